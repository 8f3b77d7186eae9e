//! Integration tests for segment editing
//!
//! Drives a SegmentEditor through a realistic editing session built from a
//! server region tree, checking the undo/redo laws along the way.

use trackview_core::{RegionNode, RegionTree, SegmentStore, TrackType};
use trackview_edit::{EditCommand, HistoryConfig, SegmentEditor, TrackTypeSwitch, UnsavedDecision};

fn region_tree() -> RegionTree {
    RegionTree {
        regions: vec![
            RegionNode::leaf("p-hb", TrackType::Province, "Hubei", 0, 49).with_children(vec![
                RegionNode::leaf("c-wh", TrackType::City, "Wuhan", 0, 29).with_children(vec![
                    RegionNode::leaf("d-wc", TrackType::District, "Wuchang", 0, 14),
                    RegionNode::leaf("d-hk", TrackType::District, "Hankou", 15, 29),
                ]),
                RegionNode::leaf("c-xg", TrackType::City, "Xiaogan", 30, 49),
            ]),
        ],
        roads: vec![
            RegionNode::leaf("r-g4", TrackType::Road, "G4", 0, 39),
            RegionNode::leaf("r-s1", TrackType::Road, "S1", 40, 49),
        ],
    }
}

fn editor() -> SegmentEditor {
    let store = SegmentStore::from_segments(region_tree().segments());
    SegmentEditor::new(store, &HistoryConfig::default()).with_active_track_type(TrackType::City)
}

#[test]
fn test_n_applies_then_n_undos_restore_original() {
    let mut editor = editor();
    let original = editor.store().clone();

    let edits = [
        (TrackType::City, "c-wh", "Wuhan City"),
        (TrackType::District, "d-hk", "Hankou District"),
        (TrackType::Road, "r-g4", "G4 Beijing-HK-Macau"),
        (TrackType::City, "c-wh", "Wuhan Municipality"),
        (TrackType::Province, "p-hb", "Hubei Province"),
    ];
    for (track_type, id, value) in edits {
        editor.apply(track_type, id, value, None).unwrap();
    }
    let edited = editor.store().clone();
    assert_ne!(edited, original);

    for _ in 0..edits.len() {
        editor.undo().unwrap();
    }
    assert_eq!(*editor.store(), original);
    assert!(!editor.can_undo());

    for _ in 0..edits.len() {
        editor.redo().unwrap();
    }
    assert_eq!(*editor.store(), edited);
    assert!(!editor.can_redo());
}

#[test]
fn test_commands_have_increasing_ids() {
    let mut editor = editor();
    let a = editor.apply(TrackType::City, "c-wh", "A", None).unwrap();
    let b = editor.apply(TrackType::City, "c-xg", "B", None).unwrap();
    editor.undo().unwrap();
    let c = editor.apply(TrackType::City, "c-xg", "C", None).unwrap();

    assert!(a.id < b.id);
    assert!(b.id < c.id);
}

#[test]
fn test_save_cycle_with_switch() {
    let mut editor = editor();
    editor
        .apply(TrackType::City, "c-xg", "Xiaogan City", Some("Xiaogan".into()))
        .unwrap();

    let outcome = editor.request_track_type(TrackType::Road);
    assert!(matches!(outcome, TrackTypeSwitch::NeedsDecision { pending: 1, .. }));

    // Caller persists the pending edits, then resolves with Save
    let edits = editor.pending_edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].segment_id, "c-xg");
    assert_eq!(edits[0].value_en.as_deref(), Some("Xiaogan"));
    editor.mark_saved();

    assert_eq!(
        editor
            .resolve_track_type(TrackType::Road, UnsavedDecision::Save)
            .unwrap(),
        TrackTypeSwitch::Switched {
            from: TrackType::City,
            to: TrackType::Road
        }
    );
    assert_eq!(editor.active_segments().len(), 2);

    // History survives the save
    assert!(editor.can_undo());
    editor.undo().unwrap();
    assert!(editor.has_unsaved_changes());
}

#[test]
fn test_edit_command_serializes_camel_case() {
    let mut editor = editor();
    let command = editor
        .apply(TrackType::District, "d-wc", "Wuchang District", None)
        .unwrap();

    let json = serde_json::to_string(&command).unwrap();
    assert!(json.contains(r#""segmentId":"d-wc""#));
    assert!(json.contains(r#""previousValue":"Wuchang""#));
    assert!(json.contains(r#""trackType":"district""#));

    let back: EditCommand = serde_json::from_str(&json).unwrap();
    assert_eq!(back, command);
}
