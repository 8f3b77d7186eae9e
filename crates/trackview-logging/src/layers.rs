//! Custom tracing layers for Trackview
//!
//! This module provides layers that attach session context to spans and
//! build the JSONL formatter used for console and file output.

use tracing::{Subscriber, span};
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::config::JsonlConfig;
use crate::context::{SessionContextData, SessionContextGuard};

/// Layer that attaches the active session context to new spans
///
/// When a [`SessionContextGuard`] is active, every span created on that
/// thread gets a [`SessionContextExtension`] that later layers can read.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionContextLayer;

impl SessionContextLayer {
    pub fn new() -> Self {
        Self
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct SessionContextExtension {
    pub data: SessionContextData,
}

impl<S> Layer<S> for SessionContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        // Inherit from the parent span when no guard is active on this thread
        let data = SessionContextGuard::current().or_else(|| {
            span.parent().and_then(|parent| {
                parent
                    .extensions()
                    .get::<SessionContextExtension>()
                    .map(|ext| ext.data.clone())
            })
        });

        if let Some(data) = data {
            span.extensions_mut().insert(SessionContextExtension { data });
        }
    }
}

/// Create a JSONL formatting layer writing to `writer`
pub fn jsonl_layer<S, W>(writer: W, config: &JsonlConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_writer(writer)
        .boxed()
}
