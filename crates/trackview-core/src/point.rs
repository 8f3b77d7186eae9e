//! Track points

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Mean earth radius used for great-circle distances, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True if both components are finite and inside the WGS-84 value range
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to `other` in meters (haversine)
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Reverse-geocoding metadata attached to a point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Geocoding {
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub road_name: Option<String>,
    pub road_number: Option<String>,
    pub province_en: Option<String>,
    pub city_en: Option<String>,
    pub district_en: Option<String>,
    pub road_name_en: Option<String>,
}

impl Geocoding {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A single GPS fix
///
/// `position` is WGS-84. The alternate projections are filled in by the
/// server for map providers that need them and are never derived locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    /// Unique within a track
    pub index: u64,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub position: Coordinate,
    /// GCJ-02 projection
    #[serde(default)]
    pub gcj02: Option<Coordinate>,
    /// BD-09 projection
    #[serde(default)]
    pub bd09: Option<Coordinate>,
    /// CGCS2000 projection
    #[serde(default)]
    pub cgcs2000: Option<Coordinate>,
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Speed in km/h
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(flatten)]
    pub geocoding: Geocoding,
    #[serde(default)]
    pub memo: Option<String>,
}

impl TrackPoint {
    /// Create a bare point with only an index and a position
    pub fn new(index: u64, lat: f64, lon: f64) -> Self {
        Self {
            index,
            time: None,
            created_at: None,
            position: Coordinate::new(lat, lon),
            gcj02: None,
            bd09: None,
            cgcs2000: None,
            elevation: None,
            speed: None,
            geocoding: Geocoding::default(),
            memo: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_geocoding(mut self, geocoding: Geocoding) -> Self {
        self.geocoding = geocoding;
        self
    }

    /// Check that the point can be merged into a store
    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.position.is_valid() {
            return Err(StoreError::InvalidCoordinate {
                index: self.index,
                lat: self.position.lat,
                lon: self.position.lon,
            });
        }
        if self.elevation.is_some_and(|e| !e.is_finite()) {
            return Err(StoreError::NonFiniteValue {
                index: self.index,
                field: "elevation",
            });
        }
        if self.speed.is_some_and(|s| !s.is_finite()) {
            return Err(StoreError::NonFiniteValue {
                index: self.index,
                field: "speed",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(31.2, 121.5).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let d = a.distance_to(&b);
        // One degree of latitude is ~111.19 km on the mean sphere
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_validate_rejects_non_finite_elevation() {
        let point = TrackPoint::new(1, 10.0, 10.0).with_elevation(f64::INFINITY);
        assert!(matches!(
            point.validate(),
            Err(StoreError::NonFiniteValue { field: "elevation", .. })
        ));
        assert!(TrackPoint::new(2, 10.0, 10.0).validate().is_ok());
    }

    #[test]
    fn test_deserialize_camel_case_point() {
        let json = r#"{
            "index": 4,
            "time": "2024-05-01T10:00:00Z",
            "lat": 30.5,
            "lon": 114.3,
            "gcj02": {"lat": 30.49, "lon": 114.31},
            "elevation": 23.5,
            "roadName": "Jiefang Ave",
            "roadNameEn": "Jiefang Avenue",
            "memo": null
        }"#;

        let point: TrackPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.index, 4);
        assert!(point.time.is_some());
        assert_eq!(point.position, Coordinate::new(30.5, 114.3));
        assert_eq!(point.gcj02, Some(Coordinate::new(30.49, 114.31)));
        assert!(point.bd09.is_none());
        assert_eq!(point.geocoding.road_name.as_deref(), Some("Jiefang Ave"));
        assert_eq!(point.geocoding.road_name_en.as_deref(), Some("Jiefang Avenue"));
        assert!(point.geocoding.city.is_none());
    }
}
