//! Data models for USGS FDSN event query responses.
//!
//! The query service returns GeoJSON, but records are treated as loosely
//! typed: every field may be missing and falls back to a documented default
//! instead of failing the whole response.

use std::borrow::Cow;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::QuakeviewError;
use crate::location::format_location_opt;
use crate::stats::format_time_since;

/// Place text used when an event carries none.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Base URL for USGS event pages.
const EVENT_PAGE_BASE: &str = "https://earthquake.usgs.gov/earthquakes/eventpage";

/// Top-level GeoJSON response from the query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Query metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Earthquake events
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), QuakeviewError> {
        if self.type_ != "FeatureCollection" {
            return Err(QuakeviewError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }
}

/// Metadata about the query response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Human-readable title
    pub title: Option<String>,

    /// Number of events in response
    pub count: Option<usize>,
}

/// A single earthquake event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    /// Unique event ID
    #[serde(default)]
    pub id: Option<String>,

    /// Geographic location
    #[serde(default)]
    pub geometry: Option<Geometry>,

    /// Event properties
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl Feature {
    /// Event ID, or an empty string when the feed omitted it.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Magnitude, treating a missing value as 0.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.properties
            .as_ref()
            .and_then(|p| p.mag)
            .unwrap_or(0.0)
    }

    /// Raw place description, or [`UNKNOWN_LOCATION`].
    #[must_use]
    pub fn place(&self) -> &str {
        self.properties
            .as_ref()
            .and_then(|p| p.place.as_deref())
            .unwrap_or(UNKNOWN_LOCATION)
    }

    /// Place normalized by [`format_location_opt`], or [`UNKNOWN_LOCATION`].
    #[must_use]
    pub fn location(&self) -> Cow<'_, str> {
        let place = self.properties.as_ref().and_then(|p| p.place.as_deref());
        format_location_opt(place).unwrap_or(Cow::Borrowed(UNKNOWN_LOCATION))
    }

    /// Event time as reported by the feed, if present and representable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        let millis = self.properties.as_ref()?.time?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Event time, substituting `now` when the feed omitted it.
    #[must_use]
    pub fn time_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.time().unwrap_or(now)
    }

    fn coordinate(&self, index: usize) -> f64 {
        self.geometry
            .as_ref()
            .and_then(|g| g.coordinates.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Get longitude (degrees).
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinate(0)
    }

    /// Get latitude (degrees).
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinate(1)
    }

    /// Get depth in kilometers (positive down).
    #[must_use]
    pub fn depth_km(&self) -> f64 {
        self.coordinate(2)
    }

    /// USGS event page for this event.
    #[must_use]
    pub fn event_page(&self) -> String {
        match self.properties.as_ref().and_then(|p| p.url.as_deref()) {
            Some(url) => url.to_string(),
            None => format!("{EVENT_PAGE_BASE}/{}", self.id()),
        }
    }
}

/// Geographic geometry for an event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

/// The subset of event properties quakeview reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Properties {
    /// Magnitude value
    pub mag: Option<f64>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: Option<i64>,

    /// Event page URL
    pub url: Option<String>,
}

/// Simplified event for output.
///
/// This is the normalized structure we emit in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent {
    pub id: String,
    pub time: String,
    pub magnitude: f64,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub place: String,
    pub location: String,
    pub time_since: String,
    pub url: String,
}

impl OutputEvent {
    /// Normalize a feature relative to `now`.
    #[must_use]
    pub fn new(f: &Feature, now: DateTime<Utc>) -> Self {
        let time = f.time_or(now);
        Self {
            id: f.id().to_string(),
            time: time.to_rfc3339(),
            magnitude: f.magnitude(),
            depth_km: f.depth_km(),
            latitude: f.latitude(),
            longitude: f.longitude(),
            place: f.place().to_string(),
            location: f.location().into_owned(),
            time_since: format_time_since(time, now),
            url: f.event_page(),
        }
    }
}

#[cfg(test)]
pub(crate) fn quake(id: &str, mag: Option<f64>, time: Option<DateTime<Utc>>) -> Feature {
    Feature {
        id: Some(id.to_string()),
        geometry: Some(Geometry {
            coordinates: vec![-122.0, 37.0, 10.0],
        }),
        properties: Some(Properties {
            mag,
            place: Some(format!("10 km N of {id}")),
            time: time.map(|t| t.timestamp_millis()),
            url: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_query() {
        let json = include_str!("../tools/sample_query.geojson");
        let feed: FeatureCollection =
            serde_json::from_str(json).expect("failed to parse sample query");

        feed.validate().expect("invalid feed");
        assert_eq!(feed.features.len(), 4);
        assert_eq!(feed.metadata.count, Some(4));

        let first = &feed.features[0];
        assert_eq!(first.id(), "us7000abcd");
        assert!((first.magnitude() - 5.2).abs() < f64::EPSILON);
        assert_eq!(first.place(), "45 km SSW of Example Town, Chile");
        assert_eq!(first.location(), "Example Town, Chile - 45 km SSW");
        assert_eq!(feed.features[1].location(), "Example Ridge - 12 km NE");
        assert_eq!(feed.features[2].location(), "Southern Alaska");
        assert!((first.depth_km() - 35.0).abs() < f64::EPSILON);
        assert_eq!(
            first.event_page(),
            "https://earthquake.usgs.gov/earthquakes/eventpage/us7000abcd"
        );
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let json = include_str!("../tools/sample_query.geojson");
        let feed: FeatureCollection = serde_json::from_str(json).unwrap();
        let sparse = &feed.features[3];

        let now = Utc::now();
        assert_eq!(sparse.id(), "");
        assert!(sparse.magnitude().abs() < f64::EPSILON);
        assert_eq!(sparse.place(), UNKNOWN_LOCATION);
        assert_eq!(sparse.location(), UNKNOWN_LOCATION);
        assert!(sparse.time().is_none());
        assert_eq!(sparse.time_or(now), now);
        // Two coordinates only: depth falls back to 0
        assert!((sparse.longitude() - 10.5).abs() < f64::EPSILON);
        assert!((sparse.latitude() - 20.25).abs() < f64::EPSILON);
        assert!(sparse.depth_km().abs() < f64::EPSILON);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let feed: FeatureCollection =
            serde_json::from_str(r#"{"type": "Feature", "features": []}"#).unwrap();
        assert!(feed.validate().is_err());
    }

    #[test]
    fn test_null_properties_and_geometry() {
        let f: Feature =
            serde_json::from_str(r#"{"id": "x1", "geometry": null, "properties": null}"#).unwrap();
        assert_eq!(f.id(), "x1");
        assert_eq!(f.place(), UNKNOWN_LOCATION);
        assert!(f.longitude().abs() < f64::EPSILON);
    }

    #[test]
    fn test_output_event_uses_formatted_location() {
        let now = Utc::now();
        let event = OutputEvent::new(&quake("Example Town", Some(4.0), Some(now)), now);
        assert_eq!(event.place, "10 km N of Example Town");
        assert_eq!(event.location, "Example Town - 10 km N");
        assert_eq!(event.time_since, "0 seconds ago");
    }
}
