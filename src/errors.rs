//! Error types for quakeview.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in quakeview operations.
///
/// In `watch` any of these raised by a fetch ends up as
/// [`FetchStatus::Failed`](crate::state::FetchStatus::Failed); one-shot
/// commands log them and print an empty result.
#[derive(Error, Debug)]
pub enum QuakeviewError {
    /// Transport failure: connect, timeout, TLS, or reading the body
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not JSON
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Non-success status from the event service
    #[error("USGS API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON that is not a GeoJSON feature collection
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Lookback window reaches past the earliest representable date
    #[error("lookback of {days} days is out of range")]
    WindowOutOfRange { days: u32 },

    /// A line typed on stdin in `watch` that is not a known control
    #[error("Invalid control: {0}")]
    InvalidControl(String),
}
