//! USGS FDSN event query client.
//!
//! Provides async HTTP access to the earthquake catalog query endpoint.
//! Uses reqwest with rustls for TLS.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use reqwest::{Client, Request};
use tracing::{debug, info, instrument, warn};

use crate::errors::QuakeviewError;
use crate::models::{Feature, FeatureCollection};

/// Default request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakeview/", env!("CARGO_PKG_VERSION"));

/// USGS earthquake catalog query endpoint.
pub const USGS_QUERY_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

/// Connection settings for [`UsgsClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: USGS_QUERY_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// User-facing query controls: lookback window and magnitude floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParams {
    pub days: u32,
    pub min_magnitude: f64,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            days: 1,
            min_magnitude: 2.5,
        }
    }
}

impl QueryParams {
    /// Resolve the lookback window against a concrete end time.
    ///
    /// # Errors
    ///
    /// Returns [`QuakeviewError::WindowOutOfRange`] if the start of the
    /// window is before the earliest date chrono can represent.
    pub fn window_ending_at(self, end: DateTime<Utc>) -> Result<QueryWindow, QuakeviewError> {
        let start = TimeDelta::try_days(i64::from(self.days))
            .and_then(|lookback| end.checked_sub_signed(lookback))
            .ok_or(QuakeviewError::WindowOutOfRange { days: self.days })?;

        Ok(QueryWindow {
            start,
            end,
            min_magnitude: self.min_magnitude,
        })
    }
}

/// A concrete time range and magnitude floor sent to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub min_magnitude: f64,
}

impl QueryWindow {
    /// Query-string pairs in the endpoint's expected textual format.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("format", "geojson".to_string()),
            ("starttime", iso_millis(self.start)),
            ("endtime", iso_millis(self.end)),
            ("minmagnitude", self.min_magnitude.to_string()),
        ]
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
fn iso_millis(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Client for the USGS event query API.
#[derive(Debug, Clone)]
pub struct UsgsClient {
    client: Client,
    base_url: String,
}

impl UsgsClient {
    /// Create a client with an explicit endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_config(config: ClientConfig) -> Result<Self, QuakeviewError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    fn build_request(&self, window: &QueryWindow) -> Result<Request, QuakeviewError> {
        Ok(self
            .client
            .get(&self.base_url)
            .query(&window.query_pairs()[..])
            .build()?)
    }

    /// Run a query and return the full collection.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body that is not a GeoJSON feature collection.
    #[instrument(skip(self), fields(min_magnitude = window.min_magnitude))]
    pub async fn query(&self, window: &QueryWindow) -> Result<FeatureCollection, QuakeviewError> {
        let request = self.build_request(window)?;
        debug!("fetching data from {}", request.url());

        let response = self.client.execute(request).await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuakeviewError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let feed: FeatureCollection = serde_json::from_str(&body)?;
        feed.validate()?;

        debug!(
            title = ?feed.metadata.title,
            count = ?feed.metadata.count,
            "fetched {} events",
            feed.features.len()
        );
        Ok(feed)
    }

    /// Fetch the events for `params`, ending now.
    ///
    /// # Errors
    ///
    /// Same as [`UsgsClient::query`], plus
    /// [`QuakeviewError::WindowOutOfRange`] for an unrepresentable window.
    pub async fn fetch(&self, params: QueryParams) -> Result<Vec<Feature>, QuakeviewError> {
        let window = params.window_ending_at(Utc::now())?;
        let feed = self.query(&window).await?;
        if feed.features.is_empty() {
            info!("no earthquake data found for the selected parameters");
        } else {
            info!("found {} earthquakes", feed.features.len());
        }
        Ok(feed.features)
    }

    /// Fetch the events for `params`, collapsing any failure to an empty list.
    ///
    /// The failure is only visible in the logs; use [`UsgsClient::fetch`]
    /// to tell "no data" from "fetch failed".
    pub async fn fetch_recent(&self, params: QueryParams) -> Vec<Feature> {
        match self.fetch(params).await {
            Ok(features) => features,
            Err(e) => {
                warn!("error fetching earthquake data: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn unreachable_client() -> UsgsClient {
        UsgsClient::with_config(ClientConfig {
            base_url: "http://127.0.0.1:9/fdsnws/event/1/query".to_string(),
            timeout: Duration::from_secs(2),
        })
        .expect("client")
    }

    /// Serve the same canned HTTP response to every connection and return
    /// the query URL pointing at it.
    async fn canned_server(status_line: &str, body: &str) -> String {
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{addr}/fdsnws/event/1/query")
    }

    fn client_for(base_url: String) -> UsgsClient {
        UsgsClient::with_config(ClientConfig {
            base_url,
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    #[test]
    fn test_window_from_params() {
        let end = Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap();
        let window = QueryParams {
            days: 7,
            min_magnitude: 4.5,
        }
        .window_ending_at(end)
        .unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert_eq!(window.end, end);
    }

    #[test]
    fn test_query_url() {
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let window = QueryParams {
            days: 1,
            min_magnitude: 2.5,
        }
        .window_ending_at(end)
        .unwrap();

        let client = UsgsClient::with_config(ClientConfig::default()).expect("client");
        let request = client.build_request(&window).expect("request");
        let url = request.url();

        assert_eq!(url.host_str(), Some("earthquake.usgs.gov"));
        assert_eq!(url.path(), "/fdsnws/event/1/query");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("format".to_string(), "geojson".to_string()),
                ("starttime".to_string(), "2024-04-30T12:00:00.000Z".to_string()),
                ("endtime".to_string(), "2024-05-01T12:00:00.000Z".to_string()),
                ("minmagnitude".to_string(), "2.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_whole_magnitude_has_no_fraction() {
        let window = QueryParams {
            days: 1,
            min_magnitude: 3.0,
        }
        .window_ending_at(Utc::now())
        .unwrap();
        assert_eq!(window.query_pairs()[3].1, "3");
    }

    #[test]
    fn test_window_before_earliest_date_is_an_error() {
        let result = QueryParams {
            days: 100_000_000,
            min_magnitude: 2.5,
        }
        .window_ending_at(Utc::now());
        assert!(matches!(
            result,
            Err(QuakeviewError::WindowOutOfRange { days: 100_000_000 })
        ));

        let widest = QueryParams {
            days: u32::MAX,
            min_magnitude: 2.5,
        };
        assert!(widest.window_ending_at(Utc::now()).is_err());
    }

    #[tokio::test]
    async fn test_fetch_reports_out_of_range_window() {
        let params = QueryParams {
            days: 100_000_000,
            min_magnitude: 2.5,
        };
        let client = unreachable_client();

        let result = client.fetch(params).await;
        assert!(matches!(result, Err(QuakeviewError::WindowOutOfRange { .. })));
        assert!(client.fetch_recent(params).await.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_becomes_api_error() {
        let client = client_for(canned_server("503 Service Unavailable", "unavailable").await);

        let result = client.fetch(QueryParams::default()).await;
        match result {
            Err(QuakeviewError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "unavailable");
            }
            other => panic!("expected API error, got {other:?}"),
        }
        assert!(client.fetch_recent(QueryParams::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_geojson_type_is_invalid_response() {
        let client = client_for(canned_server("200 OK", r#"{"type":"Feature"}"#).await);

        let result = client.fetch(QueryParams::default()).await;
        assert!(matches!(result, Err(QuakeviewError::InvalidResponse(_))));
        assert!(client.fetch_recent(QueryParams::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_is_parse_error() {
        let client = client_for(canned_server("200 OK", "<html>maintenance</html>").await);

        let result = client.fetch(QueryParams::default()).await;
        assert!(matches!(result, Err(QuakeviewError::Parse(_))));
        assert!(client.fetch_recent(QueryParams::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_parses_served_collection() {
        let body = include_str!("../tools/sample_query.geojson");
        let client = client_for(canned_server("200 OK", body).await);

        let events = client.fetch(QueryParams::default()).await.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].id(), "us7000abcd");
    }

    #[tokio::test]
    async fn test_fetch_recent_swallows_transport_failure() {
        let events = unreachable_client()
            .fetch_recent(QueryParams::default())
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_surfaces_transport_failure() {
        let result = unreachable_client().fetch(QueryParams::default()).await;
        assert!(matches!(result, Err(QuakeviewError::Http(_))));
    }
}
