//! Application state for one display session.
//!
//! Everything the display needs lives here instead of in globals: the last
//! fetched events, their summary, the sort preference and whether the last
//! refresh actually succeeded.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::client::QueryParams;
use crate::errors::QuakeviewError;
use crate::models::Feature;
use crate::stats::{Highlights, Summary, calculate_stats};

/// Ordering for the quake list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Newest first (default)
    #[default]
    Time,
    /// Largest magnitude first
    Magnitude,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Magnitude => "magnitude",
        }
    }

    /// The other ordering.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Time => Self::Magnitude,
            Self::Magnitude => Self::Time,
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "time" => Ok(Self::Time),
            "magnitude" | "mag" => Ok(Self::Magnitude),
            _ => Err(format!("unknown sort: {s} (expected: time, magnitude)")),
        }
    }
}

/// Outcome of the most recent applied refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// Nothing fetched yet
    #[default]
    Idle,
    /// The query returned events
    Loaded { count: usize },
    /// The query succeeded with zero results
    Empty,
    /// The query failed; the event list is empty
    Failed { reason: String },
}

/// Sort `events` for display. Missing times sort as `now`; ties keep feed order.
#[must_use]
pub fn sort_events(events: &[Feature], sort_by: SortBy, now: DateTime<Utc>) -> Vec<&Feature> {
    let mut sorted: Vec<&Feature> = events.iter().collect();
    sorted.sort_by(|a, b| compare(a, b, sort_by, now));
    sorted
}

fn compare(a: &Feature, b: &Feature, sort_by: SortBy, now: DateTime<Utc>) -> Ordering {
    match sort_by {
        SortBy::Time => b.time_or(now).cmp(&a.time_or(now)),
        SortBy::Magnitude => b.magnitude().total_cmp(&a.magnitude()),
    }
}

/// State owned by the refresh loop and published to the display.
#[derive(Debug, Clone)]
pub struct AppState {
    pub params: QueryParams,
    pub events: Vec<Feature>,
    pub summary: Summary,
    pub highlights: Highlights,
    pub status: FetchStatus,
    pub sort_by: SortBy,
    /// Id of the refresh that produced the current data (0 before the first)
    pub refresh_id: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl AppState {
    #[must_use]
    pub fn new(params: QueryParams, sort_by: SortBy) -> Self {
        Self {
            params,
            events: Vec::new(),
            summary: Summary::default(),
            highlights: Highlights::default(),
            status: FetchStatus::Idle,
            sort_by,
            refresh_id: 0,
            refreshed_at: None,
        }
    }

    /// Replace all fetched data with the outcome of refresh `refresh_id`.
    pub fn apply(
        &mut self,
        refresh_id: u64,
        params: QueryParams,
        result: Result<Vec<Feature>, QuakeviewError>,
        now: DateTime<Utc>,
    ) {
        let (events, status) = match result {
            Ok(events) if events.is_empty() => (events, FetchStatus::Empty),
            Ok(events) => {
                let count = events.len();
                (events, FetchStatus::Loaded { count })
            }
            Err(e) => (
                Vec::new(),
                FetchStatus::Failed {
                    reason: e.to_string(),
                },
            ),
        };

        self.summary = calculate_stats(&events, now);
        self.highlights = Highlights::find(&events);
        self.events = events;
        self.status = status;
        self.params = params;
        self.refresh_id = refresh_id;
        self.refreshed_at = Some(now);
    }

    /// Events in the current sort order.
    #[must_use]
    pub fn sorted_events(&self) -> Vec<&Feature> {
        sort_events(
            &self.events,
            self.sort_by,
            self.refreshed_at.unwrap_or_else(Utc::now),
        )
    }

    pub fn toggle_sort(&mut self) {
        self.sort_by = self.sort_by.toggled();
    }
}
