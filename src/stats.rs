//! Energy release and summary statistics.
//!
//! Energy uses the Gutenberg–Richter magnitude–energy relation,
//! `log10(E) = 1.5 * M + 4.8` with E in ergs.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Feature;

/// Additive constant of the magnitude–energy relation (ergs).
pub const ERGS_LOG_OFFSET: f64 = 4.8;

/// One ton of TNT in ergs.
pub const ERGS_PER_TON_TNT: f64 = 4.184e16;

/// Window for the "last 24 hours" count.
const RECENT_WINDOW_HOURS: i64 = 24;

/// Placeholder for `time_since_last` when there are no events.
pub const NOT_AVAILABLE: &str = "N/A";

/// Energy released by an event of the given magnitude, in ergs.
#[must_use]
pub fn energy_ergs(magnitude: f64) -> f64 {
    10f64.powf(1.5 * magnitude + ERGS_LOG_OFFSET)
}

/// Energy released by an event of the given magnitude, in tons of TNT.
#[must_use]
pub fn energy_tons_tnt(magnitude: f64) -> f64 {
    energy_ergs(magnitude) / ERGS_PER_TON_TNT
}

/// Aggregate metrics over one refresh worth of events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub max_magnitude: f64,
    /// Tons of TNT
    pub energy_release: f64,
    pub time_since_last: String,
    pub recent_count: usize,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            total: 0,
            max_magnitude: 0.0,
            energy_release: 0.0,
            time_since_last: NOT_AVAILABLE.to_string(),
            recent_count: 0,
        }
    }
}

/// Compute the summary for `events` as seen at `now`.
///
/// Missing magnitudes count as 0 and missing times as `now`.
#[must_use]
pub fn calculate_stats(events: &[Feature], now: DateTime<Utc>) -> Summary {
    if events.is_empty() {
        return Summary::default();
    }

    let one_day_ago = now - Duration::hours(RECENT_WINDOW_HOURS);
    let mut summary = Summary {
        total: events.len(),
        ..Summary::default()
    };
    let mut most_recent = DateTime::<Utc>::UNIX_EPOCH;

    for event in events {
        let magnitude = event.magnitude();
        let time = event.time_or(now);

        summary.energy_release += energy_tons_tnt(magnitude);

        if magnitude > summary.max_magnitude {
            summary.max_magnitude = magnitude;
        }
        if time > most_recent {
            most_recent = time;
        }
        if time > one_day_ago {
            summary.recent_count += 1;
        }
    }

    summary.time_since_last = format_time_since(most_recent, now);
    summary
}

/// Human-readable time elapsed from `then` to `now`.
#[must_use]
pub fn format_time_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_milliseconds().div_euclid(1000);
    format_elapsed_secs(seconds)
}

/// Bucket an elapsed number of seconds. Units are never singularized.
#[must_use]
pub fn format_elapsed_secs(seconds: i64) -> String {
    if seconds < 60 {
        format!("{seconds} seconds ago")
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{} hours ago", seconds / 3600)
    } else {
        format!("{} days ago", seconds / 86_400)
    }
}

/// Compact energy text: millions and thousands of tons get an M/K suffix.
#[must_use]
pub fn format_energy(tons: f64) -> String {
    if tons >= 1_000_000.0 {
        format!("{:.1}M tons TNT", tons / 1_000_000.0)
    } else if tons >= 1_000.0 {
        format!("{:.1}K tons TNT", tons / 1_000.0)
    } else {
        format!("{tons:.1} tons TNT")
    }
}

/// Positions of the events worth pointing at in a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlights {
    /// First event with the greatest magnitude
    pub strongest: Option<usize>,
    /// First event with the latest reported time; events without a time are skipped
    pub most_recent: Option<usize>,
}

impl Highlights {
    #[must_use]
    pub fn find(events: &[Feature]) -> Self {
        let mut highlights = Self::default();
        // Magnitudes at or below -1 never count as strongest
        let mut max_magnitude = -1.0;
        let mut latest: Option<DateTime<Utc>> = None;

        for (index, event) in events.iter().enumerate() {
            let magnitude = event.magnitude();
            if magnitude > max_magnitude {
                max_magnitude = magnitude;
                highlights.strongest = Some(index);
            }

            if let Some(time) = event.time() {
                if latest.is_none_or(|t| time > t) {
                    latest = Some(time);
                    highlights.most_recent = Some(index);
                }
            }
        }

        highlights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quake;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= a.abs().max(b.abs()) * 1e-12
    }

    #[test]
    fn test_energy_constants() {
        assert!(close(energy_ergs(5.0), 10f64.powf(12.3)));
        assert!(close(energy_tons_tnt(5.0), 10f64.powf(12.3) / 4.184e16));
        assert!(energy_tons_tnt(5.0) > 0.0);
    }

    #[test]
    fn test_energy_of_zero_magnitude_is_positive() {
        let e = energy_tons_tnt(0.0);
        assert!(e > 0.0);
        assert!(close(e, 10f64.powf(4.8) / 4.184e16));
    }

    #[test]
    fn test_energy_scales_by_magnitude_step() {
        // One magnitude unit is 10^1.5 times the energy
        let ratio = energy_tons_tnt(6.0) / energy_tons_tnt(5.0);
        assert!(close(ratio, 10f64.powf(1.5)));
    }

    #[test]
    fn test_empty_summary() {
        let summary = calculate_stats(&[], Utc::now());
        assert_eq!(summary.total, 0);
        assert!(summary.max_magnitude.abs() < f64::EPSILON);
        assert!(summary.energy_release.abs() < f64::EPSILON);
        assert_eq!(summary.time_since_last, "N/A");
        assert_eq!(summary.recent_count, 0);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_two_event_summary() {
        let now = Utc::now();
        let events = [
            quake("a", Some(4.0), Some(now - Duration::hours(2))),
            quake("b", Some(6.0), Some(now - Duration::hours(30))),
        ];

        let summary = calculate_stats(&events, now);
        assert_eq!(summary.total, 2);
        assert!((summary.max_magnitude - 6.0).abs() < f64::EPSILON);
        assert_eq!(summary.recent_count, 1);
        assert!(close(
            summary.energy_release,
            energy_tons_tnt(4.0) + energy_tons_tnt(6.0)
        ));
        assert_eq!(summary.time_since_last, "2 hours ago");
    }

    #[test]
    fn test_missing_magnitude_and_time() {
        let now = Utc::now();
        let events = [
            quake("a", None, None),
            quake("b", Some(-0.5), Some(now - Duration::days(3))),
        ];

        let summary = calculate_stats(&events, now);
        // Negative magnitudes never pull the maximum below 0
        assert!(summary.max_magnitude.abs() < f64::EPSILON);
        // Missing time counts as "now"
        assert_eq!(summary.recent_count, 1);
        assert_eq!(summary.time_since_last, "0 seconds ago");
        assert!(close(
            summary.energy_release,
            energy_tons_tnt(0.0) + energy_tons_tnt(-0.5)
        ));
    }

    #[test]
    fn test_elapsed_boundaries() {
        assert_eq!(format_elapsed_secs(0), "0 seconds ago");
        assert_eq!(format_elapsed_secs(59), "59 seconds ago");
        assert_eq!(format_elapsed_secs(60), "1 minutes ago");
        assert_eq!(format_elapsed_secs(3599), "59 minutes ago");
        assert_eq!(format_elapsed_secs(3600), "1 hours ago");
        assert_eq!(format_elapsed_secs(86_399), "23 hours ago");
        assert_eq!(format_elapsed_secs(86_400), "1 days ago");
        assert_eq!(format_elapsed_secs(10 * 86_400 + 5), "10 days ago");
    }

    #[test]
    fn test_time_since_floors_partial_seconds() {
        let now = Utc::now();
        let then = now - Duration::milliseconds(59_999);
        assert_eq!(format_time_since(then, now), "59 seconds ago");
    }

    #[test]
    fn test_format_energy() {
        assert_eq!(format_energy(0.0), "0.0 tons TNT");
        assert_eq!(format_energy(999.94), "999.9 tons TNT");
        assert_eq!(format_energy(1_000.0), "1.0K tons TNT");
        assert_eq!(format_energy(2_500_000.0), "2.5M tons TNT");
    }

    #[test]
    fn test_summary_json_field_names() {
        let json = serde_json::to_value(Summary::default()).unwrap();
        assert_eq!(json["timeSinceLast"], "N/A");
        assert_eq!(json["maxMagnitude"], 0.0);
        assert_eq!(json["recentCount"], 0);
        assert_eq!(json["energyRelease"], 0.0);
        assert_eq!(json["total"], 0);
    }

    #[test]
    fn test_highlights() {
        let now = Utc::now();
        let events = [
            quake("a", Some(3.0), Some(now - Duration::hours(5))),
            quake("b", Some(5.5), Some(now - Duration::hours(9))),
            quake("c", Some(5.5), None),
            quake("d", Some(1.0), Some(now - Duration::minutes(3))),
        ];

        let highlights = Highlights::find(&events);
        assert_eq!(highlights.strongest, Some(1));
        assert_eq!(highlights.most_recent, Some(3));
        assert_eq!(Highlights::find(&[]), Highlights::default());
    }

    #[test]
    fn test_highlights_ignore_magnitudes_at_or_below_minus_one() {
        let now = Utc::now();
        let events = [
            quake("a", Some(-1.0), Some(now)),
            quake("b", Some(-1.5), Some(now - Duration::hours(1))),
        ];
        let highlights = Highlights::find(&events);
        assert_eq!(highlights.strongest, None);
        assert_eq!(highlights.most_recent, Some(0));

        // A missing magnitude counts as 0 and does qualify
        let events = [quake("a", Some(-1.2), None), quake("b", None, None)];
        assert_eq!(Highlights::find(&events).strongest, Some(1));
    }
}
