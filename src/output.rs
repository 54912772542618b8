//! Output formatters for statistics and quake lists.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::models::{Feature, OutputEvent};
use crate::state::{AppState, FetchStatus};
use crate::stats::{Summary, format_energy, format_time_since};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[91m";
const ORANGE: &str = "\x1b[38;5;208m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const BLUE: &str = "\x1b[94m";

const ICON_QUAKE: &str = "🌍";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Magnitude classes used for coloring, strictly above each lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeBand {
    Major,
    Strong,
    Moderate,
    Light,
    Minor,
}

impl MagnitudeBand {
    /// Legend rows from weakest to strongest.
    pub const LEGEND: [(&'static str, Self); 5] = [
        ("0–3", Self::Minor),
        ("3–4", Self::Light),
        ("4–5", Self::Moderate),
        ("5–6", Self::Strong),
        ("6+", Self::Major),
    ];

    #[must_use]
    pub fn of(magnitude: f64) -> Self {
        match magnitude {
            m if m > 6.0 => Self::Major,
            m if m > 5.0 => Self::Strong,
            m if m > 4.0 => Self::Moderate,
            m if m > 3.0 => Self::Light,
            _ => Self::Minor,
        }
    }

    /// Map color for the band.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Major => "#d73027",
            Self::Strong => "#fc8d59",
            Self::Moderate => "#fee090",
            Self::Light => "#e0f3f8",
            Self::Minor => "#91bfdb",
        }
    }

    /// Closest terminal color.
    const fn ansi(self) -> &'static str {
        match self {
            Self::Major => RED,
            Self::Strong => ORANGE,
            Self::Moderate => YELLOW,
            Self::Light => CYAN,
            Self::Minor => BLUE,
        }
    }
}

fn to_io<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Write the statistics box.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_stats<W: Write>(writer: &mut W, summary: &Summary, format: Format) -> io::Result<()> {
    match format {
        Format::Human => {
            writeln!(writer, "{BOLD}{ICON_QUAKE} Quake Stats{RESET}")?;
            writeln!(writer, "  Total Earthquakes:  {}", summary.total)?;
            writeln!(writer, "  Last 24 Hours:      {}", summary.recent_count)?;
            writeln!(
                writer,
                "  Strongest:          {}{:.1}{RESET}",
                MagnitudeBand::of(summary.max_magnitude).ansi(),
                summary.max_magnitude
            )?;
            writeln!(
                writer,
                "  Energy Release:     {}",
                format_energy(summary.energy_release)
            )?;
            writeln!(writer, "  Last Earthquake:    {}", summary.time_since_last)
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(summary).map_err(to_io)?;
            writeln!(writer, "{json}")
        }
        Format::Ndjson => {
            let json = serde_json::to_string(summary).map_err(to_io)?;
            writeln!(writer, "{json}")
        }
    }
}

/// Write events in human-readable format, one line each.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[&Feature], now: DateTime<Utc>) -> io::Result<()> {
    for event in events {
        let mag = event.magnitude();
        let color = MagnitudeBand::of(mag).ansi();
        let location = event.location();
        let since = format_time_since(event.time_or(now), now);

        writeln!(
            writer,
            "{color}{BOLD}M{mag:.1}{RESET} │ \
             {location} │ \
             {DIM}{since}{RESET} │ \
             {DIM}{depth:.2} km{RESET}",
            depth = event.depth_km()
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[&Feature], now: DateTime<Utc>) -> io::Result<()> {
    let output: Vec<OutputEvent> = events.iter().map(|f| OutputEvent::new(f, now)).collect();
    let json = serde_json::to_string_pretty(&output).map_err(to_io)?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[&Feature], now: DateTime<Utc>) -> io::Result<()> {
    for event in events {
        let json = serde_json::to_string(&OutputEvent::new(event, now)).map_err(to_io)?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    events: &[&Feature],
    format: Format,
    now: DateTime<Utc>,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events, now),
        Format::Json => write_json(writer, events, now),
        Format::Ndjson => write_ndjson(writer, events, now),
    }
}

/// Write the magnitude legend.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_legend<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{BOLD}Magnitude{RESET}")?;
    for (label, band) in MagnitudeBand::LEGEND {
        writeln!(writer, "  {}●{RESET} {label:<4} {DIM}{}{RESET}", band.ansi(), band.hex())?;
    }
    Ok(())
}

/// One-line description of the last refresh outcome.
#[must_use]
pub fn status_line(state: &AppState) -> String {
    let days = state.params.days;
    let min_mag = state.params.min_magnitude;
    match &state.status {
        FetchStatus::Idle => "Loading…".to_string(),
        FetchStatus::Loaded { count } => format!(
            "{count} earthquakes in the last {days} days, magnitude >= {min_mag} (sorted by {})",
            state.sort_by.as_str()
        ),
        FetchStatus::Empty => format!(
            "No earthquakes in the last {days} days with magnitude >= {min_mag}"
        ),
        FetchStatus::Failed { reason } => format!("Fetch failed: {reason}"),
    }
}

/// Point at the strongest and the most recent event.
fn write_highlights<W: Write>(writer: &mut W, state: &AppState) -> io::Result<()> {
    let picks = [
        ("Strongest", state.highlights.strongest),
        ("Most recent", state.highlights.most_recent),
    ];
    for (label, index) in picks {
        if let Some(event) = index.and_then(|i| state.events.get(i)) {
            writeln!(
                writer,
                "  {label:<19} M{:.1} {} {DIM}{}{RESET}",
                event.magnitude(),
                event.location(),
                event.event_page()
            )?;
        }
    }
    Ok(())
}

/// Write a full `watch` frame: status, statistics and the top of the list.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_snapshot<W: Write>(
    writer: &mut W,
    state: &AppState,
    limit: usize,
    now: DateTime<Utc>,
) -> io::Result<()> {
    let color = match state.status {
        FetchStatus::Failed { .. } => RED,
        _ => DIM,
    };
    writeln!(writer, "{DIM}─────────────────────────────────────────────{RESET}")?;
    writeln!(writer, "{color}{}{RESET}", status_line(state))?;
    write_stats(writer, &state.summary, Format::Human)?;
    write_highlights(writer, state)?;

    let mut events = state.sorted_events();
    if !events.is_empty() {
        events.truncate(limit);
        writeln!(writer, "{BOLD}Quake List{RESET}")?;
        write_human(writer, &events, now)?;
    }
    writer.flush()
}
