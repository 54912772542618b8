//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::client::{ClientConfig, QueryParams, REQUEST_TIMEOUT_SECS, USGS_QUERY_URL};
use crate::errors::QuakeviewError;
use crate::output::Format;
use crate::state::SortBy;

/// Recent earthquake statistics from the USGS event service.
#[derive(Parser, Debug)]
#[command(name = "quakeview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Event query endpoint
    #[arg(long, global = true, default_value = USGS_QUERY_URL)]
    pub endpoint: String,

    /// Request timeout in seconds
    #[arg(
        long,
        global = true,
        default_value_t = REQUEST_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
}

impl Cli {
    /// Client settings from the global flags.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.endpoint.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show summary statistics for recent earthquakes
    Stats(StatsArgs),

    /// List recent earthquakes
    List(ListArgs),

    /// Keep statistics on screen and refresh when controls change on stdin
    Watch(WatchArgs),

    /// Show the magnitude color legend
    Legend,
}

/// Lookback window and magnitude floor shared by all queries.
#[derive(Args, Debug, Clone, Copy)]
pub struct QueryArgs {
    /// Number of days to look back
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// Minimum magnitude to show
    #[arg(long, default_value = "2.5", value_parser = parse_magnitude)]
    pub min_magnitude: f64,
}

impl From<QueryArgs> for QueryParams {
    fn from(args: QueryArgs) -> Self {
        Self {
            days: args.days,
            min_magnitude: args.min_magnitude,
        }
    }
}

/// Arguments for the `stats` command.
#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// List ordering
    #[arg(long, default_value = "time", value_parser = parse_sort)]
    pub sort: SortBy,

    /// Maximum number of events to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Initial list ordering
    #[arg(long, default_value = "time", value_parser = parse_sort)]
    pub sort: SortBy,

    /// Number of events listed under the statistics
    #[arg(long, short = 'n', default_value = "10")]
    pub limit: usize,
}

/// A control line read from stdin in `watch` mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    /// `days <N>`: change the lookback window
    Days(u32),
    /// `mag <M>`: change the magnitude floor
    Magnitude(f64),
    /// `sort`: flip between time and magnitude order
    ToggleSort,
    /// `refresh`: fetch again right away
    Refresh,
    /// `quit`
    Quit,
}

impl Control {
    /// Apply a numeric control to the current parameters.
    ///
    /// Returns `true` if the parameters changed.
    pub fn update(self, params: &mut QueryParams) -> bool {
        let before = *params;
        match self {
            Self::Days(days) => params.days = days,
            Self::Magnitude(min_magnitude) => params.min_magnitude = min_magnitude,
            Self::ToggleSort | Self::Refresh | Self::Quit => {}
        }
        *params != before
    }
}

impl std::str::FromStr for Control {
    type Err = QuakeviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let value = words.next();
        if words.next().is_some() {
            return Err(QuakeviewError::InvalidControl(format!(
                "too many arguments: {s}"
            )));
        }

        let require = |name: &str| {
            value.ok_or_else(|| QuakeviewError::InvalidControl(format!("{name} needs a value")))
        };

        match command.as_str() {
            "days" | "d" => {
                let raw = require("days")?;
                let days: u32 = raw
                    .parse()
                    .map_err(|_| QuakeviewError::InvalidControl(format!("invalid days: {raw}")))?;
                if days == 0 {
                    return Err(QuakeviewError::InvalidControl(
                        "days must be at least 1".into(),
                    ));
                }
                Ok(Self::Days(days))
            }
            "mag" | "magnitude" | "m" => {
                let raw = require("mag")?;
                parse_magnitude(raw)
                    .map(Self::Magnitude)
                    .map_err(QuakeviewError::InvalidControl)
            }
            "sort" | "s" => Ok(Self::ToggleSort),
            "refresh" | "r" => Ok(Self::Refresh),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            "" => Err(QuakeviewError::InvalidControl("empty line".into())),
            other => Err(QuakeviewError::InvalidControl(format!(
                "unknown control: {other} (expected: days, mag, sort, refresh, quit)"
            ))),
        }
    }
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a list ordering from string.
fn parse_sort(s: &str) -> Result<SortBy, String> {
    s.parse()
}

/// Parse a magnitude threshold; must be a finite number.
fn parse_magnitude(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid magnitude {s}: {e}"))?;
    if !value.is_finite() {
        return Err(format!("magnitude must be finite, got {s}"));
    }
    Ok(value)
}
