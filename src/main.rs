//! quakeview - Recent earthquake statistics from your terminal.
//!
//! Queries the USGS event service for a lookback window and magnitude
//! floor, then prints summary statistics and a sortable quake list.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Runtime;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{error, warn};

mod cli;
mod client;
mod errors;
mod location;
mod models;
mod output;
mod refresh;
mod state;
mod stats;

use cli::{Cli, Command, Control};
use client::{ClientConfig, QueryParams, UsgsClient};
use refresh::Refresher;
use state::sort_events;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let config = cli.client_config();
    match cli.command {
        Command::Stats(args) => cmd_stats(&config, &args),
        Command::List(args) => cmd_list(&config, &args),
        Command::Watch(args) => cmd_watch(config, &args),
        Command::Legend => cmd_legend(),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// One-shot fetch. Failures are logged and yield an empty result.
fn fetch_once(config: &ClientConfig, params: QueryParams) -> Result<Vec<models::Feature>> {
    let runtime = Runtime::new().context("failed to create tokio runtime")?;
    runtime.block_on(async {
        let client =
            UsgsClient::with_config(config.clone()).context("failed to create USGS client")?;
        Ok::<_, anyhow::Error>(client.fetch_recent(params).await)
    })
}

/// Execute the `stats` command - summary of the selected window.
fn cmd_stats(config: &ClientConfig, args: &cli::StatsArgs) -> Result<()> {
    let events = fetch_once(config, args.query.into())?;
    let summary = stats::calculate_stats(&events, Utc::now());

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_stats(&mut handle, &summary, args.format)?;

    Ok(())
}

/// Execute the `list` command - sorted quake list.
fn cmd_list(config: &ClientConfig, args: &cli::ListArgs) -> Result<()> {
    let events = fetch_once(config, args.query.into())?;
    let now = Utc::now();

    let mut sorted = sort_events(&events, args.sort, now);
    sorted.truncate(args.limit);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &sorted, args.format, now)?;

    Ok(())
}

/// Execute the `legend` command.
fn cmd_legend() -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_legend(&mut handle)?;
    Ok(())
}

/// Execute the `watch` command - refresh on control changes from stdin.
fn cmd_watch(config: ClientConfig, args: &cli::WatchArgs) -> Result<()> {
    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "\x1b[1m🌍 quakeview watch\x1b[0m")?;
        writeln!(
            handle,
            "\x1b[2mControls: days <N> | mag <M> | sort | refresh | quit\x1b[0m"
        )?;
    }

    let runtime = Runtime::new().context("failed to create tokio runtime")?;
    let result = runtime.block_on(watch(config, args));

    // Stdin reads cannot be cancelled; don't wait for the reader thread.
    runtime.shutdown_background();
    result
}

async fn watch(config: ClientConfig, args: &cli::WatchArgs) -> Result<()> {
    let client = UsgsClient::with_config(config).context("failed to create USGS client")?;
    let mut params: QueryParams = args.query.into();
    let (refresher, task) = Refresher::spawn(client, params, args.sort);

    let mut updates = WatchStream::from_changes(refresher.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            Some(state) = updates.next() => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                output::write_snapshot(&mut handle, &state, args.limit, Utc::now())?;
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("failed to read controls")? else {
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Control>() {
                    Ok(Control::Quit) => break,
                    Ok(Control::ToggleSort) => {
                        refresher.toggle_sort();
                    }
                    Ok(Control::Refresh) => {
                        refresher.refresh_now(params);
                    }
                    Ok(control) => {
                        if control.update(&mut params) {
                            refresher.request(params);
                        }
                    }
                    Err(e) => warn!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(refresher);
    task.await.context("refresh loop failed")?;
    Ok(())
}
