//! CLI entry point for the park crowd index.
//!
//! Provides subcommands for a one-off summary of every configured park, a
//! single park at a chosen timestamp, and a refresh loop that keeps
//! recomputing the summary the way the dashboard does.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use park_crowd_index::estimator::{CrowdIndexEngine, CrowdSummary, get_crowd_index_summary};
use park_crowd_index::output::{append_summary, render_report, to_json};
use park_crowd_index::profile::EngineConfig;
use park_crowd_index::store::{DataSource, SqliteStore, WaitStore};
use park_crowd_index::timestamp::parse_timestamp;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "park_crowd_index")]
#[command(about = "Estimate theme park crowd levels from posted wait times", long_about = None)]
struct Cli {
    /// Live SQLite database (overrides CROWD_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// JSON engine configuration (overrides CROWD_CONFIG_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crowd index for every configured park at the latest sample
    Summary {
        /// Print JSON instead of the text report
        #[arg(long)]
        json: bool,

        /// CSV file to append one row per park to
        #[arg(long, value_name = "CSV")]
        history: Option<String>,
    },
    /// Crowd index for one park
    Park {
        #[arg(value_name = "NAME")]
        name: String,

        /// Evaluation timestamp (ISO-8601); defaults to the latest sample
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<String>,

        /// Print JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
    /// Recompute the summary on an interval until Ctrl+C
    Watch {
        /// Seconds between refreshes
        #[arg(short, long, default_value_t = 300)]
        interval: u64,

        /// CSV file to append one row per park to on every refresh
        #[arg(long, value_name = "CSV")]
        history: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging()?;

    let cli = Cli::parse();

    let mut source = DataSource::from_env();
    if let Some(path) = cli.db {
        source.path = path;
    }
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Summary { json, history } => {
            let parks = config.parks.names();
            let Some(summary) = get_crowd_index_summary(&source, &config, &parks) else {
                println!("Crowd data unavailable");
                return Ok(());
            };

            if json {
                println!("{}", to_json(&summary)?);
            } else {
                print!(
                    "{}",
                    render_report(&summary, &parks, config.params.window_minutes)
                );
            }
            if let Some(path) = history {
                append_summary(&path, &summary)?;
            }
            info!(
                high_confidence = summary.high_confidence_count(),
                parks = parks.len(),
                "Analysis complete"
            );
        }
        Commands::Park { name, at, json } => {
            single_park(&source, &config, name, at, json)?;
        }
        Commands::Watch { interval, history } => {
            watch(source, config, interval, history).await?;
        }
    }

    Ok(())
}

/// Colored stderr plus a JSON daily rolling log file.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/park_crowd_index.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("park_crowd_index.log"));
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("RUST_LOG")
                .from_env_lossy(),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .with_env_var("RUST_LOG_JSON")
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

/// `--config`, then `CROWD_CONFIG_PATH`, then the built-in parks.
fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let path = path.or_else(|| std::env::var_os("CROWD_CONFIG_PATH").map(PathBuf::from));
    match path {
        Some(path) => {
            let config = EngineConfig::load(&path)
                .with_context(|| format!("loading engine config {}", path.display()))?;
            info!(path = %path.display(), parks = config.parks.names().len(), "Loaded engine config");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

#[tracing::instrument(skip(source, config, json))]
fn single_park(
    source: &DataSource,
    config: &EngineConfig,
    name: String,
    at: Option<String>,
    json: bool,
) -> Result<()> {
    let store = SqliteStore::open(source)?;
    let timestamp = match at {
        Some(raw) => {
            parse_timestamp(&raw)?;
            raw
        }
        None => store
            .latest_timestamp()?
            .context("no wait samples recorded yet")?,
    };

    let engine = CrowdIndexEngine::new(&store, config)?;
    let result = engine.calculate(&name, &timestamp);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let summary = CrowdSummary {
            timestamp,
            parks: BTreeMap::from([(name.clone(), result)]),
        };
        print!(
            "{}",
            render_report(&summary, &[name], config.params.window_minutes)
        );
    }
    Ok(())
}

/// Dashboard-style refresh loop. Each cycle runs on the blocking pool since
/// rusqlite is synchronous.
async fn watch(
    source: DataSource,
    config: EngineConfig,
    interval_secs: u64,
    history: Option<String>,
) -> Result<()> {
    let source = Arc::new(source);
    let config = Arc::new(config);
    let parks = Arc::new(config.parks.names());

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    info!(interval_secs, "Watching crowd levels. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (source, config_ref, parks_ref) = (source.clone(), config.clone(), parks.clone());
                let cycle = tokio::task::spawn_blocking(move || {
                    get_crowd_index_summary(&source, &config_ref, &parks_ref)
                });

                match cycle.await {
                    Ok(Some(summary)) => {
                        print!(
                            "{}",
                            render_report(&summary, &parks, config.params.window_minutes)
                        );
                        if let Some(path) = &history
                            && let Err(e) = append_summary(path, &summary)
                        {
                            error!(path = %path, error = %e, "Failed to append crowd history");
                        }
                    }
                    Ok(None) => {
                        warn!("Crowd data unavailable this cycle");
                        println!("Crowd data unavailable");
                    }
                    Err(e) => error!(error = %e, "Refresh task failed"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Stopping crowd watch");
                break;
            }
        }
    }

    Ok(())
}
