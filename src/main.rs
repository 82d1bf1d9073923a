//! RideTrace - replay recorded telemetry batches through a live session.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ridetrace::config::{load_config_from, EngineConfig};
use ridetrace::course::parse_course;
use ridetrace::session::LiveSession;

#[derive(Parser)]
#[command(author, version, about = "Replay cycling telemetry batches and print session metrics", long_about = None)]
struct Cli {
    /// Athlete/engine configuration (TOML)
    #[arg(short, long)]
    athlete: Option<PathBuf>,
    /// Planned course (JSON with geoPoints or trackPoints)
    #[arg(short, long)]
    course: Option<PathBuf>,
    /// Include the enriched points in the output
    #[arg(long)]
    points: bool,
    /// Telemetry batch files, ingested in the given order
    #[arg(required = true)]
    batches: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting RideTrace v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.athlete {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let mut session = LiveSession::new(&config);

    if let Some(path) = &cli.course {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read course {}", path.display()))?;
        let course =
            parse_course(&json).with_context(|| format!("Invalid course {}", path.display()))?;
        session.load_course(course);
    }

    for path in &cli.batches {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch {}", path.display()))?;
        let outcome = session.ingest_json(&json);
        tracing::info!("{}: {:?}", path.display(), outcome);
    }

    let output = if cli.points {
        json!({
            "summary": session.summary(),
            "points": session.points(),
        })
    } else {
        serde_json::to_value(session.summary())?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
