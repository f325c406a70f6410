//! Highlight reel generator binary.

use std::path::PathBuf;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_engine::{generate_highlights, EngineConfig};
use reel_models::format_seconds;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reel=info".parse().expect("valid directive"))
        .add_directive("ort=warn".parse().expect("valid directive"))
        .add_directive("onnxruntime=warn".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: reelforge <input-video> [output-video]");
            std::process::exit(2);
        }
    };
    let output = args.next().map(PathBuf::from);

    let config = EngineConfig::from_env();
    info!(input = %input.display(), "Starting highlight generation");

    // Ctrl-C flips the cancellation signal; in-flight FFmpeg work is
    // killed at the next check.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal, cancelling");
        let _ = cancel_tx.send(true);
    });

    match generate_highlights(&input, output, &config, cancel_rx).await {
        Ok(outcome) => {
            println!("{}", outcome.report.summary());
            for segment in outcome.plan.segments() {
                println!(
                    "  {} - {}  ({:.1}s)",
                    format_seconds(segment.start),
                    format_seconds(segment.end),
                    segment.duration()
                );
            }
            println!("Wrote {}", outcome.output.display());

            // Optional machine-readable dump of the plan and curve.
            if let Ok(path) = std::env::var("REEL_PLAN_JSON") {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(json) => {
                        if let Err(e) = std::fs::write(&path, json) {
                            error!(path = %path, "Failed to write plan JSON: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to serialize plan: {}", e),
                }
            }
        }
        Err(e) => {
            error!("Highlight generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
