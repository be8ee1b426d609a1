//! skeleton-json-console binary
//!
//! Runs a tracking session against the synthetic sensor and prints every
//! record to stdout.  Logs go to stderr.
//!
//! ## Configuration (env / TOML via `config` crate, flags override)
//!
//! | Flag              | Env                              | Default            |
//! |-------------------|----------------------------------|--------------------|
//! | `--config`        | `SKELETON_JSON_CONFIG`           | *(none)*           |
//! | `--mirror`        | `SKELETON_JSON_MIRROR`           | settings (`false`) |
//! | `--pose-start`    | `SKELETON_JSON_POSE_START`       | settings (`true`)  |
//! | `--world-space`   | `SKELETON_JSON_WORLD_SPACE`      | settings (`false`) |
//! | `--bodies`        | `SKELETON_JSON_BODIES`           | `1`                |
//! | `--raise-at`      | `SKELETON_JSON_RAISE_AT`         | `60`               |
//! | `--duration-secs` | `SKELETON_JSON_DURATION_SECS`    | run until Ctrl-C   |

use anyhow::{Context, Result};
use clap::Parser;
use skeleton_json::{replay::SyntheticSensor, BodyTracker, Cue, Notifier, Settings};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "skeleton-json-console",
    about = "Print body-tracking frames as JSON",
    version
)]
struct Args {
    /// TOML settings file
    #[arg(long, env = "SKELETON_JSON_CONFIG")]
    config: Option<PathBuf>,

    /// Report sides as seen in a mirror
    #[arg(long, env = "SKELETON_JSON_MIRROR")]
    mirror: Option<bool>,

    /// Wait for the hands-up pose before emitting a body
    #[arg(long, env = "SKELETON_JSON_POSE_START")]
    pose_start: Option<bool>,

    /// Level coordinates against the floor plane
    #[arg(long, env = "SKELETON_JSON_WORLD_SPACE")]
    world_space: Option<bool>,

    /// Synthetic bodies in view
    #[arg(long, env = "SKELETON_JSON_BODIES", default_value_t = 1)]
    bodies: usize,

    /// Frame at which the synthetic bodies raise their hands
    #[arg(long, env = "SKELETON_JSON_RAISE_AT", default_value_t = 60)]
    raise_at: u64,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long, env = "SKELETON_JSON_DURATION_SECS")]
    duration_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Rings the terminal bell on stderr.
struct TerminalBell;

impl Notifier for TerminalBell {
    fn notify(&self, cue: Cue) {
        tracing::debug!("cue: {:?}", cue);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skeleton_json=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(mirror) = args.mirror {
        settings.tracking.mirror = mirror;
    }
    if let Some(pose_start) = args.pose_start {
        settings.tracking.gate_on_pose = pose_start;
    }
    if let Some(world_space) = args.world_space {
        settings.tracking.world_space = world_space;
    }

    tracing::info!(
        "Starting skeleton-json-console ({}, bodies={}, raise_at={})",
        settings.tracking,
        args.bodies,
        args.raise_at,
    );

    let sensor = SyntheticSensor::new(args.bodies, args.raise_at);
    let tracker = Arc::new(
        BodyTracker::with_options(sensor, settings.session).with_notifier(Arc::new(TerminalBell)),
    );

    tracker
        .start(settings.tracking, |record| {
            let mut out = std::io::stdout().lock();
            if let Err(e) = out.write_all(record.as_bytes()).and_then(|_| out.flush()) {
                tracing::warn!("Failed to write record: {}", e);
            }
        })
        .context("Failed to start body tracking")?;

    match args.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    tracing::info!("Run duration elapsed");
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down (SIGINT)");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutting down (SIGINT)");
        }
    }

    // stop() joins the worker thread; keep it off the async workers.
    let stopper = tracker.clone();
    tokio::task::spawn_blocking(move || stopper.stop()).await?;

    let stats = tracker.stats();
    match tracker.camera_height() {
        Some(height) => tracing::info!("Camera height: {:.3}m", height),
        None => tracing::info!("Camera height never reported"),
    }
    tracing::info!(
        "Processed {} frames, delivered {}, dropped {} oversize",
        stats.frames_processed,
        stats.frames_delivered,
        stats.capacity_overflows,
    );

    Ok(())
}
