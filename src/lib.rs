// src/lib.rs

pub mod app;
pub mod catalog;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod export;
pub mod fs;
pub mod logging;
pub mod sink;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info, warn};

use crate::app::REQUEST_ACK;
use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, ConfigFile};
use crate::export::{default_file_name, Transcript};
use crate::sink::{ChannelSink, SinkEvent};
use crate::types::Platform;

pub use crate::app::{Checkpoint, CheckpointBuilder};
pub use crate::errors::CheckpointError;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the feature catalog and platform
/// - a channel-backed log sink printed to stdout
/// - Ctrl-C handling (cancels running sessions)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    let platform = args.platform.unwrap_or_else(Platform::current);

    match args.command {
        Command::List => {
            print_catalog(&cfg, platform);
            Ok(())
        }
        Command::Run { features, export } => run_features(&cfg, platform, features, export).await,
    }
}

async fn run_features(
    cfg: &ConfigFile,
    platform: Platform,
    features: Vec<String>,
    export: Option<Option<PathBuf>>,
) -> Result<()> {
    let (sink, mut rx) = ChannelSink::new();
    let app = Checkpoint::builder(Arc::new(sink))
        .config(cfg)
        .platform(platform)
        .build()?;

    let mut transcript = Transcript::new();
    let mut pending = 0usize;

    for feature in &features {
        let ack = app.run(feature);
        if ack == REQUEST_ACK {
            pending += 1;
        } else {
            println!("{ack}");
            transcript.push(ack);
        }
    }

    info!(pending, "waiting for sessions");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    while pending > 0 {
        tokio::select! {
            event = rx.recv() => match event {
                Some(SinkEvent::Line(line)) => {
                    println!("{line}");
                    transcript.push(line);
                }
                Some(SinkEvent::Done(feature)) => {
                    debug!(%feature, "done received");
                    pending -= 1;
                }
                None => break,
            },

            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                } else {
                    let n = app.cancel_all();
                    info!(cancelled = n, "Ctrl+C received; cancelling sessions");
                }
            }
        }
    }

    if let Some(path) = export {
        let path = path.unwrap_or_else(|| {
            cfg.export
                .directory
                .clone()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(default_file_name(Local::now()))
        });
        let written = app
            .export_logs(&transcript.render(), Some(&path))
            .with_context(|| format!("exporting logs to {:?}", path))?;
        if let Some(p) = written {
            eprintln!("log exported to {}", p.display());
        }
    }

    Ok(())
}

/// Print features grouped by category, marking ones unavailable on `platform`.
fn print_catalog(cfg: &ConfigFile, platform: Platform) {
    let catalog = cfg.build_catalog();
    println!("checkpoint features ({platform}):");

    let mut current: Option<&str> = None;
    for def in catalog.features() {
        if current != Some(def.category.as_str()) {
            println!();
            println!("{}:", def.category);
            current = Some(def.category.as_str());
        }
        if def.supports(platform) {
            println!("  - {}", def.id);
        } else {
            println!("  - {} (not available on {platform})", def.id);
        }
    }
}
