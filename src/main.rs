//! Video Frame Capturer
//!
//! Scrub through a video frame by frame and save individual frames as
//! still images.

mod app;
mod capture;
mod config;
mod error;
mod render;
mod video;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use app::CapturerApp;
use config::{CaptureConfig, ImageFormat};
use video::FfmpegDecoder;

/// Video Frame Capturer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to open at start-up
    video: Option<PathBuf>,

    /// Directory captured frames are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Image format for captured frames
    #[arg(short, long, value_enum)]
    format: Option<ImageFormat>,

    /// Path to a JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Settings file (or defaults) overridden by command-line flags
    fn resolve_config(&self) -> Result<CaptureConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from: {:?}", path);
                CaptureConfig::load_from_file(path)?
            }
            None => CaptureConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(format) = self.format {
            config.image_format = format;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over --debug
    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install logging subscriber")?;

    info!("Video Frame Capturer starting...");

    let config = args.resolve_config()?;
    info!("Output directory: {:?}", config.output_dir);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([640.0, 400.0])
            .with_title("Video Frame Capturer"),
        ..Default::default()
    };

    let initial_video = args.video.clone();
    eframe::run_native(
        "Video Frame Capturer",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(CapturerApp::<FfmpegDecoder>::new(
                cc,
                config,
                initial_video,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
