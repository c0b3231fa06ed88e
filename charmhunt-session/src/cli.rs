use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use charmhunt_core::{ArConfig, Spawn};

/// Replay a recorded sensor feed against a single spawn and print the AR
/// targeting state as JSON lines.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None, allow_negative_numbers = true)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// JSON-lines sensor feed to replay
    #[arg(long)]
    pub feed: PathBuf,

    /// Latitude of the spawn (degrees)
    #[arg(long)]
    pub spawn_lat: f64,

    /// Longitude of the spawn (degrees)
    #[arg(long)]
    pub spawn_lng: f64,

    #[arg(long, default_value = "spawn")]
    pub spawn_id: String,

    /// Capture radius (meters)
    #[arg(long, default_value_t = 50.0)]
    pub radius: f64,

    /// JSON config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Horizontal camera field of view (degrees)
    #[arg(long)]
    pub fov: Option<f64>,

    /// Viewport width (pixels)
    #[arg(long)]
    pub width: Option<f64>,

    /// Viewport height (pixels)
    #[arg(long)]
    pub height: Option<f64>,

    /// Substitute a position near the spawn when no fix arrives in time
    #[arg(long)]
    pub fallback: bool,
}

impl Cli {
    /// Build the effective config: defaults, then the config file, then flags.
    pub fn ar_config(&self) -> anyhow::Result<ArConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config {}", path.display()))?;
                ArConfig::from_json_str(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => ArConfig::default(),
        };

        if let Some(fov) = self.fov {
            config.fov_degrees = fov;
        }
        if let Some(width) = self.width {
            config.viewport.width = width;
        }
        if let Some(height) = self.height {
            config.viewport.height = height;
        }
        if self.fallback {
            config.fallback.enabled = true;
        }

        config.validate().context("invalid command line options")?;
        Ok(config)
    }

    pub fn spawn(&self) -> Spawn {
        Spawn::new(self.spawn_id.clone(), self.spawn_lat, self.spawn_lng, self.radius)
    }
}
