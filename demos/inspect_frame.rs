//! Loads an image file from disk, wraps it as a `Frame`, runs `detect`, and
//! prints the resulting confidence/failure/metrics as JSON.
//!
//! Usage: `cargo run --example inspect_frame -- path/to/chart.png`

use anyhow::{Context, Result};
use colorchecker_core::{ColorCheckerCore, DetectorConfig, Frame};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: inspect_frame <path/to/image>")?;

    let img = image::open(&path)
        .with_context(|| format!("failed to open {path}"))?
        .to_rgba8();
    let (width, height) = img.dimensions();

    let frame = Frame::new(width, height, 0, img.into_raw());

    let core = ColorCheckerCore::new(DetectorConfig::default());
    let output = core.detect(&frame);

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
