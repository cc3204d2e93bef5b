//! trailmap CLI — estimate a camera path and a rough edge map from a video.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use trailmap::Config;

#[derive(Parser, Debug)]
#[command(name = "trailmap")]
#[command(about = "Prototype: video → 2D path + rough edge map")]
#[command(version)]
struct Cli {
    /// Input video: a frame directory or an animated GIF. Containers such
    /// as .mp4 or .avi need a build with `--features opencv` (requires a
    /// system OpenCV); without it they are rejected as unsupported.
    #[arg(long)]
    video: PathBuf,

    /// Output directory, created if missing.
    #[arg(long, default_value = "outputs")]
    out: PathBuf,

    /// Process every n-th frame.
    #[arg(long = "frame_step")]
    frame_step: Option<usize>,

    /// Stop after this many processed frames.
    #[arg(long = "max_frames")]
    max_frames: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::default().with_overrides(cli.frame_step, cli.max_frames);

    let outputs = trailmap::run_video(&cli.video, &cli.out, &config)
        .with_context(|| format!("processing {}", cli.video.display()))?;

    println!("Done.");
    for path in outputs.iter() {
        println!("Saved: {}", path.display());
    }
    Ok(())
}
