//! Analyse one clip offline and print the result as JSON.
//!
//! Usage: analyze_clip <video> [config.toml]

use anyhow::{bail, Result};
use std::time::Instant;

use skipcount::config::Config;
use skipcount::pose::YoloPoseDetector;
use skipcount::video::OpenCvVideo;
use skipcount::Analyzer;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(video_path) = args.get(1) else {
        bail!("usage: {} <video> [config.toml]", args[0]);
    };
    let config = match args.get(2) {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default("coach_server.toml"),
    };

    eprintln!("analyze_clip ({})", env!("GIT_VERSION"));
    let mut detector = YoloPoseDetector::from_config(&config.pose)?;
    let video = OpenCvVideo::open(video_path)?;
    let analyzer = Analyzer::new(config.analysis);

    let start = Instant::now();
    let result = analyzer.analyze(video, &mut detector)?;
    eprintln!("Analysed in {:.2}s", start.elapsed().as_secs_f64());

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
