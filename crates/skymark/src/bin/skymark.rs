use std::{
    error::Error,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use serde::Serialize;
use skymark::{frame, EgoPose, FrameResult, LandmarkObservation, Localizer, LocalizerConfig};

/// Ceiling landmark detection and camera localization.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the identified landmarks of each image as JSON.
    Detect {
        /// Localizer config; its map selects the accepted identities.
        #[arg(long)]
        config: PathBuf,
        /// 8-bit grayscale frames.
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Track the camera through a frame sequence, one JSON pose per line.
    Localize {
        #[arg(long)]
        config: PathBuf,
        /// Seconds between consecutive frames.
        #[arg(long, default_value_t = 1.0 / 30.0)]
        dt: f64,
        /// Frames in capture order.
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(Serialize)]
struct DetectOutput<'a> {
    image: String,
    landmarks: &'a [LandmarkObservation],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct PoseLine<'a> {
    frame: usize,
    image: String,
    identified: Vec<u16>,
    #[serde(flatten)]
    result: &'a FrameResult,
}

/// A frame that could not be processed; the pose is the one carried over.
#[derive(Serialize)]
struct SkippedLine<'a> {
    frame: usize,
    image: String,
    error: String,
    pose: &'a EgoPose,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_log)?;

    match cli.command {
        Command::Detect { config, images } => {
            let localizer = load_localizer(&config)?;
            let mut reports = Vec::with_capacity(images.len());
            for path in &images {
                match detect_image(&localizer, path) {
                    Ok(landmarks) => {
                        log::info!("{}: {} landmarks", path.display(), landmarks.len());
                        reports.push((path.display().to_string(), landmarks, None));
                    }
                    Err(err) => {
                        log::warn!("{}: skipped: {err}", path.display());
                        let error = Some(err.to_string());
                        reports.push((path.display().to_string(), Vec::new(), error));
                    }
                }
            }
            let out: Vec<_> = reports
                .iter()
                .map(|(image, landmarks, error)| DetectOutput {
                    image: image.clone(),
                    landmarks,
                    error: error.as_deref(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Localize { config, dt, images } => {
            let mut localizer = load_localizer(&config)?;
            for (index, path) in images.iter().enumerate() {
                let result = match localize_image(&mut localizer, path, dt) {
                    Ok(result) => result,
                    Err(err) => {
                        log::warn!("{}: frame {index} skipped: {err}", path.display());
                        let line = SkippedLine {
                            frame: index,
                            image: path.display().to_string(),
                            error: err.to_string(),
                            pose: localizer.estimator().pose(),
                        };
                        println!("{}", serde_json::to_string(&line)?);
                        continue;
                    }
                };
                let line = PoseLine {
                    frame: index,
                    image: path.display().to_string(),
                    identified: result
                        .observations
                        .iter()
                        .filter_map(|o| o.identity)
                        .collect(),
                    result: &result,
                };
                println!("{}", serde_json::to_string(&line)?);
            }
        }
    }
    Ok(())
}

fn detect_image(
    localizer: &Localizer,
    path: &Path,
) -> Result<Vec<LandmarkObservation>, Box<dyn Error>> {
    let img = frame::load_gray8(path)?;
    Ok(localizer.detector().detect(&frame::gray_view(&img))?)
}

fn localize_image(
    localizer: &mut Localizer,
    path: &Path,
    dt: f64,
) -> Result<FrameResult, Box<dyn Error>> {
    let img = frame::load_gray8(path)?;
    Ok(localizer.process_frame(&frame::gray_view(&img), dt)?)
}

fn load_localizer(config: &Path) -> Result<Localizer, Box<dyn Error>> {
    let cfg = LocalizerConfig::load_json(config)?;
    Ok(Localizer::from_config(&cfg, config.parent())?)
}

/// With `tracing`, `RUST_LOG` selects the level and `-v` is ignored.
#[cfg(feature = "tracing")]
fn init_logging(_verbose: u8, json: bool) -> Result<(), Box<dyn Error>> {
    let _ = tracing_log::LogTracer::init();
    skymark::core::init_tracing(json);
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8, json: bool) -> Result<(), Box<dyn Error>> {
    skymark::core::init_with_level(skymark::core::level_from_verbosity(verbose))?;
    if json {
        log::warn!("--json-log needs the `tracing` feature; using plain logs");
    }
    Ok(())
}
