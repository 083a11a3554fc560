use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceprint_core::{FaceDetector, FaceEmbedder, FaceSystem};
use faceprint_store::SqliteStore;
use std::path::{Path, PathBuf};
use std::time::Instant;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "faceprint", about = "Face enrollment and recognition CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the largest face in an image under an identifier
    Register {
        image_path: PathBuf,
        /// Identifier to enroll; re-registering replaces the stored embedding
        id: String,
    },
    /// Recognize the face in an image against registered identities
    Recognize {
        image_path: PathBuf,
        /// Similarity threshold for a positive match
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Remove all registered faces
    Clear,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::try_parse().unwrap_or_else(|err| {
        if matches!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
        ) {
            let _ = err.print();
            std::process::exit(0);
        }
        // clap's rendered error includes the usage text
        eprintln!("{err}");
        std::process::exit(1);
    });

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();

    match cli.command {
        Commands::Register { image_path, id } => {
            let image = load_image(&image_path)?;
            let mut system = open_system(&config)?;

            let start = Instant::now();
            system
                .enroll(&image, &id)
                .with_context(|| format!("failed to register face for {id}"))?;
            println!(
                "Successfully registered face for {id} (time: {}ms)",
                start.elapsed().as_millis()
            );
        }
        Commands::Recognize {
            image_path,
            threshold,
        } => {
            let image = load_image(&image_path)?;
            let mut system = open_system(&config)?;
            let threshold = threshold.unwrap_or(config.match_threshold);

            let start = Instant::now();
            let result = system
                .recognize(&image, threshold)
                .context("recognition failed")?;
            println!(
                "Recognized as: {} (confidence: {:.4}, time: {}ms)",
                result.id,
                result.confidence,
                start.elapsed().as_millis()
            );
        }
        Commands::Clear => {
            let mut system = open_system(&config)?;
            system.clear().context("failed to clear registered faces")?;
            println!("Successfully cleared all registered faces");
        }
    }

    Ok(())
}

fn load_image(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("failed to load image: {}", path.display()))
}

fn open_system(config: &Config) -> Result<FaceSystem<SqliteStore>> {
    let detector =
        FaceDetector::load(&config.detector_model_path()).context("failed to load detection model")?;
    let embedder =
        FaceEmbedder::load(&config.embedder_model_path()).context("failed to load embedding model")?;
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("failed to open embedding store at {}", config.db_path.display()))?;

    Ok(FaceSystem::new(
        detector,
        embedder,
        store,
        config.detect_threshold,
    ))
}
