use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use skinscan::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use skinscan::pipeline::{Predictor, TrainingPipeline, DEFAULT_THRESHOLD};
use skinscan::utils::logging::{init_logging, LogConfig};
use skinscan::PipelineConfig;

#[derive(Parser)]
#[command(name = "skinscan", about = "Multi-label skin problem classifier", version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the staged training pipeline
    Train {
        /// Pipeline configuration file
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },
    /// Score a single image with the trained model
    Predict {
        /// Pipeline configuration file
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
        /// Image file to score
        #[arg(long)]
        image: PathBuf,
        /// Decision threshold on per-label probabilities
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config);

    println!("{}", "skinscan".bold().green());
    println!("Backend: {}\n", backend_name().cyan());

    match cli.command {
        Commands::Train { config } => {
            let config = PipelineConfig::from_file(&config)?;
            let device = default_device();

            let artifacts = TrainingPipeline::new(config).run::<TrainingBackend>(&device)?;

            println!("{}", "Pipeline completed".bold().green());
            println!("  archive:  {}", artifacts.ingestion.archive_path.display());
            println!("  backbone: {}", artifacts.backbone.updated_model_path.display());
            if let Some(training) = artifacts.training {
                println!("  trained:  {}", training.trained_model_path.display());
            }
        }
        Commands::Predict {
            config,
            image,
            threshold,
        } => {
            let config = PipelineConfig::from_file(&config)?;
            let device = default_device();

            let predictor = Predictor::<DefaultBackend>::from_config(&config, &device)?;
            let report = predictor.predict(&image, threshold)?;

            println!("{} {}\n", "Prediction for".bold(), image.display());
            for score in &report.scores {
                let line = format!(
                    "{:<14} {:>6.1}%",
                    score.label,
                    score.probability * 100.0
                );
                if score.prediction == 1 {
                    println!("  {}  {}", line.green(), "positive".green().bold());
                } else {
                    println!("  {}", line.dimmed());
                }
            }
        }
    }

    Ok(())
}
