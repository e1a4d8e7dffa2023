// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with `clap`, loads the settings once,
// and hands off to Layer 2 (application).
//
//   modality-train supervised   — train encoder + linear head
//   modality-train pretrain     — SSL pre-training of an encoder
//   modality-train split        — write train/val/test CSVs
//   modality-train show-config  — print folders and settings
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PretrainArgs, SplitArgs, SupervisedArgs};

use crate::infra::settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "modality-train",
    version = "0.1.0",
    about = "Assemble encoders, transforms and SSL frameworks from a settings document and train them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        let settings = Settings::load()?;
        match self.command {
            Commands::Supervised(args) => run_supervised(&settings, args),
            Commands::Pretrain(args)   => run_pretrain(&settings, args),
            Commands::Split(args)      => run_split(&settings, args),
            Commands::ShowConfig       => show_config(&settings),
        }
    }
}

fn run_supervised(settings: &Settings, args: SupervisedArgs) -> Result<()> {
    use crate::application::supervised_use_case::SupervisedUseCase;

    tracing::info!("Starting supervised training in '{}'", settings.folders.main.display());
    let metrics = SupervisedUseCase::new(settings, args.into()).execute()?;

    println!("\nTest loss: {:.4}", metrics.loss);
    if let Some(acc) = metrics.accuracy {
        println!("Test accuracy: {:.1}% over {} samples", acc * 100.0, metrics.samples);
    }
    Ok(())
}

fn run_pretrain(settings: &Settings, args: PretrainArgs) -> Result<()> {
    use crate::application::pretrain_use_case::PretrainUseCase;

    let outcome = PretrainUseCase::new(settings, args.into()).execute()?;

    println!("\nExperiment: {}", outcome.experiment_id);
    println!("Test loss:  {:.4}", outcome.test_metrics.loss);
    println!("Encoder:    {}", outcome.encoder_path.display());
    Ok(())
}

fn run_split(settings: &Settings, args: SplitArgs) -> Result<()> {
    use crate::application::split_use_case::SplitUseCase;

    let config = args.into_config(&settings.folders);
    let out    = config.out_dir.clone();
    let splits = SplitUseCase::new(config).execute()?;

    println!(
        "Wrote {} / {} / {} records to '{}'",
        splits.train.len(),
        splits.val.len(),
        splits.test.len(),
        out.display()
    );
    Ok(())
}

fn show_config(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
