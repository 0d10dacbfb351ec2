// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains the network on paired low/high images
//   2. `enhance` — loads a checkpoint and brightens one image
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EnhanceArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "llie",
    version = "0.1.0",
    about = "Train a low-light image enhancement autoencoder, then enhance images."
)]
pub struct Cli {
    /// The subcommand to run (train or enhance)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Enhance(args) => run_enhance(args),
        }
    }
}

/// Handles the `train` subcommand.
/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on pairs in: {}", args.data_dir);

    let checkpoint_dir = args.checkpoint_dir.clone();
    let history = TrainUseCase::new(args.into()).execute()?;

    match history.best() {
        Some(best) => println!(
            "Training complete. Best val_loss={:.6} ({:.2} dB) at epoch {}. Checkpoints in '{}'.",
            best.val_loss, best.val_psnr, best.epoch, checkpoint_dir
        ),
        None => println!("Training complete. Checkpoints in '{}'.", checkpoint_dir),
    }
    Ok(())
}

/// Handles the `enhance` subcommand.
fn run_enhance(args: EnhanceArgs) -> Result<()> {
    use crate::application::enhance_use_case::EnhanceUseCase;

    let use_case = EnhanceUseCase::new(&args.checkpoint_dir)?;
    use_case.enhance_file(&args.input, &args.output)?;

    println!("Saved enhanced image to '{}'", args.output.display());
    Ok(())
}
