// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// use case in Layer 2. Only this layer prints.
//
//   1. `prepare` — corpus → tokenizer + prepared task module
//   2. `encode`  — report how a corpus encodes
//   3. `predict` — write documents with predicted relations
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EncodeArgs, PredictArgs, PrepareArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ie-taskmodules",
    version,
    about = "Encode annotated documents for relation classification and decode predictions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Encode(args)  => run_encode(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    tracing::info!("Preparing task module from: {}", args.docs);
    let checkpoint_dir = args.checkpoint_dir.clone();
    let report = PrepareUseCase::new(args.into()).execute()?;

    println!("Prepared task module in '{}'", checkpoint_dir);
    println!("  documents:     {}", report.documents);
    println!("  labels:        {}", report.labels.join(", "));
    if !report.entity_labels.is_empty() {
        println!("  entity types:  {}", report.entity_labels.join(", "));
    }
    println!("  vocab size:    {}", report.vocab_size);
    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    use crate::application::encode_use_case::EncodeUseCase;

    let summary = EncodeUseCase::new(args.into()).execute()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let output = args.output.clone();
    let report = PredictUseCase::new(args.into()).execute()?;
    println!(
        "Predicted {} relations over {} documents → {}",
        report.predictions, report.documents, output
    );
    Ok(())
}
