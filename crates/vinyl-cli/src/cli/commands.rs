use super::CliError;
use anyhow::Context;
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use vinyl_core::{CalculatorEntity, VinylErrorKind};

#[derive(clap::Args)]
pub(super) struct InspectArgs {
    /// Calculator snapshot path
    snapshot: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct VerifyArgs {
    /// Calculator snapshot path
    snapshot: PathBuf,
}

pub(super) fn run_inspect_command(args: InspectArgs) -> Result<i32, CliError> {
    let entity = CalculatorEntity::from_snapshot(&args.snapshot)?;
    debug!(path = %args.snapshot.display(), "restored snapshot");

    println!("calculator: {}", entity.name());
    println!(
        "base dirs:  {} / {}",
        entity.instrument_base_dir().display(),
        entity.calculator_base_dir().display()
    );
    println!("inputs:     {}", entity.input().len());
    println!("outputs:");
    for (index, key) in entity.output_keys().iter().enumerate() {
        let data_type = &entity.output_data_types()[index];
        let filename = entity.output_filenames()[index]
            .as_deref()
            .unwrap_or("<no default filename>");
        println!("  {key:<20}{data_type:<20}{filename}");
    }
    match entity.parameters() {
        Some(parameters) if !parameters.is_empty() => {
            println!("parameters:");
            for parameter in parameters {
                println!("  {}", parameter.summary_line());
            }
        }
        _ => println!("parameters: <none>"),
    }

    Ok(0)
}

pub(super) fn run_verify_command(args: VerifyArgs) -> Result<i32, CliError> {
    let entity = CalculatorEntity::from_snapshot(&args.snapshot)?;

    let source = fs::read_to_string(&args.snapshot)
        .with_context(|| format!("failed to re-read '{}'", args.snapshot.display()))?;
    let document: serde_json::Value = serde_json::from_str(&source)
        .with_context(|| format!("failed to re-parse '{}'", args.snapshot.display()))?;
    let reserialized = serde_json::to_value(&entity)
        .context("failed to re-serialize the restored calculator")?;

    if document.get("calculator") == Some(&reserialized) {
        println!(
            "OK: '{}' restores and round-trips losslessly",
            args.snapshot.display()
        );
        Ok(0)
    } else {
        eprintln!(
            "MISMATCH: '{}' does not round-trip losslessly",
            args.snapshot.display()
        );
        Ok(VinylErrorKind::Io.exit_code())
    }
}
