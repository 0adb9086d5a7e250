use anyhow::Context;
use clap::Parser;

use healthcare_snowflake::{args::Args, pipeline};

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let summary = pipeline::run(&args).context("transformation failed")?;
    summary.print_table();
    println!(
        "Patient status summary: Active: {}, Inactive: {}",
        summary.patient_status.active, summary.patient_status.inactive
    );
    println!(
        "Transformation complete. Files saved to '{}'.",
        args.output_dir.display()
    );
    Ok(())
}
