use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::args::Args;
use crate::constants::RUN_SUMMARY_FILE_NAME;
use crate::emit::write_tables;
use crate::engine::{SnowflakeTables, TransformSession};
use crate::ingest::SourceReader;
use crate::status::default_active_since;
use crate::summary::RunSummary;

fn apply_row_progress_style(progress: &ProgressBar) {
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {prefix:.bold} [{elapsed_precise}] {pos} rows ({per_sec}) {msg}",
    ) {
        progress.set_style(style);
    }
}

/// Reads the whole extract and returns the finished tables.
pub fn transform_file(input_path: &Path, batch_size: usize) -> Result<SnowflakeTables> {
    let mut reader = SourceReader::open(input_path)?;

    let column_count = reader.headers().count();
    for column in reader.headers() {
        tracing::debug!("input column: {column}");
    }
    tracing::info!("Input {} has {column_count} columns", input_path.display());

    let progress = ProgressBar::new_spinner();
    progress.set_prefix("ROWS");
    apply_row_progress_style(&progress);
    progress.enable_steady_tick(Duration::from_millis(250));

    let mut session = TransformSession::new(default_active_since());
    loop {
        let batch = reader
            .next_batch(batch_size)
            .with_context(|| format!("Failed reading input CSV {}", input_path.display()))?;
        if batch.is_empty() {
            break;
        }
        session.process_batch(&batch);
        progress.set_position(reader.rows_read() as u64);
        progress.set_message(format!("visits={}", session.visit_count()));
    }
    progress.finish_with_message(format!("done, visits={}", session.visit_count()));
    tracing::info!(
        "Processed {} rows in {} batches",
        session.stats().rows_seen,
        session.stats().batches
    );

    Ok(session.finish())
}

pub fn run(args: &Args) -> Result<RunSummary> {
    tracing::info!("Starting healthcare data transformation");
    tracing::info!("Using input file {}", args.input_path.display());

    let tables = transform_file(&args.input_path, args.batch_size)?;
    let written = write_tables(&tables, &args.output_dir)?;

    let summary = RunSummary::new(
        &args.input_path,
        &args.output_dir,
        args.batch_size,
        &tables,
        written,
    );
    summary.warn_on_conflicts();

    let summary_path = args.output_dir.join(RUN_SUMMARY_FILE_NAME);
    summary.write_json(&summary_path)?;
    tracing::info!("Wrote run summary {}", summary_path.display());
    Ok(summary)
}
