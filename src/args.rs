use std::path::PathBuf;

use clap::Parser;

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_DIR};

#[derive(Debug, Parser)]
#[command(name = "healthcare_snowflake")]
#[command(
    about = "Normalize a flat healthcare visit extract into a snowflake schema (one fact table, ten dimensions)"
)]
pub struct Args {
    /// Denormalized visit extract (.csv with a header row).
    #[arg(default_value = DEFAULT_INPUT_PATH)]
    pub input_path: PathBuf,

    /// Directory receiving one CSV per table plus the run summary.
    #[arg(default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Rows read per batch.
    ///
    /// Only affects memory use and progress granularity; output is identical for
    /// any batch size.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,
}

fn parse_batch_size(value: &str) -> Result<usize, String> {
    let size: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a positive integer"))?;
    if size == 0 {
        return Err("batch size must be at least 1".to_string());
    }
    Ok(size)
}
