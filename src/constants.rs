pub const DEFAULT_INPUT_PATH: &str = "dataset/legacy_healthcare_data.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Visits on or after this date (midnight) make a patient `Active`.
pub const ACTIVE_SINCE: (i32, u32, u32) = (2022, 1, 1);

/// Joins composite key parts. ASCII unit separator, never present in the extract.
pub const COMPOSITE_KEY_DELIMITER: char = '\u{1f}';

pub const RUN_SUMMARY_FILE_NAME: &str = "run_summary.json";
