use std::{io::IsTerminal, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::common::{format_count, now_unix_seconds, write_atomic};
use crate::emit::WrittenTable;
use crate::engine::SnowflakeTables;
use crate::schema::Table;
use crate::status::StatusSummary;

#[derive(Debug, Clone, Serialize)]
pub struct TableConflicts {
    pub table: Table,
    pub conflicting_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input_path: String,
    pub output_dir: String,
    pub batch_size: usize,
    pub rows_read: usize,
    pub batches: usize,
    pub visits_written: usize,
    pub duplicate_visits_dropped: usize,
    pub unparseable_visit_datetimes: usize,
    pub patient_status: StatusSummary,
    pub tables: Vec<WrittenTable>,
    pub natural_key_conflicts: Vec<TableConflicts>,
    pub finished_at_unix: i64,
}

impl RunSummary {
    pub fn new(
        input_path: &Path,
        output_dir: &Path,
        batch_size: usize,
        tables: &SnowflakeTables,
        written: Vec<WrittenTable>,
    ) -> Self {
        Self {
            input_path: input_path.display().to_string(),
            output_dir: output_dir.display().to_string(),
            batch_size,
            rows_read: tables.stats.rows_seen,
            batches: tables.stats.batches,
            visits_written: tables.visits.len(),
            duplicate_visits_dropped: tables.stats.duplicate_visits,
            unparseable_visit_datetimes: tables.stats.unparseable_visit_datetimes,
            patient_status: tables.status,
            tables: written,
            natural_key_conflicts: tables
                .conflicts
                .iter()
                .map(|&(table, conflicting_rows)| TableConflicts {
                    table,
                    conflicting_rows,
                })
                .collect(),
            finished_at_unix: now_unix_seconds(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(self).context("Failed serializing run summary")?;
        write_atomic(path, &contents)
    }

    /// Surfaces first-write-wins disagreements as data-integrity warnings.
    pub fn warn_on_conflicts(&self) {
        for conflict in &self.natural_key_conflicts {
            tracing::warn!(
                table = %conflict.table,
                rows = conflict.conflicting_rows,
                "Rows reused an existing {} key with different values; the first-seen record was kept",
                conflict.table
            );
        }
    }

    pub fn print_table(&self) {
        let use_color = std::io::stdout().is_terminal();
        let reset = if use_color { "\x1b[0m" } else { "" };
        let bold = if use_color { "\x1b[1m" } else { "" };
        let cyan = if use_color { "\x1b[36m" } else { "" };
        let green = if use_color { "\x1b[32m" } else { "" };
        let yellow = if use_color { "\x1b[33m" } else { "" };

        let border = "+--------------------------------------------+--------------------------+";
        let section = "| SNOWFLAKE TRANSFORMATION SUMMARY           |                          |";

        println!();
        println!("{bold}{cyan}{border}{reset}");
        println!("{bold}{cyan}{section}{reset}");
        println!("{bold}{cyan}{border}{reset}");
        println!(
            "| {:<42} | {:<24} |",
            "Total data rows processed",
            format_count(self.rows_read)
        );
        println!(
            "| {:<42} | {:<24} |",
            "Visits written",
            format_count(self.visits_written)
        );
        println!(
            "| {:<42} | {}{:<24}{} |",
            "Duplicate visit rows dropped",
            yellow,
            format_count(self.duplicate_visits_dropped),
            reset
        );
        println!(
            "| {:<42} | {}{:<24}{} |",
            "Unparseable visit dates",
            yellow,
            format_count(self.unparseable_visit_datetimes),
            reset
        );
        println!(
            "| {:<42} | {}{:<24}{} |",
            "Active patients",
            green,
            format_count(self.patient_status.active),
            reset
        );
        println!(
            "| {:<42} | {:<24} |",
            "Inactive patients",
            format_count(self.patient_status.inactive)
        );
        println!("{bold}{cyan}{border}{reset}");
        for written in &self.tables {
            println!(
                "| {:<42} | {:<24} |",
                written.table.name(),
                format_count(written.rows)
            );
        }
        println!("{bold}{cyan}{border}{reset}");
        println!("  output dir: {}", self.output_dir);
        println!();
    }
}
