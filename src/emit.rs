//! Writes each finished table to `<output_dir>/<Table>.csv`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

use crate::common::{ensure_dir, rename_into_place, tmp_path_for};
use crate::engine::SnowflakeTables;
use crate::schema::Table;

#[derive(Debug, Clone, Serialize)]
pub struct WrittenTable {
    pub table: Table,
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes `rows` under a header equal to `table`'s columns. The file is built
/// next to its destination and renamed once flushed.
pub fn write_table_csv(path: &Path, table: Table, rows: &[Vec<String>]) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    let mut writer = Writer::from_path(&tmp_path)
        .with_context(|| format!("Failed creating {} CSV {}", table, tmp_path.display()))?;
    writer
        .write_record(table.columns())
        .with_context(|| format!("Failed writing {table} header"))?;

    for row in rows {
        writer
            .write_record(row)
            .with_context(|| format!("Failed writing {table} row"))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed flushing {table} CSV writer"))?;
    drop(writer);

    rename_into_place(&tmp_path, path)
}

/// Writes all eleven tables. Empty tables still get a header-only file.
pub fn write_tables(tables: &SnowflakeTables, output_dir: &Path) -> Result<Vec<WrittenTable>> {
    ensure_dir(output_dir)?;

    let mut written = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        if tables.row_count(table) == 0 {
            tracing::warn!("No data for {table}; writing header only");
        }
        let rows = tables.render(table);
        let path = output_dir.join(table.file_name());
        write_table_csv(&path, table, &rows)?;
        tracing::info!("Created {} with {} rows", path.display(), rows.len());
        written.push(WrittenTable {
            table,
            path,
            rows: rows.len(),
        });
    }
    Ok(written)
}
