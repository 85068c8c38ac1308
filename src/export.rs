use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;

use crate::enrich::{ENRICHED_COLUMNS, EnrichedRow};
use crate::error::PipelineError;
use crate::normalize::{NORMALIZED_COLUMNS, NormalizedRow};

const RESULTS_SHEET: &str = "Results";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> std::result::Result<Self, PipelineError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(PipelineError::config(format!(
                "unsupported output file (expected .csv or .xlsx): {}",
                path.display()
            ))),
        }
    }
}

/// Writes the final table; the format follows the file extension.
pub fn write_enriched(path: &Path, rows: &[EnrichedRow]) -> Result<()> {
    ensure_parent(path)?;
    match OutputFormat::from_path(path)? {
        OutputFormat::Csv => write_csv(path, ENRICHED_COLUMNS, rows),
        OutputFormat::Xlsx => write_xlsx(path, rows),
    }
}

pub fn write_normalized(path: &Path, rows: &[NormalizedRow]) -> Result<()> {
    ensure_parent(path)?;
    write_csv(path, NORMALIZED_COLUMNS, rows)
}

// Header is written explicitly so an empty table still carries its columns.
fn write_csv<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed creating {}", path.display()))?;
    writer.write_record(columns).context("write csv header")?;
    for (idx, row) in rows.iter().enumerate() {
        writer
            .serialize(row)
            .with_context(|| format!("write csv row {idx}"))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed flushing {}", path.display()))?;
    Ok(())
}

fn write_xlsx(path: &Path, rows: &[EnrichedRow]) -> Result<()> {
    let mut table = Vec::with_capacity(rows.len() + 1);
    table.push(ENRICHED_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    table.extend(rows.iter().map(EnrichedRow::cells));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(RESULTS_SHEET)?;
        write_rows(sheet, &table)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;
        }
    }
    Ok(())
}
