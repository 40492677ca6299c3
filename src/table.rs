use crate::error::SyncError;
use anyhow::{Context, Result};
use std::path::Path;

/// A single CSV cell. Empty fields are read as `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Absent,
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Absent => None,
            Cell::Text(s) => Some(s),
        }
    }
}

/// Ordered columns plus rows aligned to them. Column 0 is the tag column.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(SyncError::NoColumns.into());
        }
        Ok(Self { columns, rows: Vec::new() })
    }

    /// Appends a row, padding short rows with `Absent` and dropping cells past the last column.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), Cell::Absent);
        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn tag_column(&self) -> &str {
        &self.columns[0]
    }

    /// Non-tag columns with their positional index.
    pub fn field_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns.iter().enumerate().skip(1).map(|(i, c)| (i, c.as_str()))
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn read_csv(path: &Path) -> Result<Table> {
    if !path.exists() {
        anyhow::bail!("file not found: {}", path.display());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading csv file: {}", path.display()))?;
    parse_csv(&text).with_context(|| format!("parsing csv file: {}", path.display()))
}

pub fn parse_csv(text: &str) -> Result<Table> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .context("reading csv header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(SyncError::NoColumns.into());
    }
    let mut table = Table::new(columns)?;

    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading csv record {}", idx + 1))?;
        let cells = record
            .iter()
            .map(|v| if v.is_empty() { Cell::Absent } else { Cell::text(v) })
            .collect();
        table.push_row(cells);
    }
    log::debug!("parsed csv: {} columns, {} rows", table.columns().len(), table.len());
    Ok(table)
}
