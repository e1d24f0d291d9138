use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

static EMPTY_CELL: Cell = Cell::Empty;

/// One untyped spreadsheet cell as handed over by a sheet reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// CSV fields arrive as text; blanks become `Empty`.
    pub fn from_raw(raw: &str) -> Cell {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(t) => t.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(t) => Some(t.trim()),
            _ => None,
        }
    }

    /// Display form used for labels, header scans and notes.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(b) => b.to_string().to_uppercase(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Text(t) => t.trim().to_string(),
        }
    }
}

/// Cell at `idx`, or an empty cell past the end of a short row.
pub fn cell_at(cells: &[Cell], idx: usize) -> &Cell {
    cells.get(idx).unwrap_or(&EMPTY_CELL)
}

/// Rows of heterogeneous cells; rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        RawGrid { rows }
    }

    /// Build a grid of text cells; handy for hand-written sheets.
    pub fn from_text_rows<R, S>(rows: &[R]) -> Self
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        RawGrid {
            rows: rows
                .iter()
                .map(|r| r.as_ref().iter().map(|c| Cell::from_raw(c.as_ref())).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// True when there is nothing to classify: no rows or only blank cells.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().flatten().all(Cell::is_blank)
    }

    pub fn any_text_contains(&self, needle: &str) -> bool {
        self.rows
            .iter()
            .flatten()
            .any(|c| c.text().to_uppercase().contains(needle))
    }

    /// Headerless CSV, ragged rows allowed.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.context("Failed to read CSV record")?;
            rows.push(record.iter().map(Cell::from_raw).collect());
        }
        Ok(RawGrid { rows })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Grid JSON must be an array of rows")
    }

    /// Load a grid from a `.csv` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("Failed to open {:?}", path))?;
                Self::from_csv_reader(file)
            }
            "json" => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {:?}", path))?;
                Self::from_json_str(&raw)
            }
            _ => bail!(
                "Unsupported sheet format {:?}: export the sheet as CSV or a JSON grid",
                path
            ),
        }
    }
}
