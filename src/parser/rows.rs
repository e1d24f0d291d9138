use crate::grid::{cell_at, Cell, RawGrid};

use super::cells::{extract_numeric, label_key};
use super::columns::looks_like_header;
use super::sections::{tag_for_label, SectionTag};

/// Shape of one sheet row, decided once before segmentation.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Blank,
    /// Section label such as `FABRIC/S`. `lead_value` is the number in the
    /// cell right after the label; `header` is set when the rest of the row
    /// reads like column headers.
    SectionLabel {
        tag: SectionTag,
        lead_value: Option<f64>,
        header: bool,
    },
    /// `TOTAL FACTORY COST`: ends segmentation.
    Sentinel { value: Option<f64> },
    /// Any other total or subtotal line.
    Total,
    Header,
    Data,
}

#[derive(Debug, Clone)]
pub struct SheetRow<'g> {
    pub index: usize,
    pub cells: &'g [Cell],
    pub kind: RowKind,
}

impl<'g> SheetRow<'g> {
    pub fn cell(&self, idx: usize) -> &'g Cell {
        cell_at(self.cells, idx)
    }

    /// First non-blank cell with its column.
    pub fn label(&self) -> Option<(usize, String)> {
        first_label(self.cells)
    }

    pub fn numerics(&self) -> Vec<(usize, f64)> {
        numerics(self.cells)
    }

    pub fn has_numeric(&self) -> bool {
        self.cells.iter().any(|c| extract_numeric(c).is_some())
    }

    /// Non-blank cells joined by a single space.
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .filter(|c| !c.is_blank())
            .map(Cell::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn non_blank_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_blank()).count()
    }
}

pub fn classify_rows(grid: &RawGrid) -> Vec<SheetRow<'_>> {
    grid.rows()
        .iter()
        .enumerate()
        .map(|(index, cells)| SheetRow {
            index,
            cells,
            kind: classify_row(cells),
        })
        .collect()
}

pub fn classify_row(cells: &[Cell]) -> RowKind {
    let Some((label_idx, label)) = first_label(cells) else {
        return RowKind::Blank;
    };
    let key = label_key(&label);

    if key.starts_with("TOTALFACTORYCOST") {
        return RowKind::Sentinel {
            value: last_numeric(cells),
        };
    }

    if let Some(tag) = tag_for_label(&label) {
        let numeric_count = numerics(cells).len();
        let allowed = if tag == SectionTag::Operations { 1 } else { 0 };
        if numeric_count <= allowed {
            let rest = &cells[label_idx + 1..];
            return RowKind::SectionLabel {
                tag,
                lead_value: extract_numeric(cell_at(cells, label_idx + 1)),
                header: looks_like_header(rest),
            };
        }
    }

    if is_total_key(&key) {
        return RowKind::Total;
    }

    if looks_like_header(cells) {
        return RowKind::Header;
    }

    RowKind::Data
}

/// `TOTAL …`, `SUBTOTAL …`, `GRAND TOTAL …`.
pub fn is_total_key(key: &str) -> bool {
    key.starts_with("TOTAL") || key.starts_with("SUBTOTAL") || key.starts_with("GRANDTOTAL")
}

pub fn first_label(cells: &[Cell]) -> Option<(usize, String)> {
    cells
        .iter()
        .enumerate()
        .find(|(_, c)| !c.is_blank())
        .map(|(i, c)| (i, c.text()))
}

pub fn numerics(cells: &[Cell]) -> Vec<(usize, f64)> {
    cells
        .iter()
        .enumerate()
        .filter_map(|(i, c)| extract_numeric(c).map(|v| (i, v)))
        .collect()
}

/// Right-most numeric cell of a row.
pub fn last_numeric(cells: &[Cell]) -> Option<f64> {
    cells.iter().rev().find_map(extract_numeric)
}
