pub mod cells;
pub mod columns;
pub mod extract;
pub mod rows;
pub mod sections;

use crate::error::ExtractError;
use crate::grid::RawGrid;
use crate::model::{Category, CostRecord};

/// Three-pass pipeline: grid → classified rows → sections → cost record.
pub fn process_sheet(grid: &RawGrid, category: Category) -> Result<CostRecord, ExtractError> {
    if grid.is_empty() {
        return Err(ExtractError::EmptyGrid);
    }
    let rows = rows::classify_rows(grid);
    let segmentation = sections::cluster_sections(&rows);
    Ok(extract::extract_all(category, &rows, &segmentation))
}
