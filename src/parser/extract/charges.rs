use tracing::debug;

use super::item_label;
use crate::model::MaterialItem;
use crate::parser::cells::{canonical_decimal, extract_numeric};
use crate::parser::columns::{ColumnRole, ColumnRoleMap};
use crate::parser::rows::SheetRow;

/// Packaging / overhead row → item with a cost and optional factory note.
pub fn classify(row: &SheetRow, map: &ColumnRoleMap) -> Option<MaterialItem> {
    let name_idx = map.get(ColumnRole::Name)?;
    let label = item_label(row, name_idx)?;

    let Some(cost) = map
        .get(ColumnRole::Cost)
        .and_then(|idx| extract_numeric(row.cell(idx)))
    else {
        debug!(row = row.index, %label, "charge row without usable cost");
        return None;
    };

    let notes = map
        .get(ColumnRole::Notes)
        .filter(|&idx| idx != name_idx)
        .map(|idx| row.cell(idx))
        .filter(|c| !c.is_blank() && extract_numeric(c).is_none())
        .map(|c| c.text());

    Some(MaterialItem {
        label,
        material_type: None,
        consumption: None,
        price: None,
        cost: canonical_decimal(cost),
        notes,
    })
}
