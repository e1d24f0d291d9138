use tracing::debug;

use super::item_label;
use crate::model::OperationItem;
use crate::parser::cells::{canonical_decimal, extract_numeric, format_computed_value};
use crate::parser::columns::{ColumnRole, ColumnRoleMap};
use crate::parser::rows::SheetRow;

const SUMMARY_LABEL: &str = "Operations";
const UNNAMED_LABEL: &str = "Operation";

/// Shape of a candidate operation row, decided once per row.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationShape {
    /// Columns 1–3 all numeric: time, cost per minute, total.
    ThreeNumeric {
        label: String,
        time: f64,
        cost_per_minute: f64,
        total: f64,
    },
    /// Blank-labelled row right after an `OPERATIONS` label that carried the
    /// time; the row supplies cost per minute and total. Only used when
    /// columns 1–3 are not all numeric.
    Summary {
        time: f64,
        cost_per_minute: f64,
        total: f64,
    },
    Labeled {
        label: String,
        time: Option<f64>,
        cost_per_minute: Option<f64>,
        total: Option<f64>,
    },
    Unusable,
}

pub fn classify_shape(row: &SheetRow, map: &ColumnRoleMap, pending_time: Option<f64>) -> OperationShape {
    let name_idx = map.get(ColumnRole::Name).unwrap_or(0);
    let label = item_label(row, name_idx);
    let numerics = row.numerics();

    let at = |idx| extract_numeric(row.cell(idx));
    if let (Some(time), Some(cost_per_minute), Some(total)) = (at(1), at(2), at(3)) {
        return OperationShape::ThreeNumeric {
            label: label.unwrap_or_else(|| UNNAMED_LABEL.to_string()),
            time,
            cost_per_minute,
            total,
        };
    }

    if let Some(time) = pending_time {
        if row.cell(name_idx).is_blank() && numerics.len() >= 2 {
            let (cpm_idx, cost_per_minute) = numerics[0];
            let total = map
                .get(ColumnRole::Total)
                .filter(|&idx| idx != cpm_idx)
                .and_then(|idx| extract_numeric(row.cell(idx)))
                .or_else(|| numerics.last().map(|&(_, v)| v))
                .unwrap_or_default();
            return OperationShape::Summary {
                time,
                cost_per_minute,
                total,
            };
        }
    }

    let Some(label) = label else {
        return OperationShape::Unusable;
    };
    let value = |role| map.get(role).and_then(|idx| extract_numeric(row.cell(idx)));
    OperationShape::Labeled {
        label,
        time: value(ColumnRole::Time),
        cost_per_minute: value(ColumnRole::CostPerMinute),
        total: value(ColumnRole::Total),
    }
}

/// Explicit total wins, else `time × cost per minute`; neither means no item.
pub fn resolve(shape: OperationShape) -> Option<OperationItem> {
    match shape {
        OperationShape::ThreeNumeric {
            label,
            time,
            cost_per_minute,
            total,
        } => Some(item(label, Some(time), Some(cost_per_minute), total)),
        OperationShape::Summary {
            time,
            cost_per_minute,
            total,
        } => Some(item(SUMMARY_LABEL.to_string(), Some(time), Some(cost_per_minute), total)),
        OperationShape::Labeled {
            label,
            time,
            cost_per_minute,
            total,
        } => match (total, time, cost_per_minute) {
            (Some(total), _, _) => Some(item(label, time, cost_per_minute, total)),
            (None, Some(t), Some(c)) => Some(OperationItem {
                label,
                time: canonical_decimal(t),
                cost_per_minute: canonical_decimal(c),
                total: format_computed_value(t * c),
            }),
            _ => None,
        },
        OperationShape::Unusable => None,
    }
}

fn item(label: String, time: Option<f64>, cost_per_minute: Option<f64>, total: f64) -> OperationItem {
    OperationItem {
        label,
        time: time.map(canonical_decimal).unwrap_or_else(|| "0.00".to_string()),
        cost_per_minute: cost_per_minute
            .map(canonical_decimal)
            .unwrap_or_else(|| "0.00".to_string()),
        total: canonical_decimal(total),
    }
}

/// Row inside an `OPERATIONS` section.
pub fn classify(row: &SheetRow, map: &ColumnRoleMap, pending_time: Option<f64>) -> Option<OperationItem> {
    let shape = classify_shape(row, map, pending_time);
    let item = resolve(shape);
    if item.is_none() {
        debug!(row = row.index, "operation row without total or time/rate pair");
    }
    item
}

/// Looser pass for rows outside any section. No summary rows here: the
/// pending time only exists under an `OPERATIONS` label.
pub fn fallback(row: &SheetRow, map: &ColumnRoleMap) -> Option<OperationItem> {
    resolve(classify_shape(row, map, None))
}

/// Append unless an identical item is already present.
pub fn push_unique(items: &mut Vec<OperationItem>, item: OperationItem) {
    if items.contains(&item) {
        debug!(label = %item.label, "duplicate operation dropped");
        return;
    }
    items.push(item);
}
