use std::sync::LazyLock;

use regex::Regex;

use crate::db::CostSheetRow;
use crate::model::{Category, CostRecord, MaterialItem};
use crate::parser::cells::canonical_decimal;

static OVERHEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(overhead|oh)\b").unwrap());

/// Sum of decimal strings; anything unparsable counts as zero.
pub fn sum_costs<'a>(costs: impl IntoIterator<Item = &'a str>) -> f64 {
    costs
        .into_iter()
        .filter_map(|c| c.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .sum()
}

fn sum_items<'a>(items: impl IntoIterator<Item = &'a MaterialItem>) -> String {
    canonical_decimal(sum_costs(items.into_iter().map(|i| i.cost.as_str())))
}

/// Overhead and profit from the overhead items: a label naming overhead (or
/// `OH`) counts as overhead, otherwise one naming profit counts as profit.
pub fn overhead_split(items: &[MaterialItem]) -> (String, String) {
    let mut oh = 0.0;
    let mut profit = 0.0;
    for item in items {
        let Ok(cost) = item.cost.parse::<f64>() else {
            continue;
        };
        if OVERHEAD_RE.is_match(&item.label) {
            oh += cost;
        } else if item.label.to_uppercase().contains("PROFIT") {
            profit += cost;
        }
    }
    (canonical_decimal(oh), canonical_decimal(profit))
}

/// Flatten a record into the stored row shape.
pub fn flatten(record: &CostRecord) -> CostSheetRow {
    let main = record.fabric.first();
    let (oh, profit) = overhead_split(&record.overhead);
    let ops_cost = canonical_decimal(sum_costs(record.operations.iter().map(|o| o.total.as_str())));

    let (knitting_cost, knitting_machine) = match record.category {
        Category::Beanie => (
            Some(canonical_decimal(sum_costs(
                record
                    .operations
                    .iter()
                    .filter(|o| o.label.to_uppercase().contains("KNIT"))
                    .map(|o| o.total.as_str()),
            ))),
            Some(record.header.knitting_machine.clone().unwrap_or_default()),
        ),
        Category::BallCap => (None, None),
    };

    CostSheetRow {
        id: None,
        customer: record.header.customer.trim().to_string(),
        season: record.header.season.trim().to_string(),
        style_number: record.header.style_number.trim().to_string(),
        style_name: record.header.style_name.clone(),
        costed_quantity: record.header.costed_quantity.clone(),
        leadtime: record.header.leadtime.clone(),
        main_material: main.map(|m| m.label.clone()).unwrap_or_default(),
        material_consumption: main
            .and_then(|m| m.consumption.clone())
            .unwrap_or_else(|| "0.00".to_string()),
        material_price: main
            .and_then(|m| m.price.clone())
            .unwrap_or_else(|| "0.00".to_string()),
        trim_cost: sum_items(record.other_fabric_trim.iter().chain(&record.trim)),
        total_material_cost: record.total_material_cost.clone(),
        ops_cost,
        packaging: sum_items(&record.packaging),
        oh,
        profit,
        ttl_fty_cost: record.total_factory_cost.clone(),
        knitting_cost,
        knitting_machine,
        notes: record.notes.clone(),
        details: serde_json::to_string(record).unwrap_or_default(),
    }
}
