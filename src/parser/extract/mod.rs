pub mod charges;
pub mod header;
pub mod materials;
pub mod notes;
pub mod operations;
pub mod summary;
pub mod totals;

use tracing::debug;

use super::cells::{canonical_decimal, extract_numeric, is_error_marker, label_key, starts_with_currency};
use super::columns::{family_hint, RoleCache};
use super::rows::{is_total_key, RowKind, SheetRow};
use super::sections::{SectionFamily, SectionTag, Segmentation};
use crate::model::{Category, CostRecord};

// Column-header words that are never item names on their own.
const RESERVED_LABELS: &[&str] = &[
    "FACTORYNOTES",
    "DESCRIPTION",
    "NAME",
    "ITEM",
    "MATERIAL",
    "CONSUMPTION",
    "PRICE",
    "MATERIALPRICE",
    "COST",
    "MATERIALCOST",
    "OPERATION",
    "OPERATIONCOST",
    "TIME",
    "SMV",
    "TIME(SMV)",
    "COST(USD/MIN)",
];

/// Item label from column `idx`, or `None` when that cell cannot name an item:
/// blank, numeric, an error token, a currency amount, a total line or a bare
/// column-header word.
pub(crate) fn item_label(row: &SheetRow, idx: usize) -> Option<String> {
    let cell = row.cell(idx);
    if cell.is_blank() || is_error_marker(cell) || extract_numeric(cell).is_some() {
        return None;
    }
    let text = cell.text();
    if starts_with_currency(&text) {
        return None;
    }
    let key = label_key(&text);
    if is_total_key(&key) || RESERVED_LABELS.contains(&key.as_str()) {
        return None;
    }
    Some(text)
}

/// Assemble the cost record from classified rows and their segmentation.
pub fn extract_all(category: Category, rows: &[SheetRow], segmentation: &Segmentation) -> CostRecord {
    let body_end = segmentation.terminated_at.unwrap_or(rows.len());
    let mut record = CostRecord::new(category, header::extract(&rows[..body_end]));
    let mut cache = RoleCache::default();

    for section in &segmentation.sections {
        let tag = section.tag;
        let family = tag.family();
        let mut pending_time = section.pending_time;

        for row in &section.rows {
            match &row.kind {
                RowKind::SectionLabel { header: true, .. } => cache.learn(tag, row.cells),
                RowKind::Header if tag == SectionTag::None => {
                    if let Some(hint) = family_hint(row.cells) {
                        debug!(row = row.index, ?hint, "column header outside any section");
                        cache.learn_family(hint, row.cells);
                    }
                }
                RowKind::Header if family != SectionFamily::Notes => cache.learn(tag, row.cells),
                RowKind::Data => {
                    let map = cache.get(tag);
                    match family {
                        SectionFamily::Material => {
                            if let Some(item) = materials::classify(row, &map) {
                                match tag {
                                    SectionTag::Fabric => record.fabric.push(item),
                                    SectionTag::OtherFabricTrim => record.other_fabric_trim.push(item),
                                    _ => record.trim.push(item),
                                }
                            }
                        }
                        SectionFamily::Operations => {
                            let pending = pending_time.take();
                            if let Some(item) = operations::classify(row, &map, pending) {
                                operations::push_unique(&mut record.operations, item);
                            }
                        }
                        SectionFamily::Charges => {
                            if let Some(item) = charges::classify(row, &map) {
                                if tag == SectionTag::Packaging {
                                    record.packaging.push(item);
                                } else {
                                    record.overhead.push(item);
                                }
                            }
                        }
                        SectionFamily::Notes => {}
                        SectionFamily::Unsectioned => {
                            if header::is_field_row(row) {
                                continue;
                            }
                            if let Some(item) = operations::fallback(row, &map) {
                                debug!(row = row.index, label = %item.label, "operation recovered outside sections");
                                operations::push_unique(&mut record.operations, item);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let found = totals::extract(rows);
    let material = found.material.unwrap_or_else(|| {
        summary::sum_costs(
            record
                .fabric
                .iter()
                .chain(&record.other_fabric_trim)
                .chain(&record.trim)
                .map(|i| i.cost.as_str()),
        )
    });
    let factory = segmentation.total_factory.or(found.factory).unwrap_or_else(|| {
        material
            + summary::sum_costs(record.operations.iter().map(|o| o.total.as_str()))
            + summary::sum_costs(
                record
                    .packaging
                    .iter()
                    .chain(&record.overhead)
                    .map(|i| i.cost.as_str()),
            )
    });
    record.total_material_cost = canonical_decimal(material);
    record.total_factory_cost = canonical_decimal(factory);
    record.notes = notes::extract(rows);

    debug!(
        items = record.item_count(),
        total = %record.total_factory_cost,
        "cost record assembled"
    );
    record
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RawGrid;
    use crate::parser::process_sheet;

    fn fixture(name: &str) -> RawGrid {
        RawGrid::load(std::path::Path::new(&format!("tests/fixtures/{}", name))).unwrap()
    }

    fn sheet(rows: &[&[&str]]) -> CostRecord {
        process_sheet(&RawGrid::from_text_rows(rows), Category::BallCap).unwrap()
    }

    #[test]
    fn ballcap_header_and_sections() {
        let r = process_sheet(&fixture("ballcap.csv"), Category::BallCap).unwrap();
        assert_eq!(r.header.customer, "Acme Headwear");
        assert_eq!(r.header.season, "F25");
        assert_eq!(r.header.style_number, "BC-100");
        assert_eq!(r.header.style_name, "Classic Trucker");
        assert_eq!(r.header.costed_quantity, "5,000 pcs");
        assert_eq!(r.header.leadtime, "60 days");

        assert_eq!(r.fabric.len(), 2);
        assert_eq!(r.fabric[0].label, "Cotton twill crown");
        assert_eq!(r.fabric[0].consumption.as_deref(), Some("0.25"));
        assert_eq!(r.fabric[0].price.as_deref(), Some("3.20"));
        assert_eq!(r.fabric[0].cost, "0.80");
        assert_eq!(r.other_fabric_trim.len(), 2);
        assert!(r.other_fabric_trim.iter().all(|i| i.label != "Lining"));
        assert_eq!(r.trim.len(), 2);
        assert_eq!(r.packaging.len(), 2);
        assert_eq!(r.overhead.len(), 2);
    }

    #[test]
    fn ballcap_summary_operation_row() {
        let r = process_sheet(&fixture("ballcap.csv"), Category::BallCap).unwrap();
        assert_eq!(r.operations.len(), 1);
        let op = &r.operations[0];
        assert_eq!(op.time, "12.50");
        assert_eq!(op.cost_per_minute, "0.045");
        assert_eq!(op.total, "0.5625");
    }

    #[test]
    fn ballcap_totals_and_notes() {
        let r = process_sheet(&fixture("ballcap.csv"), Category::BallCap).unwrap();
        assert_eq!(r.total_material_cost, "1.84");
        assert_eq!(r.total_factory_cost, "3.1825");
        assert_eq!(
            r.notes.as_deref(),
            Some("Surcharge of $0.05 applies below MOQ\nSuggest heavier visor board for this style")
        );
        // reference table below the sentinel
        assert!(r.operations.iter().all(|o| o.label != "Sewing"));
    }

    #[test]
    fn beanie_operations() {
        let r = process_sheet(&fixture("beanie.json"), Category::Beanie).unwrap();
        assert_eq!(r.header.customer, "Northwind");
        assert_eq!(r.header.style_number, "4410");
        assert_eq!(r.header.costed_quantity, "3000");
        assert_eq!(r.header.knitting_machine.as_deref(), Some("Shima Seiki 12G"));
        assert_eq!(r.fabric.len(), 1);

        let ops: Vec<(&str, &str, &str, &str)> = r
            .operations
            .iter()
            .map(|o| {
                (
                    o.label.as_str(),
                    o.time.as_str(),
                    o.cost_per_minute.as_str(),
                    o.total.as_str(),
                )
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                ("Knitting", "8.00", "0.05", "0.40"),
                ("Linking", "4.00", "0.05", "0.20"),
                ("Washing", "0.00", "0.00", "0.10"),
            ]
        );
    }

    #[test]
    fn beanie_computed_material_total() {
        let r = process_sheet(&fixture("beanie.json"), Category::Beanie).unwrap();
        assert_eq!(r.total_material_cost, "0.645");
        assert_eq!(r.total_factory_cost, "1.915");
        assert_eq!(
            r.notes.as_deref(),
            Some("Pom color to match body; MOQ 1200 pcs per color")
        );
    }

    #[test]
    fn n_material_rows_give_n_items() {
        let r = sheet(&[
            &["FABRIC/S", "CONSUMPTION", "MATERIAL PRICE", "MATERIAL COST"],
            &["Twill", "0.25", "3.20", "0.80"],
            &["Mesh", "0.10", "2.00", "0.20"],
            &["Buckram", "0.05", "1.00", "$0.05"],
        ]);
        assert_eq!(r.fabric.len(), 3);
        assert!(r.fabric.iter().all(|i| i.cost.parse::<f64>().is_ok()));
    }

    #[test]
    fn error_token_costs_never_become_items() {
        let r = sheet(&[
            &["TRIM/S"],
            &["Snap", "1", "0.08", "#REF!"],
            &["Label", "1", "0.02", "#DIV/0!"],
            &["Eyelets", "6", "0.01", "0.06"],
            &["PACKAGING"],
            &["Polybag", "", "", "#VALUE!"],
        ]);
        assert_eq!(r.trim.len(), 1);
        assert_eq!(r.trim[0].label, "Eyelets");
        assert!(r.packaging.is_empty());
    }

    #[test]
    fn bad_cost_row_keeps_section_columns() {
        let r = sheet(&[
            &["TRIM/S"],
            &["Snap", "1", "0.08", "0.08"],
            &["Label cost", "", "", "#REF!"],
            &["Eyelets", "6", "0.01", "0.06"],
            &["Sweatband", "1", "0.15", "0.15"],
            &["Freight cost", "", "", ""],
            &["Buckle", "1", "0.20", "0.20"],
        ]);
        let labels: Vec<_> = r.trim.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["Snap", "Eyelets", "Sweatband", "Buckle"]);
        assert_eq!(r.trim[2].cost, "0.15");
    }

    #[test]
    fn timed_operations_label_with_full_row() {
        let r = sheet(&[&["OPERATIONS", "12"], &["", "10", "0.05", "0.50"]]);
        assert_eq!(r.operations.len(), 1);
        let op = &r.operations[0];
        assert_eq!(
            (op.time.as_str(), op.cost_per_minute.as_str(), op.total.as_str()),
            ("10.00", "0.05", "0.50")
        );
    }

    #[test]
    fn header_row_remaps_columns() {
        let r = sheet(&[
            &["TRIM/S"],
            &["", "Description", "Consumption", "Material Price", "Material Cost"],
            &["", "Sweatband", "1", "0.15", "0.15"],
        ]);
        assert_eq!(r.trim.len(), 1);
        assert_eq!(r.trim[0].label, "Sweatband");
        assert_eq!(r.trim[0].cost, "0.15");
    }

    #[test]
    fn overhead_split() {
        let r = sheet(&[
            &["OVERHEAD/PROFIT"],
            &["OVERHEAD", "", "", "2.00"],
            &["PROFIT", "", "", "1.50"],
        ]);
        assert_eq!(r.overhead.len(), 2);
        assert_eq!(r.overhead[0].label, "OVERHEAD");
        assert_eq!(r.overhead[1].cost, "1.50");
    }

    #[test]
    fn fallback_recovers_unsectioned_operations() {
        let r = sheet(&[
            &["CUSTOMER", "Acme"],
            &["Operation", "Time (SMV)", "Cost (USD/min)", "Operation Cost"],
            &["Sewing", "10", "0.05", ""],
            &["Embroidery", "", "", "0.30"],
            &["Sewing", "10", "0.05", "0.50"],
        ]);
        assert_eq!(r.operations.len(), 2);
        assert_eq!(r.operations[0].total, "0.50");
        assert_eq!(r.operations[1].label, "Embroidery");
    }

    #[test]
    fn sentinel_stops_item_extraction() {
        let r = sheet(&[
            &["OPERATIONS"],
            &["Sewing", "10", "0.05", "0.50"],
            &["TOTAL FACTORY COST", "", "", "0.50"],
            &["Sewing", "1", "2", "3"],
            &["Finishing", "1", "2", "3"],
        ]);
        assert_eq!(r.operations.len(), 1);
        assert_eq!(r.total_factory_cost, "0.50");
    }

    #[test]
    fn missing_totals_are_summed() {
        let r = sheet(&[
            &["FABRIC"],
            &["Twill", "0.25", "3.20", "0.80"],
            &["OPERATIONS"],
            &["Sewing", "10", "0.05", "0.50"],
            &["PACKAGING"],
            &["Polybag", "", "", "0.05"],
        ]);
        assert_eq!(r.total_material_cost, "0.80");
        assert_eq!(r.total_factory_cost, "1.35");
    }
}
