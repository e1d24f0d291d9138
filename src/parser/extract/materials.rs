use tracing::debug;

use super::item_label;
use crate::model::MaterialItem;
use crate::parser::cells::{canonical_decimal, extract_numeric, normalize_to_decimal_string};
use crate::parser::columns::{ColumnRole, ColumnRoleMap};
use crate::parser::rows::SheetRow;

/// Material-like row (fabric, other fabric/trim, trim) → item.
pub fn classify(row: &SheetRow, map: &ColumnRoleMap) -> Option<MaterialItem> {
    let label = item_label(row, map.get(ColumnRole::Name)?)?;

    let Some(cost) = map
        .get(ColumnRole::Cost)
        .and_then(|idx| extract_numeric(row.cell(idx)))
    else {
        debug!(row = row.index, %label, "material row without usable cost");
        return None;
    };

    let amount = |role| {
        map.get(role)
            .map(|idx| normalize_to_decimal_string(row.cell(idx), "0.00"))
    };
    let text = |role| {
        map.get(role)
            .map(|idx| row.cell(idx).text())
            .filter(|t| !t.is_empty())
    };

    Some(MaterialItem {
        label,
        material_type: text(ColumnRole::Type),
        consumption: amount(ColumnRole::Consumption),
        price: amount(ColumnRole::Price),
        cost: canonical_decimal(cost),
        notes: text(ColumnRole::Notes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RawGrid;
    use crate::parser::rows::classify_rows;
    use crate::parser::sections::SectionFamily;

    fn classify_one(cells: &[&str], map: &ColumnRoleMap) -> Option<MaterialItem> {
        let grid = RawGrid::from_text_rows(&[cells]);
        let rows = classify_rows(&grid);
        classify(&rows[0], map)
    }

    fn default_map() -> ColumnRoleMap {
        ColumnRoleMap::default_for(SectionFamily::Material)
    }

    #[test]
    fn positional_row() {
        let item = classify_one(&["Cotton twill", "0.25", "$3.2", "0.80"], &default_map()).unwrap();
        assert_eq!(item.label, "Cotton twill");
        assert_eq!(item.consumption.as_deref(), Some("0.25"));
        assert_eq!(item.price.as_deref(), Some("3.20"));
        assert_eq!(item.cost, "0.80");
        assert_eq!(item.notes, None);
    }

    #[test]
    fn missing_amounts_default_to_zero() {
        let item = classify_one(&["Buckram", "", "n/a", "0.05"], &default_map()).unwrap();
        assert_eq!(item.consumption.as_deref(), Some("0.00"));
        assert_eq!(item.price.as_deref(), Some("0.00"));
    }

    #[test]
    fn rejected_labels() {
        let map = default_map();
        assert!(classify_one(&["", "0.25", "3.2", "0.80"], &map).is_none());
        assert!(classify_one(&["12", "0.25", "3.2", "0.80"], &map).is_none());
        assert!(classify_one(&["$4.00", "", "", "4.00"], &map).is_none());
        assert!(classify_one(&["Material Cost", "", "", "4.00"], &map).is_none());
    }

    #[test]
    fn cost_must_parse() {
        let map = default_map();
        assert!(classify_one(&["Lining", "0.1", "2", "#REF!"], &map).is_none());
        assert!(classify_one(&["Lining", "0.1", "2", ""], &map).is_none());
        assert!(classify_one(&["Lining", "0.1", "2", "0"], &map).is_some());
    }

    #[test]
    fn type_and_notes_columns() {
        let header = RawGrid::from_text_rows(&[["Name", "Type", "Consumption", "Price", "Cost", "Notes"]]);
        let map = ColumnRoleMap::infer(SectionFamily::Material, &header.rows()[0]);
        let item = classify_one(&["Acrylic yarn", "Knit", "0.09", "5", "0.45", "dyed to match"], &map)
            .unwrap();
        assert_eq!(item.material_type.as_deref(), Some("Knit"));
        assert_eq!(item.cost, "0.45");
        assert_eq!(item.notes.as_deref(), Some("dyed to match"));
    }
}
