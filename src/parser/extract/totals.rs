use crate::parser::rows::{last_numeric, SheetRow};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SheetTotals {
    pub material: Option<f64>,
    pub factory: Option<f64>,
}

/// Grand totals found on the sheet. The right-most number of a
/// `TOTAL MATERIAL …` / `TOTAL FACTORY …` row is its value; the first row
/// that yields one wins.
pub fn extract(rows: &[SheetRow]) -> SheetTotals {
    let mut totals = SheetTotals::default();
    for row in rows {
        let key: String = row
            .text()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let slot = if key.contains("TOTALMATERIAL") {
            &mut totals.material
        } else if key.contains("TOTALFACTORY") {
            &mut totals.factory
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = last_numeric(row.cells);
        }
    }
    totals
}
