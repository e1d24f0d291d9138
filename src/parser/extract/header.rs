use crate::model::SheetHeader;
use crate::parser::cells::label_key;
use crate::parser::rows::{RowKind, SheetRow};
use crate::parser::sections::tag_for_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Customer,
    Season,
    StyleNumber,
    StyleName,
    CostedQuantity,
    Leadtime,
    KnittingMachine,
}

// Whitespace-free, upper-cased, trailing dots dropped.
const FIELD_LABELS: &[(&str, Field)] = &[
    ("CUSTOMER", Field::Customer),
    ("CLIENT", Field::Customer),
    ("BUYER", Field::Customer),
    ("SEASON", Field::Season),
    ("STYLE#", Field::StyleNumber),
    ("STYLENO", Field::StyleNumber),
    ("STYLENUMBER", Field::StyleNumber),
    ("STYLENAME", Field::StyleName),
    ("COSTEDQUANTITY", Field::CostedQuantity),
    ("COSTEDQTY", Field::CostedQuantity),
    ("ORDERQUANTITY", Field::CostedQuantity),
    ("LEADTIME", Field::Leadtime),
    ("KNITTINGMACHINE", Field::KnittingMachine),
];

fn field_for(text: &str) -> Option<Field> {
    let key = label_key(text);
    let key = key.trim_end_matches('.');
    FIELD_LABELS
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, f)| *f)
}

/// Row carrying at least one header-field label (`CUSTOMER`, `SEASON`, …).
pub fn is_field_row(row: &SheetRow) -> bool {
    row.cells.iter().any(|c| field_for(&c.text()).is_some())
}

/// Value for the label in cell `idx`: text after `:` in the same cell, else
/// the next non-blank cell unless that one is a label itself.
fn field_value(row: &SheetRow, idx: usize) -> Option<String> {
    let own = row.cell(idx).text();
    if let Some((_, inline)) = own.split_once(':') {
        let inline = inline.trim();
        if !inline.is_empty() {
            return Some(inline.to_string());
        }
    }
    let next = row.cells[idx + 1..].iter().find(|c| !c.is_blank())?.text();
    if field_for(&next).is_some() || tag_for_label(&next).is_some() {
        return None;
    }
    Some(next)
}

/// Header fields from the rows above the sentinel. First occurrence wins.
pub fn extract(rows: &[SheetRow]) -> SheetHeader {
    let mut header = SheetHeader::default();

    for row in rows {
        if !matches!(row.kind, RowKind::Data | RowKind::Header) {
            continue;
        }
        for (idx, cell) in row.cells.iter().enumerate() {
            let Some(field) = field_for(&cell.text()) else {
                continue;
            };
            let Some(value) = field_value(row, idx) else {
                continue;
            };
            let slot = match field {
                Field::Customer => &mut header.customer,
                Field::Season => &mut header.season,
                Field::StyleNumber => &mut header.style_number,
                Field::StyleName => &mut header.style_name,
                Field::CostedQuantity => &mut header.costed_quantity,
                Field::Leadtime => &mut header.leadtime,
                Field::KnittingMachine => {
                    if header.knitting_machine.is_none() {
                        header.knitting_machine = Some(value);
                    }
                    continue;
                }
            };
            if slot.is_empty() {
                *slot = value;
            }
        }
    }

    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RawGrid;
    use crate::parser::rows::classify_rows;

    fn header_of(rows: &[&[&str]]) -> SheetHeader {
        let grid = RawGrid::from_text_rows(rows);
        extract(&classify_rows(&grid))
    }

    #[test]
    fn label_value_pairs() {
        let h = header_of(&[
            &["CUSTOMER", "Acme Headwear", "", "SEASON", "F25"],
            &["Style No.", "BC-100"],
            &["STYLE NAME", "", "Classic Trucker"],
            &["COSTED QUANTITY", "5,000 pcs"],
            &["Lead Time:", "60 days"],
        ]);
        assert_eq!(h.customer, "Acme Headwear");
        assert_eq!(h.season, "F25");
        assert_eq!(h.style_number, "BC-100");
        assert_eq!(h.style_name, "Classic Trucker");
        assert_eq!(h.costed_quantity, "5,000 pcs");
        assert_eq!(h.leadtime, "60 days");
        assert_eq!(h.knitting_machine, None);
    }

    #[test]
    fn inline_values_and_first_wins() {
        let h = header_of(&[
            &["Buyer: Northwind"],
            &["Client", "Someone Else"],
            &["Knitting Machine:", "Shima Seiki 12G"],
        ]);
        assert_eq!(h.customer, "Northwind");
        assert_eq!(h.knitting_machine.as_deref(), Some("Shima Seiki 12G"));
    }

    #[test]
    fn label_as_value_is_ignored() {
        let h = header_of(&[&["CUSTOMER", "SEASON", "F25"]]);
        assert_eq!(h.customer, "");
        assert_eq!(h.season, "F25");
    }

    #[test]
    fn field_rows() {
        let grid = RawGrid::from_text_rows(&[["Season", "W26"], ["Knitting", "8"]]);
        let rows = classify_rows(&grid);
        assert!(is_field_row(&rows[0]));
        assert!(!is_field_row(&rows[1]));
    }
}
