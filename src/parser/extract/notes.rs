use super::header::is_field_row;
use crate::parser::rows::{RowKind, SheetRow};
use crate::parser::sections::SectionTag;

const NOTE_KEYWORDS: &[&str] = &[
    "surcharge",
    "suggest",
    "recommend",
    "moq",
    "minimum",
    "fabric",
    "color",
    "visor",
    "sweatband",
    "crown",
    "knit",
    "cuff",
    "pom",
];

/// Free-text notes, newline-joined. Rows under a `NOTES` label come first;
/// keyword rows elsewhere are only used when there is no such block.
pub fn extract(rows: &[SheetRow]) -> Option<String> {
    let lines = labelled_block(rows);
    let lines = if lines.is_empty() {
        keyword_rows(rows)
    } else {
        lines
    };
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn labelled_block(rows: &[SheetRow]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut in_block = false;

    for row in rows {
        match &row.kind {
            RowKind::SectionLabel {
                tag: SectionTag::Notes,
                ..
            } => {
                in_block = true;
                if let Some(inline) = inline_text(row) {
                    lines.push(inline);
                }
            }
            RowKind::SectionLabel { .. } | RowKind::Total | RowKind::Sentinel { .. } => {
                in_block = false;
            }
            RowKind::Blank => {}
            _ if in_block => lines.push(row.text()),
            _ => {}
        }
    }

    lines
}

/// Text sharing the row with a `NOTES` label: after the `:` and in later cells.
fn inline_text(row: &SheetRow) -> Option<String> {
    let (idx, label) = row.label()?;
    let mut parts = Vec::new();
    if let Some((_, rest)) = label.split_once(':') {
        let rest = rest.trim();
        if !rest.is_empty() {
            parts.push(rest.to_string());
        }
    }
    parts.extend(
        row.cells[idx + 1..]
            .iter()
            .filter(|c| !c.is_blank())
            .map(|c| c.text()),
    );
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn keyword_rows(rows: &[SheetRow]) -> Vec<String> {
    rows.iter()
        .filter(|row| match row.kind {
            RowKind::Data => true,
            RowKind::Header => row.non_blank_count() == 1,
            _ => false,
        })
        .filter(|row| !row.has_numeric() && !is_field_row(row))
        .map(|row| row.text())
        .filter(|text| {
            let lower = text.to_lowercase();
            NOTE_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .collect()
}
