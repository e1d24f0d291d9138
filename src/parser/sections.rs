use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cells::label_key;
use super::rows::{RowKind, SheetRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionTag {
    Fabric,
    OtherFabricTrim,
    Trim,
    Operations,
    Packaging,
    Overhead,
    Notes,
    None,
}

/// Sections sharing a row layout and a default column map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionFamily {
    Material,
    Operations,
    Charges,
    Notes,
    Unsectioned,
}

impl SectionTag {
    pub fn family(self) -> SectionFamily {
        match self {
            SectionTag::Fabric | SectionTag::OtherFabricTrim | SectionTag::Trim => {
                SectionFamily::Material
            }
            SectionTag::Operations => SectionFamily::Operations,
            SectionTag::Packaging | SectionTag::Overhead => SectionFamily::Charges,
            SectionTag::Notes => SectionFamily::Notes,
            SectionTag::None => SectionFamily::Unsectioned,
        }
    }
}

// Keys are compared whitespace-free and upper-cased (see `label_key`).
const SECTION_LABELS: &[(&str, SectionTag)] = &[
    ("FABRIC", SectionTag::Fabric),
    ("FABRIC/S", SectionTag::Fabric),
    ("FABRICS", SectionTag::Fabric),
    ("EMBROIDERY", SectionTag::OtherFabricTrim),
    ("OTHERFABRIC/S-TRIM/S", SectionTag::OtherFabricTrim),
    ("OTHERFABRICS-TRIMS", SectionTag::OtherFabricTrim),
    ("OTHERFABRIC-TRIM", SectionTag::OtherFabricTrim),
    ("OTHERFABRIC/S&TRIM/S", SectionTag::OtherFabricTrim),
    ("TRIM", SectionTag::Trim),
    ("TRIM/S", SectionTag::Trim),
    ("TRIMS", SectionTag::Trim),
    ("OPERATIONS", SectionTag::Operations),
    ("PACKAGING", SectionTag::Packaging),
    ("OVERHEAD", SectionTag::Overhead),
    ("OVERHEAD/PROFIT", SectionTag::Overhead),
    ("OVERHEAD&PROFIT", SectionTag::Overhead),
    ("OVERHEADANDPROFIT", SectionTag::Overhead),
    ("OH/PROFIT", SectionTag::Overhead),
    ("NOTES", SectionTag::Notes),
    ("NOTE", SectionTag::Notes),
    ("NOTE/S", SectionTag::Notes),
];

pub fn tag_for_label(text: &str) -> Option<SectionTag> {
    let key = label_key(text);
    SECTION_LABELS
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, tag)| *tag)
}

#[derive(Debug, Clone)]
pub struct Section<'g> {
    pub tag: SectionTag,
    /// Time value from the `OPERATIONS` label row, if any.
    pub pending_time: Option<f64>,
    pub rows: Vec<SheetRow<'g>>,
}

impl<'g> Section<'g> {
    fn new(tag: SectionTag, pending_time: Option<f64>) -> Self {
        Section {
            tag,
            pending_time,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Segmentation<'g> {
    pub sections: Vec<Section<'g>>,
    /// Value of the `TOTAL FACTORY COST` sentinel row.
    pub total_factory: Option<f64>,
    /// Index of the sentinel row; nothing from here on is segmented.
    pub terminated_at: Option<usize>,
}

/// Single pass over classified rows, tracking the active section.
///
/// Label rows open a section and stay in it as its first row. A total line
/// closes a notes block. The sentinel stops the scan.
pub fn cluster_sections<'g>(rows: &[SheetRow<'g>]) -> Segmentation<'g> {
    let mut sections = Vec::new();
    let mut current = Section::new(SectionTag::None, None);
    let mut total_factory = None;
    let mut terminated_at = None;

    for row in rows {
        match &row.kind {
            RowKind::Sentinel { value } => {
                debug!(row = row.index, ?value, "total factory cost sentinel");
                total_factory = *value;
                terminated_at = Some(row.index);
                break;
            }
            RowKind::SectionLabel {
                tag, lead_value, ..
            } => {
                debug!(row = row.index, ?tag, "entering section");
                let pending = if *tag == SectionTag::Operations {
                    *lead_value
                } else {
                    None
                };
                let next = Section::new(*tag, pending);
                let done = std::mem::replace(&mut current, next);
                if !done.rows.is_empty() {
                    sections.push(done);
                }
                current.rows.push(row.clone());
            }
            RowKind::Total if current.tag == SectionTag::Notes => {
                let done = std::mem::replace(&mut current, Section::new(SectionTag::None, None));
                sections.push(done);
                current.rows.push(row.clone());
            }
            _ => current.rows.push(row.clone()),
        }
    }

    if !current.rows.is_empty() {
        sections.push(current);
    }

    Segmentation {
        sections,
        total_factory,
        terminated_at,
    }
}

// ── Tests ──
