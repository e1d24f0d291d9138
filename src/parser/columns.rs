use std::collections::HashMap;

use crate::grid::Cell;

use super::cells::{extract_numeric, is_error_marker};
use super::sections::{SectionFamily, SectionTag};

const HEADER_KEYWORDS: &[&str] = &[
    "consumption",
    "material price",
    "material cost",
    "operation",
    "smv",
    "factory notes",
    "cost",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Name,
    Consumption,
    Price,
    Cost,
    Time,
    CostPerMinute,
    Total,
    Notes,
    Type,
}

/// Keyword rule for one role. `specific` wins over `generic`; cells containing
/// an `exclude` word never match.
struct RoleRule {
    role: ColumnRole,
    specific: &'static [&'static str],
    generic: &'static [&'static str],
    exclude: &'static [&'static str],
}

const MATERIAL_RULES: &[RoleRule] = &[
    RoleRule {
        role: ColumnRole::Name,
        specific: &["name", "description"],
        generic: &["material", "item"],
        exclude: &["price", "cost", "consumption", "type"],
    },
    RoleRule {
        role: ColumnRole::Consumption,
        specific: &["consumption"],
        generic: &["usage"],
        exclude: &[],
    },
    RoleRule {
        role: ColumnRole::Price,
        specific: &["material price"],
        generic: &["price"],
        exclude: &["total"],
    },
    RoleRule {
        role: ColumnRole::Cost,
        specific: &["material cost"],
        generic: &["cost", "amount"],
        exclude: &["price", "/min"],
    },
    RoleRule {
        role: ColumnRole::Notes,
        specific: &["notes", "remark"],
        generic: &["note", "comment"],
        exclude: &[],
    },
    RoleRule {
        role: ColumnRole::Type,
        specific: &["type"],
        generic: &[],
        exclude: &[],
    },
];

const OPERATION_RULES: &[RoleRule] = &[
    RoleRule {
        role: ColumnRole::Name,
        specific: &["description", "process"],
        generic: &["operation", "name"],
        exclude: &["cost", "time", "smv"],
    },
    RoleRule {
        role: ColumnRole::Time,
        specific: &["smv", "time"],
        generic: &["sam", "minutes"],
        exclude: &["cost", "/min"],
    },
    RoleRule {
        role: ColumnRole::CostPerMinute,
        specific: &["cost (usd/min)", "usd/min"],
        generic: &["/min", "per min", "rate"],
        exclude: &["operation cost", "total"],
    },
    RoleRule {
        role: ColumnRole::Total,
        specific: &["operation cost", "total"],
        generic: &["cost"],
        exclude: &["/min", "per min"],
    },
];

const CHARGE_RULES: &[RoleRule] = &[
    RoleRule {
        role: ColumnRole::Name,
        specific: &["description", "name", "item"],
        generic: &[],
        exclude: &["cost", "notes"],
    },
    RoleRule {
        role: ColumnRole::Notes,
        specific: &["factory notes", "notes", "remark"],
        generic: &["note", "comment"],
        exclude: &[],
    },
    RoleRule {
        role: ColumnRole::Cost,
        specific: &["cost"],
        generic: &["amount", "price", "usd"],
        exclude: &["/min"],
    },
];

/// Role → column index for one section of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoleMap {
    roles: HashMap<ColumnRole, usize>,
}

impl ColumnRoleMap {
    /// Positional layout used until a header row says otherwise.
    pub fn default_for(family: SectionFamily) -> Self {
        let pairs: &[(ColumnRole, usize)] = match family {
            SectionFamily::Material => &[
                (ColumnRole::Name, 0),
                (ColumnRole::Consumption, 1),
                (ColumnRole::Price, 2),
                (ColumnRole::Cost, 3),
            ],
            SectionFamily::Operations | SectionFamily::Unsectioned => &[
                (ColumnRole::Name, 0),
                (ColumnRole::Time, 1),
                (ColumnRole::CostPerMinute, 2),
                (ColumnRole::Total, 3),
            ],
            SectionFamily::Charges => &[
                (ColumnRole::Name, 0),
                (ColumnRole::Notes, 1),
                (ColumnRole::Cost, 3),
            ],
            SectionFamily::Notes => &[],
        };
        ColumnRoleMap {
            roles: pairs.iter().copied().collect(),
        }
    }

    /// Default layout overlaid with whatever roles the header row names.
    pub fn infer(family: SectionFamily, header: &[Cell]) -> Self {
        let mut map = Self::default_for(family);
        for (role, idx) in detect_roles(rules_for(family), header) {
            map.roles.insert(role, idx);
        }
        map
    }

    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        self.roles.get(&role).copied()
    }
}

fn rules_for(family: SectionFamily) -> &'static [RoleRule] {
    match family {
        SectionFamily::Material => MATERIAL_RULES,
        SectionFamily::Operations | SectionFamily::Unsectioned => OPERATION_RULES,
        SectionFamily::Charges => CHARGE_RULES,
        SectionFamily::Notes => &[],
    }
}

fn detect_roles(rules: &[RoleRule], header: &[Cell]) -> Vec<(ColumnRole, usize)> {
    let lowered: Vec<String> = header.iter().map(|c| c.text().to_lowercase()).collect();
    let mut claimed: Vec<usize> = Vec::new();
    let mut found = Vec::new();

    for rule in rules {
        let candidate = |words: &[&str], claimed: &[usize]| {
            lowered.iter().enumerate().position(|(i, text)| {
                !text.is_empty()
                    && !claimed.contains(&i)
                    && words.iter().any(|w| text.contains(w))
                    && !rule.exclude.iter().any(|x| text.contains(x))
            })
        };
        let hit = candidate(rule.specific, &claimed).or_else(|| candidate(rule.generic, &claimed));
        if let Some(idx) = hit {
            claimed.push(idx);
            found.push((rule.role, idx));
        }
    }

    found
}

/// Column-header row: at least two keyword cells, no numbers, no error tokens.
pub fn looks_like_header(cells: &[Cell]) -> bool {
    if cells
        .iter()
        .any(|c| is_error_marker(c) || extract_numeric(c).is_some())
    {
        return false;
    }
    let keyword_cells = cells
        .iter()
        .map(|c| c.text().to_lowercase())
        .filter(|text| HEADER_KEYWORDS.iter().any(|kw| text.contains(kw)))
        .count();
    keyword_cells >= 2
}

/// Family a header row belongs to when it shows up outside any section.
pub fn family_hint(cells: &[Cell]) -> Option<SectionFamily> {
    let joined = cells
        .iter()
        .map(|c| c.text().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if ["operation", "smv", "usd/min"].iter().any(|k| joined.contains(k)) {
        Some(SectionFamily::Operations)
    } else if ["consumption", "material price", "material cost"]
        .iter()
        .any(|k| joined.contains(k))
    {
        Some(SectionFamily::Material)
    } else if joined.contains("factory notes") {
        Some(SectionFamily::Charges)
    } else {
        None
    }
}

/// Role maps learned during one scan: per tag, then per family, then default.
#[derive(Debug, Default)]
pub struct RoleCache {
    by_tag: HashMap<SectionTag, ColumnRoleMap>,
    by_family: HashMap<SectionFamily, ColumnRoleMap>,
}

impl RoleCache {
    pub fn learn(&mut self, tag: SectionTag, header: &[Cell]) {
        self.by_tag
            .insert(tag, ColumnRoleMap::infer(tag.family(), header));
    }

    pub fn learn_family(&mut self, family: SectionFamily, header: &[Cell]) {
        self.by_family
            .insert(family, ColumnRoleMap::infer(family, header));
    }

    pub fn get(&self, tag: SectionTag) -> ColumnRoleMap {
        let family = match tag.family() {
            SectionFamily::Unsectioned => SectionFamily::Operations,
            f => f,
        };
        self.by_tag
            .get(&tag)
            .or_else(|| self.by_family.get(&family))
            .cloned()
            .unwrap_or_else(|| ColumnRoleMap::default_for(family))
    }
}
