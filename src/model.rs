use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grid::RawGrid;

/// Garment category; selects the table a record is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BallCap,
    Beanie,
}

impl Category {
    pub fn table(self) -> &'static str {
        match self {
            Category::BallCap => "ball_caps",
            Category::Beanie => "beanies",
        }
    }

    /// Beanie when the file name or any cell says so, ball cap otherwise.
    pub fn detect(path: Option<&Path>, grid: &RawGrid) -> Category {
        let named = path
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_uppercase().contains("BEANIE"));
        if named || grid.any_text_contains("BEANIE") {
            Category::Beanie
        } else {
            Category::BallCap
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::BallCap => "ball-cap",
            Category::Beanie => "beanie",
        })
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "ball-cap" | "ballcap" | "cap" => Ok(Category::BallCap),
            "beanie" => Ok(Category::Beanie),
            other => Err(format!("unknown category '{}' (expected ball-cap or beanie)", other)),
        }
    }
}

/// Line item of a material-like section (fabric, trims, packaging, overhead).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialItem {
    pub label: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
    pub consumption: Option<String>,
    pub price: Option<String>,
    pub cost: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationItem {
    pub label: String,
    pub time: String,
    pub cost_per_minute: String,
    pub total: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetHeader {
    pub customer: String,
    pub season: String,
    pub style_number: String,
    pub style_name: String,
    pub costed_quantity: String,
    pub leadtime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knitting_machine: Option<String>,
}

/// Normalized result of one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRecord {
    pub category: Category,
    #[serde(flatten)]
    pub header: SheetHeader,
    pub fabric: Vec<MaterialItem>,
    pub other_fabric_trim: Vec<MaterialItem>,
    pub trim: Vec<MaterialItem>,
    pub operations: Vec<OperationItem>,
    pub packaging: Vec<MaterialItem>,
    pub overhead: Vec<MaterialItem>,
    pub total_material_cost: String,
    pub total_factory_cost: String,
    pub notes: Option<String>,
}

impl CostRecord {
    pub fn new(category: Category, header: SheetHeader) -> Self {
        CostRecord {
            category,
            header,
            fabric: Vec::new(),
            other_fabric_trim: Vec::new(),
            trim: Vec::new(),
            operations: Vec::new(),
            packaging: Vec::new(),
            overhead: Vec::new(),
            total_material_cost: "0.00".to_string(),
            total_factory_cost: "0.00".to_string(),
            notes: None,
        }
    }

    pub fn item_count(&self) -> usize {
        self.fabric.len()
            + self.other_fabric_trim.len()
            + self.trim.len()
            + self.operations.len()
            + self.packaging.len()
            + self.overhead.len()
    }
}
