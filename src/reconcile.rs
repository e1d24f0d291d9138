use std::fmt;

use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{insert_cost_sheet, update_cost_sheet, CostSheetRow, CostStore};
use crate::error::StoreResult;
use crate::model::{Category, CostRecord};
use crate::parser::extract::summary::flatten;

/// Trimmed `(customer, season, style_number)` used to look up prior saves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchKey {
    pub customer: String,
    pub season: String,
    pub style_number: String,
}

impl MatchKey {
    pub fn new(customer: &str, season: &str, style_number: &str) -> Self {
        MatchKey {
            customer: customer.trim().to_string(),
            season: season.trim().to_string(),
            style_number: style_number.trim().to_string(),
        }
    }

    pub fn from_row(row: &CostSheetRow) -> Self {
        Self::new(&row.customer, &row.season, &row.style_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    Exact,
    CaseInsensitive,
    Partial,
    Lenient,
}

impl MatchStrategy {
    /// Tried in this order; the first one with a candidate wins.
    pub const ESCALATION: [MatchStrategy; 4] = [
        MatchStrategy::Exact,
        MatchStrategy::CaseInsensitive,
        MatchStrategy::Partial,
        MatchStrategy::Lenient,
    ];

    /// Partial and lenient lookups need their fields filled in, otherwise
    /// `%%` would match every row.
    fn applies_to(self, key: &MatchKey) -> bool {
        match self {
            MatchStrategy::Exact | MatchStrategy::CaseInsensitive => true,
            MatchStrategy::Partial => {
                !key.customer.is_empty() && !key.season.is_empty() && !key.style_number.is_empty()
            }
            MatchStrategy::Lenient => !key.customer.is_empty() && !key.season.is_empty(),
        }
    }

    fn condition(self) -> &'static str {
        match self {
            MatchStrategy::Exact => "customer = ?1 AND season = ?2 AND style_number = ?3",
            MatchStrategy::CaseInsensitive => {
                "LOWER(TRIM(customer)) = LOWER(?1) AND LOWER(TRIM(season)) = LOWER(?2)
                 AND LOWER(TRIM(style_number)) = LOWER(?3)"
            }
            MatchStrategy::Partial => {
                "customer LIKE ?1 ESCAPE '\\' AND season LIKE ?2 ESCAPE '\\'
                 AND style_number LIKE ?3 ESCAPE '\\'"
            }
            MatchStrategy::Lenient => {
                "LOWER(TRIM(customer)) = LOWER(?1) AND LOWER(TRIM(season)) = LOWER(?2)"
            }
        }
    }

    fn params(self, key: &MatchKey) -> Vec<String> {
        match self {
            MatchStrategy::Exact | MatchStrategy::CaseInsensitive => vec![
                key.customer.clone(),
                key.season.clone(),
                key.style_number.clone(),
            ],
            MatchStrategy::Partial => vec![
                like_pattern(&key.customer),
                like_pattern(&key.season),
                like_pattern(&key.style_number),
            ],
            MatchStrategy::Lenient => vec![key.customer.clone(), key.season.clone()],
        }
    }

    /// Candidates for `key` in `table`, most recently touched first.
    pub fn find(self, conn: &Connection, category: Category, key: &MatchKey) -> StoreResult<Vec<Candidate>> {
        let sql = format!(
            "SELECT id, customer, season, style_number, created_at
             FROM {}
             WHERE {}
             ORDER BY COALESCE(updated_at, created_at) DESC, id DESC",
            category.table(),
            self.condition()
        );
        let params = self.params(key);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    customer: row.get(1)?,
                    season: row.get(2)?,
                    style_number: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::CaseInsensitive => "case-insensitive",
            MatchStrategy::Partial => "partial",
            MatchStrategy::Lenient => "lenient",
        })
    }
}

fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// A previously stored row that may be the same logical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: i64,
    pub customer: String,
    pub season: String,
    pub style_number: String,
    pub created_at: String,
}

/// Walk the escalation and return the first strategy's best candidate.
pub fn find_existing(
    conn: &Connection,
    category: Category,
    key: &MatchKey,
) -> StoreResult<Option<(MatchStrategy, Candidate)>> {
    for strategy in MatchStrategy::ESCALATION {
        if !strategy.applies_to(key) {
            continue;
        }
        let found = strategy.find(conn, category, key)?;
        debug!(%strategy, candidates = found.len(), "match attempt");
        if let Some(best) = found.into_iter().next() {
            return Ok(Some((strategy, best)));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub action: SaveAction,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchStrategy>,
    pub record: CostSheetRow,
}

/// Save a record: update the matching row in place or insert a new one.
///
/// Lookup and write share one `IMMEDIATE` transaction, so two sessions saving
/// the same key serialize instead of both inserting.
pub fn save_record(store: &CostStore, record: &CostRecord) -> StoreResult<SaveOutcome> {
    let category = record.category;
    let mut row = flatten(record);
    let key = MatchKey::from_row(&row);
    let now = Utc::now().to_rfc3339();

    let tx = Transaction::new_unchecked(store.conn(), TransactionBehavior::Immediate)?;
    let (action, id, matched_by) = match find_existing(&tx, category, &key)? {
        Some((strategy, existing)) => {
            let note = format!(
                "Updated {} (matched by {}); record originally created {}",
                now, strategy, existing.created_at
            );
            update_cost_sheet(&tx, category, existing.id, &row, &now, &note)?;
            info!(
                table = category.table(),
                id = existing.id,
                %strategy,
                style = %key.style_number,
                "updated cost sheet"
            );
            (SaveAction::Updated, existing.id, Some(strategy))
        }
        None => {
            let id = insert_cost_sheet(&tx, category, &row, &now)?;
            info!(table = category.table(), id, style = %key.style_number, "inserted cost sheet");
            (SaveAction::Inserted, id, None)
        }
    };
    tx.commit()?;

    row.id = Some(id);
    Ok(SaveOutcome {
        action,
        id,
        matched_by,
        record: row,
    })
}

/// Caller-facing result of one save: `success: false` carries the error text.
#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SaveOutcome>,
}

impl SaveResponse {
    pub fn from_result(source: &str, result: StoreResult<SaveOutcome>) -> Self {
        match result {
            Ok(outcome) => SaveResponse {
                success: true,
                message: match outcome.action {
                    SaveAction::Inserted => format!("{}: inserted as #{}", source, outcome.id),
                    SaveAction::Updated => format!("{}: updated #{}", source, outcome.id),
                },
                outcome: Some(outcome),
            },
            Err(e) => SaveResponse {
                success: false,
                message: format!("{}: failed to save cost sheet: {}", source, e),
                outcome: None,
            },
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fetch_overview;
    use crate::model::{MaterialItem, SheetHeader};

    fn record(customer: &str, season: &str, style: &str) -> CostRecord {
        let mut r = CostRecord::new(
            Category::BallCap,
            SheetHeader {
                customer: customer.into(),
                season: season.into(),
                style_number: style.into(),
                style_name: "Classic Trucker".into(),
                ..SheetHeader::default()
            },
        );
        r.fabric.push(MaterialItem {
            label: "Cotton twill".into(),
            material_type: None,
            consumption: Some("0.25".into()),
            price: Some("3.20".into()),
            cost: "0.80".into(),
            notes: None,
        });
        r.total_material_cost = "0.80".into();
        r.total_factory_cost = "1.20".into();
        r
    }

    fn count(store: &CostStore) -> usize {
        store
            .conn()
            .query_row("SELECT COUNT(*) FROM ball_caps", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn saving_twice_updates_one_row() {
        let store = CostStore::open_in_memory().unwrap();
        let first = save_record(&store, &record("Acme", "F25", "BC-100")).unwrap();
        assert_eq!(first.action, SaveAction::Inserted);

        let mut again = record("Acme", "F25", "BC-100");
        again.total_factory_cost = "1.35".into();
        let second = save_record(&store, &again).unwrap();
        assert_eq!(second.action, SaveAction::Updated);
        assert_eq!(second.id, first.id);
        assert_eq!(second.matched_by, Some(MatchStrategy::Exact));
        assert_eq!(count(&store), 1);

        let (total, note): (String, String) = store
            .conn()
            .query_row("SELECT ttl_fty_cost, revision_note FROM ball_caps", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(total, "1.35");
        assert!(note.contains("matched by exact"));
        assert!(note.contains("originally created"));
    }

    #[test]
    fn key_fields_are_trimmed() {
        let store = CostStore::open_in_memory().unwrap();
        save_record(&store, &record("Acme", "F25", "BC-100")).unwrap();
        let out = save_record(&store, &record("  Acme ", "F25", " BC-100")).unwrap();
        assert_eq!(out.matched_by, Some(MatchStrategy::Exact));
    }

    #[test]
    fn case_insensitive_match() {
        let store = CostStore::open_in_memory().unwrap();
        save_record(&store, &record("acme headwear", "f25", "bc-100")).unwrap();
        let out = save_record(&store, &record("ACME Headwear", "F25", "BC-100")).unwrap();
        assert_eq!(out.action, SaveAction::Updated);
        assert_eq!(out.matched_by, Some(MatchStrategy::CaseInsensitive));
        assert_eq!(count(&store), 1);
    }

    #[test]
    fn partial_match() {
        let store = CostStore::open_in_memory().unwrap();
        save_record(&store, &record("Acme Headwear Ltd", "F25", "BC-100A")).unwrap();
        let out = save_record(&store, &record("Acme Headwear", "F25", "BC-100")).unwrap();
        assert_eq!(out.matched_by, Some(MatchStrategy::Partial));
        assert_eq!(count(&store), 1);
    }

    #[test]
    fn like_wildcards_are_literal() {
        let store = CostStore::open_in_memory().unwrap();
        save_record(&store, &record("Acme", "F25", "BC-100")).unwrap();
        // `_` must not match the `-`; falls through to the lenient strategy
        let out = save_record(&store, &record("Acme", "F25", "BC_100")).unwrap();
        assert_eq!(out.matched_by, Some(MatchStrategy::Lenient));
    }

    #[test]
    fn lenient_match_merges_distinct_styles() {
        // Known ambiguity: two styles sharing customer and season collapse
        // into one stored row.
        let store = CostStore::open_in_memory().unwrap();
        save_record(&store, &record("Acme", "F25", "BC-100")).unwrap();
        let out = save_record(&store, &record("Acme", "F25", "VB-7")).unwrap();
        assert_eq!(out.action, SaveAction::Updated);
        assert_eq!(out.matched_by, Some(MatchStrategy::Lenient));
        assert_eq!(count(&store), 1);

        let listed = fetch_overview(store.conn(), Category::BallCap, None, 10).unwrap();
        assert_eq!(listed[0].style_number, "VB-7");
    }

    #[test]
    fn new_customer_inserts() {
        let store = CostStore::open_in_memory().unwrap();
        save_record(&store, &record("Acme", "F25", "BC-100")).unwrap();
        let out = save_record(&store, &record("Northwind", "F25", "BC-100")).unwrap();
        assert_eq!(out.action, SaveAction::Inserted);
        assert_eq!(out.matched_by, None);
        assert_eq!(count(&store), 2);
    }

    #[test]
    fn blank_style_does_not_match_everything() {
        let store = CostStore::open_in_memory().unwrap();
        save_record(&store, &record("Acme", "F25", "BC-100")).unwrap();
        let key = MatchKey::new("Acme", "", "");
        assert!(!MatchStrategy::Partial.applies_to(&key));
        assert!(!MatchStrategy::Lenient.applies_to(&key));
        assert_eq!(find_existing(store.conn(), Category::BallCap, &key).unwrap(), None);
    }

    #[test]
    fn most_recent_candidate_wins() {
        let store = CostStore::open_in_memory().unwrap();
        let conn = store.conn();
        let older_row = flatten(&record("Acme", "F25", "BC-100"));
        let older = insert_cost_sheet(conn, Category::BallCap, &older_row, "2025-01-01T00:00:00+00:00")
            .unwrap();
        let newer = insert_cost_sheet(
            conn,
            Category::BallCap,
            &flatten(&record("Acme", "F25", "BC-200")),
            "2025-03-01T00:00:00+00:00",
        )
        .unwrap();

        let key = MatchKey::new("Acme", "F25", "BC-999");
        let (strategy, cand) = find_existing(conn, Category::BallCap, &key).unwrap().unwrap();
        assert_eq!(strategy, MatchStrategy::Lenient);
        assert_eq!(cand.id, newer);

        update_cost_sheet(
            conn,
            Category::BallCap,
            older,
            &older_row,
            "2025-04-01T00:00:00+00:00",
            "touched",
        )
        .unwrap();
        let (_, cand) = find_existing(conn, Category::BallCap, &key).unwrap().unwrap();
        assert_eq!(cand.id, older);
    }

    #[test]
    fn two_sessions_same_file_keep_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costsheets.sqlite");
        let a = CostStore::open(&path).unwrap();
        let b = CostStore::open(&path).unwrap();
        save_record(&a, &record("Acme", "F25", "BC-100")).unwrap();
        let out = save_record(&b, &record("Acme", "F25", "BC-100")).unwrap();
        assert_eq!(out.action, SaveAction::Updated);
        assert_eq!(count(&a), 1);
        a.close().unwrap();
        b.close().unwrap();
    }

    #[test]
    fn failed_save_reports_message() {
        let store = CostStore::open_in_memory().unwrap();
        store.conn().execute_batch("DROP TABLE ball_caps").unwrap();
        let resp = SaveResponse::from_result("sheet.csv", save_record(&store, &record("Acme", "F25", "BC-1")));
        assert!(!resp.success);
        assert!(resp.message.contains("failed to save"));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("action").is_none());
    }

    #[test]
    fn response_json_shape() {
        let store = CostStore::open_in_memory().unwrap();
        let resp = SaveResponse::from_result("sheet.csv", save_record(&store, &record("Acme", "F25", "BC-1")));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["action"], "inserted");
        assert_eq!(json["record"]["style_number"], "BC-1");
    }
}
