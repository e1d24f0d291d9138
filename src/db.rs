use std::path::Path;

use rusqlite::types::ToSql;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::StoreResult;
use crate::model::Category;

/// One store session. Owns its connection; pass it by reference and `close()`
/// it when done.
pub struct CostStore {
    conn: Connection,
}

impl CostStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        init_schema(&conn)?;
        Ok(CostStore { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(CostStore { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ball_caps (
            id                   INTEGER PRIMARY KEY,
            customer             TEXT NOT NULL,
            season               TEXT NOT NULL,
            style_number         TEXT NOT NULL,
            style_name           TEXT,
            costed_quantity      TEXT,
            leadtime             TEXT,
            main_material        TEXT,
            material_consumption TEXT,
            material_price       TEXT,
            trim_cost            TEXT,
            total_material_cost  TEXT,
            ops_cost             TEXT,
            packaging            TEXT,
            oh                   TEXT,
            profit               TEXT,
            ttl_fty_cost         TEXT,
            notes                TEXT,
            details              TEXT,
            created_at           TEXT NOT NULL,
            updated_at           TEXT,
            revision_note        TEXT,
            UNIQUE(customer, season, style_number)
        );
        CREATE INDEX IF NOT EXISTS idx_ball_caps_customer ON ball_caps(customer, season);

        CREATE TABLE IF NOT EXISTS beanies (
            id                   INTEGER PRIMARY KEY,
            customer             TEXT NOT NULL,
            season               TEXT NOT NULL,
            style_number         TEXT NOT NULL,
            style_name           TEXT,
            costed_quantity      TEXT,
            leadtime             TEXT,
            main_material        TEXT,
            material_consumption TEXT,
            material_price       TEXT,
            trim_cost            TEXT,
            total_material_cost  TEXT,
            ops_cost             TEXT,
            knitting_cost        TEXT,
            knitting_machine     TEXT,
            packaging            TEXT,
            oh                   TEXT,
            profit               TEXT,
            ttl_fty_cost         TEXT,
            notes                TEXT,
            details              TEXT,
            created_at           TEXT NOT NULL,
            updated_at           TEXT,
            revision_note        TEXT,
            UNIQUE(customer, season, style_number)
        );
        CREATE INDEX IF NOT EXISTS idx_beanies_customer ON beanies(customer, season);
        ",
    )?;
    Ok(())
}

// ── Rows ──

/// Flat stored shape of a cost record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSheetRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub customer: String,
    pub season: String,
    pub style_number: String,
    pub style_name: String,
    pub costed_quantity: String,
    pub leadtime: String,
    pub main_material: String,
    pub material_consumption: String,
    pub material_price: String,
    pub trim_cost: String,
    pub total_material_cost: String,
    pub ops_cost: String,
    pub packaging: String,
    pub oh: String,
    pub profit: String,
    pub ttl_fty_cost: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knitting_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knitting_machine: Option<String>,
    pub notes: Option<String>,
    #[serde(skip)]
    pub details: String,
}

impl CostSheetRow {
    /// Column names and values in the same order; beanie columns only for beanies.
    fn columns(&self, category: Category) -> (Vec<&'static str>, Vec<&dyn ToSql>) {
        let mut names = vec![
            "customer",
            "season",
            "style_number",
            "style_name",
            "costed_quantity",
            "leadtime",
            "main_material",
            "material_consumption",
            "material_price",
            "trim_cost",
            "total_material_cost",
            "ops_cost",
            "packaging",
            "oh",
            "profit",
            "ttl_fty_cost",
            "notes",
            "details",
        ];
        let mut values: Vec<&dyn ToSql> = vec![
            &self.customer,
            &self.season,
            &self.style_number,
            &self.style_name,
            &self.costed_quantity,
            &self.leadtime,
            &self.main_material,
            &self.material_consumption,
            &self.material_price,
            &self.trim_cost,
            &self.total_material_cost,
            &self.ops_cost,
            &self.packaging,
            &self.oh,
            &self.profit,
            &self.ttl_fty_cost,
            &self.notes,
            &self.details,
        ];
        if category == Category::Beanie {
            names.extend(["knitting_cost", "knitting_machine"]);
            values.push(&self.knitting_cost);
            values.push(&self.knitting_machine);
        }
        (names, values)
    }
}

pub fn insert_cost_sheet(
    conn: &Connection,
    category: Category,
    row: &CostSheetRow,
    created_at: &str,
) -> StoreResult<i64> {
    let (names, mut values) = row.columns(category);
    values.push(&created_at);
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}, created_at) VALUES ({})",
        category.table(),
        names.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, values.as_slice())?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite row `id` in place, keeping its id and `created_at`.
pub fn update_cost_sheet(
    conn: &Connection,
    category: Category,
    id: i64,
    row: &CostSheetRow,
    updated_at: &str,
    revision_note: &str,
) -> StoreResult<usize> {
    let (names, mut values) = row.columns(category);
    let assignments: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = ?{}", name, i + 1))
        .collect();
    let n = values.len();
    values.push(&updated_at);
    values.push(&revision_note);
    values.push(&id);
    let sql = format!(
        "UPDATE {} SET {}, updated_at = ?{}, revision_note = ?{} WHERE id = ?{}",
        category.table(),
        assignments.join(", "),
        n + 1,
        n + 2,
        n + 3
    );
    Ok(conn.execute(&sql, values.as_slice())?)
}

// ── Overview ──

#[derive(Debug, Clone, Serialize)]
pub struct OverviewRow {
    pub id: i64,
    pub customer: String,
    pub season: String,
    pub style_number: String,
    pub style_name: String,
    pub ttl_fty_cost: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

pub fn fetch_overview(
    conn: &Connection,
    category: Category,
    customer: Option<&str>,
    limit: usize,
) -> StoreResult<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(c) = customer {
        conditions.push(format!("customer = ?{} COLLATE NOCASE", params.len() + 1));
        params.push(Box::new(c.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT id, customer, season, style_number, COALESCE(style_name,''),
                COALESCE(ttl_fty_cost,''), created_at, updated_at
         FROM {}{}
         ORDER BY COALESCE(updated_at, created_at) DESC, id DESC
         LIMIT {}",
        category.table(),
        where_clause,
        limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                id: row.get(0)?,
                customer: row.get(1)?,
                season: row.get(2)?,
                style_number: row.get(3)?,
                style_name: row.get(4)?,
                ttl_fty_cost: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub ball_caps: usize,
    pub beanies: usize,
    pub revised: usize,
    pub customers: usize,
}

pub fn get_stats(conn: &Connection) -> StoreResult<Stats> {
    let ball_caps: usize = conn.query_row("SELECT COUNT(*) FROM ball_caps", [], |r| r.get(0))?;
    let beanies: usize = conn.query_row("SELECT COUNT(*) FROM beanies", [], |r| r.get(0))?;
    let revised: usize = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM ball_caps WHERE updated_at IS NOT NULL)
              + (SELECT COUNT(*) FROM beanies WHERE updated_at IS NOT NULL)",
        [],
        |r| r.get(0),
    )?;
    let customers: usize = conn.query_row(
        "SELECT COUNT(DISTINCT customer) FROM
            (SELECT customer FROM ball_caps UNION SELECT customer FROM beanies)",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        ball_caps,
        beanies,
        revised,
        customers,
    })
}
