use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use costsheet::config::Settings;
use costsheet::db::{self, CostStore, OverviewRow};
use costsheet::grid::RawGrid;
use costsheet::model::{Category, CostRecord};
use costsheet::parser::{self, extract::summary};
use costsheet::reconcile::{self, SaveResponse};

#[derive(Parser)]
#[command(name = "costsheet", about = "Ball cap / beanie cost sheet extractor")]
struct Cli {
    /// SQLite store (default: COSTSHEET_DB_PATH or data/costsheets.sqlite)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one sheet and print the cost record as JSON
    Extract {
        /// Sheet exported as CSV or a JSON grid
        path: PathBuf,
        /// ball-cap or beanie (default: detected from the sheet)
        #[arg(short, long)]
        category: Option<Category>,
        /// Print the flat stored row instead of the full record
        #[arg(long)]
        flat: bool,
    },
    /// Extract sheets and save them, updating matching records
    Save {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        category: Option<Category>,
    },
    /// Stored cost sheets, most recently touched first
    List {
        #[arg(short, long, default_value = "ball-cap")]
        category: Category,
        /// Filter by customer (case-insensitive)
        #[arg(long)]
        customer: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show store statistics
    Stats,
}

fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.as_str().into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(|| settings.db_path.clone());

    let result = match cli.command {
        Commands::Extract {
            path,
            category,
            flat,
        } => {
            let record = extract_file(&path, category)?;
            let json = if flat {
                serde_json::to_string_pretty(&summary::flatten(&record))?
            } else {
                serde_json::to_string_pretty(&record)?
            };
            println!("{}", json);
            Ok(())
        }
        Commands::Save { paths, category } => {
            let store = CostStore::open(&db_path)
                .with_context(|| format!("Failed to open store {:?}", db_path))?;
            let records = extract_files(&paths, category);

            let (mut inserted, mut updated, mut failed) = (0, 0, 0);
            for (path, record) in paths.iter().zip(records) {
                let source = path.display().to_string();
                let record = match record {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(file = %source, "{:#}", e);
                        failed += 1;
                        continue;
                    }
                };
                let response = SaveResponse::from_result(&source, reconcile::save_record(&store, &record));
                match response.outcome.as_ref().map(|o| o.action) {
                    Some(reconcile::SaveAction::Inserted) => inserted += 1,
                    Some(reconcile::SaveAction::Updated) => updated += 1,
                    None => {
                        warn!(file = %source, "{}", response.message);
                        failed += 1;
                    }
                }
                println!("{}", serde_json::to_string(&response)?);
            }
            store.close()?;
            eprintln!(
                "Saved {} sheets: {} inserted, {} updated, {} failed.",
                inserted + updated,
                inserted,
                updated,
                failed
            );
            Ok(())
        }
        Commands::List {
            category,
            customer,
            limit,
        } => {
            let store = CostStore::open(&db_path)?;
            let rows = db::fetch_overview(store.conn(), category, customer.as_deref(), limit)?;
            print!("{}", render_overview(category, &rows));
            Ok(())
        }
        Commands::Stats => {
            let store = CostStore::open(&db_path)?;
            let s = db::get_stats(store.conn())?;
            println!("Ball caps: {}", s.ball_caps);
            println!("Beanies:   {}", s.beanies);
            println!("Revised:   {}", s.revised);
            println!("Customers: {}", s.customers);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn extract_file(path: &Path, category: Option<Category>) -> Result<CostRecord> {
    let grid = RawGrid::load(path)?;
    let category = category.unwrap_or_else(|| Category::detect(Some(path), &grid));
    parser::process_sheet(&grid, category).with_context(|| format!("Failed to extract {:?}", path))
}

/// Extract in parallel; results come back in input order.
fn extract_files(paths: &[PathBuf], category: Option<Category>) -> Vec<Result<CostRecord>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(paths.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut results = Vec::with_capacity(paths.len());
    for chunk in paths.chunks(64) {
        let extracted: Vec<_> = chunk
            .par_iter()
            .map(|path| extract_file(path, category))
            .collect();
        results.extend(extracted);
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    results
}

fn render_overview(category: Category, rows: &[OverviewRow]) -> String {
    if rows.is_empty() {
        return format!("No {} cost sheets found.\n", category);
    }

    let mut out = format!(
        "{:>5} | {:<20} | {:<6} | {:<12} | {:<24} | {:>9} | {:<10}\n",
        "id", "Customer", "Season", "Style", "Name", "Fty cost", "Touched"
    );
    out.push_str(&"-".repeat(103));
    out.push('\n');
    for r in rows {
        let touched = r.updated_at.as_deref().unwrap_or(&r.created_at);
        out.push_str(&format!(
            "{:>5} | {:<20} | {:<6} | {:<12} | {:<24} | {:>9} | {:<10}\n",
            r.id,
            truncate(&r.customer, 20),
            truncate(&r.season, 6),
            truncate(&r.style_number, 12),
            truncate(&r.style_name, 24),
            r.ttl_fty_cost,
            truncate(touched, 10)
        ));
    }
    out.push_str(&format!("\n{} {} cost sheets\n", rows.len(), category));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
