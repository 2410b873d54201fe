//! SQLite export of a finished crawl
//!
//! Each export appends one run to the database, so several crawls of the
//! same site can be compared. This is a read-only record of finished graphs;
//! nothing is ever loaded back to resume a crawl.

use crate::crawler::CrawlReport;
use crate::output::traits::{CrawlSummary, OutputHandler, OutputResult};
use crate::url::is_internal;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// SQL schema for the export database
pub const SCHEMA_SQL: &str = r#"
-- One row per exported crawl
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    outcome TEXT NOT NULL,
    config_hash TEXT,
    node_count INTEGER NOT NULL,
    edge_count INTEGER NOT NULL
);

-- Every node of the graph
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    host TEXT NOT NULL,
    status TEXT NOT NULL,
    internal INTEGER NOT NULL,
    in_degree INTEGER NOT NULL,
    out_degree INTEGER NOT NULL,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_run ON pages(run_id);
CREATE INDEX IF NOT EXISTS idx_pages_status ON pages(status);

-- Every edge of the graph, in the source page's link order
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    from_page_id INTEGER NOT NULL REFERENCES pages(id),
    to_page_id INTEGER NOT NULL REFERENCES pages(id),
    position INTEGER NOT NULL,
    UNIQUE(from_page_id, to_page_id)
);

CREATE INDEX IF NOT EXISTS idx_links_from ON links(from_page_id);
CREATE INDEX IF NOT EXISTS idx_links_to ON links(to_page_id);
"#;

/// Opens (or creates) an export database and ensures the schema exists
pub fn open_database(path: &Path) -> OutputResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(conn)
}

/// Inserts one finished crawl into the database
///
/// Everything lands in a single transaction, so a failed export leaves no
/// partial run behind.
///
/// # Returns
///
/// The new run's id
pub fn export_run(
    conn: &mut Connection,
    report: &CrawlReport,
    summary: &CrawlSummary,
) -> OutputResult<i64> {
    let graph = &report.graph;
    let seed_host = report.start_url.host();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO runs (start_url, started_at, finished_at, outcome, config_hash, node_count, edge_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            summary.start_url,
            summary.started_at,
            summary.finished_at,
            summary.outcome,
            summary.config_hash,
            graph.node_count() as i64,
            graph.edge_count() as i64,
        ],
    )?;
    let run_id = tx.last_insert_rowid();

    let mut page_ids: HashMap<&str, i64> = HashMap::with_capacity(graph.node_count());
    {
        let mut insert_page = tx.prepare(
            "INSERT INTO pages (run_id, url, host, status, internal, in_degree, out_degree)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for node in graph.nodes() {
            insert_page.execute(params![
                run_id,
                node.url.as_str(),
                node.url.host(),
                node.status.to_db_string(),
                is_internal(&node.url, seed_host),
                node.in_degree as i64,
                node.out_degree as i64,
            ])?;
            page_ids.insert(node.url.as_str(), tx.last_insert_rowid());
        }

        let mut insert_link = tx.prepare(
            "INSERT INTO links (run_id, from_page_id, to_page_id, position)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        for node in graph.nodes() {
            let Some(&from_id) = page_ids.get(node.url.as_str()) else {
                continue;
            };
            for (position, target) in node.outgoing_urls.iter().enumerate() {
                if let Some(&to_id) = page_ids.get(target.as_str()) {
                    insert_link.execute(params![run_id, from_id, to_id, position as i64])?;
                }
            }
        }
    }

    tx.commit()?;
    Ok(run_id)
}

/// Writes `<base>_graph.db`
#[derive(Debug, Clone)]
pub struct SqliteOutputHandler {
    path: PathBuf,
}

impl SqliteOutputHandler {
    /// Creates a new SQLite output handler
    ///
    /// # Arguments
    ///
    /// * `path` - Database file; created if missing, appended to otherwise
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for SqliteOutputHandler {
    fn name(&self) -> &'static str {
        "database"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, report: &CrawlReport, summary: &CrawlSummary) -> OutputResult<PathBuf> {
        let mut conn = open_database(&self.path)?;
        let run_id = export_run(&mut conn, report, summary)?;
        tracing::debug!("Exported run {} to {}", run_id, self.path.display());
        Ok(self.path.clone())
    }
}
