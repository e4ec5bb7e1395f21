//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{CrawlResults, FailedPage, Heading, HeadingLevel, Image, Link, PageContent};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_page(&self, page_id: i64, title: String, meta_description: String) -> StorageResult<PageContent> {
        let mut stmt = self
            .conn
            .prepare("SELECT level, text FROM headings WHERE page_id = ?1 ORDER BY position")?;
        let raw_headings = stmt
            .query_map(params![page_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let headings = raw_headings
            .into_iter()
            .map(|(level, text)| {
                HeadingLevel::from_tag(&level)
                    .map(|level| Heading { level, text })
                    .ok_or_else(|| StorageError::Corrupt(format!("heading level '{}'", level)))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT text FROM paragraphs WHERE page_id = ?1 ORDER BY position")?;
        let paragraphs = stmt
            .query_map(params![page_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT text, url FROM links WHERE page_id = ?1 ORDER BY position")?;
        let links = stmt
            .query_map(params![page_id], |row| {
                Ok(Link {
                    text: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT src, alt, data FROM images WHERE page_id = ?1 ORDER BY position")?;
        let images = stmt
            .query_map(params![page_id], |row| {
                Ok(Image {
                    src: row.get(0)?,
                    alt: row.get(1)?,
                    data: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageContent {
            title,
            meta_description,
            headings,
            paragraphs,
            links,
            images,
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        base_domain: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        config_hash: row.get(5)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?).unwrap_or(RunStatus::Failed),
    })
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("timestamp '{}': {}", value, e)))
}

const RUN_COLUMNS: &str = "id, seed_url, base_domain, started_at, finished_at, config_hash, status";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (seed_url, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![seed_url, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Results =====

    fn save_results(&mut self, run_id: i64, results: &CrawlResults) -> StorageResult<()> {
        self.get_run(run_id)?;

        let fetch_index: HashMap<&str, i64> = results
            .fetch_order
            .iter()
            .enumerate()
            .map(|(index, url)| (url.as_str(), index as i64))
            .collect();
        // Entries missing from the fetch order sort after everything else
        let index_of = |url: &str| {
            fetch_index
                .get(url)
                .copied()
                .unwrap_or(results.fetch_order.len() as i64)
        };

        let status = if results.cancelled {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM pages WHERE run_id = ?1", params![run_id])?;
        tx.execute("DELETE FROM failures WHERE run_id = ?1", params![run_id])?;

        {
            let mut insert_page = tx.prepare(
                "INSERT INTO pages (run_id, url, fetch_index, title, meta_description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_heading = tx.prepare(
                "INSERT INTO headings (page_id, position, level, text) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut insert_paragraph =
                tx.prepare("INSERT INTO paragraphs (page_id, position, text) VALUES (?1, ?2, ?3)")?;
            let mut insert_link = tx.prepare(
                "INSERT INTO links (page_id, position, text, url) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut insert_image = tx.prepare(
                "INSERT INTO images (page_id, position, src, alt, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_failure = tx.prepare(
                "INSERT INTO failures (run_id, url, fetch_index, error) VALUES (?1, ?2, ?3, ?4)",
            )?;

            for (url, page) in &results.pages {
                insert_page.execute(params![
                    run_id,
                    url,
                    index_of(url),
                    page.title,
                    page.meta_description
                ])?;
                let page_id = tx.last_insert_rowid();

                for (position, heading) in page.headings.iter().enumerate() {
                    insert_heading.execute(params![
                        page_id,
                        position as i64,
                        heading.level.as_tag(),
                        heading.text
                    ])?;
                }
                for (position, text) in page.paragraphs.iter().enumerate() {
                    insert_paragraph.execute(params![page_id, position as i64, text])?;
                }
                for (position, link) in page.links.iter().enumerate() {
                    insert_link.execute(params![page_id, position as i64, link.text, link.url])?;
                }
                for (position, image) in page.images.iter().enumerate() {
                    insert_image.execute(params![
                        page_id,
                        position as i64,
                        image.src,
                        image.alt,
                        image.data
                    ])?;
                }
            }

            for failure in &results.failures {
                insert_failure.execute(params![
                    run_id,
                    failure.url,
                    index_of(&failure.url),
                    failure.error
                ])?;
            }
        }

        tx.execute(
            "UPDATE runs SET seed_url = ?1, base_domain = ?2, started_at = ?3, finished_at = ?4,
             status = ?5 WHERE id = ?6",
            params![
                results.seed_url,
                results.base_domain,
                results.started_at.to_rfc3339(),
                results.finished_at.to_rfc3339(),
                status.to_db_string(),
                run_id
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            "Saved run {}: {} pages, {} failures",
            run_id,
            results.page_count(),
            results.failures.len()
        );

        Ok(())
    }

    fn load_results(&self, run_id: i64) -> StorageResult<CrawlResults> {
        let run = self.get_run(run_id)?;
        let (base_domain, finished_at) = match (run.base_domain, run.finished_at) {
            (Some(base_domain), Some(finished_at)) => (base_domain, finished_at),
            _ => return Err(StorageError::NoResults(run_id)),
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, url, fetch_index, title, meta_description FROM pages
             WHERE run_id = ?1 ORDER BY fetch_index",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut attempts: Vec<(i64, String)> = Vec::new();
        let mut pages = BTreeMap::new();
        for (page_id, url, fetch_index, title, meta_description) in rows {
            let content = self.load_page(page_id, title, meta_description)?;
            attempts.push((fetch_index, url.clone()));
            pages.insert(url, content);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT url, fetch_index, error FROM failures WHERE run_id = ?1 ORDER BY fetch_index")?;
        let failure_rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut failures = Vec::with_capacity(failure_rows.len());
        for (url, fetch_index, error) in failure_rows {
            attempts.push((fetch_index, url.clone()));
            failures.push(FailedPage { url, error });
        }

        attempts.sort_by_key(|(index, _)| *index);
        let fetch_order = attempts.into_iter().map(|(_, url)| url).collect();

        Ok(CrawlResults {
            seed_url: run.seed_url,
            base_domain,
            pages,
            failures,
            fetch_order,
            cancelled: run.status == RunStatus::Interrupted,
            started_at: parse_timestamp(&run.started_at)?,
            finished_at: parse_timestamp(&finished_at)?,
        })
    }

    fn count_pages(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
