//! SQLite storage implementation

use crate::crawler::CrawlReport;
use crate::model::{Affiliation, Author, CitationPayload, Funder, Work, WorkType};
use crate::registry::{Entity, Record, Registry, Works};
use crate::review::Review;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

const REVIEW_NAME_KEY: &str = "review_name";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
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

    /// Creates an in-memory database (used for dry runs and tests)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Entity kinds stored as `(id, position, details, links)` rows
trait StoredEntity: Entity {
    const TABLE: &'static str;

    fn links(&self) -> Value;

    fn from_stored(details: Self::Details, links: &Value) -> Self;
}

fn id_list(links: &Value, key: &str) -> Vec<String> {
    links
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl StoredEntity for Author {
    const TABLE: &'static str = "authors";

    fn links(&self) -> Value {
        json!({"publications": self.publications, "affiliations": self.affiliations})
    }

    fn from_stored(details: Self::Details, links: &Value) -> Self {
        Author {
            details,
            publications: id_list(links, "publications"),
            affiliations: id_list(links, "affiliations"),
        }
    }
}

impl StoredEntity for Funder {
    const TABLE: &'static str = "funders";

    fn links(&self) -> Value {
        json!({"funded_works": self.funded_works})
    }

    fn from_stored(details: Self::Details, links: &Value) -> Self {
        Funder {
            details,
            funded_works: id_list(links, "funded_works"),
        }
    }
}

impl StoredEntity for Affiliation {
    const TABLE: &'static str = "affiliations";

    fn links(&self) -> Value {
        json!({"members": self.members})
    }

    fn from_stored(details: Self::Details, links: &Value) -> Self {
        Affiliation {
            details,
            members: id_list(links, "members"),
        }
    }
}

fn save_entities<E>(tx: &Transaction<'_>, registry: &Registry<E>) -> StorageResult<()>
where
    E: StoredEntity,
    E::Details: Serialize,
{
    tx.execute(&format!("DELETE FROM {}", E::TABLE), [])?;
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} (id, position, details, links) VALUES (?1, ?2, ?3, ?4)",
        E::TABLE
    ))?;

    for (position, row) in registry.rows().enumerate() {
        let Some(id) = row.id() else {
            warn!("Skipping {} row {} without an ID", E::TABLE, position);
            continue;
        };
        let links = registry
            .get(id)
            .map(StoredEntity::links)
            .unwrap_or_else(|_| json!({}));
        stmt.execute(params![
            id,
            position as i64,
            serde_json::to_string(row)?,
            links.to_string()
        ])?;
    }
    Ok(())
}

fn load_entities<E>(conn: &Connection, registry: &mut Registry<E>) -> StorageResult<()>
where
    E: StoredEntity,
    E::Details: DeserializeOwned,
{
    let mut stmt = conn.prepare(&format!(
        "SELECT id, details, links FROM {} ORDER BY position",
        E::TABLE
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (id, details, links) in rows {
        let mut details: E::Details = serde_json::from_str(&details)?;
        details.set_id(id);
        let links: Value = serde_json::from_str(&links)?;
        registry.restore(E::from_stored(details, &links));
    }
    Ok(())
}

/// A `works` row before its JSON columns are decoded
struct StoredWork {
    work_id: String,
    title: Option<String>,
    date: Option<String>,
    source: Option<String>,
    publisher: Option<String>,
    repository: Option<String>,
    work_type: Option<String>,
    doi: Option<String>,
    isbn: Option<String>,
    issn: Option<String>,
    link: Option<String>,
    abstract_text: Option<String>,
    authors: String,
    keywords: String,
    funders: String,
    citations_data: Option<String>,
}

impl StoredWork {
    fn into_work(self) -> StorageResult<Work> {
        let corrupt = |reason: serde_json::Error| StorageError::CorruptRecord {
            id: self.work_id.clone(),
            reason: reason.to_string(),
        };

        let citations_data = match self.citations_data.as_deref() {
            Some(raw) => CitationPayload::from_json(&serde_json::from_str(raw).map_err(corrupt)?),
            None => CitationPayload::Empty,
        };

        Ok(Work {
            authors: serde_json::from_str(&self.authors).map_err(corrupt)?,
            keywords: serde_json::from_str(&self.keywords).map_err(corrupt)?,
            funders: serde_json::from_str(&self.funders).map_err(corrupt)?,
            work_id: Some(self.work_id),
            title: self.title,
            date: self.date,
            source: self.source,
            publisher: self.publisher,
            repository: self.repository,
            work_type: self.work_type.map(|label| WorkType::from_label(&label)),
            doi: self.doi,
            isbn: self.isbn,
            issn: self.issn,
            link: self.link,
            abstract_text: self.abstract_text,
            citations: CitationPayload::Empty,
            citations_data,
        })
    }
}

/// Current table ID of a cited work
///
/// Rows can be re-keyed after a citation snapshot was taken, so an unknown ID
/// falls back to the row describing the same entity.
fn current_id(works: &Works, cited: &Work) -> Option<String> {
    cited
        .work_id
        .as_deref()
        .filter(|id| works.contains(id))
        .map(str::to_string)
        .or_else(|| {
            works
                .rows()
                .find(|row| row.same_entity(cited))
                .and_then(|row| row.work_id.clone())
        })
}

fn save_works(tx: &Transaction<'_>, works: &Works) -> StorageResult<()> {
    tx.execute("DELETE FROM citations", [])?;
    tx.execute("DELETE FROM works", [])?;

    let mut insert_work = tx.prepare(
        "INSERT INTO works (work_id, position, title, date, source, publisher, repository,
         work_type, doi, isbn, issn, link, abstract, authors, keywords, funders, citations_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
    )?;

    for (position, work) in works.rows().enumerate() {
        let Some(id) = work.work_id.as_deref() else {
            warn!("Skipping works row {} without an ID", position);
            continue;
        };
        let citations_data = match &work.citations_data {
            CitationPayload::Empty => None,
            payload => Some(payload.to_json().to_string()),
        };
        insert_work.execute(params![
            id,
            position as i64,
            work.title,
            work.date,
            work.source,
            work.publisher,
            work.repository,
            work.work_type.as_ref().map(WorkType::as_str),
            work.doi,
            work.isbn,
            work.issn,
            work.link,
            work.abstract_text,
            serde_json::to_string(&work.authors)?,
            serde_json::to_string(&work.keywords)?,
            serde_json::to_string(&work.funders)?,
            citations_data,
        ])?;
    }

    let mut insert_edge = tx.prepare(
        "INSERT OR IGNORE INTO citations (citing_id, cited_id, position) VALUES (?1, ?2, ?3)",
    )?;
    let mut dangling = 0usize;
    for work in works.rows() {
        let (Some(citing), CitationPayload::Resolved(cited)) = (&work.work_id, &work.citations) else {
            continue;
        };
        for (position, reference) in cited.rows().enumerate() {
            match current_id(works, reference) {
                Some(cited_id) => {
                    insert_edge.execute(params![citing, cited_id, position as i64])?;
                }
                None => dangling += 1,
            }
        }
    }
    if dangling > 0 {
        debug!("{} citation edges point at works no longer in the table", dangling);
    }
    Ok(())
}

fn load_works(conn: &Connection, works: &mut Works) -> StorageResult<()> {
    let mut stmt = conn.prepare(
        "SELECT work_id, title, date, source, publisher, repository, work_type, doi, isbn,
         issn, link, abstract, authors, keywords, funders, citations_data
         FROM works ORDER BY position",
    )?;
    let stored = stmt
        .query_map([], |row| {
            Ok(StoredWork {
                work_id: row.get(0)?,
                title: row.get(1)?,
                date: row.get(2)?,
                source: row.get(3)?,
                publisher: row.get(4)?,
                repository: row.get(5)?,
                work_type: row.get(6)?,
                doi: row.get(7)?,
                isbn: row.get(8)?,
                issn: row.get(9)?,
                link: row.get(10)?,
                abstract_text: row.get(11)?,
                authors: row.get(12)?,
                keywords: row.get(13)?,
                funders: row.get(14)?,
                citations_data: row.get(15)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for row in stored {
        works.restore(row.into_work()?);
    }

    let mut stmt =
        conn.prepare("SELECT citing_id, cited_id FROM citations ORDER BY citing_id, position")?;
    let edges = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (citing, cited) in edges {
        grouped.entry(citing).or_default().push(cited);
    }

    for (citing, cited_ids) in grouped {
        let mut cited = Works::new();
        for id in &cited_ids {
            if let Ok(work) = works.get(id) {
                cited.restore(work.clone());
            }
        }
        let Some(index) = works.position(&citing) else {
            continue;
        };
        if let Some(row) = works.row_mut(index) {
            row.citations = CitationPayload::Resolved(cited);
        }
    }
    Ok(())
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
        crawl_state: row.get(5)?,
        visited: row.get::<_, i64>(6)?.max(0) as u64,
        discovered: row.get::<_, i64>(7)?.max(0) as u64,
    })
}

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, crawl_state, visited, discovered";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
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

    fn complete_run(&mut self, run_id: i64, report: &CrawlReport) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, crawl_state = ?3, visited = ?4,
             discovered = ?5 WHERE id = ?6",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                report.state.as_str(),
                report.visited as i64,
                report.discovered as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Review Snapshots =====

    fn save_review(&mut self, review: &Review) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![REVIEW_NAME_KEY, review.name],
        )?;
        save_works(&tx, &review.works)?;
        save_entities(&tx, &review.authors)?;
        save_entities(&tx, &review.funders)?;
        save_entities(&tx, &review.affiliations)?;

        tx.commit()?;
        debug!(
            "Saved review '{}' with {} works",
            review.name,
            review.works.len()
        );
        Ok(())
    }

    fn load_review(&self) -> StorageResult<Review> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![REVIEW_NAME_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let mut review = Review::new(name.unwrap_or_default());
        load_works(&self.conn, &mut review.works)?;
        load_entities(&self.conn, &mut review.authors)?;
        load_entities(&self.conn, &mut review.funders)?;
        load_entities(&self.conn, &mut review.affiliations)?;
        review.sync();

        Ok(review)
    }

    // ===== Statistics =====

    fn count_works(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM works", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_citations(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM citations", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
