//! Database schema for review snapshots and crawl runs

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    crawl_state TEXT,
    visited INTEGER NOT NULL DEFAULT 0,
    discovered INTEGER NOT NULL DEFAULT 0
);

-- Review-level values (name)
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Works table, in registry row order
CREATE TABLE IF NOT EXISTS works (
    work_id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    title TEXT,
    date TEXT,
    source TEXT,
    publisher TEXT,
    repository TEXT,
    work_type TEXT,
    doi TEXT,
    isbn TEXT,
    issn TEXT,
    link TEXT,
    abstract TEXT,
    authors TEXT NOT NULL DEFAULT '[]',
    keywords TEXT NOT NULL DEFAULT '[]',
    funders TEXT NOT NULL DEFAULT '[]',
    citations_data TEXT
);

CREATE INDEX IF NOT EXISTS idx_works_position ON works(position);
CREATE INDEX IF NOT EXISTS idx_works_doi ON works(doi);

-- Resolved references: citing work -> cited work
CREATE TABLE IF NOT EXISTS citations (
    citing_id TEXT NOT NULL REFERENCES works(work_id),
    cited_id TEXT NOT NULL REFERENCES works(work_id),
    position INTEGER NOT NULL,
    PRIMARY KEY (citing_id, cited_id)
);

CREATE INDEX IF NOT EXISTS idx_citations_cited ON citations(cited_id);

-- Entity registries: flat details plus graph links, both as JSON
CREATE TABLE IF NOT EXISTS authors (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    details TEXT NOT NULL,
    links TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS funders (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    details TEXT NOT NULL,
    links TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS affiliations (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    details TEXT NOT NULL,
    links TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
