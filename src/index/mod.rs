// src/index/mod.rs

//! Requirement index: relational store of source-package metadata
//!
//! The index answers two questions for the resolver: "which source package
//! provides capability X" and "what does source package Y require to build."
//! It is populated out-of-band (from distribution repodata snapshots); this
//! module only defines the schema and the read interface the resolver
//! consumes, plus insert helpers used by the importer and by test fixtures.
//!
//! Capability metadata is stored per *tier* (a named repodata snapshot such
//! as "updates" or "base"). When the same capability name exists in more
//! than one tier, lookups prefer the tier listed first in the caller's
//! preference slice. The preference is an explicit parameter rather than an
//! ordering baked into the schema so the contract stays testable.

use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

/// Default tier preference: the updates snapshot shadows the base release.
pub const DEFAULT_TIERS: &[&str] = &["updates", "base"];

/// Read interface over the requirement index database
pub struct Index {
    conn: Connection,
}

impl Index {
    /// Open an existing index database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open a fresh in-memory index with the schema applied
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Create a new index database on disk with the schema applied
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        info!("Initialized requirement index");
        Ok(Self { conn })
    }

    /// Source packages providing a capability name, ordered by tier
    /// preference (earlier entries in `tiers` win), then by source name.
    pub fn provides_by_name(&self, name: &str, tiers: &[&str]) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT source, tier FROM provides WHERE name = ?1")?;
        let rows = stmt.query_map([name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut results: Vec<(String, String)> = rows.collect::<rusqlite::Result<_>>()?;
        sort_by_tier(&mut results, tiers);
        Ok(results)
    }

    /// Source packages providing a file path, same tier preference.
    /// Used only when the requirement token is an absolute path.
    pub fn provides_by_file(&self, path: &str, tiers: &[&str]) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT source, tier FROM file_provides WHERE path = ?1")?;
        let rows = stmt.query_map([path], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut results: Vec<(String, String)> = rows.collect::<rusqlite::Result<_>>()?;
        sort_by_tier(&mut results, tiers);
        Ok(results)
    }

    /// Distinct BuildRequires tokens of a source package, alphabetical
    pub fn buildrequires_of(&self, source: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT requirement FROM buildrequires
             WHERE source = ?1 ORDER BY requirement",
        )?;
        let rows = stmt.query_map([source], |row| row.get::<_, String>(0))?;
        let reqs = rows.collect::<rusqlite::Result<_>>()?;
        Ok(reqs)
    }

    /// Whether the index knows a source package at all. A package with zero
    /// BuildRequires is still known if it provides anything, so
    /// bootstrap-style leaf packages remain valid resolution targets.
    pub fn knows_package(&self, source: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM buildrequires WHERE source = ?1)
                  + (SELECT COUNT(*) FROM provides WHERE source = ?1)",
            [source],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record that `source` (from `tier`) provides capability `name`
    pub fn add_provides(&self, name: &str, source: &str, tier: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO provides (name, source, tier) VALUES (?1, ?2, ?3)",
            params![name, source, tier],
        )?;
        Ok(())
    }

    /// Record that `source` (from `tier`) provides file `path`
    pub fn add_file_provides(&self, path: &str, source: &str, tier: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO file_provides (path, source, tier) VALUES (?1, ?2, ?3)",
            params![path, source, tier],
        )?;
        Ok(())
    }

    /// Record one BuildRequires token of a source package
    pub fn add_buildrequires(&self, source: &str, requirement: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO buildrequires (source, requirement) VALUES (?1, ?2)",
            params![source, requirement],
        )?;
        Ok(())
    }
}

/// Stable sort by position in the tier preference slice; unknown tiers sort
/// last, ties broken by source name.
fn sort_by_tier(results: &mut [(String, String)], tiers: &[&str]) {
    let rank = |tier: &str| {
        tiers
            .iter()
            .position(|t| *t == tier)
            .unwrap_or(tiers.len())
    };
    results.sort_by(|a, b| rank(&a.1).cmp(&rank(&b.1)).then_with(|| a.0.cmp(&b.0)));
}

/// Create the index tables
fn init_schema(conn: &Connection) -> Result<()> {
    debug!("Creating requirement index schema");
    conn.execute_batch(
        "
        -- Capability name -> providing source package, per metadata tier
        CREATE TABLE IF NOT EXISTS provides (
            name TEXT NOT NULL,
            source TEXT NOT NULL,
            tier TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_provides_name ON provides(name);

        -- File path -> providing source package, per metadata tier
        CREATE TABLE IF NOT EXISTS file_provides (
            path TEXT NOT NULL,
            source TEXT NOT NULL,
            tier TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_file_provides_path ON file_provides(path);

        -- Source package -> raw BuildRequires tokens
        CREATE TABLE IF NOT EXISTS buildrequires (
            source TEXT NOT NULL,
            requirement TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_buildrequires_source ON buildrequires(source);
        ",
    )?;
    Ok(())
}
