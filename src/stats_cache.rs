use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http_cache::app_cache_dir;
use crate::player::{ExternalStats, PlayerIdentity};

/// One scraped (or unresolved) stats line, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub fpl_name: String,
    pub source_name: String,
    pub league: String,
    pub season: String,
    pub goals: u32,
    pub assists: u32,
    pub minutes: u32,
    /// Where the numbers came from: a source name, or "none".
    pub notes: String,
}

impl StatsRecord {
    pub const NO_SOURCE: &'static str = "none";

    pub fn new(identity: &PlayerIdentity, stats: ExternalStats, season: &str, notes: &str) -> Self {
        Self {
            fpl_name: identity.search_name().to_string(),
            source_name: identity.web_name.clone(),
            league: stats.league,
            season: season.to_string(),
            goals: stats.goals,
            assists: stats.assists,
            minutes: stats.minutes,
            notes: notes.to_string(),
        }
    }

    pub fn stats(&self) -> ExternalStats {
        ExternalStats {
            league: self.league.clone(),
            goals: self.goals,
            assists: self.assists,
            minutes: self.minutes,
        }
    }

    pub fn identity(&self) -> PlayerIdentity {
        PlayerIdentity {
            name: self.fpl_name.clone(),
            web_name: self.source_name.clone(),
        }
    }

    pub fn matches(&self, identity: &PlayerIdentity) -> bool {
        self.fpl_name == identity.search_name() || self.source_name == identity.web_name
    }
}

/// Immutable view of the cache taken before enrichment; safe to share across workers.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    records: Vec<StatsRecord>,
}

impl CacheSnapshot {
    pub fn from_records(records: Vec<StatsRecord>) -> Self {
        Self { records }
    }

    /// Oldest record matching either name.
    pub fn lookup(&self, identity: &PlayerIdentity) -> Option<&StatsRecord> {
        self.records.iter().find(|r| r.matches(identity))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StatsRecord] {
        &self.records
    }
}

/// Append-only SQLite store of external stats.
pub struct StatsCache {
    conn: Connection,
}

impl StatsCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open stats cache {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory stats cache")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn snapshot(&self) -> Result<CacheSnapshot> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT fpl_name, source_name, league, season, goals, assists, minutes, notes
                FROM external_stats
                ORDER BY id ASC
                "#,
            )
            .context("prepare stats snapshot query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StatsRecord {
                    fpl_name: row.get(0)?,
                    source_name: row.get(1)?,
                    league: row.get(2)?,
                    season: row.get(3)?,
                    goals: row.get(4)?,
                    assists: row.get(5)?,
                    minutes: row.get(6)?,
                    notes: row.get(7)?,
                })
            })
            .context("query stats snapshot")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.context("decode stats row")?);
        }
        Ok(CacheSnapshot { records })
    }

    /// Single writer: appends every record in one transaction.
    pub fn append(&mut self, records: &[StatsRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let created_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().context("begin stats append")?;
        for r in records {
            tx.execute(
                "INSERT INTO external_stats(fpl_name, source_name, league, season, goals, assists, minutes, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    r.fpl_name,
                    r.source_name,
                    r.league,
                    r.season,
                    r.goals,
                    r.assists,
                    r.minutes,
                    r.notes,
                    created_at
                ],
            )
            .context("insert stats record")?;
        }
        tx.commit().context("commit stats append")?;
        info!(count = records.len(), "appended external stats to cache");
        Ok(records.len())
    }

    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM external_stats", [], |row| row.get(0))
            .context("count stats records")?;
        Ok(n as usize)
    }
}

pub fn default_cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("external_stats.sqlite"))
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS external_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fpl_name TEXT NOT NULL,
            source_name TEXT NOT NULL,
            league TEXT NOT NULL,
            season TEXT NOT NULL,
            goals INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            minutes INTEGER NOT NULL,
            notes TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_external_stats_fpl_name ON external_stats(fpl_name);
        CREATE INDEX IF NOT EXISTS idx_external_stats_source_name ON external_stats(source_name);
        "#,
    )
    .context("create stats cache schema")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, web: &str) -> PlayerIdentity {
        PlayerIdentity {
            name: name.into(),
            web_name: web.into(),
        }
    }

    #[test]
    fn append_then_snapshot_keeps_order() {
        let mut cache = StatsCache::open_in_memory().unwrap();
        let a = StatsRecord::new(
            &identity("Alex Scott", "Scott"),
            ExternalStats {
                league: "Championship".into(),
                goals: 4,
                assists: 6,
                minutes: 3100,
            },
            "2025/2026",
            "Transfermarkt",
        );
        let b = StatsRecord::new(
            &identity("Jo Doe", "Doe"),
            ExternalStats::unknown(),
            "2025/2026",
            StatsRecord::NO_SOURCE,
        );
        assert_eq!(cache.append(&[a.clone(), b.clone()]).unwrap(), 2);
        let snap = cache.snapshot().unwrap();
        assert_eq!(snap.records(), &[a.clone(), b]);
        assert_eq!(cache.len().unwrap(), 2);
        assert_eq!(snap.lookup(&identity("", "Scott")), Some(&a));
        assert_eq!(snap.lookup(&identity("Alex Scott", "Other")), Some(&a));
        assert!(snap.lookup(&identity("Nobody", "Nobody")).is_none());
    }

    #[test]
    fn empty_append_is_noop() {
        let mut cache = StatsCache::open_in_memory().unwrap();
        assert_eq!(cache.append(&[]).unwrap(), 0);
        assert!(cache.snapshot().unwrap().is_empty());
    }
}
