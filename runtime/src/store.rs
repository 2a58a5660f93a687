//! SQLite persistence for check results, settings and tracked domains.
//!
//! Results are append-only: every check adds a row, nothing is
//! deduplicated. Metric columns are TEXT because the paid path stores
//! formatted values such as `1.2K`; numeric filters cast them.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rankscope::{CheckStatus, Confidence, DomainResult, MetricValue, ResultSource, SpeedClass};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use crate::config::Settings;

/// Rows per page when the caller gives no limit.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Priority split used by the results filter.
pub const HIGH_PRIORITY_RATING: i64 = 50;
pub const HIGH_PRIORITY_BACKLINKS: i64 = 1000;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS domain_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL,
    domain_rating INTEGER,
    domain_trust INTEGER,
    page_trust INTEGER,
    backlinks TEXT,
    referring_domains TEXT,
    organic_traffic TEXT,
    page_speed TEXT,
    confidence TEXT,
    status TEXT NOT NULL,
    error TEXT,
    source TEXT NOT NULL DEFAULT 'basic',
    checked_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_domain_results_checked_at ON domain_results(checked_at);
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS tracked_domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL UNIQUE,
    added_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

const INSERT_RESULT: &str = "INSERT INTO domain_results (
    domain, domain_rating, domain_trust, page_trust, backlinks, referring_domains,
    organic_traffic, page_speed, confidence, status, error, source, checked_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

const SELECT_RESULT: &str = "SELECT domain, domain_rating, domain_trust, page_trust, backlinks,
    referring_domains, organic_traffic, page_speed, confidence, status, error, source,
    checked_at FROM domain_results";

/// Priority bucket for result filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Rating ≥ 50 or backlinks ≥ 1000.
    High,
    /// Rating < 50 and backlinks < 1000.
    Low,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// Filters and paging for [`Store::query_results`].
///
/// Query strings are parsed leniently: an empty or unparseable value reads
/// as unset, so `?minRating=&page=abc` lists the first unfiltered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultQuery {
    #[serde(deserialize_with = "lenient_number")]
    pub page: Option<u32>,
    #[serde(deserialize_with = "lenient_number")]
    pub limit: Option<u32>,
    #[serde(deserialize_with = "lenient_number")]
    pub min_rating: Option<i64>,
    #[serde(deserialize_with = "lenient_number")]
    pub min_backlinks: Option<i64>,
    #[serde(deserialize_with = "lenient_number")]
    pub min_ref_domains: Option<i64>,
    #[serde(deserialize_with = "lenient_status")]
    pub status: Option<CheckStatus>,
    #[serde(deserialize_with = "lenient_priority")]
    pub priority: Option<Priority>,
}

/// The trimmed text of a query value. Numbers are accepted for JSON callers.
fn query_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(query_text(d)?.and_then(|s| s.parse().ok()))
}

fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<CheckStatus>, D::Error> {
    Ok(query_text(d)?.and_then(|s| CheckStatus::parse(&s.to_ascii_lowercase())))
}

fn lenient_priority<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Priority>, D::Error> {
    Ok(query_text(d)?.and_then(|s| Priority::parse(&s)))
}

impl ResultQuery {
    fn page(&self) -> u32 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    fn limit(&self) -> u32 {
        self.limit.filter(|l| *l >= 1).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// WHERE clause and its bound parameters.
    fn where_clause(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::from(" WHERE 1=1");
        let mut args = Vec::new();

        if let Some(min) = self.min_rating {
            sql.push_str(" AND domain_rating >= ?");
            args.push(SqlValue::Integer(min));
        }
        if let Some(min) = self.min_backlinks {
            sql.push_str(" AND CAST(backlinks AS INTEGER) >= ?");
            args.push(SqlValue::Integer(min));
        }
        if let Some(min) = self.min_ref_domains {
            sql.push_str(" AND CAST(referring_domains AS INTEGER) >= ?");
            args.push(SqlValue::Integer(min));
        }
        if let Some(status) = self.status {
            sql.push_str(" AND status = ?");
            args.push(SqlValue::Text(status.as_str().to_string()));
        }
        match self.priority {
            Some(Priority::High) => sql.push_str(&format!(
                " AND (domain_rating >= {HIGH_PRIORITY_RATING} \
                 OR CAST(backlinks AS INTEGER) >= {HIGH_PRIORITY_BACKLINKS})"
            )),
            Some(Priority::Low) => sql.push_str(&format!(
                " AND (domain_rating < {HIGH_PRIORITY_RATING} \
                 AND CAST(backlinks AS INTEGER) < {HIGH_PRIORITY_BACKLINKS})"
            )),
            None => {}
        }

        (sql, args)
    }
}

/// Result history and settings store backed by SQLite.
pub struct Store {
    db: Mutex<Connection>,
}

impl Store {
    /// Open or create a store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Connection::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))?;
        Self::init(db)
    }

    /// In-memory store, for tests and one-off runs.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("failed to open in-memory database")?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(SCHEMA)
            .context("failed to create tables")?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| anyhow!("database lock poisoned"))
    }

    // ── Results ─────────────────────────────────────────────────

    /// Append one result.
    pub fn save_result(&self, result: &DomainResult) -> Result<()> {
        let db = self.conn()?;
        insert_result(&db, result)
    }

    /// Append results in a single transaction.
    pub fn save_results(&self, results: &[DomainResult]) -> Result<()> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        for result in results {
            insert_result(&tx, result)?;
        }
        tx.commit().context("failed to commit results")?;
        Ok(())
    }

    /// One page of results, newest first.
    pub fn query_results(&self, query: &ResultQuery) -> Result<Vec<DomainResult>> {
        let (where_sql, mut args) = query.where_clause();
        let limit = query.limit();
        let offset = (query.page() - 1) as i64 * limit as i64;
        args.push(SqlValue::Integer(limit as i64));
        args.push(SqlValue::Integer(offset));

        let sql = format!("{SELECT_RESULT}{where_sql} ORDER BY checked_at DESC, id DESC LIMIT ? OFFSET ?");
        let db = self.conn()?;
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), row_to_result)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every stored result, newest first.
    pub fn all_results(&self) -> Result<Vec<DomainResult>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(&format!("{SELECT_RESULT} ORDER BY checked_at DESC, id DESC"))?;
        let rows = stmt
            .query_map([], row_to_result)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete every result. Returns the number of rows removed.
    pub fn clear_results(&self) -> Result<usize> {
        let db = self.conn()?;
        Ok(db.execute("DELETE FROM domain_results", [])?)
    }

    // ── Settings ────────────────────────────────────────────────

    /// Raw stored settings. Values that are not valid JSON come back as strings.
    pub fn settings_map(&self) -> Result<Map<String, Value>> {
        let db = self.conn()?;
        let mut stmt = db.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = Map::new();
        for row in rows {
            let (key, raw) = row?;
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            map.insert(key, value);
        }
        Ok(map)
    }

    pub fn settings(&self) -> Result<Settings> {
        Settings::from_map(self.settings_map()?)
    }

    /// Insert or replace each given key. Keys not present are left alone.
    pub fn update_settings(&self, updates: &Map<String, Value>) -> Result<()> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        for (key, value) in updates {
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value, updated_at)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP)",
                params![key, value.to_string()],
            )?;
        }
        tx.commit().context("failed to save settings")?;
        Ok(())
    }

    // ── Tracked domains ─────────────────────────────────────────

    pub fn tracked_domains(&self) -> Result<Vec<String>> {
        let db = self.conn()?;
        let mut stmt = db.prepare("SELECT domain FROM tracked_domains ORDER BY id")?;
        let domains = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(domains)
    }

    /// Track a domain. Returns false when it was already tracked.
    pub fn add_tracked_domain(&self, domain: &str) -> Result<bool> {
        let db = self.conn()?;
        let rows = db.execute(
            "INSERT OR IGNORE INTO tracked_domains (domain) VALUES (?1)",
            params![domain],
        )?;
        Ok(rows > 0)
    }

    /// Stop tracking a domain. Returns false when it was not tracked.
    pub fn remove_tracked_domain(&self, domain: &str) -> Result<bool> {
        let db = self.conn()?;
        let rows = db.execute(
            "DELETE FROM tracked_domains WHERE domain = ?1",
            params![domain],
        )?;
        Ok(rows > 0)
    }
}

fn insert_result(db: &Connection, r: &DomainResult) -> Result<()> {
    db.execute(
        INSERT_RESULT,
        params![
            r.domain,
            r.domain_rating,
            r.domain_trust,
            r.page_trust,
            r.backlinks.as_ref().map(MetricValue::to_string),
            r.referring_domains.as_ref().map(MetricValue::to_string),
            r.organic_traffic.as_ref().map(MetricValue::to_string),
            r.page_speed.map(|s| s.as_str()),
            r.confidence.map(|c| c.as_str()),
            r.status.as_str(),
            r.error,
            r.source.as_str(),
            r.checked_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("failed to save result for {}", r.domain))?;
    Ok(())
}

fn row_to_result(row: &Row<'_>) -> rusqlite::Result<DomainResult> {
    let metric = |idx: usize| -> rusqlite::Result<Option<MetricValue>> {
        Ok(row
            .get::<_, Option<String>>(idx)?
            .map(|s| MetricValue::from_stored(&s)))
    };
    let status: String = row.get(9)?;
    let source: Option<String> = row.get(11)?;
    let checked_at: String = row.get(12)?;

    Ok(DomainResult {
        domain: row.get(0)?,
        domain_rating: row.get(1)?,
        domain_trust: row.get(2)?,
        page_trust: row.get(3)?,
        backlinks: metric(4)?,
        referring_domains: metric(5)?,
        organic_traffic: metric(6)?,
        page_speed: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| SpeedClass::parse(&s)),
        confidence: row
            .get::<_, Option<String>>(8)?
            .and_then(|s| Confidence::parse(&s)),
        status: CheckStatus::parse(&status).unwrap_or(CheckStatus::Error),
        error: row.get(10)?,
        source: ResultSource::from(source.unwrap_or_default()),
        checked_at: DateTime::parse_from_rfc3339(&checked_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rankscope::{assemble_at, assemble_failure, CheckError, HeuristicScore, MetricsSource};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    fn heuristic(domain: &str, rating: u8, backlinks: u64, minute: u32) -> DomainResult {
        assemble_at(
            domain,
            MetricsSource::Heuristic(HeuristicScore {
                domain_rating: rating,
                backlinks,
                referring_domains: backlinks / 10,
                organic_traffic: "Est: 1K-1K/month".to_string(),
                page_speed: SpeedClass::Fast,
                confidence: Confidence::Estimated,
            }),
            at(minute),
        )
    }

    #[test]
    fn test_result_roundtrip() {
        let store = Store::in_memory().unwrap();
        let saved = heuristic("example.com", 72, 1234, 0);
        store.save_result(&saved).unwrap();

        let loaded = store.all_results().unwrap();
        assert_eq!(loaded, vec![saved]);
    }

    #[test]
    fn test_error_result_roundtrip() {
        let store = Store::in_memory().unwrap();
        let err = CheckError::DomainUnreachable {
            domain: "down.example".to_string(),
            reason: "timeout".to_string(),
        };
        store.save_result(&assemble_failure("down.example", &err)).unwrap();

        let loaded = store.all_results().unwrap();
        assert_eq!(loaded[0].status, CheckStatus::Error);
        assert_eq!(loaded[0].error.as_deref(), Some("Cannot access domain: timeout"));
        assert_eq!(loaded[0].domain_rating, None);
    }

    #[test]
    fn test_append_only() {
        let store = Store::in_memory().unwrap();
        store
            .save_results(&[heuristic("a.com", 10, 5, 0), heuristic("a.com", 20, 5, 1)])
            .unwrap();
        assert_eq!(store.all_results().unwrap().len(), 2);
        assert_eq!(store.clear_results().unwrap(), 2);
        assert!(store.all_results().unwrap().is_empty());
    }

    #[test]
    fn test_query_newest_first_with_paging() {
        let store = Store::in_memory().unwrap();
        let results: Vec<_> = (0..5)
            .map(|i| heuristic(&format!("d{i}.com"), 30, 100, i))
            .collect();
        store.save_results(&results).unwrap();

        let page1 = store
            .query_results(&ResultQuery {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        let names: Vec<_> = page1.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(names, ["d4.com", "d3.com"]);

        let page3 = store
            .query_results(&ResultQuery {
                page: Some(3),
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].domain, "d0.com");
    }

    #[test]
    fn test_numeric_filters_and_priority() {
        let store = Store::in_memory().unwrap();
        store
            .save_results(&[
                heuristic("big.com", 70, 200, 0),
                heuristic("linked.com", 20, 5000, 1),
                heuristic("small.com", 15, 900, 2),
            ])
            .unwrap();

        let domains = |q: ResultQuery| -> Vec<String> {
            let mut v: Vec<_> = store
                .query_results(&q)
                .unwrap()
                .into_iter()
                .map(|r| r.domain)
                .collect();
            v.sort();
            v
        };

        // 900 < 1000 must compare numerically, not as text
        assert_eq!(
            domains(ResultQuery {
                min_backlinks: Some(1000),
                ..Default::default()
            }),
            ["linked.com"]
        );
        assert_eq!(
            domains(ResultQuery {
                min_rating: Some(50),
                ..Default::default()
            }),
            ["big.com"]
        );
        assert_eq!(
            domains(ResultQuery {
                priority: Some(Priority::High),
                ..Default::default()
            }),
            ["big.com", "linked.com"]
        );
        assert_eq!(
            domains(ResultQuery {
                priority: Some(Priority::Low),
                ..Default::default()
            }),
            ["small.com"]
        );
        assert_eq!(
            domains(ResultQuery {
                status: Some(CheckStatus::Error),
                ..Default::default()
            }),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_query_ignores_blank_and_bad_values() {
        let query: ResultQuery = serde_json::from_value(serde_json::json!({
            "page": "abc",
            "limit": " 10 ",
            "minRating": "",
            "minBacklinks": 500,
            "status": "Error",
            "priority": "urgent"
        }))
        .unwrap();
        assert_eq!(
            query,
            ResultQuery {
                limit: Some(10),
                min_backlinks: Some(500),
                status: Some(CheckStatus::Error),
                ..Default::default()
            }
        );
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn test_settings_merge() {
        let store = Store::in_memory().unwrap();
        let mut first = Map::new();
        first.insert("email".into(), Value::from("a@x.com"));
        first.insert("automation".into(), Value::from(true));
        store.update_settings(&first).unwrap();

        let mut second = Map::new();
        second.insert("email".into(), Value::from("b@y.com"));
        store.update_settings(&second).unwrap();

        let settings = store.settings().unwrap();
        assert_eq!(settings.email.as_deref(), Some("b@y.com"));
        assert!(settings.automation);
    }

    #[test]
    fn test_tracked_domains() {
        let store = Store::in_memory().unwrap();
        assert!(store.add_tracked_domain("a.com").unwrap());
        assert!(!store.add_tracked_domain("a.com").unwrap());
        assert!(store.add_tracked_domain("b.com").unwrap());
        assert_eq!(store.tracked_domains().unwrap(), ["a.com", "b.com"]);
        assert!(store.remove_tracked_domain("a.com").unwrap());
        assert!(!store.remove_tracked_domain("a.com").unwrap());
        assert_eq!(store.tracked_domains().unwrap(), ["b.com"]);
    }

    #[test]
    fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domains.db");
        {
            let store = Store::open(&path).unwrap();
            store.add_tracked_domain("kept.com").unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.tracked_domains().unwrap(), ["kept.com"]);
    }
}
