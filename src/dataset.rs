//! Read-only dataset access with process-lifetime memoization.
//!
//! A `QueryCache` owns one pooled read-only connection per artifact path
//! and memoizes query results by `(query_id, params, artifact.tag)`. There
//! is no time-based eviction: artifacts are immutable per tag, so a cached
//! result only goes stale when the tag itself changes, which produces a
//! fresh cache key anyway.

use crate::error::DatasetError;
use crate::models::{LocalArtifact, OrderFact, SpendFact, SpendSource};
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, ToSql};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Generic tabular result: rows of named, typed columns.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    query_id: String,
    params: Vec<(String, String)>,
    tag: String,
}

impl QueryKey {
    fn new(query_id: &str, params: &[(&str, &str)], tag: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            tag: tag.to_string(),
        }
    }
}

pub struct QueryCache {
    results: RwLock<HashMap<QueryKey, Arc<Table>>>,
    orders: RwLock<HashMap<String, Arc<Vec<OrderFact>>>>,
    connections: Mutex<HashMap<PathBuf, Arc<Mutex<Connection>>>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Run `sql` against the artifact, memoized by
    /// `(query_id, params, artifact.tag)`.
    pub fn rows(
        &self,
        query_id: &str,
        sql: &str,
        params: &[(&str, &str)],
        artifact: &LocalArtifact,
    ) -> Result<Arc<Table>, DatasetError> {
        let key = QueryKey::new(query_id, params, &artifact.tag);
        if let Some(hit) = self.results.read().get(&key) {
            return Ok(hit.clone());
        }

        debug!("Query cache miss: {} (tag {})", query_id, artifact.tag);
        let conn = self.connection(&artifact.path)?;
        let table = {
            let conn = conn.lock();
            execute_table(&conn, sql, params)?
        };

        let table = Arc::new(table);
        self.results.write().insert(key, table.clone());
        Ok(table)
    }

    /// All order facts for the artifact, memoized by tag.
    pub fn orders(&self, artifact: &LocalArtifact) -> Result<Arc<Vec<OrderFact>>, DatasetError> {
        if let Some(hit) = self.orders.read().get(&artifact.tag) {
            return Ok(hit.clone());
        }

        let conn = self.connection(&artifact.path)?;
        let facts = {
            let conn = conn.lock();
            load_orders(&conn)?
        };

        let facts = Arc::new(facts);
        self.orders
            .write()
            .insert(artifact.tag.clone(), facts.clone());
        Ok(facts)
    }

    /// Marketing spend, or `Absent` when the artifact carries no spend
    /// table. Absence is a normal state, not an error.
    pub fn spend(&self, artifact: &LocalArtifact) -> Result<SpendSource, DatasetError> {
        let conn = self.connection(&artifact.path)?;
        let conn = conn.lock();
        if !has_table(&conn, "marketing_spend")? {
            debug!("Artifact {} has no marketing_spend table", artifact.tag);
            return Ok(SpendSource::Absent);
        }
        load_spend(&conn).map(SpendSource::Present)
    }

    fn connection(&self, path: &Path) -> Result<Arc<Mutex<Connection>>, DatasetError> {
        let mut pool = self.connections.lock();
        if let Some(conn) = pool.get(path) {
            return Ok(conn.clone());
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |cause| DatasetError::Open {
                path: path.to_path_buf(),
                cause,
            },
        )?;
        let conn = Arc::new(Mutex::new(conn));
        pool.insert(path.to_path_buf(), conn.clone());
        Ok(conn)
    }
}

fn execute_table(
    conn: &Connection,
    sql: &str,
    params: &[(&str, &str)],
) -> Result<Table, DatasetError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let ncols = columns.len();

    let bound: Vec<(&str, &dyn ToSql)> = params
        .iter()
        .map(|(k, v)| (*k, v as &dyn ToSql))
        .collect();
    let mut rows = stmt.query(&bound[..])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(ncols);
        for i in 0..ncols {
            record.push(value_to_json(row.get_ref(i)?));
        }
        out.push(record);
    }

    Ok(Table { columns, rows: out })
}

fn value_to_json(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(r) => serde_json::Number::from_f64(r)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

pub(crate) fn has_table(conn: &Connection, name: &str) -> Result<bool, DatasetError> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    Ok(stmt.exists([name])?)
}

fn load_orders(conn: &Connection) -> Result<Vec<OrderFact>, DatasetError> {
    let mut stmt = conn.prepare(
        "SELECT order_id, customer_id, order_date, revenue, is_return, review_score
         FROM orders
         ORDER BY order_date, order_id",
    )?;

    let mut rows = stmt.query([])?;
    let mut facts = Vec::new();
    while let Some(row) = rows.next()? {
        let date_text: String = row.get(2)?;
        let order_date = parse_date(&date_text)?;
        let review_score: Option<i64> = row.get(5)?;
        facts.push(OrderFact {
            order_id: row.get(0)?,
            customer_id: row.get(1)?,
            order_date,
            revenue: row.get(3)?,
            is_return: row.get::<_, i64>(4)? != 0,
            review_score: review_score.map(|s| s as u8),
        });
    }
    Ok(facts)
}

fn load_spend(conn: &Connection) -> Result<Vec<SpendFact>, DatasetError> {
    let mut stmt = conn.prepare("SELECT date, spend FROM marketing_spend ORDER BY date")?;
    let mut rows = stmt.query([])?;
    let mut facts = Vec::new();
    while let Some(row) = rows.next()? {
        let date_text: String = row.get(0)?;
        facts.push(SpendFact {
            date: parse_date(&date_text)?,
            spend: row.get(1)?,
        });
    }
    Ok(facts)
}

fn parse_date(text: &str) -> Result<NaiveDate, DatasetError> {
    // Dates land as ISO text; tolerate a trailing time component.
    let day = text.split(&[' ', 'T'][..]).next().unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| DatasetError::Malformed {
        detail: format!("bad order_date '{}': {}", text, e),
    })
}
