//! Per-model property store backed by SQLite
//!
//! One table `properties`, one row per design element: `object_id`, `name`,
//! `external_id`, then one column per schema entry in schema order. The store
//! is built once per model and never updated in place; population happens in
//! a temp file that is renamed over the target only on success, so a failed
//! build leaves no partial store behind the cache's existence check.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OpenFlags};

use crate::remote::ElementRecord;
use crate::schema::{PropValue, PROPERTY_SCHEMA, SCHEMA_VERSION};

/// Whether an unrecognized unit aborts the build (reference behavior) or
/// stores NULL for the offending cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Strict,
    NullOnParseFailure,
}

pub struct PropertyStore {
    conn: Connection,
}

impl PropertyStore {
    /// Open an existing store read-only. Queries are the only thing a built
    /// store is for.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open property store {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Open `path` only if it exists and was built by the current schema.
    /// A version mismatch returns `None` so the caller rebuilds.
    pub fn open_if_current(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let store = Self::open(path)?;
        if store.schema_version()? == i64::from(SCHEMA_VERSION) {
            Ok(Some(store))
        } else {
            Ok(None)
        }
    }

    /// Build the store at `path` from the raw property collection. A no-op
    /// returning the existing handle when a current-schema store is already
    /// on disk; a stale-schema store is rebuilt from `elements`.
    pub fn build(path: &Path, elements: &[ElementRecord], mode: BuildMode) -> Result<Self> {
        if let Some(existing) = Self::open_if_current(path)? {
            tracing::debug!(path = %path.display(), "property store already built");
            return Ok(existing);
        }
        if path.exists() {
            tracing::info!(path = %path.display(), "schema changed, rebuilding property store");
            fs::remove_file(path)?;
        }

        let tmp = path.with_extension("db.tmp");
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }

        if let Err(error) = populate(&tmp, elements, mode) {
            let _ = fs::remove_file(&tmp);
            return Err(error);
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to move store into place at {}", path.display()))?;

        tracing::info!(path = %path.display(), rows = elements.len(), "property store built");
        Self::open(path)
    }

    pub fn schema_version(&self) -> Result<i64> {
        let version = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    pub fn row_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Run an arbitrary read-only query, stringifying every cell
    pub fn run_query(&self, sql: &str) -> Result<QueryOutput> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(render_value(row.get_ref(i)?));
            }
            out.push(values);
        }

        Ok(QueryOutput { columns, rows: out })
    }

    /// Table DDL, for engine-side schema introspection
    pub fn describe(&self) -> Result<String> {
        let mut stmt = self.conn.prepare(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND sql IS NOT NULL ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let tables: Vec<String> = rows.collect::<std::result::Result<_, _>>()?;
        Ok(tables.join("\n"))
    }
}

fn populate(path: &Path, elements: &[ElementRecord], mode: BuildMode) -> Result<()> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to create store at {}", path.display()))?;

    let mut columns = vec![
        "object_id INTEGER".to_string(),
        "name TEXT".to_string(),
        "external_id TEXT".to_string(),
    ];
    columns.extend(
        PROPERTY_SCHEMA
            .iter()
            .map(|e| format!("{} {}", e.column, e.kind.sql_type())),
    );
    conn.execute(
        &format!("CREATE TABLE properties ({})", columns.join(", ")),
        [],
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    let tx = conn.transaction()?;
    {
        let placeholders = vec!["?"; 3 + PROPERTY_SCHEMA.len()].join(", ");
        let mut stmt = tx.prepare(&format!("INSERT INTO properties VALUES ({placeholders})"))?;

        // insertion order follows the raw collection, not sorted
        for record in elements {
            let mut values: Vec<SqlValue> = Vec::with_capacity(3 + PROPERTY_SCHEMA.len());
            values.push(SqlValue::Integer(record.object_id));
            values.push(SqlValue::Text(record.name.clone()));
            values.push(SqlValue::Text(record.external_id.clone()));

            for entry in PROPERTY_SCHEMA {
                let cell = match record.properties.get(entry.category, entry.property) {
                    None => SqlValue::Null,
                    Some(raw) => match entry.normalizer.apply(raw) {
                        Ok(PropValue::Real(v)) => SqlValue::Real(v),
                        Ok(PropValue::Text(v)) => SqlValue::Text(v),
                        Err(error) => {
                            if mode == BuildMode::Strict {
                                return Err(error).with_context(|| {
                                    format!(
                                        "element {} ({}): bad value for column '{}'",
                                        record.object_id, record.name, entry.column
                                    )
                                });
                            }
                            tracing::warn!(
                                object_id = record.object_id,
                                column = entry.column,
                                %error,
                                "unparseable value, storing NULL"
                            );
                            SqlValue::Null
                        }
                    },
                };
                values.push(cell);
            }

            stmt.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;

    Ok(())
}

fn render_value(value: rusqlite::types::ValueRef<'_>) -> String {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(_) => "<blob>".to_string(),
    }
}

/// Stringified result set of one query
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        if self.rows.is_empty() {
            return write!(f, "(no rows)");
        }
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", row.join(" | "))?;
        }
        Ok(())
    }
}
