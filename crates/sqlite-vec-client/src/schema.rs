//! Record table, `vec0` index table and the triggers that keep them in step.
//!
//! The triggers are the only writers of `{table}_vec`. Nothing in this crate
//! inserts into, updates or deletes from the index table directly, so every
//! mutation of the record table (single, bulk, or issued by someone else's
//! SQL) is mirrored in the same statement's atomic unit.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VecClientError};

static FLOAT_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"float\[(\d+)\]").expect("valid regex"));

/// Distance function the index ranks neighbours by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    L1,
    L2,
    #[default]
    #[serde(rename = "cosine")]
    Cosine,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = VecClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l1" => Ok(Self::L1),
            "l2" => Ok(Self::L2),
            "cosine" => Ok(Self::Cosine),
            other => Err(VecClientError::Validation(format!(
                "unknown distance metric '{other}', expected L1, L2 or cosine"
            ))),
        }
    }
}

/// Name of the `vec0` table mirroring `table`.
pub fn index_table(table: &str) -> String {
    format!("{table}_vec")
}

/// DDL that provisions `table`. Every statement is `IF NOT EXISTS`, so
/// running it against an already provisioned database changes nothing.
///
/// `table` must already have passed
/// [`validate_table_name`](crate::validation::validate_table_name).
pub(crate) fn provision_sql(table: &str, dim: usize, distance: DistanceMetric) -> String {
    let vec_table = index_table(table);
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT,
            metadata BLOB,
            text_embedding BLOB
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS {vec_table} USING vec0(
            rowid INTEGER PRIMARY KEY,
            text_embedding float[{dim}] distance_metric={distance}
        );
        CREATE TRIGGER IF NOT EXISTS {table}_embed_text
        AFTER INSERT ON {table}
        BEGIN
            INSERT INTO {vec_table}(rowid, text_embedding)
            VALUES (new.rowid, new.text_embedding);
        END;
        CREATE TRIGGER IF NOT EXISTS {table}_update_text_embedding
        AFTER UPDATE OF text_embedding ON {table}
        BEGIN
            UPDATE {vec_table}
            SET text_embedding = new.text_embedding
            WHERE rowid = new.rowid;
        END;
        CREATE TRIGGER IF NOT EXISTS {table}_delete_row
        AFTER DELETE ON {table}
        BEGIN
            DELETE FROM {vec_table} WHERE rowid = old.rowid;
        END;
        "#
    )
}

/// Names of the three synchronisation triggers for `table`.
pub fn trigger_names(table: &str) -> [String; 3] {
    [
        format!("{table}_embed_text"),
        format!("{table}_update_text_embedding"),
        format!("{table}_delete_row"),
    ]
}

/// Create the record table, the index table and the triggers.
pub(crate) fn provision(
    conn: &Connection,
    table: &str,
    dim: usize,
    distance: DistanceMetric,
) -> Result<()> {
    conn.execute_batch(&provision_sql(table, dim, distance))?;
    Ok(())
}

/// Read the dimension an existing index table was declared with.
///
/// Returns `None` when the index table does not exist.
pub(crate) fn discover_dimension(conn: &Connection, table: &str) -> Result<Option<usize>> {
    let sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![index_table(table)],
            |row| row.get(0),
        )
        .optional()?;
    let Some(sql) = sql else {
        return Ok(None);
    };
    parse_dimension(&sql).map(Some).ok_or_else(|| {
        VecClientError::Validation(format!(
            "cannot read embedding dimension from index table declaration: {sql}"
        ))
    })
}

fn parse_dimension(create_sql: &str) -> Option<usize> {
    FLOAT_COLUMN
        .captures(create_sql)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_metric_renders_engine_names() {
        assert_eq!(DistanceMetric::L1.to_string(), "L1");
        assert_eq!(DistanceMetric::L2.to_string(), "L2");
        assert_eq!(DistanceMetric::default().to_string(), "cosine");
    }

    #[test]
    fn distance_metric_parses_case_insensitively() {
        assert_eq!("COSINE".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert!("dot".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn provision_sql_declares_tables_and_triggers() {
        let sql = provision_sql("docs", 384, DistanceMetric::L2);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS docs ("));
        assert!(sql.contains("CREATE VIRTUAL TABLE IF NOT EXISTS docs_vec USING vec0("));
        assert!(sql.contains("float[384] distance_metric=L2"));
        for name in trigger_names("docs") {
            assert!(sql.contains(&format!("CREATE TRIGGER IF NOT EXISTS {name}")));
        }
    }

    #[test]
    fn parse_dimension_reads_float_column() {
        let sql = provision_sql("docs", 1536, DistanceMetric::Cosine);
        let vec_decl = sql
            .split(';')
            .find(|s| s.contains("vec0"))
            .unwrap_or_default();
        assert_eq!(parse_dimension(vec_decl), Some(1536));
        assert_eq!(parse_dimension("CREATE TABLE t (x)"), None);
    }
}
