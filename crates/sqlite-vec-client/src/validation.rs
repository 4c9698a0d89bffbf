//! Input checks run before any statement reaches the engine.
//!
//! Table names cannot be bound as parameters, so [`validate_table_name`] is
//! the only thing standing between a caller-supplied identifier and the SQL
//! text. It is a strict whitelist.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, VecClientError};
use crate::filter::MetadataFilter;

static TABLE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Accept identifiers matching `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_table_name(table: &str) -> Result<()> {
    if table.is_empty() {
        return Err(VecClientError::TableName(
            "table name cannot be empty".to_string(),
        ));
    }
    if !TABLE_NAME_PATTERN.is_match(table) {
        return Err(VecClientError::TableName(format!(
            "'{table}': must start with a letter or underscore and contain only \
             alphanumeric characters and underscores"
        )));
    }
    Ok(())
}

pub fn validate_dimension(dim: usize) -> Result<()> {
    if dim == 0 {
        return Err(VecClientError::Validation(format!(
            "dimension must be a positive integer, got {dim}"
        )));
    }
    Ok(())
}

pub fn validate_top_k(top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(VecClientError::Validation(format!(
            "top_k must be a positive integer, got {top_k}"
        )));
    }
    Ok(())
}

pub fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(VecClientError::Validation(format!(
            "limit must be a positive integer, got {limit}"
        )));
    }
    Ok(())
}

/// SQLite binds `OFFSET` as a signed 64-bit integer.
pub fn validate_offset(offset: usize) -> Result<i64> {
    i64::try_from(offset).map_err(|_| {
        VecClientError::Validation(format!(
            "offset must be a non-negative integer no larger than {}, got {offset}",
            i64::MAX
        ))
    })
}

/// Texts, embeddings and (when given) metadata must line up one-to-one.
pub fn validate_lengths_match(
    texts: usize,
    embeddings: usize,
    metadata: Option<usize>,
) -> Result<()> {
    if texts != embeddings {
        return Err(VecClientError::Validation(format!(
            "number of texts ({texts}) must match number of embeddings ({embeddings})"
        )));
    }
    if let Some(metadata) = metadata {
        if texts != metadata {
            return Err(VecClientError::Validation(format!(
                "number of texts ({texts}) must match number of metadata ({metadata})"
            )));
        }
    }
    Ok(())
}

pub fn validate_embedding_dimension(embedding: &[f32], expected: usize) -> Result<()> {
    if embedding.len() != expected {
        return Err(VecClientError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

/// An empty filter would match every row; callers almost never mean that.
pub fn validate_metadata_filter(filter: &MetadataFilter) -> Result<()> {
    if filter.is_empty() {
        return Err(VecClientError::Validation(
            "metadata filter must contain at least one condition".to_string(),
        ));
    }
    if let Some(path) = filter.paths().find(|p| p.trim().is_empty()) {
        return Err(VecClientError::Validation(format!(
            "metadata filter path must not be blank, got '{path}'"
        )));
    }
    Ok(())
}
