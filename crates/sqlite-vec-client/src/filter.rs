//! Metadata filters and their compilation into SQL predicates.
//!
//! A [`MetadataFilter`] is an ordered list of `path = value` conditions over
//! the JSON `metadata` column. Paths are dotted (`"author.name"`) and become
//! JSON paths (`"$.author.name"`). Every path and value is bound as a
//! parameter, so filter contents never reach the SQL text.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::error::{Result, VecClientError};

/// Column the compiled predicate reads from.
pub(crate) const METADATA_COLUMN: &str = "metadata";

/// A scalar a metadata path can be compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for FilterValue {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<&Value> for FilterValue {
    type Error = VecClientError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n.as_f64().map(Self::Float).ok_or_else(|| {
                    VecClientError::Validation(format!("unsupported filter number: {n}"))
                }),
            },
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(VecClientError::Validation(format!(
                "filter values must be scalars or null, got {value}"
            ))),
        }
    }
}

/// Ordered conjunction of `path = value` conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, FilterValue)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the condition for `path`, keeping first-insertion order.
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<FilterValue>) {
        let path = path.into();
        let value = value.into();
        match self.conditions.iter_mut().find(|(p, _)| *p == path) {
            Some(slot) => slot.1 = value,
            None => self.conditions.push((path, value)),
        }
    }

    /// Build a filter from a JSON object such as `{"category": "news", "year": 2024}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(VecClientError::Validation(format!(
                "metadata filter must be a JSON object, got {value}"
            )));
        };
        let mut filter = Self::new();
        for (path, v) in map {
            filter.insert(path.clone(), FilterValue::try_from(v)?);
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.conditions.iter().map(|(p, v)| (p.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for MetadataFilter
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filter = Self::new();
        for (k, v) in iter {
            filter.insert(k, v);
        }
        filter
    }
}

/// A predicate ready to be spliced into a `WHERE` clause, with its
/// positional parameters in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub predicate: String,
    pub params: Vec<SqlValue>,
}

/// Compile a filter into `json_extract` comparisons joined by `AND`.
///
/// - null: `IS NULL` on the extracted path.
/// - bool: matched on `json_type`, since `json_extract` yields JSON booleans as
///   0/1 and would otherwise confuse them with integers.
/// - number: extracted value cast to `REAL` and compared to a float.
/// - text: plain equality.
///
/// An empty filter compiles to the always-true predicate `1`; callers reject
/// empty filters before getting here.
pub fn compile(filter: &MetadataFilter) -> CompiledFilter {
    if filter.is_empty() {
        return CompiledFilter {
            predicate: "1".to_string(),
            params: Vec::new(),
        };
    }

    let mut conditions = Vec::with_capacity(filter.len());
    let mut params = Vec::with_capacity(filter.len() * 2);
    for (path, value) in filter.iter() {
        params.push(SqlValue::Text(format!("$.{path}")));
        match value {
            FilterValue::Null => {
                conditions.push(format!("json_extract({METADATA_COLUMN}, ?) IS NULL"));
            }
            FilterValue::Bool(b) => {
                conditions.push(format!("json_type({METADATA_COLUMN}, ?) = ?"));
                params.push(SqlValue::Text(b.to_string()));
            }
            FilterValue::Int(i) => {
                conditions.push(format!(
                    "CAST(json_extract({METADATA_COLUMN}, ?) AS REAL) = ?"
                ));
                params.push(SqlValue::Real(*i as f64));
            }
            FilterValue::Float(f) => {
                conditions.push(format!(
                    "CAST(json_extract({METADATA_COLUMN}, ?) AS REAL) = ?"
                ));
                params.push(SqlValue::Real(*f));
            }
            FilterValue::Text(s) => {
                conditions.push(format!("json_extract({METADATA_COLUMN}, ?) = ?"));
                params.push(SqlValue::Text(s.clone()));
            }
        }
    }

    CompiledFilter {
        predicate: conditions.join(" AND "),
        params,
    }
}
