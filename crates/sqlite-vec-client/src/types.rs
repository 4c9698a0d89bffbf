use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-record metadata. Key order is preserved through storage.
pub type Metadata = Map<String, Value>;

/// Row identifier assigned by the record table.
pub type Rowid = i64;

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub rowid: Rowid,
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// One neighbour returned by a similarity search, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub rowid: Rowid,
    pub text: String,
    pub distance: f64,
}

/// Fields to change on one record. `None` leaves the column untouched;
/// an update with every field `None` is skipped entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub rowid: Rowid,
    pub text: Option<String>,
    pub metadata: Option<Metadata>,
    pub embedding: Option<Vec<f32>>,
}

impl RecordUpdate {
    pub fn new(rowid: Rowid) -> Self {
        Self {
            rowid,
            ..Default::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.metadata.is_none() && self.embedding.is_none()
    }
}
