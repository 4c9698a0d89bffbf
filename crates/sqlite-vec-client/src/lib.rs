//! Text, metadata and embedding storage on SQLite with a synchronized
//! [sqlite-vec](https://github.com/asg017/sqlite-vec) ANN index.
//!
//! [`VecClient`] manages a record table (`text`, JSON `metadata`, embedding
//! blob) and a `vec0` virtual table that triggers keep identical to it on
//! every insert, embedding update and delete. On top of that it offers CRUD,
//! nearest-neighbour search, metadata filtering, transactions, a per-thread
//! [`ConnectionPool`] and JSON Lines / CSV import and export.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use sqlite_vec_client::{DistanceMetric, MetadataFilter, VecClient};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = VecClient::in_memory("documents")?;
//! client.create_table(3, DistanceMetric::Cosine)?;
//!
//! let metadata = vec![
//!     json!({"lang": "en"}).as_object().cloned().unwrap_or_default(),
//!     json!({"lang": "fr"}).as_object().cloned().unwrap_or_default(),
//! ];
//! client.add(
//!     &["hello", "bonjour"],
//!     &[[1.0, 0.0, 0.0], [0.9, 0.1, 0.0]],
//!     Some(metadata.as_slice()),
//! )?;
//!
//! let english = MetadataFilter::new().eq("lang", "en");
//! let hits = client.similarity_search_with_filter(&[1.0, 0.0, 0.0], &english, 5)?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod codec;
mod connection;
mod error;
pub mod filter;
pub mod io;
mod logging;
mod pool;
mod scan;
pub mod schema;
mod types;
pub mod validation;

pub use client::{VecClient, DEFAULT_BATCH_SIZE};
pub use connection::{create_connection, IN_MEMORY};
pub use error::{Result, VecClientError};
pub use filter::{compile, CompiledFilter, FilterValue, MetadataFilter};
pub use io::{ExportOptions, ImportOptions};
pub use logging::{LogConfig, LOG_LEVEL_ENV};
pub use pool::{ConnectionPool, PooledConnection, DEFAULT_POOL_SIZE};
pub use scan::RecordIter;
pub use schema::DistanceMetric;
pub use types::{Metadata, Record, RecordUpdate, Rowid, SearchHit};
