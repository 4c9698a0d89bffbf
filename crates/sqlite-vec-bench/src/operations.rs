//! One timed pass over the client API for a single dataset size.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;
use sqlite_vec_client::{Metadata, RecordUpdate, Result, VecClient};

use crate::config::{BenchConfig, DbMode};

const TABLE: &str = "benchmark";

/// One measured operation.
#[derive(Debug, Clone, Serialize)]
pub struct BenchRow {
    pub db_mode: &'static str,
    pub size: usize,
    pub operation: String,
    /// Rows touched, or searches run for `similarity_search`.
    pub count: usize,
    pub elapsed_ms: f64,
    pub ops_per_sec: f64,
}

impl BenchRow {
    fn new(
        mode: DbMode,
        size: usize,
        operation: impl Into<String>,
        count: usize,
        elapsed: Duration,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        Self {
            db_mode: mode.as_str(),
            size,
            operation: operation.into(),
            count,
            elapsed_ms: secs * 1_000.0,
            ops_per_sec: if secs > 0.0 { count as f64 / secs } else { 0.0 },
        }
    }
}

pub fn run_suite(config: &BenchConfig, mode: DbMode, size: usize) -> Result<Vec<BenchRow>> {
    let dir = tempfile::tempdir()?;
    let client = match mode {
        DbMode::File => VecClient::open(TABLE, dir.path().join("benchmark.db"))?,
        DbMode::Memory => VecClient::in_memory(TABLE)?,
    };
    client.create_table(config.dimension, config.distance)?;

    let texts = generate_texts(size);
    let embeddings = generate_embeddings(size, config.dimension);
    let metadata = generate_metadata(size);
    let mut rows = Vec::new();

    let (elapsed, rowids) = timed(|| client.add(&texts, &embeddings, Some(metadata.as_slice())))?;
    rows.push(BenchRow::new(mode, size, "add", rowids.len(), elapsed));

    let (elapsed, fetched) = timed(|| client.get_many(&rowids))?;
    rows.push(BenchRow::new(mode, size, "get_many", fetched.len(), elapsed));

    let query = deterministic_vector(size as u64 + 7, config.dimension);
    for &top_k in &config.top_k {
        let mut total = Duration::ZERO;
        for _ in 0..config.iterations {
            let (elapsed, _) = timed(|| client.similarity_search(&query, top_k))?;
            total += elapsed;
        }
        rows.push(BenchRow::new(
            mode,
            size,
            format!("similarity_search(k={top_k})"),
            config.iterations,
            total,
        ));
    }

    let updates: Vec<RecordUpdate> = rowids
        .iter()
        .enumerate()
        .map(|(i, &rowid)| RecordUpdate::new(rowid).text(format!("updated_{i}")))
        .collect();
    let (elapsed, updated) = timed(|| client.update_many(&updates))?;
    rows.push(BenchRow::new(mode, size, "update_many", updated, elapsed));

    let (elapsed, scanned) = timed(|| {
        let mut n = 0usize;
        for record in client.get_all(config.batch_size)? {
            record?;
            n += 1;
        }
        Ok(n)
    })?;
    rows.push(BenchRow::new(mode, size, "get_all", scanned, elapsed));

    let (elapsed, deleted) = timed(|| client.delete_many(&rowids))?;
    rows.push(BenchRow::new(mode, size, "delete_many", deleted, elapsed));

    client.close();
    Ok(rows)
}

fn timed<T>(f: impl FnOnce() -> Result<T>) -> Result<(Duration, T)> {
    let started = Instant::now();
    let out = f()?;
    Ok((started.elapsed(), out))
}

fn generate_texts(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("document_{i}")).collect()
}

fn generate_embeddings(count: usize, dimension: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| deterministic_vector(i as u64, dimension))
        .collect()
}

fn generate_metadata(count: usize) -> Vec<Metadata> {
    (0..count)
        .map(|i| {
            let mut md = Metadata::new();
            md.insert("id".to_string(), json!(i));
            md.insert("category".to_string(), json!(format!("cat_{}", i % 10)));
            md
        })
        .collect()
}

/// Values in `[0.0001, 1.0]`, never all zero, so cosine distance stays
/// defined for every generated vector.
fn deterministic_vector(seed: u64, dimension: usize) -> Vec<f32> {
    (0..dimension)
        .map(|index| {
            let mixed = (seed as usize)
                .wrapping_mul(31)
                .wrapping_add(index.wrapping_mul(17))
                % 10_000;
            (mixed + 1) as f32 / 10_000.0
        })
        .collect()
}
