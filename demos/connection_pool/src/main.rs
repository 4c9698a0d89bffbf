use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sqlite_vec_client::{ConnectionPool, DistanceMetric, LogConfig, VecClient, VecClientError};

const DIM: usize = 384;
const POOL_SIZE: usize = 5;

/// Each worker provisions its own table, writes ten rows and runs a search.
fn worker_task(worker_id: usize, pool: Arc<ConnectionPool>) -> Result<Duration, VecClientError> {
    let started = Instant::now();

    let client = VecClient::with_pool(format!("docs_{worker_id}"), pool)?;
    client.create_table(DIM, DistanceMetric::Cosine)?;

    let texts: Vec<String> = (0..10)
        .map(|i| format!("Document {i} from worker {worker_id}"))
        .collect();
    let embeddings: Vec<Vec<f32>> = (1..=10).map(|i| vec![0.1 * i as f32; DIM]).collect();
    client.add(&texts, &embeddings, None)?;

    let _ = client.similarity_search(&[0.5f32; DIM], 5)?;
    client.close();

    Ok(started.elapsed())
}

fn main() -> Result<(), VecClientError> {
    LogConfig::from_env().init()?;

    println!("Connection Pooling Example");
    println!("{}", "=".repeat(50));

    let dir = tempfile::tempdir()?;
    let pool = Arc::new(ConnectionPool::open(dir.path().join("pooled.db"), POOL_SIZE)?);
    println!("Created connection pool with size={POOL_SIZE}\n");

    // One thread per pool slot; a sixth thread would get PoolExhausted.
    println!("Running {POOL_SIZE} concurrent workers...");
    let handles: Vec<_> = (0..POOL_SIZE)
        .map(|id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || (id, worker_task(id, pool)))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let Ok((id, outcome)) = handle.join() else {
            return Err(VecClientError::Connection("worker thread panicked".to_string()));
        };
        results.push((id, outcome?));
    }
    results.sort_by_key(|(id, _)| *id);

    println!("\nWorker execution times:");
    for (id, elapsed) in &results {
        println!("  Worker {id}: {:.3}s", elapsed.as_secs_f64());
    }
    let avg = results.iter().map(|(_, d)| d.as_secs_f64()).sum::<f64>() / results.len() as f64;
    println!("\nAverage execution time: {avg:.3}s");

    let extra = Arc::clone(&pool);
    match thread::spawn(move || extra.get_connection().map(|_| ())).join() {
        Ok(Err(VecClientError::PoolExhausted { max })) => {
            println!("\nExtra thread refused: pool exhausted (max {max})")
        }
        Ok(other) => println!("\nExtra thread: {other:?}"),
        Err(_) => println!("\nExtra thread panicked"),
    }

    pool.close_all();
    println!("\nPool closed successfully");
    Ok(())
}
