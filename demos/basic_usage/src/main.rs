use serde_json::json;
use sqlite_vec_client::{
    DistanceMetric, LogConfig, Metadata, MetadataFilter, RecordUpdate, VecClient, VecClientError,
};

const DIM: usize = 384;

/// A mostly-zero vector with a distinctive head.
fn embedding(head: [f32; 3]) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[..3].copy_from_slice(&head);
    v
}

fn main() -> Result<(), VecClientError> {
    LogConfig::from_env().init()?;

    // --- Setup: in-memory table with 384-dimensional cosine index ---
    let client = VecClient::in_memory("documents")?;
    client.create_table(DIM, DistanceMetric::Cosine)?;

    let texts = [
        "The quick brown fox jumps over the lazy dog",
        "Machine learning is a subset of artificial intelligence",
        "Python is a popular programming language",
    ];
    let embeddings = vec![
        embedding([0.1, 0.2, 0.3]),
        embedding([0.5, 0.4, 0.3]),
        embedding([0.2, 0.1, 0.05]),
    ];
    let metadata: Vec<Metadata> = [
        json!({"topic": "animals"}),
        json!({"topic": "ai"}),
        json!({"topic": "programming", "lang": "python"}),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect();

    // --- Add ---
    let rowids = client.add(&texts, &embeddings, Some(metadata.as_slice()))?;
    println!("Added {} records: {rowids:?}", rowids.len());

    // --- Similarity search ---
    println!("\n=== Top 2 similar documents ===");
    for hit in client.similarity_search(&embedding([0.1, 0.2, 0.3]), 2)? {
        let preview: String = hit.text.chars().take(50).collect();
        println!("  [{}] {preview}... (distance: {:.4})", hit.rowid, hit.distance);
    }

    // --- Get by rowid ---
    if let Some(record) = client.get(rowids[0])? {
        println!("\nRecord {}: {}", record.rowid, record.text);
    }

    // --- Metadata filter ---
    let filter = MetadataFilter::new().eq("topic", "ai");
    for record in client.filter_by_metadata(&filter, 10, 0)? {
        println!("\nTopic 'ai': [{}] {}", record.rowid, record.text);
    }

    // --- Update and delete ---
    client.update(&RecordUpdate::new(rowids[2]).text("Rust is a systems programming language"))?;
    client.delete(rowids[1])?;

    println!("\nTotal records: {}", client.count()?);
    for record in client.get_all(100)? {
        let record = record?;
        println!("  [{}] {}", record.rowid, record.text);
    }

    client.close();
    Ok(())
}
