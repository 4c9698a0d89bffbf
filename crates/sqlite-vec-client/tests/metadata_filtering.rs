use serde_json::{json, Value};
use sqlite_vec_client::{DistanceMetric, Metadata, MetadataFilter, VecClient, VecClientError};

fn md(value: Value) -> Metadata {
    value.as_object().cloned().unwrap()
}

/// Ten records alternating between two categories, with a nested author,
/// a year, a float score and a boolean flag.
fn seeded() -> VecClient {
    let client = VecClient::in_memory("articles").unwrap();
    client.create_table(2, DistanceMetric::Cosine).unwrap();
    let texts: Vec<String> = (0..10).map(|i| format!("article {i}")).collect();
    let embeddings: Vec<Vec<f32>> = (0..10).map(|i| vec![1.0, i as f32 / 10.0]).collect();
    let metadata: Vec<Metadata> = (0..10)
        .map(|i| {
            md(json!({
                "category": if i % 2 == 0 { "science" } else { "sports" },
                "author": {"name": if i < 5 { "ada" } else { "alan" }},
                "year": 2020 + i,
                "score": i as f64 * 0.5,
                "published": i % 3 == 0,
                "editor": null,
            }))
        })
        .collect();
    client
        .add(&texts, &embeddings, Some(metadata.as_slice()))
        .unwrap();
    client
}

#[test]
fn test_filter_by_text_value() {
    let client = seeded();
    let filter = MetadataFilter::new().eq("category", "science");
    let records = client.filter_by_metadata(&filter, 100, 0).unwrap();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.metadata["category"] == "science"));
    assert!(records.windows(2).all(|w| w[0].rowid < w[1].rowid));
    assert_eq!(client.count_by_metadata(&filter).unwrap(), 5);
}

#[test]
fn test_filter_by_nested_path_and_multiple_conditions() {
    let client = seeded();
    let filter = MetadataFilter::new()
        .eq("author.name", "ada")
        .eq("category", "sports");
    let texts: Vec<_> = client
        .filter_by_metadata(&filter, 100, 0)
        .unwrap()
        .into_iter()
        .map(|r| r.text)
        .collect();
    assert_eq!(texts, vec!["article 1", "article 3"]);
}

#[test]
fn test_filter_numbers_match_int_and_float_forms() {
    let client = seeded();
    assert_eq!(
        client
            .count_by_metadata(&MetadataFilter::new().eq("year", 2024))
            .unwrap(),
        1
    );
    assert_eq!(
        client
            .count_by_metadata(&MetadataFilter::new().eq("year", 2024.0))
            .unwrap(),
        1
    );
    assert_eq!(
        client
            .count_by_metadata(&MetadataFilter::new().eq("score", 1.5))
            .unwrap(),
        1
    );
}

#[test]
fn test_filter_booleans_do_not_match_integers() {
    let client = seeded();
    let int_flag = vec![md(json!({"published": 1}))];
    client
        .add(&["flag as int"], &[vec![0.5, 0.5]], Some(int_flag.as_slice()))
        .unwrap();
    let published = client
        .filter_by_metadata(&MetadataFilter::new().eq("published", true), 100, 0)
        .unwrap();
    let texts: Vec<_> = published.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["article 0", "article 3", "article 6", "article 9"]);
    assert_eq!(
        client
            .count_by_metadata(&MetadataFilter::new().eq("published", false))
            .unwrap(),
        6
    );
}

#[test]
fn test_filter_null_matches_explicit_null() {
    let client = seeded();
    let filter = MetadataFilter::new().eq("editor", Option::<String>::None);
    assert_eq!(client.count_by_metadata(&filter).unwrap(), 10);
}

#[test]
fn test_filter_pages_partition_matches() {
    let client = seeded();
    let filter = MetadataFilter::new().eq("author.name", "alan");
    let total = client.count_by_metadata(&filter).unwrap();
    assert_eq!(total, 5);

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let page = client.filter_by_metadata(&filter, 2, offset).unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 2);
        offset += page.len();
        seen.extend(page.into_iter().map(|r| r.rowid));
    }
    let everything: Vec<_> = client
        .filter_by_metadata(&filter, 100, 0)
        .unwrap()
        .into_iter()
        .map(|r| r.rowid)
        .collect();
    assert_eq!(seen, everything);
}

#[test]
fn test_filter_from_json_object() {
    let client = seeded();
    let filter = MetadataFilter::from_json(&json!({"category": "sports", "year": 2023})).unwrap();
    let records = client.filter_by_metadata(&filter, 10, 0).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "article 3");
}

#[test]
fn test_filter_values_are_bound_not_spliced() {
    let client = seeded();
    let filter = MetadataFilter::new().eq("category", "science' OR '1'='1");
    assert_eq!(client.count_by_metadata(&filter).unwrap(), 0);
    assert_eq!(client.count().unwrap(), 10);
}

#[test]
fn test_filter_rejects_invalid_arguments() {
    let client = seeded();
    let filter = MetadataFilter::new().eq("category", "science");
    assert!(client
        .filter_by_metadata(&MetadataFilter::new(), 10, 0)
        .unwrap_err()
        .is_validation());
    assert!(client
        .filter_by_metadata(&filter, 0, 0)
        .unwrap_err()
        .is_validation());
    assert!(client
        .count_by_metadata(&MetadataFilter::new())
        .unwrap_err()
        .is_validation());
    assert!(matches!(
        MetadataFilter::from_json(&json!({"tags": ["a"]})).unwrap_err(),
        VecClientError::Validation(_)
    ));
}

#[test]
fn test_similarity_search_with_filter_only_returns_matches() {
    let client = seeded();
    let filter = MetadataFilter::new().eq("category", "science");
    for top_k in [1, 3, 5, 10] {
        let hits = client
            .similarity_search_with_filter(&[1.0, 0.9], &filter, top_k)
            .unwrap();
        assert!(hits.len() <= top_k);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        for hit in &hits {
            let record = client.get(hit.rowid).unwrap().unwrap();
            assert_eq!(record.metadata["category"], "science");
        }
    }
}

#[test]
fn test_similarity_search_with_filter_does_not_backfill() {
    let client = seeded();
    let unfiltered = client.similarity_search(&[1.0, 0.9], 2).unwrap();
    let matching: Vec<_> = unfiltered
        .iter()
        .filter(|h| client.get(h.rowid).unwrap().unwrap().metadata["author"]["name"] == "ada")
        .map(|h| h.rowid)
        .collect();

    let ada = MetadataFilter::new().eq("author.name", "ada");
    let filtered = client
        .similarity_search_with_filter(&[1.0, 0.9], &ada, 2)
        .unwrap();
    let filtered: Vec<_> = filtered.iter().map(|h| h.rowid).collect();
    assert_eq!(filtered, matching);
}
