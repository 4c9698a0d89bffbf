use std::fs;

use serde_json::{json, Value};
use sqlite_vec_client::{
    DistanceMetric, ExportOptions, ImportOptions, Metadata, MetadataFilter, Record, VecClient,
    VecClientError,
};

fn md(value: Value) -> Metadata {
    value.as_object().cloned().unwrap()
}

fn source() -> VecClient {
    let client = VecClient::in_memory("notes").unwrap();
    client.create_table(3, DistanceMetric::Cosine).unwrap();
    let metadata = vec![
        md(json!({"lang": "en", "tags": ["a", "b"]})),
        md(json!({"lang": "fr"})),
        md(json!({"lang": "en", "note": "has, comma and \"quotes\""})),
    ];
    client
        .add(
            &["hello", "bonjour", "line one\nline two"],
            &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.25, 0.5, 0.75]],
            Some(metadata.as_slice()),
        )
        .unwrap();
    client
}

fn empty_target() -> VecClient {
    let client = VecClient::in_memory("notes").unwrap();
    client.create_table(3, DistanceMetric::Cosine).unwrap();
    client
}

fn contents(client: &VecClient) -> Vec<(String, Metadata, Vec<f32>)> {
    client
        .get_all(10)
        .unwrap()
        .map(|r| {
            let Record {
                text,
                metadata,
                embedding,
                ..
            } = r.unwrap();
            (text, metadata, embedding)
        })
        .collect()
}

#[test]
fn test_json_export_import_preserves_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("notes.jsonl");
    let source = source();

    let exported = source.export_to_json(&path, &ExportOptions::json()).unwrap();
    assert_eq!(exported, 3);
    let lines: Vec<Value> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["text"], "hello");
    assert_eq!(lines[0]["embedding"], json!([1.0, 0.0, 0.0]));

    let target = empty_target();
    let imported = target
        .import_from_json(&path, &ImportOptions::new())
        .unwrap();
    assert_eq!(imported, 3);
    assert_eq!(contents(&target), contents(&source));
}

#[test]
fn test_csv_export_import_preserves_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.csv");
    let source = source();

    let options = ExportOptions::csv().with_embeddings(true);
    assert_eq!(source.export_to_csv(&path, &options).unwrap(), 3);
    let header = fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("rowid,text,metadata,embedding"));

    let target = empty_target();
    let imported = target
        .import_from_csv(&path, &ImportOptions::new().with_batch_size(2))
        .unwrap();
    assert_eq!(imported, 3);
    assert_eq!(contents(&target), contents(&source));
    assert_eq!(
        target
            .similarity_search(&[0.0, 1.0, 0.0], 1)
            .unwrap()[0]
            .text,
        "bonjour"
    );
}

#[test]
fn test_csv_without_embeddings_cannot_be_imported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.csv");
    source().export_to_csv(&path, &ExportOptions::csv()).unwrap();
    let header = fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("rowid,text,metadata\n"));

    let target = empty_target();
    let err = target
        .import_from_csv(&path, &ImportOptions::new())
        .unwrap_err();
    assert!(matches!(err, VecClientError::Import(_)));
    assert_eq!(target.count().unwrap(), 0);
}

#[test]
fn test_json_without_embeddings_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.jsonl");
    source()
        .export_to_json(&path, &ExportOptions::json().with_embeddings(false))
        .unwrap();

    let err = empty_target()
        .import_from_json(&path, &ImportOptions::new())
        .unwrap_err();
    match err {
        VecClientError::Import(msg) => assert!(msg.contains("line 1"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_import_skips_existing_rowids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.jsonl");
    let client = source();
    client.export_to_json(&path, &ExportOptions::json()).unwrap();

    let skipped = client
        .import_from_json(&path, &ImportOptions::new().with_skip_duplicates(true))
        .unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(client.count().unwrap(), 3);

    let duplicated = client
        .import_from_json(&path, &ImportOptions::new())
        .unwrap();
    assert_eq!(duplicated, 3);
    assert_eq!(client.count().unwrap(), 6);
}

#[test]
fn test_filtered_export_writes_only_matches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("en.jsonl");
    let options = ExportOptions::json()
        .with_filter(MetadataFilter::new().eq("lang", "en"))
        .with_batch_size(1);
    assert_eq!(source().export_to_json(&path, &options).unwrap(), 2);

    let target = empty_target();
    target.import_from_json(&path, &ImportOptions::new()).unwrap();
    let texts: Vec<_> = contents(&target).into_iter().map(|(t, _, _)| t).collect();
    assert_eq!(texts, vec!["hello", "line one\nline two"]);
}

#[test]
fn test_import_of_hand_written_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manual.jsonl");
    fs::write(
        &path,
        "{\"text\": \"no rowid\", \"embedding\": [0.0, 0.0, 1.0]}\n\n\
         {\"text\": \"with meta\", \"metadata\": {\"k\": 1}, \"embedding\": [1.0, 1.0, 0.0]}\n",
    )
    .unwrap();

    let target = empty_target();
    assert_eq!(
        target
            .import_from_json(&path, &ImportOptions::new().with_skip_duplicates(true))
            .unwrap(),
        2
    );
    let rows = contents(&target);
    assert!(rows[0].1.is_empty());
    assert_eq!(rows[1].1, md(json!({"k": 1})));
}

#[test]
fn test_import_with_wrong_dimension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.jsonl");
    fs::write(&path, "{\"text\": \"short\", \"embedding\": [1.0]}\n").unwrap();
    let err = empty_target()
        .import_from_json(&path, &ImportOptions::new())
        .unwrap_err();
    assert!(matches!(err, VecClientError::DimensionMismatch { .. }));
}
