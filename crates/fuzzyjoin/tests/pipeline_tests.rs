//! File-to-file join tests

use std::fs;
use std::path::Path;

use fuzzyjoin::pipeline::{load_config, Output, Pipeline};
use fuzzyjoin::Error;
use fuzzyjoin_core::{ConfigError, MatchConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const MAIN: &str = r#"{"schema":[{"name":"id","type":"integer"},{"name":"customer","type":"string"}]}
[1,"Catrine"]
[2,null]

[3,"Jon"]
"#;

// "Catriny" and "John" stored as base64 UTF-8
const LOOKUP: &str = r#"{"schema":[{"name":"name","type":"string","encoding":"opaque-binary"},{"name":"city","type":"string"}]}
["Sm9obg==","Oslo"]
["Q2F0cmlueQ==","Rome"]
"#;

const CONFIG: &str = r#"{
    "algorithm": "levenshtein",
    "max_distance": 2,
    "main_key_field": "customer",
    "lookup_key_field": "name",
    "value_field": "closer",
    "distance_field": "distance",
    "lookup_fields": [{"name": "city"}]
}"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn output_lines(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_join_files() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&write(dir.path(), "join.json", CONFIG)).await.unwrap();
    let main = write(dir.path(), "main.jsonl", MAIN);
    let lookup = write(dir.path(), "lookup.jsonl", LOOKUP);
    let out = dir.path().join("out.jsonl");

    let summary = Pipeline::new(config)
        .with_channel_capacity(1)
        .run(&main, &lookup, Output::File(out.clone()))
        .await
        .unwrap();

    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.stats.index_size, 2);
    assert_eq!(summary.stats.rows_matched, 2);

    let lines = output_lines(&out);
    assert_eq!(
        lines[0]["schema"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect::<Vec<_>>(),
        vec!["id", "customer", "match", "closer", "distance", "city"]
    );
    assert_eq!(
        lines[1..],
        [
            serde_json::json!([1, "Catrine", true, "Catriny", 1, "Rome"]),
            serde_json::json!([2, null, false, null, null, null]),
            serde_json::json!([3, "Jon", true, "John", 1, "Oslo"]),
        ]
    );
}

#[tokio::test]
async fn test_malformed_row_fails_join() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&write(dir.path(), "join.json", CONFIG)).await.unwrap();
    let main = write(dir.path(), "main.jsonl", MAIN);
    let lookup = write(
        dir.path(),
        "lookup.jsonl",
        &format!("{LOOKUP}[\"Sm9obg==\"]\n"),
    );

    let err = Pipeline::new(config)
        .run(&main, &lookup, Output::File(dir.path().join("out.jsonl")))
        .await
        .unwrap_err();

    match err {
        Error::Format { line, .. } => assert_eq!(line, 4),
        other => panic!("expected format error, got {other}"),
    }
}

#[tokio::test]
async fn test_unknown_algorithm_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = MatchConfig {
        algorithm: "nope".into(),
        main_key_field: "customer".into(),
        lookup_key_field: "name".into(),
        ..Default::default()
    };
    let main = write(dir.path(), "main.jsonl", MAIN);
    let lookup = write(dir.path(), "lookup.jsonl", LOOKUP);

    let err = Pipeline::new(config)
        .run(&main, &lookup, Output::File(dir.path().join("out.jsonl")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::UnknownAlgorithm(name)) if name == "nope"
    ));
}

#[tokio::test]
async fn test_invalid_bounds_in_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "join.json",
        r#"{"main_key_field": "a", "lookup_key_field": "b", "min_distance": 3, "max_distance": 1}"#,
    );
    let err = load_config(&path).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidBounds { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_join_writes_no_rows() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&write(dir.path(), "join.json", CONFIG)).await.unwrap();
    let main = write(dir.path(), "main.jsonl", MAIN);
    let lookup = write(dir.path(), "lookup.jsonl", LOOKUP);
    let out = dir.path().join("out.jsonl");

    let pipeline = Pipeline::new(config);
    pipeline.cancel_handle().cancel();
    let summary = pipeline
        .run(&main, &lookup, Output::File(out.clone()))
        .await
        .unwrap();

    assert!(summary.stats.cancelled);
    assert_eq!(summary.rows_written, 0);
    // Only the schema line
    assert_eq!(output_lines(&out).len(), 1);
}
