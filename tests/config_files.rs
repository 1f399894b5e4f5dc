use std::io::Write;

use sitedup::{ConfigLoadError, DuplicateSession, EngineConfig, PageInput};
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn loads_session_config_from_disk() {
    let file = write_config(
        r#"
version: "1.0"
name: "docs crawl"
num_permutations: 64
num_bands: 8
rows_per_band: 8
max_similarity_comparisons: 10
min_token_count: 20
reconcile_threads: 2
seed: 42
normalize:
  remove_stopwords: false
"#,
    );

    let cfg = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(cfg.name.as_deref(), Some("docs crawl"));
    assert_eq!(cfg.num_permutations, 64);
    assert_eq!(cfg.reconcile_threads, Some(2));
    assert_eq!(cfg.shingle_width, 5);
    assert!(!cfg.normalize.remove_stopwords);

    let mut session = DuplicateSession::new(cfg).unwrap();
    let body = (0..40).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
    session.process(&PageInput::text("https://a.test/", body)).unwrap();
    assert_eq!(session.documents()[0].signature.len(), 64);
    assert_eq!(session.documents()[0].bucket_keys.len(), 8);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigLoadError::FileRead(_)));
}

#[test]
fn invalid_file_contents_are_rejected() {
    let bad_yaml = write_config("num_bands: [1, 2");
    assert!(matches!(
        EngineConfig::from_file(bad_yaml.path()),
        Err(ConfigLoadError::YamlParse(_))
    ));

    let bad_banding = write_config("num_permutations: 100\n");
    assert!(matches!(
        EngineConfig::from_file(bad_banding.path()),
        Err(ConfigLoadError::Validation(_))
    ));
}

#[test]
fn saved_config_reloads_identically() {
    let cfg = EngineConfig::default()
        .with_seed(7)
        .with_queue_capacity(16)
        .with_reconcile_threads(3);
    let file = write_config(&cfg.to_yaml().unwrap());
    assert_eq!(EngineConfig::from_file(file.path()).unwrap(), cfg);
}
