use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use polypack_config::Config;
use polypack_pipeline::{
    Catalog, FileFetcher, LocalPublisher, PipelineError, PipelinePool, Publisher, Registry,
};
use polypack_store::PackStore;
use polypack_types::{PairSpec, StageEvent};

fn spec(id: &str, expected: u64) -> PairSpec {
    let (source, target) = id.split_once('-').unwrap();
    PairSpec {
        id: id.to_string(),
        name: format!("{source} to {target}"),
        source_language: source.to_string(),
        target_language: target.to_string(),
        url: None,
        expected_entries: expected,
    }
}

fn write_dump(dir: &TempDir, id: &str) {
    let lines = [
        r#"{"headword":"agua","forms":["aguas"],"gloss":"water","pos":"noun"}"#,
        r#"{"headword":"agua","gloss":"rain, drizzle","pos":"noun"}"#,
        r#"{"headword":"lluvia","gloss":"rain","pos":"noun"}"#,
        r#"{"headword":"fuego","gloss":"fire","pos":"noun"}"#,
    ];
    fs::write(dir.path().join(format!("{id}.jsonl")), lines.join("\n")).unwrap();
}

struct Harness {
    pool: PipelinePool,
    events: kanal::AsyncReceiver<StageEvent>,
    config: Arc<Config>,
    _dirs: (TempDir, TempDir),
}

fn harness(source_dir: TempDir) -> Harness {
    let out_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.pipeline.output_dir = out_dir.path().join("packs");
    config.pipeline.registry_dir = out_dir.path().join("dist");
    let config = Arc::new(config);

    let (tx, rx) = kanal::unbounded_async();
    let pool = PipelinePool::new(
        Arc::clone(&config),
        Arc::new(FileFetcher::new(source_dir.path())),
        tx,
        CancellationToken::new(),
    );
    Harness {
        pool,
        events: rx,
        config,
        _dirs: (source_dir, out_dir),
    }
}

#[tokio::test]
async fn generate_produces_store_and_artifact() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");
    let h = harness(source_dir);

    let summary = h.pool.run_one(&spec("es-en", 4)).await.unwrap();
    assert!(summary.store_path.exists());
    assert!(summary.artifact.path.exists());
    assert_eq!(summary.manifest.id, "es-en");
    assert_eq!(summary.manifest.schema_version, "2.0");
    assert_eq!(summary.manifest.forward_entries, 4);
    assert_eq!(
        summary.manifest.total_entries,
        summary.manifest.forward_entries + summary.manifest.reverse_entries
    );
    assert_eq!(summary.manifest.checksum.len(), 64);

    // the written store answers real lookups
    let store = PackStore::open(&summary.store_path).unwrap();
    let hits = store.forward_lookup("aguas").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].group.base_word, "agua");
    assert_eq!(hits[0].meanings.len(), 2);
    let hits = store.reverse_lookup("rain").unwrap();
    assert_eq!(hits[0].base_word, "lluvia");
}

#[tokio::test]
async fn generation_emits_every_stage_in_order() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");
    let h = harness(source_dir);

    h.pool.run_one(&spec("es-en", 0)).await.unwrap();

    let mut indices = Vec::new();
    while let Ok(Some(event)) = h.events.try_recv() {
        assert_eq!(event.pair, "es-en");
        indices.push(event.stage_index);
    }
    assert_eq!(indices, (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn verify_only_reuses_the_written_store() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");
    let h = harness(source_dir);

    let pack = spec("es-en", 4);
    h.pool.run_one(&pack).await.unwrap();
    h.pool.verify_one(&pack).await.unwrap();
}

#[tokio::test]
async fn verify_only_requires_an_existing_store() {
    let source_dir = TempDir::new().unwrap();
    let h = harness(source_dir);
    let err = h.pool.verify_one(&spec("es-en", 0)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Internal(_)));
}

#[tokio::test]
async fn cancelled_run_stops_before_fetch() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");

    let out_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.pipeline.output_dir = out_dir.path().join("packs");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (tx, _rx) = kanal::unbounded_async();
    let pool = PipelinePool::new(
        Arc::new(config),
        Arc::new(FileFetcher::new(source_dir.path())),
        tx,
        cancel,
    );
    let err = pool.run_one(&spec("es-en", 0)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled(_)));
}

#[tokio::test]
async fn run_many_isolates_pair_failures() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");
    // no dump for fr-en
    let h = harness(source_dir);

    let outcomes = h
        .pool
        .run_many(&[spec("es-en", 4), spec("fr-en", 4)])
        .await;
    assert_eq!(outcomes.len(), 2);
    let ok = outcomes.iter().find(|o| o.pair_id == "es-en").unwrap();
    assert!(ok.result.is_ok());
    let failed = outcomes.iter().find(|o| o.pair_id == "fr-en").unwrap();
    assert!(matches!(
        failed.result,
        Err(PipelineError::SourceFetch(_))
    ));
}

#[tokio::test]
async fn mostly_malformed_source_reports_source_quality() {
    let source_dir = TempDir::new().unwrap();
    let mut lines = vec!["{{corrupt"; 6];
    lines.extend([
        r#"{"headword":"agua","gloss":"water"}"#,
        r#"{"headword":"lluvia","gloss":"rain"}"#,
        r#"{"headword":"fuego","gloss":"fire"}"#,
        r#"{"headword":"mar","gloss":"sea"}"#,
    ]);
    fs::write(source_dir.path().join("es-en.jsonl"), lines.join("\n")).unwrap();
    let h = harness(source_dir);

    let err = h.pool.run_one(&spec("es-en", 0)).await.unwrap_err();
    assert!(matches!(err, PipelineError::SourceQuality(_)));
    assert_eq!(err.category(), "source-quality");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn coverage_failure_fails_generation() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");
    let h = harness(source_dir);

    let err = h.pool.run_one(&spec("es-en", 1_000_000)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Store(_)));
}

#[tokio::test]
async fn publish_copies_artifact_and_updates_registry() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");
    let h = harness(source_dir);

    let summary = h.pool.run_one(&spec("es-en", 4)).await.unwrap();
    let publisher = LocalPublisher::new(&h.config.pipeline);
    publisher.publish(&summary).await.unwrap();

    let registry_dir = &h.config.pipeline.registry_dir;
    assert!(registry_dir.join("es-en.sqlite.gz").exists());
    let registry =
        Registry::load_or_default(&registry_dir.join(&h.config.pipeline.registry_file)).unwrap();
    assert_eq!(registry.packs["es-en"].checksum, summary.manifest.checksum);
}

#[tokio::test]
async fn verify_deployment_checks_the_published_artifact() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");
    let h = harness(source_dir);

    let publisher = LocalPublisher::new(&h.config.pipeline);
    // nothing published yet
    assert!(publisher.verify_deployment("es-en").is_err());

    let summary = h.pool.run_one(&spec("es-en", 4)).await.unwrap();
    publisher.publish(&summary).await.unwrap();
    publisher.verify_deployment("es-en").unwrap();
    assert!(publisher.verify_deployment("fr-en").is_err());

    // a damaged artifact no longer matches the registry checksum
    let artifact = h.config.pipeline.registry_dir.join("es-en.sqlite.gz");
    fs::write(&artifact, b"truncated").unwrap();
    let err = publisher.verify_deployment("es-en").unwrap_err();
    assert!(err.to_string().contains("checksum mismatch"));
}

#[tokio::test]
async fn catalog_drives_generation() {
    let source_dir = TempDir::new().unwrap();
    write_dump(&source_dir, "es-en");

    let catalog_file = source_dir.path().join("packs.json");
    fs::write(
        &catalog_file,
        r#"{"packs":[{"id":"es-en","name":"Spanish-English","source_language":"es",
            "target_language":"en","expected_entries":4}]}"#,
    )
    .unwrap();

    let catalog = Catalog::load(&catalog_file).unwrap();
    let h = harness(source_dir);
    let outcomes = h.pool.run_many(&catalog.packs).await;
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
}
