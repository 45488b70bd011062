mod common;

use common::*;
use metalearn_common::entities::PredsLoadStatus;
use metalearn_extracts::{
    extract_denormalized, DirPredictionsStore, ExtractOptions, Index, InMemoryPredictionsStore,
    PredictionsCache, PredictionsLoad,
};
use pretty_assertions_sorted::assert_eq;
use rstest::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[fixture]
fn dump_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_dump(dir.path());
    dir
}

#[rstest]
fn test_extract_denormalized(dump_dir: TempDir) {
    let maps = extract_denormalized(dump_dir.path(), ExtractOptions::default()).unwrap();

    assert_eq!(maps.pipelines.len(), 2);
    assert_eq!(maps.problems.len(), 1);
    assert_eq!(maps.datasets.len(), 1);
    assert_eq!(
        maps.pipeline_runs.keys().cloned().collect::<Vec<_>>(),
        vec!["run-gb".to_string(), "run-rf".to_string()]
    );

    let run = &maps.pipeline_runs["run-rf"];
    assert!(Arc::ptr_eq(&run.pipeline, &maps.pipelines["pipe-rf"]));
    assert!(Arc::ptr_eq(&run.problem, &maps.problems["prob-iris"]));
    assert!(Arc::ptr_eq(&run.datasets[0], &maps.datasets["ds-iris"]));
    let other = &maps.pipeline_runs["run-gb"];
    assert!(run.is_one_step_off_from(other));
    assert!(other.is_one_step_off_from(run));
    assert!(other.is_same_problem_and_context_as(run));
}

#[rstest]
fn test_missing_index_file_is_an_error(dump_dir: TempDir) {
    let options = ExtractOptions {
        pipeline_runs_index: Index::PipelineRunsUntrusted,
        ..ExtractOptions::default()
    };
    let err = extract_denormalized(dump_dir.path(), options).unwrap_err();
    assert!(format!("{err:#}").contains("pipeline_runs_untrusted.json"));
}

#[rstest]
fn test_dangling_run_reference(dump_dir: TempDir) {
    write_index(
        dump_dir.path(),
        "pipeline_runs_trusted",
        &[
            run("run-rf", "pipe-rf", "prob-iris", "ds-iris", 0.9),
            run("run-orphan", "pipe-unknown", "prob-iris", "ds-iris", 0.9),
        ],
    );

    let err = extract_denormalized(dump_dir.path(), ExtractOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("pipeline 'pipe-unknown' is referenced but was not loaded"));

    let lenient = ExtractOptions {
        strict_references: false,
        ..ExtractOptions::default()
    };
    let maps = extract_denormalized(dump_dir.path(), lenient).unwrap();
    assert_eq!(maps.pipeline_runs.len(), 1);
}

#[rstest]
fn test_enforced_ids(dump_dir: TempDir) {
    let mut external = pipeline("ignored", "random_forest");
    external.as_object_mut().unwrap().remove("digest");
    external["id"] = "external-pipeline".into();
    write_index(dump_dir.path(), "pipelines", &[pipeline("pipe-rf", "random_forest"), external]);

    let err = extract_denormalized(dump_dir.path(), ExtractOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("document must have a(n) digest"));
}

#[rstest]
fn test_predictions_cache_loads_once(dump_dir: TempDir) {
    let maps = extract_denormalized(dump_dir.path(), ExtractOptions::default()).unwrap();
    let predictions_dir = dump_dir.path().join("predictions");
    fs::create_dir(&predictions_dir).unwrap();
    fs::write(
        predictions_dir.join("run-rf.json"),
        predictions_blob("run-rf", &["setosa", "virginica"]).to_string(),
    )
    .unwrap();
    fs::write(predictions_dir.join("run-gb.json"), "{truncated").unwrap();

    let cache = PredictionsCache::new(DirPredictionsStore::new(&predictions_dir));
    let rf = &maps.pipeline_runs["run-rf"];
    let gb = &maps.pipeline_runs["run-gb"];

    for _ in 0..3 {
        match cache.get(rf) {
            PredictionsLoad::Usable(predictions) => assert_eq!(predictions.indices(), &[0, 1]),
            PredictionsLoad::NotUsable => panic!("run-rf predictions should load"),
        }
        assert_eq!(cache.get(gb), PredictionsLoad::NotUsable);
    }
    assert_eq!(cache.loads_performed(), 2);
}

#[rstest]
fn test_statically_unusable_runs_skip_the_store(dump_dir: TempDir) {
    let mut headerless = run("run-headerless", "pipe-rf", "prob-iris", "ds-iris", 0.9);
    headerless["run"]["results"]["predictions"]["header"] = serde_json::json!(["species"]);
    write_index(dump_dir.path(), "pipeline_runs_trusted", &[headerless]);
    let maps = extract_denormalized(dump_dir.path(), ExtractOptions::default()).unwrap();
    let run = &maps.pipeline_runs["run-headerless"];
    assert_eq!(run.preds_load_status, PredsLoadStatus::NotUsable);

    let mut store = InMemoryPredictionsStore::new();
    store.insert("run-headerless", predictions_blob("run-headerless", &["setosa"]));
    let cache = PredictionsCache::new(store);
    assert_eq!(cache.get(run), PredictionsLoad::NotUsable);
    assert_eq!(cache.loads_performed(), 0);
}
