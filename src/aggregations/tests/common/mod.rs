use metalearn_extracts::{CorpusBuilder, EntityMaps, InMemoryPredictionsStore, PredictionsCache};
use serde_json::{json, Value};

pub fn primitive_step(id: &str, input: &str) -> Value {
    json!({
        "type": "PRIMITIVE",
        "primitive": {"id": id, "name": id, "python_path": format!("d3m.primitives.test.{id}")},
        "arguments": {"inputs": {"type": "CONTAINER", "data": input}},
        "outputs": [{"id": "produce"}],
    })
}

pub fn pipeline(digest: &str, steps: Vec<Value>) -> Value {
    json!({
        "digest": digest,
        "inputs": [{"name": "inputs"}],
        "outputs": [{"data": "steps.2.produce"}],
        "steps": steps,
    })
}

/// dataframe -> `model` -> predictions, with the model reading `model_input`.
pub fn model_pipeline(digest: &str, model: &str, model_input: &str) -> Value {
    pipeline(
        digest,
        vec![
            primitive_step("dataset_to_dataframe", "inputs.0"),
            primitive_step(model, model_input),
            primitive_step("construct_predictions", "steps.1.produce"),
        ],
    )
}

pub fn problem(digest: &str, task_type: &str, target: &str) -> Value {
    json!({
        "digest": digest,
        "problem": {"task_type": task_type},
        "performance_metrics": [{"metric": "ACCURACY"}],
        "inputs": [{"dataset_id": format!("{digest}_dataset"), "targets": [{"column_name": target, "column_index": 1}]}],
    })
}

pub struct RunFixture<'a> {
    pub id: &'a str,
    pub pipeline: &'a str,
    pub problem: &'a str,
    pub dataset: &'a str,
    pub target: &'a str,
    pub state: &'a str,
    pub phase: &'a str,
    pub accuracy: f64,
}

impl<'a> RunFixture<'a> {
    pub fn iris(id: &'a str, pipeline: &'a str, accuracy: f64) -> Self {
        Self {
            id,
            pipeline,
            problem: "prob-iris",
            dataset: "ds-iris",
            target: "species",
            state: "SUCCESS",
            phase: "PRODUCE",
            accuracy,
        }
    }

    pub fn boston(id: &'a str, pipeline: &'a str, accuracy: f64) -> Self {
        Self {
            problem: "prob-boston",
            dataset: "ds-boston",
            target: "medv",
            ..Self::iris(id, pipeline, accuracy)
        }
    }

    pub fn document(&self) -> Value {
        json!({
            "id": self.id,
            "status": {"state": self.state},
            "start": "2019-06-05T20:17:46Z",
            "end": "2019-06-05T20:18:46Z",
            "_submitter": "tester",
            "run": {
                "phase": self.phase,
                "results": {
                    "scores": [{"metric": {"metric": "ACCURACY"}, "value": self.accuracy, "normalized": self.accuracy}],
                    "predictions": {"header": ["d3mIndex", self.target]},
                },
            },
            "datasets": [{"digest": self.dataset}],
            "pipeline": {"digest": self.pipeline},
            "problem": {"digest": self.problem},
        })
    }
}

pub fn predictions_blob(target: &str, indices: &[i64], values: Value) -> Value {
    json!({"run": {"results": {"predictions": {"header": ["d3mIndex", target], "values": [indices, values]}}}})
}

pub fn base_pipelines() -> Vec<Value> {
    vec![
        model_pipeline("pipe-rf", "random_forest", "steps.0.produce"),
        model_pipeline("pipe-gb", "gradient_boosting", "steps.0.produce"),
        // reads the raw input: a different slot, not a substitution
        model_pipeline("pipe-knn", "knn", "inputs.0"),
        pipeline(
            "pipe-rf-extra",
            vec![
                primitive_step("dataset_to_dataframe", "inputs.0"),
                primitive_step("random_forest", "steps.0.produce"),
                primitive_step("construct_predictions", "steps.1.produce"),
                primitive_step("extra", "steps.2.produce"),
            ],
        ),
    ]
}

pub fn build_corpus(
    pipelines: &[Value],
    runs: &[RunFixture<'_>],
    blobs: Vec<(&str, Value)>,
) -> (EntityMaps, PredictionsCache) {
    let mut builder = CorpusBuilder::new(true, true);
    for document in pipelines {
        builder.add_pipeline(document).unwrap();
    }
    builder.add_problem(&problem("prob-iris", "CLASSIFICATION", "species")).unwrap();
    builder.add_problem(&problem("prob-boston", "REGRESSION", "medv")).unwrap();
    builder.add_dataset(&json!({"digest": "ds-iris"})).unwrap();
    builder.add_dataset(&json!({"digest": "ds-boston"})).unwrap();
    for run in runs {
        builder.add_pipeline_run(&run.document()).unwrap();
    }

    let mut store = InMemoryPredictionsStore::new();
    for (run_id, blob) in blobs {
        store.insert(run_id, blob);
    }
    (builder.build().unwrap(), PredictionsCache::new(store))
}

/// The shared scenario: one clean classification substitution, one clean
/// regression substitution, and runs that must be filtered out.
pub fn scenario() -> (EntityMaps, PredictionsCache) {
    let runs = [
        RunFixture::iris("run-rf", "pipe-rf", 0.9),
        RunFixture::iris("run-gb", "pipe-gb", 0.8),
        RunFixture::iris("run-knn", "pipe-knn", 0.9005),
        RunFixture::iris("run-rf-extra", "pipe-rf-extra", 0.7),
        RunFixture {
            phase: "FIT",
            ..RunFixture::iris("run-gb-fit", "pipe-gb", 0.95)
        },
        RunFixture {
            state: "FAILURE",
            ..RunFixture::iris("run-gb-failed", "pipe-gb", 0.1)
        },
        RunFixture::iris("run-gb-nopreds", "pipe-gb", 0.85),
        RunFixture::boston("run-rf-boston", "pipe-rf", 0.6),
        RunFixture::boston("run-gb-boston", "pipe-gb", 0.5),
    ];
    let labels = |values: [&str; 4]| json!(values);
    let blobs = vec![
        ("run-rf", predictions_blob("species", &[0, 1, 2, 3], labels(["a", "b", "c", "d"]))),
        ("run-gb", predictions_blob("species", &[0, 1, 2, 3], labels(["a", "b", "c", "x"]))),
        ("run-knn", predictions_blob("species", &[0, 1, 2, 3], labels(["a", "b", "c", "d"]))),
        ("run-rf-extra", predictions_blob("species", &[0, 1, 2, 3], labels(["a", "b", "c", "d"]))),
        ("run-gb-fit", predictions_blob("species", &[0, 1, 2, 3], labels(["a", "b", "c", "d"]))),
        ("run-gb-failed", predictions_blob("species", &[0, 1, 2, 3], labels(["a", "b", "c", "d"]))),
        ("run-rf-boston", predictions_blob("medv", &[0, 1], json!(["0.0", "0.0"]))),
        ("run-gb-boston", predictions_blob("medv", &[1, 0], json!(["4.0", "3.0"]))),
    ];
    build_corpus(&base_pipelines(), &runs, blobs)
}
