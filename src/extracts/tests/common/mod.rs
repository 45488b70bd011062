use serde_json::{json, Value};
use std::fs;
use std::path::Path;

pub fn write_index(dump_dir: &Path, index: &str, documents: &[Value]) {
    let lines: Vec<String> = documents.iter().map(Value::to_string).collect();
    fs::write(dump_dir.join(format!("{index}.json")), lines.join("\n") + "\n").unwrap();
}

pub fn primitive_step(id: &str, input: &str) -> Value {
    json!({
        "type": "PRIMITIVE",
        "primitive": {"id": id, "name": id, "python_path": format!("d3m.primitives.test.{id}")},
        "arguments": {"inputs": {"type": "CONTAINER", "data": input}},
        "outputs": [{"id": "produce"}],
    })
}

pub fn pipeline(digest: &str, model: &str) -> Value {
    json!({
        "digest": digest,
        "inputs": [{"name": "inputs"}],
        "outputs": [{"data": "steps.2.produce"}],
        "steps": [
            primitive_step("dataset_to_dataframe", "inputs.0"),
            primitive_step(model, "steps.0.produce"),
            primitive_step("construct_predictions", "steps.1.produce"),
        ],
    })
}

pub fn problem(digest: &str, task_type: &str, target: &str) -> Value {
    json!({
        "digest": digest,
        "name": digest,
        "problem": {"task_type": task_type},
        "performance_metrics": [{"metric": "ACCURACY"}],
        "inputs": [{"dataset_id": "iris_dataset", "targets": [{"column_name": target, "column_index": 5}]}],
    })
}

pub fn dataset(digest: &str) -> Value {
    json!({"digest": digest, "id": format!("{digest}_id"), "name": digest})
}

pub fn run(id: &str, pipeline: &str, problem: &str, dataset: &str, accuracy: f64) -> Value {
    json!({
        "id": id,
        "status": {"state": "SUCCESS"},
        "start": "2019-06-05T20:17:46Z",
        "end": "2019-06-05T20:18:46Z",
        "_submitter": "tester",
        "run": {
            "phase": "PRODUCE",
            "results": {
                "scores": [{"metric": {"metric": "ACCURACY"}, "value": accuracy, "normalized": accuracy}],
                "predictions": {"header": ["d3mIndex", "species"]},
            },
        },
        "datasets": [{"digest": dataset}],
        "pipeline": {"digest": pipeline},
        "problem": {"digest": problem},
    })
}

pub fn predictions_blob(id: &str, labels: &[&str]) -> Value {
    let indices: Vec<String> = (0..labels.len()).map(|i| i.to_string()).collect();
    json!({
        "id": id,
        "run": {"results": {"predictions": {"header": ["d3mIndex", "species"], "values": [indices, labels]}}},
    })
}

/// A small, consistent dump: two pipelines, one problem, one dataset, two
/// runs.
pub fn write_dump(dump_dir: &Path) {
    write_index(
        dump_dir,
        "pipelines",
        &[pipeline("pipe-rf", "random_forest"), pipeline("pipe-gb", "gradient_boosting")],
    );
    write_index(dump_dir, "problems", &[problem("prob-iris", "CLASSIFICATION", "species")]);
    write_index(dump_dir, "datasets", &[dataset("ds-iris")]);
    write_index(
        dump_dir,
        "pipeline_runs_trusted",
        &[
            run("run-rf", "pipe-rf", "prob-iris", "ds-iris", 0.9),
            run("run-gb", "pipe-gb", "prob-iris", "ds-iris", 0.8),
        ],
    );
}
