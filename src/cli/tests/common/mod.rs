use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_index(dump_dir: &Path, index: &str, documents: &[Value]) {
    let lines: Vec<String> = documents.iter().map(Value::to_string).collect();
    fs::write(dump_dir.join(format!("{index}.json")), lines.join("\n") + "\n").unwrap();
}

fn primitive_step(id: &str, input: &str) -> Value {
    json!({
        "type": "PRIMITIVE",
        "primitive": {"id": id, "name": id, "python_path": format!("d3m.primitives.test.{id}")},
        "arguments": {"inputs": {"type": "CONTAINER", "data": input}},
        "outputs": [{"id": "produce"}],
    })
}

fn pipeline(digest: &str, model: &str) -> Value {
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

fn run(id: &str, pipeline: &str, accuracy: f64) -> Value {
    json!({
        "id": id,
        "status": {"state": "SUCCESS"},
        "start": "2019-06-05T20:17:46Z",
        "end": "2019-06-05T20:18:46Z",
        "_submitter": "tester",
        "run": {
            "phase": "PRODUCE",
            "results": {
                "scores": [{"metric": {"metric": "ACCURACY"}, "value": accuracy}],
                "predictions": {"header": ["d3mIndex", "species"]},
            },
        },
        "datasets": [{"digest": "ds-iris"}],
        "pipeline": {"digest": pipeline},
        "problem": {"digest": "prob-iris"},
    })
}

fn predictions(labels: &[&str]) -> Value {
    let indices: Vec<usize> = (0..labels.len()).collect();
    json!({"run": {"results": {"predictions": {"header": ["d3mIndex", "species"], "values": [indices, labels]}}}})
}

/// A workspace with a two-run dump: random forest and gradient boosting on
/// iris, disagreeing on one of four rows and tied on accuracy.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("dump");
        let predictions_dir = dump.join("predictions");
        fs::create_dir_all(&predictions_dir).unwrap();

        write_index(
            &dump,
            "pipelines",
            &[pipeline("pipe-rf", "random_forest"), pipeline("pipe-gb", "gradient_boosting")],
        );
        write_index(
            &dump,
            "problems",
            &[json!({
                "digest": "prob-iris",
                "problem": {"task_type": "CLASSIFICATION"},
                "performance_metrics": [{"metric": "ACCURACY"}],
                "inputs": [{"dataset_id": "iris_dataset", "targets": [{"column_name": "species", "column_index": 5}]}],
            })],
        );
        write_index(&dump, "datasets", &[json!({"digest": "ds-iris", "name": "iris"})]);
        write_index(
            &dump,
            "pipeline_runs_trusted",
            &[run("run-rf", "pipe-rf", 0.9), run("run-gb", "pipe-gb", 0.9)],
        );
        fs::write(
            predictions_dir.join("run-rf.json"),
            predictions(&["a", "b", "c", "d"]).to_string(),
        )
        .unwrap();
        fs::write(
            predictions_dir.join("run-gb.json"),
            predictions(&["a", "b", "c", "x"]).to_string(),
        )
        .unwrap();

        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// The binary, pointed at this workspace through the environment.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("metalearn").unwrap();
        cmd.env("METALEARN_DUMP_DIR", self.path("dump"))
            .env("METALEARN_PREDICTIONS_DIR", self.path("dump/predictions"))
            .env("METALEARN_CACHE_DIR", self.path("cache"))
            .env("METALEARN_WORKING_DIR", self.path("logs"))
            .env_remove("RUST_LOG");
        cmd
    }
}
