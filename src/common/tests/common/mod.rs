use metalearn_common::entities::{Pipeline, PipelineDocument};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub fn primitive_step(id: &str, input: &str) -> Value {
    json!({
        "type": "PRIMITIVE",
        "primitive": {
            "id": id,
            "name": id,
            "python_path": format!("d3m.primitives.test.{id}"),
        },
        "arguments": {"inputs": {"type": "CONTAINER", "data": input}},
        "outputs": [{"id": "produce"}],
    })
}

pub fn subpipeline_step(digest: &str) -> Value {
    json!({"type": "SUBPIPELINE", "pipeline": {"digest": digest}})
}

pub fn pipeline_document(digest: &str, steps: Vec<Value>) -> Value {
    let last = steps.len().saturating_sub(1);
    json!({
        "digest": digest,
        "inputs": [{"name": "inputs"}],
        "outputs": [{"data": format!("steps.{last}.produce")}],
        "steps": steps,
    })
}

/// Resolves every document against the others, sub-pipelines included.
pub fn resolve_pipelines(documents: &[Value]) -> HashMap<String, Arc<Pipeline>> {
    fn resolve(
        digest: &str,
        parsed: &HashMap<String, PipelineDocument>,
        resolved: &mut HashMap<String, Arc<Pipeline>>,
    ) -> Arc<Pipeline> {
        if let Some(pipeline) = resolved.get(digest) {
            return pipeline.clone();
        }
        let pipeline = Arc::new(
            parsed[digest]
                .clone()
                .resolve(|reference| Ok(resolve(&reference.digest, parsed, resolved)))
                .unwrap(),
        );
        resolved.insert(digest.to_string(), pipeline.clone());
        pipeline
    }

    let parsed: HashMap<String, PipelineDocument> = documents
        .iter()
        .map(|document| {
            let parsed = PipelineDocument::from_document(document, true).unwrap();
            (parsed.key().unwrap().to_string(), parsed)
        })
        .collect();
    let mut resolved = HashMap::new();
    for digest in parsed.keys() {
        resolve(digest, &parsed, &mut resolved);
    }
    resolved
}

/// The four-step tabular classification pipeline with `model` as the
/// estimator.
pub fn classification_pipeline(digest: &str, model: &str) -> Value {
    pipeline_document(
        digest,
        vec![
            primitive_step("dataset_to_dataframe", "inputs.0"),
            primitive_step("imputer", "steps.0.produce"),
            primitive_step(model, "steps.1.produce"),
            primitive_step("construct_predictions", "steps.2.produce"),
        ],
    )
}
