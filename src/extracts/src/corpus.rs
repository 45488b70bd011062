//! Two-phase corpus construction.
//!
//! Documents reference each other by digest, so nothing can be linked until
//! every index has been read. The builder first parses each document on its
//! own, then [`CorpusBuilder::build`] resolves sub-pipelines and run
//! references into shared, immutable entities.

use metalearn_common::entities::{
    Dataset, Pipeline, PipelineDocument, PipelineRun, PipelineRunDocument, Problem,
};
use metalearn_common::errors::{EntityError, EntityResult};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The denormalized corpus: flat maps keyed by digest (runs by id).
#[derive(Debug, Clone, Default)]
pub struct EntityMaps {
    pub pipelines: BTreeMap<String, Arc<Pipeline>>,
    pub problems: BTreeMap<String, Arc<Problem>>,
    pub datasets: BTreeMap<String, Arc<Dataset>>,
    pub pipeline_runs: BTreeMap<String, Arc<PipelineRun>>,
}

impl EntityMaps {
    pub fn runs(&self) -> impl Iterator<Item = &Arc<PipelineRun>> + Clone {
        self.pipeline_runs.values()
    }
}

pub struct CorpusBuilder {
    should_enforce_ids: bool,
    strict_references: bool,
    pipelines: BTreeMap<String, PipelineDocument>,
    problems: BTreeMap<String, Arc<Problem>>,
    datasets: BTreeMap<String, Arc<Dataset>>,
    pipeline_runs: BTreeMap<String, PipelineRunDocument>,
}

fn insert_logged<T>(map: &mut BTreeMap<String, T>, kind: &str, key: String, value: T) {
    if map.insert(key.clone(), value).is_some() {
        debug!("duplicate {kind} '{key}' in dump, keeping the last one");
    }
}

impl CorpusBuilder {
    /// `strict_references` makes a dangling digest fail the build instead
    /// of dropping the entity holding it.
    pub fn new(should_enforce_ids: bool, strict_references: bool) -> Self {
        Self {
            should_enforce_ids,
            strict_references,
            pipelines: BTreeMap::new(),
            problems: BTreeMap::new(),
            datasets: BTreeMap::new(),
            pipeline_runs: BTreeMap::new(),
        }
    }

    pub fn add_pipeline(&mut self, document: &Value) -> EntityResult<()> {
        let pipeline = PipelineDocument::from_document(document, self.should_enforce_ids)?;
        let key = pipeline.key()?.to_string();
        insert_logged(&mut self.pipelines, "pipeline", key, pipeline);
        Ok(())
    }

    pub fn add_problem(&mut self, document: &Value) -> EntityResult<()> {
        let problem = Problem::from_document(document, self.should_enforce_ids)?;
        insert_logged(&mut self.problems, "problem", problem.digest.clone(), Arc::new(problem));
        Ok(())
    }

    pub fn add_dataset(&mut self, document: &Value) -> EntityResult<()> {
        let dataset = Dataset::from_document(document, self.should_enforce_ids)?;
        insert_logged(&mut self.datasets, "dataset", dataset.digest.clone(), Arc::new(dataset));
        Ok(())
    }

    pub fn add_pipeline_run(&mut self, document: &Value) -> EntityResult<()> {
        let run = PipelineRunDocument::from_document(document, self.should_enforce_ids)?;
        insert_logged(&mut self.pipeline_runs, "pipeline run", run.id.clone(), run);
        Ok(())
    }

    /// Post-init: resolves every reference and freezes the corpus.
    pub fn build(self) -> EntityResult<EntityMaps> {
        let mut resolver = PipelineResolver {
            documents: &self.pipelines,
            resolved: BTreeMap::new(),
            in_progress: BTreeSet::new(),
        };
        let mut pipelines = BTreeMap::new();
        for key in self.pipelines.keys() {
            match resolver.resolve(key) {
                Ok(pipeline) => {
                    pipelines.insert(key.clone(), pipeline);
                }
                Err(e) if e.is_dangling_reference() && !self.strict_references => {
                    warn!("dropping pipeline '{key}': {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let mut pipeline_runs = BTreeMap::new();
        for (id, run) in self.pipeline_runs {
            let resolved = resolve_run(run, &pipelines, &self.problems, &self.datasets);
            match resolved {
                Ok(run) => {
                    pipeline_runs.insert(id, Arc::new(run));
                }
                Err(e) if !self.strict_references => {
                    warn!("dropping pipeline run '{id}': {e}");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "built corpus with {} pipelines, {} problems, {} datasets and {} pipeline runs",
            pipelines.len(),
            self.problems.len(),
            self.datasets.len(),
            pipeline_runs.len()
        );

        Ok(EntityMaps {
            pipelines,
            problems: self.problems,
            datasets: self.datasets,
            pipeline_runs,
        })
    }
}

fn lookup<T>(map: &BTreeMap<String, Arc<T>>, kind: &'static str, digest: &str) -> EntityResult<Arc<T>> {
    map.get(digest)
        .cloned()
        .ok_or_else(|| EntityError::unresolved(kind, digest))
}

fn resolve_run(
    run: PipelineRunDocument,
    pipelines: &BTreeMap<String, Arc<Pipeline>>,
    problems: &BTreeMap<String, Arc<Problem>>,
    datasets: &BTreeMap<String, Arc<Dataset>>,
) -> EntityResult<PipelineRun> {
    let pipeline = lookup(pipelines, "pipeline", &run.pipeline.digest)?;
    let problem = lookup(problems, "problem", &run.problem.digest)?;
    let run_datasets = run
        .datasets
        .iter()
        .map(|reference| lookup(datasets, "dataset", &reference.digest))
        .collect::<EntityResult<Vec<_>>>()?;
    Ok(run.resolve(pipeline, problem, run_datasets))
}

/// Resolves pipelines depth first, sharing each sub-pipeline between every
/// pipeline that embeds it.
struct PipelineResolver<'a> {
    documents: &'a BTreeMap<String, PipelineDocument>,
    resolved: BTreeMap<String, Arc<Pipeline>>,
    in_progress: BTreeSet<String>,
}

impl PipelineResolver<'_> {
    fn resolve(&mut self, key: &str) -> EntityResult<Arc<Pipeline>> {
        if let Some(pipeline) = self.resolved.get(key) {
            return Ok(pipeline.clone());
        }
        let document = self
            .documents
            .get(key)
            .cloned()
            .ok_or_else(|| EntityError::unresolved("pipeline", key))?;
        if !self.in_progress.insert(key.to_string()) {
            return Err(EntityError::CyclicSubpipeline(key.to_string()));
        }
        let resolved = document.resolve(|reference| self.resolve(&reference.digest));
        self.in_progress.remove(key);

        let pipeline = Arc::new(resolved?);
        self.resolved.insert(key.to_string(), pipeline.clone());
        Ok(pipeline)
    }
}
