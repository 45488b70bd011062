//! Which pipelines reached the same score on the same dataset?

use itertools::Itertools;
use metalearn_common::entities::{PipelineRun, Score, Tantamount};
use metalearn_extracts::EntityMaps;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRunPair {
    pub run_a: String,
    pub run_b: String,
    pub pipeline_a: String,
    pub pipeline_b: String,
    /// Scores of `run_a` matched by `run_b` within the tolerance
    pub common_scores: Vec<Score>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDuplicates {
    pub dataset_digest: String,
    pub pairs: Vec<DuplicateRunPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePipelinesReport {
    pub score_tolerance: f64,
    /// Most duplicated datasets first
    pub datasets: Vec<DatasetDuplicates>,
}

/// Groups scored runs by dataset, keeping one run per distinct pipeline,
/// and reports run pairs sharing a score within `score_tolerance`. Only the
/// `max_datasets` datasets with the most such pairs are kept.
pub fn find_duplicate_pipelines(
    maps: &EntityMaps,
    score_tolerance: f64,
    max_datasets: usize,
) -> DuplicatePipelinesReport {
    let mut runs_by_dataset: BTreeMap<&str, Vec<&Arc<PipelineRun>>> = BTreeMap::new();
    for run in maps.runs().filter(|run| !run.scores.is_empty()) {
        for digest in run.dataset_digests() {
            let runs = runs_by_dataset.entry(digest).or_default();
            if !runs
                .iter()
                .any(|previous| previous.pipeline.is_tantamount_to(&run.pipeline))
            {
                runs.push(run);
            }
        }
    }

    let mut datasets: Vec<DatasetDuplicates> = runs_by_dataset
        .into_iter()
        .map(|(digest, runs)| DatasetDuplicates {
            dataset_digest: digest.to_string(),
            pairs: runs
                .into_iter()
                .tuple_combinations()
                .filter_map(|(run_a, run_b)| {
                    let common_scores = run_a.find_common_scores(run_b, score_tolerance);
                    (!common_scores.is_empty()).then(|| DuplicateRunPair {
                        run_a: run_a.id.clone(),
                        run_b: run_b.id.clone(),
                        pipeline_a: run_a.pipeline.key().to_string(),
                        pipeline_b: run_b.pipeline.key().to_string(),
                        common_scores: common_scores.into_iter().cloned().collect(),
                    })
                })
                .collect(),
        })
        .filter(|dataset| !dataset.pairs.is_empty())
        .collect();

    // stable: ties keep digest order
    datasets.sort_by(|a, b| b.pairs.len().cmp(&a.pairs.len()));
    datasets.truncate(max_datasets);

    info!(
        "{} dataset(s) have runs with the same scores (tolerance {score_tolerance})",
        datasets.len()
    );
    DuplicatePipelinesReport {
        score_tolerance,
        datasets,
    }
}
