//! Distribution summaries over the runs of a corpus.

use itertools::Itertools;
use metalearn_common::entities::PipelineRunPhase;
use metalearn_extracts::EntityMaps;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub num_runs: usize,
    /// number of scores reported by a run -> number of such runs
    pub scores_per_run: BTreeMap<usize, usize>,
    pub run_phases: BTreeMap<PipelineRunPhase, usize>,
    /// metric name -> number of scores using it
    pub metrics: BTreeMap<String, usize>,
    pub num_normalized_scores: usize,
}

pub fn compute_basic_stats(maps: &EntityMaps) -> BasicStats {
    let scores = || maps.runs().flat_map(|run| run.scores.iter());
    BasicStats {
        num_runs: maps.pipeline_runs.len(),
        scores_per_run: maps.runs().map(|run| run.scores.len()).counts().into_iter().collect(),
        run_phases: maps.runs().map(|run| run.run_phase).counts().into_iter().collect(),
        metrics: scores().map(|score| score.metric.clone()).counts().into_iter().collect(),
        num_normalized_scores: scores().filter(|score| score.normalized.is_some()).count(),
    }
}
