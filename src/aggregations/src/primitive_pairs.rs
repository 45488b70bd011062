//! Primitive-pair comparison: every validated one-step substitution
//! observed between two runs of the corpus, keyed by the pair of primitive
//! ids involved.

use anyhow::{Context, Result};
use itertools::Itertools;
use metalearn_common::constants::PROGRESS_LOG_INTERVAL;
use metalearn_common::entities::{PipelineRun, PredsLoadStatus};
use metalearn_common::errors::OutputDifferenceError;
use metalearn_common::metrics::MetricProblemType;
use metalearn_extracts::{EntityMaps, PredictionsCache, PredictionsLoad};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Two primitive ids, smaller first.
pub type PrimitivePair = (String, String);

type DiffMap = BTreeMap<PrimitivePair, Vec<PipelineRunPairDiffEntry>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDiff {
    pub metric: String,
    /// score of `run_b` minus score of `run_a`
    pub metric_score_diff: f64,
}

/// One substitution between two runs. `run_a` used the primitive with the
/// smaller id, so a positive score diff favours the larger one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunPairDiffEntry {
    pub run_a: String,
    pub run_b: String,
    pub output_difference: f64,
    pub output_difference_metric: MetricProblemType,
    pub score_diffs: Vec<ScoreDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitivePairComparison {
    /// Every ascending pair of corpus primitive ids, possibly with no entries.
    #[serde(with = "pair_map")]
    pub ppcm: DiffMap,
    /// One id may ship under several python paths across versions.
    pub prim_id_to_paths: BTreeMap<String, BTreeSet<String>>,
    pub prim_ids: Vec<String>,
}

impl PrimitivePairComparison {
    pub fn num_diff_entries(&self) -> usize {
        self.ppcm.values().map(Vec::len).sum()
    }

    pub fn observed_pairs(&self) -> impl Iterator<Item = (&PrimitivePair, &Vec<PipelineRunPairDiffEntry>)> {
        self.ppcm.iter().filter(|(_, diffs)| !diffs.is_empty())
    }
}

/// JSON object keys must be strings, so the map is written as a list of
/// `{pair, diffs}` records.
mod pair_map {
    use super::{DiffMap, PipelineRunPairDiffEntry, PrimitivePair};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct PairDiffsRef<'a> {
        pair: &'a PrimitivePair,
        diffs: &'a [PipelineRunPairDiffEntry],
    }

    #[derive(Deserialize)]
    struct PairDiffs {
        pair: PrimitivePair,
        diffs: Vec<PipelineRunPairDiffEntry>,
    }

    pub fn serialize<S: Serializer>(map: &DiffMap, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter().map(|(pair, diffs)| PairDiffsRef { pair, diffs }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DiffMap, D::Error> {
        let records = Vec::<PairDiffs>::deserialize(deserializer)?;
        Ok(records.into_iter().map(|record| (record.pair, record.diffs)).collect())
    }
}

/// Runs worth scanning: successful, evaluated on the test split, with a
/// problem type some output-difference metric supports and predictions
/// that are not known to be unusable.
pub fn is_valid_for_comparison(run: &PipelineRun) -> bool {
    let supported = MetricProblemType::supported_types();
    run.was_successful()
        && run.was_run_on_test_set()
        && run.preds_load_status != PredsLoadStatus::NotUsable
        && run
            .problem
            .problem_type
            .is_some_and(|problem_type| supported.contains(&problem_type))
}

fn collect_primitives(maps: &EntityMaps) -> BTreeMap<String, BTreeSet<String>> {
    let mut prim_id_to_paths: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for run in maps.runs() {
        for primitive in run.pipeline.flattened_steps() {
            prim_id_to_paths
                .entry(primitive.id.clone())
                .or_default()
                .insert(primitive.python_path.clone());
        }
    }
    prim_id_to_paths
}

/// Validates one pair of runs as a clean primitive substitution and builds
/// its diff entry, already canonicalised.
fn compare_runs(
    run_a: &PipelineRun,
    run_b: &PipelineRun,
    predictions: &PredictionsCache,
) -> Result<Option<(PrimitivePair, PipelineRunPairDiffEntry)>, OutputDifferenceError> {
    if !run_a.is_one_step_off_from(run_b) {
        return Ok(None);
    }

    let mismatches = run_a.pipeline.step_mismatches(&run_b.pipeline);
    // a one-sided mismatch is an added or removed step, not a substitution
    let Some(&(Some(prim_a), Some(prim_b))) = mismatches.first() else {
        return Ok(None);
    };
    if !prim_a.is_same_position_different_kind(prim_b) {
        return Ok(None);
    }

    let PredictionsLoad::Usable(preds_a) = predictions.get(run_a) else {
        return Ok(None);
    };
    let PredictionsLoad::Usable(preds_b) = predictions.get(run_b) else {
        return Ok(None);
    };
    if !preds_a.same_dtype_as(&preds_b) {
        debug!(
            "runs {} and {} predict different value types, skipping",
            run_a.id, run_b.id
        );
        return Ok(None);
    }

    let (run_a, run_b, preds_a, preds_b, pair) = if prim_a.id <= prim_b.id {
        (run_a, run_b, preds_a, preds_b, (prim_a.id.clone(), prim_b.id.clone()))
    } else {
        (run_b, run_a, preds_b, preds_a, (prim_b.id.clone(), prim_a.id.clone()))
    };

    let (output_difference, output_difference_metric) =
        match run_a.get_output_difference_from(run_b, &preds_a, &preds_b) {
            Ok(difference) => difference,
            Err(e) if e.is_recoverable() => {
                warn!(
                    "skipping runs {} and {}: {}",
                    run_a.id, run_b.id, e.source
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

    let score_diffs = run_a
        .get_scores_of_common_metrics(run_b)
        .into_iter()
        .map(|(metric, (score_a, score_b))| ScoreDiff {
            metric: metric.to_string(),
            metric_score_diff: score_b.value - score_a.value,
        })
        .collect();

    Ok(Some((
        pair,
        PipelineRunPairDiffEntry {
            run_a: run_a.id.clone(),
            run_b: run_b.id.clone(),
            output_difference,
            output_difference_metric,
            score_diffs,
        },
    )))
}

fn merge(mut into: DiffMap, from: DiffMap) -> DiffMap {
    for (pair, diffs) in from {
        into.entry(pair).or_default().extend(diffs);
    }
    into
}

/// Scans every pair of valid runs for one-step primitive substitutions.
///
/// `threads == 0` uses one worker per core. Output-difference failures
/// other than two runs sharing no predicted row abort the scan.
pub fn compare_primitive_pairs(
    maps: &EntityMaps,
    predictions: &PredictionsCache,
    threads: usize,
) -> Result<PrimitivePairComparison> {
    let prim_id_to_paths = collect_primitives(maps);
    let prim_ids: Vec<String> = prim_id_to_paths.keys().cloned().collect();

    let valid_runs: Vec<&Arc<PipelineRun>> = maps.runs().filter(|run| is_valid_for_comparison(run)).collect();
    let num_runs = valid_runs.len();
    let num_pairs = num_runs * num_runs.saturating_sub(1) / 2;
    info!(
        "{} of {} pipeline runs are valid, comparing {} pairs",
        num_runs,
        maps.pipeline_runs.len(),
        num_pairs
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build the comparison thread pool")?;

    let compared = AtomicUsize::new(0);
    let observed = pool.install(|| {
        (0..num_runs)
            .into_par_iter()
            .map(|i| {
                let mut partial = DiffMap::new();
                for j in (i + 1)..num_runs {
                    if let Some((pair, entry)) = compare_runs(valid_runs[i], valid_runs[j], predictions)? {
                        partial.entry(pair).or_default().push(entry);
                    }
                }
                let batch = num_runs - i - 1;
                let done = compared.fetch_add(batch, Ordering::Relaxed) + batch;
                if done / PROGRESS_LOG_INTERVAL > (done - batch) / PROGRESS_LOG_INTERVAL {
                    info!("compared {done} of {num_pairs} run pairs");
                }
                Ok::<_, OutputDifferenceError>(partial)
            })
            .try_reduce(DiffMap::new, |a, b| Ok(merge(a, b)))
    })?;

    let mut ppcm: DiffMap = prim_ids
        .iter()
        .tuple_combinations()
        .map(|(a, b)| ((a.clone(), b.clone()), Vec::new()))
        .collect();
    ppcm = merge(ppcm, observed);
    for diffs in ppcm.values_mut() {
        diffs.sort_by(|x, y| (&x.run_a, &x.run_b).cmp(&(&y.run_a, &y.run_b)));
    }

    let comparison = PrimitivePairComparison {
        ppcm,
        prim_id_to_paths,
        prim_ids,
    };
    info!(
        "found {} substitutions across {} primitive pairs ({} predictions loaded)",
        comparison.num_diff_entries(),
        comparison.observed_pairs().count(),
        predictions.loads_performed()
    );
    Ok(comparison)
}
