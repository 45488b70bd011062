mod common;

use common::*;
use metalearn_aggregations::find_duplicate_pipelines;
use pretty_assertions_sorted::assert_eq;

#[test]
fn test_runs_with_matching_scores() {
    let (maps, _) = scenario();
    let report = find_duplicate_pipelines(&maps, 0.001, 10);

    assert_eq!(report.datasets.len(), 1);
    let iris = &report.datasets[0];
    assert_eq!(iris.dataset_digest, "ds-iris");
    let pairs: Vec<(&str, &str)> = iris
        .pairs
        .iter()
        .map(|pair| (pair.run_a.as_str(), pair.run_b.as_str()))
        .collect();
    // one run per distinct pipeline: run-gb stands in for every pipe-gb run
    assert_eq!(pairs, vec![("run-knn", "run-rf")]);
    assert_eq!(iris.pairs[0].common_scores[0].metric, "ACCURACY");
}

#[test]
fn test_tolerance_and_report_length() {
    let (maps, _) = scenario();
    assert!(find_duplicate_pipelines(&maps, 0.0, 10).datasets.is_empty());

    let loose = find_duplicate_pipelines(&maps, 1.0, 1);
    assert_eq!(loose.datasets.len(), 1);
    assert_eq!(loose.datasets[0].dataset_digest, "ds-iris");
}
