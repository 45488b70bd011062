use crate::commands::{AggregateArgs, AggregationKind, Cli, Commands};
use crate::config::{Config, ConfigLoader};
use crate::logging::setup_logging;
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use metalearn_aggregations::{
    compare_primitive_pairs, compute_basic_stats, find_duplicate_pipelines, is_valid_for_comparison,
    DuplicatePipelinesReport, JobCache, PrimitivePairComparison,
};
use metalearn_extracts::{extract_denormalized, DirPredictionsStore, EntityMaps, PredictionsCache};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

pub fn process_cli() -> Result<()> {
    let cli = Cli::parse();
    // Use the --config flag, if provided, when loading the configuration
    let config = ConfigLoader::load_config(cli.config.as_deref())?;

    let verbose = matches!(&cli.command, Commands::Aggregate(args) if args.verbose);
    setup_logging(&config.working_dir, verbose)?;
    info!("configuration sources: {:?}", config.config_sources);

    match cli.command {
        Commands::Extract => extract(&config),
        Commands::Aggregate(args) => aggregate(&config, &args),
        Commands::Config => print_config(&config),
    }
}

fn load_corpus(config: &Config) -> Result<EntityMaps> {
    extract_denormalized(&config.dump_dir, config.extract_options())
        .with_context(|| format!("failed to extract the dump at {}", config.dump_dir.display()))
}

fn extract(config: &Config) -> Result<()> {
    let maps = load_corpus(config)?;
    let comparable = maps.runs().filter(|run| is_valid_for_comparison(run)).count();

    println!("{}", format!("Extracted {}", config.dump_dir.display()).bold());
    println!("  pipelines:       {}", maps.pipelines.len());
    println!("  problems:        {}", maps.problems.len());
    println!("  datasets:        {}", maps.datasets.len());
    println!("  pipeline runs:   {}", maps.pipeline_runs.len());
    println!("  comparable runs: {}", comparable.to_string().green());

    let stats = compute_basic_stats(&maps);
    println!("{}", "Runs".bold());
    for (phase, count) in &stats.run_phases {
        println!("  {phase:<16} {count}");
    }
    for (num_scores, count) in &stats.scores_per_run {
        println!("  with {num_scores} score(s): {count}");
    }
    println!("{}", "Scores".bold());
    for (metric, count) in &stats.metrics {
        println!("  {metric:<16} {count}");
    }
    println!("  normalized:      {}", stats.num_normalized_scores);
    Ok(())
}

/// Results depend on the dump they were computed from, the runs index, and
/// for the duplicate analysis its parameters.
fn job_id(config: &Config, kind: AggregationKind) -> String {
    let dump = path_key(&config.dump_dir);
    match kind {
        AggregationKind::PrimitivePairs => format!(
            "{kind}-{dump}-{}-{}",
            path_key(&config.predictions_dir),
            config.pipeline_runs_index
        ),
        AggregationKind::DuplicatePipelines => format!(
            "{kind}-{dump}-{}-{}-{}",
            config.pipeline_runs_index, config.score_tolerance, config.max_duplicate_datasets
        ),
    }
}

/// File-name safe rendering of a path.
fn path_key(path: &Path) -> String {
    path.to_string_lossy()
        .trim_matches(|c: char| c == '/' || c == '\\')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn aggregate(config: &Config, args: &AggregateArgs) -> Result<()> {
    let cache = JobCache::new(config.cache_dir.clone());
    let job_id = job_id(config, args.kind);
    info!("running job {job_id} (refresh: {})", args.refresh);

    match args.kind {
        AggregationKind::PrimitivePairs => {
            let comparison: PrimitivePairComparison =
                cache.compute_or_load(&job_id, args.refresh, || {
                    let maps = load_corpus(config)?;
                    let predictions =
                        PredictionsCache::new(DirPredictionsStore::new(config.predictions_dir.clone()));
                    compare_primitive_pairs(&maps, &predictions, config.threads)
                })?;
            print_primitive_pairs(&comparison, args.verbose);
            write_output(args.output.as_deref(), &comparison)
        }
        AggregationKind::DuplicatePipelines => {
            let report: DuplicatePipelinesReport =
                cache.compute_or_load(&job_id, args.refresh, || {
                    let maps = load_corpus(config)?;
                    Ok(find_duplicate_pipelines(
                        &maps,
                        config.score_tolerance,
                        config.max_duplicate_datasets,
                    ))
                })?;
            print_duplicate_pipelines(&report, args.verbose);
            write_output(args.output.as_deref(), &report)
        }
    }
}

fn print_primitive_pairs(comparison: &PrimitivePairComparison, verbose: bool) {
    println!("{}", "Primitive pair comparison".bold());
    println!("  primitives:     {}", comparison.prim_ids.len());
    println!(
        "  observed pairs: {} of {}",
        comparison.observed_pairs().count().to_string().green(),
        comparison.ppcm.len()
    );
    println!("  substitutions:  {}", comparison.num_diff_entries());

    if !verbose {
        return;
    }
    for ((prim_a, prim_b), diffs) in comparison.observed_pairs() {
        println!("  {} / {}: {} run pair(s)", prim_a.cyan(), prim_b.cyan(), diffs.len());
        for diff in diffs {
            println!(
                "    {} vs {}: {} {:.4}",
                diff.run_a, diff.run_b, diff.output_difference_metric, diff.output_difference
            );
        }
    }
}

fn print_duplicate_pipelines(report: &DuplicatePipelinesReport, verbose: bool) {
    println!(
        "{}",
        format!("Duplicate pipelines (score tolerance {})", report.score_tolerance).bold()
    );
    if report.datasets.is_empty() {
        println!("  {}", "no dataset has runs with matching scores".yellow());
        return;
    }
    for dataset in &report.datasets {
        println!("  {}: {} pair(s)", dataset.dataset_digest.cyan(), dataset.pairs.len());
        if verbose {
            for pair in &dataset.pairs {
                println!(
                    "    {} ({}) ~ {} ({})",
                    pair.run_a, pair.pipeline_a, pair.run_b, pair.pipeline_b
                );
            }
        }
    }
}

fn write_output<T: Serialize>(path: Option<&Path>, result: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), result)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display().to_string().green());
    Ok(())
}

fn print_config(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
