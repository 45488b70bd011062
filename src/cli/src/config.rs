use anyhow::{Context, Result};
use config::{Config as RConfig, Environment, File, FileFormat};
use metalearn_common::constants::{
    DEFAULT_CACHE_DIR, DEFAULT_DUMP_DIR, DEFAULT_MAX_DUPLICATE_DATASETS, DEFAULT_PREDICTIONS_DIR,
    DEFAULT_SCORE_TOLERANCE, WORKING_DIR,
};
use metalearn_extracts::{ExtractOptions, Index};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub dump_dir: PathBuf,
    pub predictions_dir: PathBuf,
    pub pipeline_runs_index: Index,
    pub enforce_ids: bool,
    pub strict_references: bool,

    pub cache_dir: PathBuf,
    pub working_dir: PathBuf,

    /// 0 means one worker per core
    pub threads: usize,
    pub score_tolerance: f64,
    pub max_duplicate_datasets: usize,

    pub config_sources: Vec<String>,
}

impl Config {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            pipeline_runs_index: self.pipeline_runs_index,
            enforce_ids: self.enforce_ids,
            strict_references: self.strict_references,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the TOML file at `path` if given, then `METALEARN_*`
    /// environment variables.
    pub fn load_config(path: Option<&str>) -> Result<Config> {
        let mut builder = RConfig::builder()
            .set_default("dump_dir", DEFAULT_DUMP_DIR)?
            .set_default("predictions_dir", DEFAULT_PREDICTIONS_DIR)?
            .set_default("pipeline_runs_index", Index::PipelineRunsTrusted.as_str())?
            .set_default("enforce_ids", true)?
            .set_default("strict_references", true)?
            .set_default("cache_dir", DEFAULT_CACHE_DIR)?
            .set_default("working_dir", WORKING_DIR)?
            .set_default("threads", 0)?
            .set_default("score_tolerance", DEFAULT_SCORE_TOLERANCE)?
            .set_default("max_duplicate_datasets", DEFAULT_MAX_DUPLICATE_DATASETS as u64)?;

        let mut sources = Vec::new();
        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Toml).required(true));
            sources.push(path.to_string());
        }
        builder = builder
            .add_source(Environment::with_prefix("METALEARN").try_parsing(true))
            .set_override("config_sources", sources)?;

        builder
            .build()
            .with_context(|| format!("failed to load config from {}", path.unwrap_or("defaults")))?
            .try_deserialize()
            .context("failed to parse config")
    }
}
