use crate::corpus::{CorpusBuilder, EntityMaps};
use crate::index::{DumpReader, Index};
use anyhow::{Context, Result};
use metalearn_common::errors::EntityResult;
use serde_json::Value;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub pipeline_runs_index: Index,
    pub enforce_ids: bool,
    pub strict_references: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pipeline_runs_index: Index::PipelineRunsTrusted,
            enforce_ids: true,
            strict_references: true,
        }
    }
}

fn load_index<F>(dump_dir: &Path, index: Index, mut add: F) -> Result<usize>
where
    F: FnMut(&Value) -> EntityResult<()>,
{
    info!("loading index {index} from {}", index.dump_path(dump_dir).display());
    let mut count = 0;
    for document in DumpReader::open_index(dump_dir, index)? {
        let document = document?;
        add(&document).with_context(|| format!("failed to load document #{} of {index}", count + 1))?;
        count += 1;
    }
    info!("loaded {count} documents from {index}");
    Ok(count)
}

/// Loads the four dumped indexes and builds the denormalized corpus: every
/// run linked to its pipeline (sub-pipelines included), problem and
/// datasets.
pub fn extract_denormalized(dump_dir: &Path, options: ExtractOptions) -> Result<EntityMaps> {
    anyhow::ensure!(
        options.pipeline_runs_index.is_pipeline_runs(),
        "{} is not a pipeline runs index",
        options.pipeline_runs_index
    );

    let mut builder = CorpusBuilder::new(options.enforce_ids, options.strict_references);

    load_index(dump_dir, Index::Pipelines, |d| builder.add_pipeline(d))?;
    load_index(dump_dir, Index::Problems, |d| builder.add_problem(d))?;
    load_index(dump_dir, Index::Datasets, |d| builder.add_dataset(d))?;
    load_index(dump_dir, options.pipeline_runs_index, |d| builder.add_pipeline_run(d))?;

    builder.build().context("failed to resolve corpus references")
}
