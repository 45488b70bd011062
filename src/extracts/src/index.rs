use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Indexes of the metalearning database, one dump file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Index {
    Pipelines,
    PipelineRunsTrusted,
    PipelineRunsUntrusted,
    Problems,
    Datasets,
}

impl Index {
    pub fn as_str(&self) -> &'static str {
        match self {
            Index::Pipelines => "pipelines",
            Index::PipelineRunsTrusted => "pipeline_runs_trusted",
            Index::PipelineRunsUntrusted => "pipeline_runs_untrusted",
            Index::Problems => "problems",
            Index::Datasets => "datasets",
        }
    }

    pub fn is_pipeline_runs(&self) -> bool {
        matches!(self, Index::PipelineRunsTrusted | Index::PipelineRunsUntrusted)
    }

    pub fn dump_path(&self, dump_dir: &Path) -> PathBuf {
        dump_dir.join(format!("{}.json", self.as_str()))
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Index {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "pipelines" => Ok(Index::Pipelines),
            "pipeline_runs_trusted" => Ok(Index::PipelineRunsTrusted),
            "pipeline_runs_untrusted" => Ok(Index::PipelineRunsUntrusted),
            "problems" => Ok(Index::Problems),
            "datasets" => Ok(Index::Datasets),
            other => anyhow::bail!("unknown index '{other}'"),
        }
    }
}

/// Reads a dumped index: one JSON document per line.
pub struct DumpReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
}

impl DumpReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)
            .with_context(|| format!("failed to open dump file {}", path.display()))?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }

    pub fn open_index(dump_dir: &Path, index: Index) -> Result<Self> {
        Self::open(index.dump_path(dump_dir))
    }
}

impl Iterator for DumpReader {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err::<Value, _>(e).with_context(|| {
                        format!("failed to read {}:{}", self.path.display(), self.line_number)
                    }))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).with_context(|| {
                format!("malformed JSON document at {}:{}", self.path.display(), self.line_number)
            }));
        }
    }
}
