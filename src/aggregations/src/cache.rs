use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Compute-or-load memoisation of whole aggregation jobs, one JSON file per
/// job id.
pub struct JobCache {
    dir: PathBuf,
}

impl JobCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    /// Returns the cached result of `job_id` unless `refresh` is set or no
    /// readable result exists, in which case `compute` runs and its result
    /// is persisted.
    pub fn compute_or_load<T, F>(&self, job_id: &str, refresh: bool, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let path = self.path(job_id);
        if !refresh && path.exists() {
            match self.load(&path) {
                Ok(result) => {
                    info!("loaded cached result of {job_id} from {}", path.display());
                    return Ok(result);
                }
                Err(e) => warn!("ignoring unreadable cache entry {}: {e:#}", path.display()),
            }
        }

        let result = compute()?;
        self.store(&path, &result)?;
        info!("cached result of {job_id} at {}", path.display());
        Ok(result)
    }

    fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file)).context("failed to deserialize cached result")
    }

    fn store<T: Serialize>(&self, path: &Path, result: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache dir {}", self.dir.display()))?;
        let file = File::create(path)
            .with_context(|| format!("failed to create cache file {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), result).context("failed to write cached result")
    }
}
