//! Side-store of per-run prediction blobs and the lazy per-run cache in
//! front of it.

use metalearn_common::entities::{PipelineRun, Predictions, PredsLoadStatus};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Yields the raw prediction blob of a run, `None` when there is none.
pub trait PredictionsStore: Send + Sync {
    fn load(&self, run_id: &str) -> Option<Value>;
}

/// Blobs dumped as `<dir>/<run_id>.json`.
pub struct DirPredictionsStore {
    dir: PathBuf,
}

impl DirPredictionsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PredictionsStore for DirPredictionsStore {
    fn load(&self, run_id: &str) -> Option<Value> {
        let path = self.dir.join(format!("{run_id}.json"));
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no predictions dumped for run {run_id}");
                return None;
            }
            Err(e) => {
                warn!("failed to read predictions at {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(blob) => Some(blob),
            Err(e) => {
                warn!("malformed predictions at {}: {e}", path.display());
                None
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryPredictionsStore {
    blobs: HashMap<String, Value>,
}

impl InMemoryPredictionsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, run_id: impl Into<String>, blob: Value) {
        self.blobs.insert(run_id.into(), blob);
    }
}

impl PredictionsStore for InMemoryPredictionsStore {
    fn load(&self, run_id: &str) -> Option<Value> {
        self.blobs.get(run_id).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionsLoad {
    Usable(Arc<Predictions>),
    NotUsable,
}

impl PredictionsLoad {
    pub fn status(&self) -> PredsLoadStatus {
        match self {
            PredictionsLoad::Usable(_) => PredsLoadStatus::Usable,
            PredictionsLoad::NotUsable => PredsLoadStatus::NotUsable,
        }
    }
}

/// Loads each run's predictions on first use and remembers the outcome, so
/// a run taking part in many comparisons is read once. Safe to share
/// between worker threads.
pub struct PredictionsCache {
    store: Box<dyn PredictionsStore>,
    cells: Mutex<HashMap<String, Arc<OnceCell<PredictionsLoad>>>>,
    loads: AtomicUsize,
}

impl PredictionsCache {
    pub fn new(store: impl PredictionsStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cells: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, run: &PipelineRun) -> PredictionsLoad {
        if run.preds_load_status == PredsLoadStatus::NotUsable {
            return PredictionsLoad::NotUsable;
        }

        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells.entry(run.id.clone()).or_default().clone()
        };
        // loaded outside the map lock so other runs are not blocked on I/O
        cell.get_or_init(|| self.load(run)).clone()
    }

    fn load(&self, run: &PipelineRun) -> PredictionsLoad {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let predictions = self
            .store
            .load(&run.id)
            .and_then(|blob| run.predictions_from_blob(&blob));
        match predictions {
            Some(predictions) => PredictionsLoad::Usable(Arc::new(predictions)),
            None => {
                debug!("predictions of run {} are not usable", run.id);
                PredictionsLoad::NotUsable
            }
        }
    }

    /// Number of blobs actually read from the store.
    pub fn loads_performed(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}
