pub const WORKING_DIR: &str = "/tmp/metalearn/";
pub const LOG_FILE_NAME: &str = "metalearn.log";

pub const DEFAULT_DUMP_DIR: &str = "dump";
pub const DEFAULT_PREDICTIONS_DIR: &str = "dump/predictions";
pub const DEFAULT_CACHE_DIR: &str = ".cached-function-calls";

/// Column of a predictions table holding the dataset row index.
pub const D3M_INDEX_COLUMN: &str = "d3mIndex";

pub const STEP_TYPE_PRIMITIVE: &str = "PRIMITIVE";
pub const STEP_TYPE_SUBPIPELINE: &str = "SUBPIPELINE";

pub const DEFAULT_SCORE_TOLERANCE: f64 = 0.001;
pub const DEFAULT_MAX_DUPLICATE_DATASETS: usize = 10;

// number of compared run pairs between two progress lines
pub const PROGRESS_LOG_INTERVAL: usize = 250_000;

// how many prediction values are echoed when an output difference can't be computed
pub const PREDICTION_SAMPLE_LEN: usize = 5;
