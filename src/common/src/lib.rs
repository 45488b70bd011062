pub mod constants;
pub mod entities;
pub mod errors;
pub mod metrics;
pub mod utils;
