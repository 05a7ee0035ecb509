pub mod app_config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod organize;
pub mod report;
pub mod utils;

pub use app_config::AppConfig;
pub use engine::{Engine, Progress, RunHandle, RunOptions, RunPhase, RunReport};
pub use error::{Error, Result};
