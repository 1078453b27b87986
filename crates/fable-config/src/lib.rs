//! Configuration, paths, and logging initialization for the Fable client core.

mod config;
mod error;
pub mod logging;
mod paths;

pub use config::{Config, DEFAULT_API_URL, DEFAULT_LOG_LEVEL, DEFAULT_PUBLISHABLE_KEY};
pub use error::{CoreError, CoreResult};
pub use paths::Paths;
