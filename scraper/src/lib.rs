pub mod archive;
pub mod config;
pub mod driver;
pub mod errors;
pub mod page;
pub mod pipeline;
pub mod task;
pub mod trigger;
pub mod watcher;

#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::archive::{delete_with_retries, ArchiveProcessor, RetryPolicy};
pub use crate::config::ScraperConfig;
pub use crate::driver::{Element, FormDriver, SessionOptions, WebDriverSession};
pub use crate::errors::{ArchiveError, ConfigError, DriverError, TaskError, WatchError};
pub use crate::page::PageController;
pub use crate::pipeline::{RunSummary, Scraper};
pub use crate::task::{DownloadTask, MonthRange};
pub use crate::trigger::DownloadTrigger;
pub use crate::watcher::{CompletionSignal, FsPollWatcher};
