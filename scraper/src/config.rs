use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::RetryPolicy;
use crate::errors::ConfigError;
use crate::task::MonthRange;

pub const DEFAULT_PAGE_URL: &str =
    "https://www.transtats.bts.gov/DL_SelectFields.aspx?gnoyr_VQ=FGJ&QO_fu146_anzr=";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_ARCHIVE_NAME: &str = "DL_SelectFields.zip";
/// Chrome's temporary download extension
pub const DEFAULT_IN_PROGRESS_SUFFIX: &str = ".crdownload";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScraperConfig {
    /// Where the browser drops the archive. Also used as the extraction scratch dir.
    pub download_dir: PathBuf,
    /// Where the renamed CSV files end up.
    pub target_dir: PathBuf,
    pub year: i32,
    pub month_start: u32,
    pub month_end: u32,
    pub page_url: String,
    pub webdriver_url: String,
    pub headless: bool,
    pub archive_name: String,
    pub in_progress_suffix: String,
    pub download_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// The site can take well over five minutes to start an export
    pub browser_timeout_secs: u64,
    pub page_ready_timeout_secs: u64,
    pub delete_attempts: u32,
    pub delete_delay_secs: u64,
    /// Log a failed month and move on instead of aborting the run
    pub keep_going: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            download_dir: PathBuf::new(),
            target_dir: PathBuf::new(),
            year: 2024,
            month_start: 1,
            month_end: 1,
            page_url: DEFAULT_PAGE_URL.to_string(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: false,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            in_progress_suffix: DEFAULT_IN_PROGRESS_SUFFIX.to_string(),
            download_timeout_secs: 600,
            poll_interval_secs: 5,
            browser_timeout_secs: 900,
            page_ready_timeout_secs: 60,
            delete_attempts: 3,
            delete_delay_secs: 1,
            keep_going: false,
        }
    }
}

impl ScraperConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("download_dir"));
        }
        if self.target_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("target_dir"));
        }
        if self.archive_name.is_empty() {
            return Err(ConfigError::Missing("archive_name"));
        }
        self.month_range()?;
        Ok(())
    }

    pub fn month_range(&self) -> Result<MonthRange, ConfigError> {
        Ok(MonthRange::new(self.year, self.month_start, self.month_end)?)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_timeout_secs)
    }

    pub fn page_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.page_ready_timeout_secs)
    }

    pub fn delete_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.delete_attempts,
            delay: Duration::from_secs(self.delete_delay_secs),
        }
    }
}
