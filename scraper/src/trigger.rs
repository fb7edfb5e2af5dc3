use log::{info, warn};
use std::time::Duration;

use crate::driver::FormDriver;
use crate::errors::DriverError;
use crate::task::DownloadTask;

pub const YEAR_SELECT_ID: &str = "cboYear";
pub const PERIOD_SELECT_ID: &str = "cboPeriod";
pub const DOWNLOAD_BUTTON_ID: &str = "btnDownload";

/// Starts the server-side export for one month.
#[derive(Debug, Clone)]
pub struct DownloadTrigger {
    browser_timeout: Duration,
}

impl Default for DownloadTrigger {
    fn default() -> Self {
        DownloadTrigger {
            browser_timeout: Duration::from_secs(900),
        }
    }
}

impl DownloadTrigger {
    pub fn new(browser_timeout: Duration) -> Self {
        DownloadTrigger { browser_timeout }
    }

    pub fn trigger<D: FormDriver>(
        &self,
        driver: &mut D,
        task: &DownloadTask,
    ) -> Result<(), DriverError> {
        // The export often takes longer than the driver's default five minutes to start
        driver.set_timeouts(self.browser_timeout, self.browser_timeout)?;

        let year_select = driver.find_by_id(YEAR_SELECT_ID)?;
        let period_select = driver.find_by_id(PERIOD_SELECT_ID)?;
        if driver.tag_name(&year_select)? == "select" && driver.tag_name(&period_select)? == "select"
        {
            driver.select_by_value(&year_select, &task.year().to_string())?;
            driver.select_by_value(&period_select, &task.month().to_string())?;
        } else {
            warn!("Year/period controls are not <select> elements, keeping page defaults");
        }

        let button = driver.find_by_id(DOWNLOAD_BUTTON_ID)?;
        driver.click(&button)?;
        info!("Download button for {} clicked.", task.label());
        Ok(())
    }
}
