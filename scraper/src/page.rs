use log::{debug, info};
use std::thread;
use std::time::{Duration, Instant};

use crate::driver::{Element, FormDriver};
use crate::errors::DriverError;

pub const DOWNLOAD_BUTTON_SELECTOR: &str = "input[type='submit']#btnDownload";

/// Pre-checked ID columns that the export does not need.
pub const DEFAULT_UNCHECKED: &[&str] = &[
    "ORIGIN_AIRPORT_ID",
    "ORIGIN_AIRPORT_SEQ_ID",
    "ORIGIN_CITY_MARKET_ID",
    "DEST_AIRPORT_ID",
    "DEST_AIRPORT_SEQ_ID",
    "DEST_CITY_MARKET_ID",
];

pub const DEFAULT_CHECKED: &[&str] = &[
    // time period
    "YEAR",
    "MONTH",
    "DAY_OF_MONTH",
    "DAY_OF_WEEK",
    "FL_DATE",
    // airline
    "OP_UNIQUE_CARRIER",
    "OP_CARRIER_FL_NUM",
    "TAIL_NUM",
    // origin
    "ORIGIN",
    "ORIGIN_CITY_NAME",
    // destination
    "DEST",
    "DEST_CITY_NAME",
    // departure performance
    "DEP_TIME",
    "CRS_DEP_TIME",
    "DEP_DELAY",
    "TAXI_OUT",
    // arrival performance
    "ARR_TIME",
    "CRS_ARR_TIME",
    "ARR_DELAY",
    "TAXI_IN",
    // cancellations and diversions
    "CANCELLED",
    "CANCELLATION_CODE",
    "DIVERTED",
    // flight summaries
    "ACTUAL_ELAPSED_TIME",
    "CRS_ELAPSED_TIME",
    "AIR_TIME",
    "DISTANCE",
    // cause of delay
    "CARRIER_DELAY",
    "WEATHER_DELAY",
    "NAS_DELAY",
    "SECURITY_DELAY",
    "LATE_AIRCRAFT_DELAY",
];

/// Loads the field-selection page and puts its checkboxes into a fixed state.
#[derive(Debug, Clone)]
pub struct PageController {
    url: String,
    ready_timeout: Duration,
    poll_interval: Duration,
    unchecked: Vec<String>,
    checked: Vec<String>,
}

impl PageController {
    pub fn new(url: &str) -> Self {
        PageController {
            url: url.to_string(),
            ready_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            unchecked: DEFAULT_UNCHECKED.iter().map(|s| s.to_string()).collect(),
            checked: DEFAULT_CHECKED.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn fields(mut self, unchecked: Vec<String>, checked: Vec<String>) -> Self {
        self.unchecked = unchecked;
        self.checked = checked;
        self
    }

    pub fn prepare<D: FormDriver>(&self, driver: &mut D) -> Result<(), DriverError> {
        info!("Navigating to {}...", self.url);
        driver.goto(&self.url)?;
        self.wait_until_clickable(driver, DOWNLOAD_BUTTON_SELECTOR)?;

        for id in &self.unchecked {
            set_checkbox(driver, id, false)?;
        }
        for id in &self.checked {
            set_checkbox(driver, id, true)?;
        }
        info!(
            "Field selection applied ({} unchecked, {} checked)",
            self.unchecked.len(),
            self.checked.len()
        );
        Ok(())
    }

    fn wait_until_clickable<D: FormDriver>(
        &self,
        driver: &mut D,
        selector: &str,
    ) -> Result<Element, DriverError> {
        let started = Instant::now();
        loop {
            let probe = driver.find_by_css(selector).and_then(|element| {
                let clickable = driver.is_clickable(&element)?;
                Ok(clickable.then_some(element))
            });
            match probe {
                Ok(Some(element)) => return Ok(element),
                Ok(None) => {}
                Err(e) if e.is_not_yet_present() => {}
                Err(e) => return Err(e),
            }

            let waited = started.elapsed();
            if waited >= self.ready_timeout {
                return Err(DriverError::Timeout {
                    what: format!("{} to become clickable", selector),
                    waited,
                });
            }
            debug!("{} not clickable yet", selector);
            thread::sleep(self.poll_interval.min(self.ready_timeout - waited));
        }
    }
}

/// Clicks the checkbox only if it is really an `<input type="checkbox">`
/// whose state differs from `checked`.
fn set_checkbox<D: FormDriver>(driver: &mut D, id: &str, checked: bool) -> Result<(), DriverError> {
    let element = driver.find_by_id(id)?;
    if driver.tag_name(&element)? != "input" {
        return Ok(());
    }
    if driver.attribute(&element, "type")?.as_deref() != Some("checkbox") {
        return Ok(());
    }
    if driver.is_selected(&element)? != checked {
        driver.click(&element)?;
        debug!("Toggled {} to {}", id, checked);
    }
    Ok(())
}
