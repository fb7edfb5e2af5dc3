use anyhow::{Context, Result};
use log::{error, info, warn};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::archive::{delete_with_retries, ArchiveProcessor, RetryPolicy};
use crate::config::ScraperConfig;
use crate::driver::FormDriver;
use crate::page::PageController;
use crate::task::{DownloadTask, MonthRange};
use crate::trigger::DownloadTrigger;
use crate::watcher::{CompletionSignal, FsPollWatcher};

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<(DownloadTask, Vec<PathBuf>)>,
    pub failed: Vec<(DownloadTask, String)>,
}

/// Runs every month of the range through trigger, wait and extraction,
/// one at a time, on a single browser session.
pub struct Scraper<D, W> {
    driver: D,
    watcher: W,
    page: PageController,
    trigger: DownloadTrigger,
    processor: ArchiveProcessor,
    months: MonthRange,
    archive_name: String,
    archive_path: PathBuf,
    marker_path: PathBuf,
    delete_policy: RetryPolicy,
    keep_going: bool,
}

impl<D: FormDriver> Scraper<D, FsPollWatcher> {
    pub fn from_config(config: &ScraperConfig, driver: D) -> Result<Self> {
        let watcher = FsPollWatcher::new(&config.download_dir, &config.in_progress_suffix)
            .timeout(config.download_timeout())
            .poll_interval(config.poll_interval());
        Scraper::with_watcher(config, driver, watcher)
    }
}

impl<D: FormDriver, W: CompletionSignal> Scraper<D, W> {
    pub fn with_watcher(config: &ScraperConfig, driver: D, watcher: W) -> Result<Self> {
        config.validate().context("Invalid scraper configuration")?;
        let archive_path = config.download_dir.join(&config.archive_name);
        let mut marker = OsString::from(archive_path.as_os_str());
        marker.push(&config.in_progress_suffix);
        Ok(Scraper {
            driver,
            watcher,
            page: PageController::new(&config.page_url).ready_timeout(config.page_ready_timeout()),
            trigger: DownloadTrigger::new(config.browser_timeout()),
            processor: ArchiveProcessor::new(&config.download_dir, &config.target_dir)
                .delete_policy(config.delete_policy()),
            months: config.month_range()?,
            archive_name: config.archive_name.clone(),
            archive_path,
            marker_path: PathBuf::from(marker),
            delete_policy: config.delete_policy(),
            keep_going: config.keep_going,
        })
    }

    pub fn page_controller(mut self, page: PageController) -> Self {
        self.page = page;
        self
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        self.page
            .prepare(&mut self.driver)
            .context("Failed to prepare the field selection page")?;

        info!("Scraping {} month(s)", self.months.month_count());
        let mut summary = RunSummary::default();
        let tasks: Vec<DownloadTask> = self.months.tasks().collect();
        for task in tasks {
            match self.download(&task) {
                Ok(files) => summary.completed.push((task, files)),
                Err(e) if self.keep_going => {
                    error!("{:#}", e);
                    summary.failed.push((task, format!("{:#}", e)));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    /// Clear leftovers, trigger, wait, extract. Any failure ends the task.
    pub fn download(&mut self, task: &DownloadTask) -> Result<Vec<PathBuf>> {
        let context = || {
            format!(
                "Error while downloading for {}-{}",
                task.year(),
                task.month()
            )
        };

        self.clear_leftovers().with_context(context)?;
        self.trigger
            .trigger(&mut self.driver, task)
            .with_context(context)?;
        let archive_path = self
            .watcher
            .wait(&self.archive_name, task)
            .with_context(context)?;
        self.processor
            .process(&archive_path, task)
            .with_context(context)
    }

    /// An archive or marker left by an earlier run, or by a month that timed
    /// out, would otherwise be picked up as this month's download.
    fn clear_leftovers(&self) -> Result<()> {
        for path in [&self.marker_path, &self.archive_path] {
            if path.exists() {
                warn!("Removing leftover download {}", path.display());
                delete_with_retries(path, &self.delete_policy);
            }
        }
        if self.archive_path.exists() {
            return Err(anyhow::anyhow!(
                "Leftover archive {} could not be removed",
                self.archive_path.display()
            ));
        }
        Ok(())
    }
}
