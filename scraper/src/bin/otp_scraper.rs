use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

use otp_scraper::{Scraper, ScraperConfig, SessionOptions, WebDriverSession};

/// Download monthly on-time performance CSVs from BTS TranStats
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    year: Option<i32>,

    /// First month to download (1-12)
    #[arg(long)]
    month_start: Option<u32>,

    /// Last month to download, inclusive (1-12)
    #[arg(long)]
    month_end: Option<u32>,

    /// Directory the browser downloads into
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Directory the renamed CSV files are moved to
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// WebDriver endpoint, e.g. a running chromedriver
    #[arg(long)]
    webdriver_url: Option<String>,

    #[arg(long)]
    headless: bool,

    /// Log failed months and continue with the next one
    #[arg(long)]
    keep_going: bool,
}

impl Cli {
    fn into_config(self) -> Result<ScraperConfig> {
        let mut config = match &self.config {
            Some(path) => ScraperConfig::from_json_file(path)?,
            None => ScraperConfig::default(),
        };

        if let Some(year) = self.year {
            config.year = year;
        }
        if let Some(month) = self.month_start {
            config.month_start = month;
        }
        if let Some(month) = self.month_end {
            config.month_end = month;
        }
        if let Some(dir) = self.download_dir {
            config.download_dir = dir;
        }
        if let Some(dir) = self.target_dir {
            config.target_dir = dir;
        }
        if let Some(url) = self.webdriver_url {
            config.webdriver_url = url;
        }
        config.headless |= self.headless;
        config.keep_going |= self.keep_going;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config()?;
    info!(
        "Downloading {}-{}..{} into {}",
        config.year,
        config.month_start,
        config.month_end,
        config.target_dir.display()
    );

    let session = WebDriverSession::start(
        &SessionOptions {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            command_timeout: config.browser_timeout() + Duration::from_secs(60),
        },
        &config.download_dir,
    )
    .with_context(|| format!("Failed to start a browser session at {}", config.webdriver_url))?;

    let mut scraper = Scraper::from_config(&config, session)?;
    let result = scraper.run();
    if let Err(e) = scraper.into_driver().close() {
        warn!("Failed to close browser session: {}", e);
    }
    let summary = result?;

    for (task, files) in &summary.completed {
        for file in files {
            info!("{} -> {}", task.label(), file.display());
        }
    }
    if !summary.failed.is_empty() {
        for (task, reason) in &summary.failed {
            warn!("{} failed: {}", task.label(), reason);
        }
        return Err(anyhow::anyhow!(
            "{} of {} month(s) failed",
            summary.failed.len(),
            summary.failed.len() + summary.completed.len()
        ));
    }

    Ok(())
}
