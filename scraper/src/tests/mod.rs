use std::path::Path;

use crate::config::ScraperConfig;

pub mod fixtures;


/// Config pointing both directories into a test's temp dirs.
pub fn test_config(download_dir: &Path, target_dir: &Path) -> ScraperConfig {
    ScraperConfig {
        download_dir: download_dir.to_path_buf(),
        target_dir: target_dir.to_path_buf(),
        ..ScraperConfig::default()
    }
}
