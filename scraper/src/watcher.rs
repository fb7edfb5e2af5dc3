use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::WatchError;
use crate::task::DownloadTask;

/// Blocks until the download subsystem reports the archive as complete,
/// bounded by a timeout.
pub trait CompletionSignal {
    fn wait(&self, archive_name: &str, task: &DownloadTask) -> Result<PathBuf, WatchError>;
}

/// Watches the download directory for the archive to appear with no
/// in-progress sibling left next to it.
#[derive(Debug, Clone)]
pub struct FsPollWatcher {
    download_dir: PathBuf,
    in_progress_suffix: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl FsPollWatcher {
    pub fn new<P: AsRef<Path>>(download_dir: P, in_progress_suffix: &str) -> Self {
        FsPollWatcher {
            download_dir: download_dir.as_ref().to_path_buf(),
            in_progress_suffix: in_progress_suffix.to_string(),
            timeout: Duration::from_secs(600),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// `DL_SelectFields.zip` -> `DL_SelectFields.zip.crdownload`
    pub fn in_progress_path(&self, archive_path: &Path) -> PathBuf {
        let mut name = OsString::from(archive_path.as_os_str());
        name.push(&self.in_progress_suffix);
        PathBuf::from(name)
    }

    fn is_complete(&self, archive_path: &Path, marker_path: &Path) -> Result<bool, WatchError> {
        let exists = |path: &Path| {
            path.try_exists().map_err(|source| WatchError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        Ok(exists(archive_path)? && !exists(marker_path)?)
    }
}

impl CompletionSignal for FsPollWatcher {
    fn wait(&self, archive_name: &str, task: &DownloadTask) -> Result<PathBuf, WatchError> {
        let archive_path = self.download_dir.join(archive_name);
        let marker_path = self.in_progress_path(&archive_path);
        let started = Instant::now();

        while !self.is_complete(&archive_path, &marker_path)? {
            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(WatchError::Timeout {
                    label: task.label(),
                    waited,
                });
            }
            debug!(
                "Waiting on {} ({:.0?} elapsed)",
                archive_path.display(),
                waited
            );
            thread::sleep(self.poll_interval.min(self.timeout - waited));
        }

        info!("Downloaded {} successfully", task.label());
        Ok(archive_path)
    }
}
