use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::errors::ArchiveError;
use crate::task::DownloadTask;

/// Bounded retry schedule for deleting the downloaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveProcessor {
    scratch_dir: PathBuf,
    target_dir: PathBuf,
    delete_policy: RetryPolicy,
}

impl ArchiveProcessor {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(scratch_dir: P, target_dir: Q) -> Self {
        ArchiveProcessor {
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
            target_dir: target_dir.as_ref().to_path_buf(),
            delete_policy: RetryPolicy::default(),
        }
    }

    pub fn delete_policy(mut self, policy: RetryPolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Extracts the archive, moves every file entry into the target directory
    /// named after the task, and deletes the archive whether or not that
    /// succeeded.
    ///
    /// Returns the destination paths in archive order.
    pub fn process(
        &self,
        archive_path: &Path,
        task: &DownloadTask,
    ) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut extracted = Vec::new();
        let result = self
            .extract(archive_path, &mut extracted)
            .and_then(|()| self.relocate(&extracted, task));

        if let Err(e) = &result {
            error!("Error processing ZIP file: {}", e);
            discard_leftovers(&extracted);
        }

        delete_with_retries(archive_path, &self.delete_policy);
        result
    }

    /// Pushes each extracted file onto `extracted` as soon as it is written,
    /// so a failure partway through still reports what is on disk.
    fn extract(
        &self,
        archive_path: &Path,
        extracted: &mut Vec<PathBuf>,
    ) -> Result<(), ArchiveError> {
        let file = File::open(archive_path).map_err(|source| ArchiveError::Open {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let zip_error = |source| ArchiveError::Zip {
            path: archive_path.to_path_buf(),
            source,
        };
        let mut archive = zip::ZipArchive::new(file).map_err(zip_error)?;

        fs::create_dir_all(&self.scratch_dir).map_err(|source| ArchiveError::CreateDir {
            path: self.scratch_dir.clone(),
            source,
        })?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(zip_error)?;
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
            let out_path = self.scratch_dir.join(relative);
            let extract_error = |source| ArchiveError::Extract {
                path: out_path.clone(),
                source,
            };

            if entry.is_dir() {
                fs::create_dir_all(&out_path).map_err(extract_error)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(extract_error)?;
            }
            let mut out_file = File::create(&out_path).map_err(extract_error)?;
            extracted.push(out_path.clone());
            io::copy(&mut entry, &mut out_file).map_err(extract_error)?;
            debug!("Extracted {} to {}", entry.name(), out_path.display());
        }

        Ok(())
    }

    fn relocate(
        &self,
        extracted: &[PathBuf],
        task: &DownloadTask,
    ) -> Result<Vec<PathBuf>, ArchiveError> {
        fs::create_dir_all(&self.target_dir).map_err(|source| ArchiveError::CreateDir {
            path: self.target_dir.clone(),
            source,
        })?;

        if extracted.len() > 1 {
            warn!(
                "Archive for {} holds {} files, numbering all but the first",
                task.label(),
                extracted.len()
            );
        }

        let mut moved = Vec::with_capacity(extracted.len());
        for (index, from) in extracted.iter().enumerate() {
            let to = self.target_dir.join(destination_name(task, index));
            move_file(from, &to)?;
            info!("File {} renamed and moved to {}", from.display(), to.display());
            moved.push(to);
        }

        Ok(moved)
    }
}

/// Removes extracted files that never made it to the target directory.
fn discard_leftovers(extracted: &[PathBuf]) {
    for path in extracted {
        if !path.exists() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed leftover {}", path.display()),
            Err(e) => warn!("Failed to remove leftover {}: {}", path.display(), e),
        }
    }
}

/// `1_2024.csv` for the first entry, then `1_2024_2.csv`, `1_2024_3.csv`, ...
pub fn destination_name(task: &DownloadTask, index: usize) -> String {
    if index == 0 {
        task.csv_file_name()
    } else {
        format!("{}_{}.csv", task.label(), index + 1)
    }
}

/// Rename, falling back to copy + remove when the rename fails
/// (typically because the directories are on different filesystems).
fn move_file(from: &Path, to: &Path) -> Result<(), ArchiveError> {
    let move_error = |source| ArchiveError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Err(e) = fs::rename(from, to) {
        debug!("Rename of {} failed ({}), copying instead", from.display(), e);
        fs::copy(from, to).map_err(move_error)?;
        fs::remove_file(from).map_err(move_error)?;
    }
    Ok(())
}

/// Best-effort delete. Permission errors are retried per the policy; once
/// the attempts run out the file is left in place and nothing is reported
/// to the caller.
pub fn delete_with_retries(path: &Path, policy: &RetryPolicy) {
    delete_with_retries_using(path, policy, |p| fs::remove_file(p))
}

pub fn delete_with_retries_using<F>(path: &Path, policy: &RetryPolicy, mut remove: F)
where
    F: FnMut(&Path) -> io::Result<()>,
{
    for _ in 0..policy.attempts {
        if !path.exists() {
            return;
        }
        match remove(path) {
            Ok(()) => {
                info!("ZIP file {} deleted successfully", path.display());
                return;
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                thread::sleep(policy.delay);
                info!("Retrying to delete ZIP file: {}", path.display());
            }
            Err(e) => {
                warn!("Giving up on deleting {}: {}", path.display(), e);
                return;
            }
        }
    }
}
