use chrono::NaiveDate;
use std::fmt;

use crate::errors::TaskError;

/// One (year, month) unit of work. Only constructed through [`DownloadTask::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadTask {
    year: i32,
    month: u32,
}

impl DownloadTask {
    pub fn new(year: i32, month: u32) -> Result<Self, TaskError> {
        if !(1..=12).contains(&month) {
            return Err(TaskError::InvalidMonth(month));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(TaskError::InvalidYear(year));
        }
        Ok(DownloadTask { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// `{month}_{year}` with no zero padding, e.g. `1_2024`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.month, self.year)
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}.csv", self.label())
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

/// Inclusive range of months within a single year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    year: i32,
    start: u32,
    end: u32,
}

impl MonthRange {
    pub fn new(year: i32, start: u32, end: u32) -> Result<Self, TaskError> {
        // validates both endpoints
        DownloadTask::new(year, start)?;
        DownloadTask::new(year, end)?;
        if start > end {
            return Err(TaskError::EmptyRange { start, end });
        }
        Ok(MonthRange { year, start, end })
    }

    pub fn tasks(&self) -> impl Iterator<Item = DownloadTask> + '_ {
        (self.start..=self.end).map(move |month| DownloadTask {
            year: self.year,
            month,
        })
    }

    /// Never zero: the constructor rejects empty ranges.
    pub fn month_count(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}
