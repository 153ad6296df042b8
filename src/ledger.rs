//! Dated failure records, one file per day.
use crate::error::FetchError;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

const UNKNOWN_CODE: i32 = -1;

pub struct FailureLedger {
    prefix: String,
}

impl FailureLedger {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        PathBuf::from(format!("{}{}", self.prefix, date.format("%Y-%m-%d")))
    }

    pub fn record(&self, context: &str, err: &anyhow::Error) -> Result<PathBuf> {
        self.record_on(Utc::now().date_naive(), context, err)
    }

    /// Appends `context,code:message` to the file for `date`.
    pub fn record_on(
        &self,
        date: NaiveDate,
        context: &str,
        err: &anyhow::Error,
    ) -> Result<PathBuf> {
        let path = self.path_for(date);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let message = format!("{err:#}");
        let message = message.lines().next().unwrap_or_default();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        writeln!(file, "{context},{}:{message}", failure_code(err))?;
        Ok(path)
    }
}

/// The HTTP status behind a failure, or -1.
pub fn failure_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<FetchError>()
        .and_then(FetchError::status)
        .map(i32::from)
        .unwrap_or(UNKNOWN_CODE)
}
