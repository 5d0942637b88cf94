use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use jiff::Zoned;
use log::info;

use crate::errors::EtlError;

/// Year-Monthname-Day-Hour-Minute-Second, e.g. `2024-Mar-05-14:02:59`
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

/// Append-only text file with one timestamped line per pipeline milestone.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProgressLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format one log line, without the trailing newline.
    pub fn line(message: &str, now: &Zoned) -> String {
        format!("{} : {}", now.strftime(TIMESTAMP_FORMAT), message)
    }

    pub fn log(&self, message: &str) -> Result<(), EtlError> {
        info!("{}", message);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", Self::line(message, &Zoned::now()))?;
        Ok(())
    }
}
