use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Every way a run of the banks ETL job can fail.  All of them are fatal
/// for the run, except the network failures the rate archive recovers from.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("failed to reach {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} failed with status {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("unexpected page layout: {0}")]
    MalformedPage(String),

    #[error("no exchange rate data available, neither remote nor cached")]
    RateUnavailable,

    #[error("exchange rate for {0} is missing")]
    MissingRate(String),

    #[error("failed to parse {field} value {value:?} as a number")]
    Parse { field: String, value: String },

    #[error("failed to read exchange rate file {path:?}: {source}")]
    RateFile {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),
}

impl EtlError {
    /// Failures to get a good response from a remote server.
    pub fn is_network(&self) -> bool {
        matches!(self, EtlError::Fetch { .. } | EtlError::HttpStatus { .. })
    }
}
