use std::{collections::BTreeMap, fmt::Display, path::Path};

use log::{info, warn};
use serde::Deserialize;

use crate::{errors::EtlError, utils::download::download_file};

/// One row of the exchange rate file, USD to `currency_code`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExchangeRate {
    #[serde(rename = "Currency")]
    pub currency_code: String,
    #[serde(rename = "Rate")]
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    /// Freshly downloaded in this run
    Remote,
    /// Read from a file downloaded in a previous run
    Cache,
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateSource::Remote => write!(f, "remote"),
            RateSource::Cache => write!(f, "cache"),
        }
    }
}

/// Exchange rates keyed by the 3-letter currency code.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRates {
    pub source: RateSource,
    rates: BTreeMap<String, f64>,
}

impl ExchangeRates {
    pub fn new(source: RateSource, rows: Vec<ExchangeRate>) -> Self {
        let mut rates = BTreeMap::new();
        for row in rows {
            let code = row.currency_code.trim().to_uppercase();
            if rates.insert(code.clone(), row.rate).is_some() {
                warn!("Duplicate exchange rate for {}, keeping the last one", code);
            }
        }
        ExchangeRates { source, rates }
    }

    /// Get the rate for a currency code, e.g. "GBP".
    pub fn rate(&self, currency_code: &str) -> Result<f64, EtlError> {
        self.rates
            .get(currency_code)
            .copied()
            .ok_or_else(|| EtlError::MissingRate(currency_code.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeRateArchive {
    pub url: String,
    /// Local copy of the last successful download
    pub cache_path: String,
}

impl ExchangeRateArchive {
    /// Get the exchange rates.  Try to download the file first and
    /// overwrite the local cache with it.  If the server can't be reached,
    /// use the cache from a previous run.  Return `None` if there is no
    /// usable cache either.
    ///
    /// The rates are always read back from the cache file, so what gets
    /// used is exactly what is on disk.
    pub fn fetch_rates(&self) -> Result<Option<ExchangeRates>, EtlError> {
        match self.download_file() {
            Ok(()) => {
                let rows = self.read_file()?;
                info!("Loaded {} exchange rates from {}", rows.len(), self.url);
                Ok(Some(ExchangeRates::new(RateSource::Remote, rows)))
            }
            Err(e) if e.is_network() => {
                warn!("{}", e);
                println!("The exchange rate website can't be reached!");
                println!("Trying to use local exchange rate data...");
                match self.read_file() {
                    Ok(rows) => {
                        let rates = ExchangeRates::new(RateSource::Cache, rows);
                        if rates.is_empty() {
                            warn!("Exchange rate cache {} has no rates", self.cache_path);
                            println!("No local exchange rate data available!");
                            return Ok(None);
                        }
                        info!(
                            "Loaded {} exchange rates from cache {}",
                            rates.len(),
                            self.cache_path
                        );
                        Ok(Some(rates))
                    }
                    Err(e) => {
                        warn!("{}", e);
                        println!("No local exchange rate data available!");
                        Ok(None)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    pub fn download_file(&self) -> Result<(), EtlError> {
        download_file(&self.url, Path::new(&self.cache_path))
    }

    /// Read the cached CSV file.  Columns are matched by header name,
    /// any other columns are ignored.
    pub fn read_file(&self) -> Result<Vec<ExchangeRate>, EtlError> {
        let path = Path::new(&self.cache_path);
        let to_err = |source| EtlError::RateFile {
            path: path.to_path_buf(),
            source,
        };
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(to_err)?;
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let record: ExchangeRate = result.map_err(to_err)?;
            rows.push(record);
        }
        Ok(rows)
    }
}
