use log::{error, info, warn};

use crate::{
    db::{
        banks::{
            exchange_rate_archive::{ExchangeRateArchive, ExchangeRates, RateSource},
            largest_banks_archive::{transform, BankRecord, LargestBanksArchive, RawRow},
        },
        table_store::TableStore,
    },
    errors::EtlError,
    utils::progress_log::ProgressLog,
};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub rows: usize,
    pub rate_source: RateSource,
    /// Result of the average GBP market cap query, `None` for an empty table
    pub average_gbp: Option<f64>,
}

/// The banks ETL job: extract the ranking, get the exchange rates,
/// convert, save to CSV and DuckDB, then query the table.  Each stage takes
/// what it needs from the previous one and returns what it produces.
pub struct Pipeline {
    pub banks: LargestBanksArchive,
    pub exchange_rates: ExchangeRateArchive,
    pub progress: ProgressLog,
}

impl Pipeline {
    pub fn new(
        banks: LargestBanksArchive,
        exchange_rates: ExchangeRateArchive,
        progress: ProgressLog,
    ) -> Self {
        Pipeline {
            banks,
            exchange_rates,
            progress,
        }
    }

    pub fn run(&self) -> Result<PipelineReport, EtlError> {
        self.progress
            .log("Preliminaries complete. Initiating ETL process")?;
        let raw_rows = self.extract()?;
        self.progress.log("Data extraction complete")?;

        self.progress.log("Fetching Exchange rate")?;
        let rates = self.fetch_rates()?;
        self.progress
            .log("Exchange rate loaded. Initiating Transformation process")?;

        let dataset = transform(&raw_rows, &rates)?;
        self.progress
            .log("Data transformation complete. Initiating loading process")?;

        self.banks.write_csv(&dataset)?;
        self.progress.log("Data saved to CSV file")?;

        let mut store = TableStore::open(&self.banks.duckdb_path)?;
        self.progress.log("SQL Connection initiated.")?;
        let average_gbp = self.load_and_query(&mut store, &dataset)?;
        self.progress.log("Process Complete.")?;
        store.close()?;

        Ok(PipelineReport {
            rows: dataset.len(),
            rate_source: rates.source,
            average_gbp,
        })
    }

    /// Tell the user about a fatal error, in the diagnostic log, on stderr
    /// and as a last line in the progress log.
    pub fn report_failure(&self, e: &EtlError) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        if let Err(log_err) = self.progress.log(&format!("ETL process failed: {}", e)) {
            warn!("Failed to write the progress log: {}", log_err);
        }
    }

    /// Scrape the page.  No point going further if the page can't be had.
    pub fn extract(&self) -> Result<Vec<RawRow>, EtlError> {
        self.banks.extract().inspect_err(|e| {
            if e.is_network() {
                println!("The URL can't be reached!");
            }
            error!("Extraction failed: {}", e);
        })
    }

    /// Rates from the server or the local cache.  Having neither is fatal.
    pub fn fetch_rates(&self) -> Result<ExchangeRates, EtlError> {
        let rates = self
            .exchange_rates
            .fetch_rates()?
            .ok_or(EtlError::RateUnavailable)?;
        info!("Using {} exchange rates from {}", rates.len(), rates.source);
        Ok(rates)
    }

    /// Replace the table and run the two report queries on it.  Returns
    /// the average market cap in GBP.
    pub fn load_and_query(
        &self,
        store: &mut TableStore,
        dataset: &[BankRecord],
    ) -> Result<Option<f64>, EtlError> {
        self.banks.write_table(store.connection(), dataset)?;
        self.progress
            .log("Data loaded to Database as table. Running the queries")?;

        println!("\x1b[1mFirst Query:\x1b[0m\n");
        let average = store.run_query(&self.banks.average_gbp_query())?;
        println!("\n\x1b[1mSecond Query:\x1b[0m\n");
        store.run_query(&self.banks.select_all_query())?;
        Ok(average.scalar_f64())
    }
}
