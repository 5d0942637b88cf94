use std::{env, path::Path};

use crate::{
    db::banks::{
        exchange_rate_archive::ExchangeRateArchive, largest_banks_archive::LargestBanksArchive,
    },
    pipeline::Pipeline,
    utils::progress_log::ProgressLog,
};

/// Environment variable pointing to the directory where all the local
/// files (rate cache, output CSV, DuckDB file, progress log) live.
pub const BASE_DIR_VAR: &str = "LARGEST_BANKS_DIR";

pub struct ProdDb {}

impl ProdDb {
    pub fn base_dir() -> String {
        env::var(BASE_DIR_VAR).unwrap_or_else(|_| ".".to_string())
    }

    pub fn largest_banks() -> LargestBanksArchive {
        let base_dir = ProdDb::base_dir();
        LargestBanksArchive {
            page_url: "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks".to_string(),
            csv_path: join(&base_dir, "Largest_banks_output.csv"),
            duckdb_path: join(&base_dir, "Banks.duckdb"),
            table_name: "Largest_banks".to_string(),
        }
    }

    pub fn exchange_rates() -> ExchangeRateArchive {
        ExchangeRateArchive {
            url: "https://cf-courses-data.s3.us.cloud-object-storage.appdomain.cloud/IBMSkillsNetwork-PY0221EN-Coursera/labs/v2/exchange_rate.csv".to_string(),
            cache_path: join(&ProdDb::base_dir(), "downloaded_exchange.csv"),
        }
    }

    pub fn progress_log() -> ProgressLog {
        ProgressLog::new(join(
            &ProdDb::base_dir(),
            "ETL World's Largest Banks log.txt",
        ))
    }

    pub fn largest_banks_pipeline() -> Pipeline {
        Pipeline::new(
            ProdDb::largest_banks(),
            ProdDb::exchange_rates(),
            ProdDb::progress_log(),
        )
    }
}

fn join(base_dir: &str, file_name: &str) -> String {
    Path::new(base_dir)
        .join(file_name)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_names() {
        let archive = ProdDb::largest_banks();
        assert_eq!(archive.table_name, "Largest_banks");
        assert!(archive.csv_path.ends_with("Largest_banks_output.csv"));
        assert!(archive.duckdb_path.ends_with("Banks.duckdb"));
        assert!(!archive.page_url.contains(' '));
        let rates = ProdDb::exchange_rates();
        assert!(rates.cache_path.ends_with("downloaded_exchange.csv"));
        assert!(rates.url.ends_with("exchange_rate.csv"));
    }
}
