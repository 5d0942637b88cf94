use std::{path::Path, process::ExitCode};

use clap::Parser;
use largest_banks::db::prod_db::ProdDb;
use log::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,
}

/// Scrape the largest banks ranking, convert the market caps to GBP, EUR
/// and INR, save to CSV and DuckDB, and print the report queries.
fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let env_file = format!(".env/{}.env", args.env);
    match dotenvy::from_path(Path::new(&env_file)) {
        Ok(_) => info!("Loaded {}", env_file),
        Err(e) => info!("No env file {} loaded: {}", env_file, e),
    }

    let pipeline = ProdDb::largest_banks_pipeline();
    match pipeline.run() {
        Ok(report) => {
            info!(
                "{} rows loaded into {} using {} exchange rates, average market cap {:?} GBP billion",
                report.rows, pipeline.banks.table_name, report.rate_source, report.average_gbp
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            pipeline.report_failure(&e);
            ExitCode::FAILURE
        }
    }
}
