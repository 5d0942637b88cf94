use std::{fs::File, path::Path};

use duckdb::{params, Connection};
use log::info;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::{
    db::banks::exchange_rate_archive::ExchangeRates, errors::EtlError, utils::download::get_bytes,
};

/// Header of the output CSV file.  The first column is the row index.
pub const CSV_HEADER: [&str; 6] = [
    "",
    "Name",
    "MC_USD_Billion",
    "MC_GBP_Billion",
    "MC_EUR_Billion",
    "MC_INR_Billion",
];

/// A row as scraped from the page, market cap not parsed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub name: String,
    pub market_cap_usd: String,
}

/// Market capitalization of a bank in USD billion, and converted to
/// GBP, EUR and INR, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct BankRecord {
    pub name: String,
    pub market_cap_usd: f64,
    pub market_cap_gbp: f64,
    pub market_cap_eur: f64,
    pub market_cap_inr: f64,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "")]
    index: usize,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "MC_USD_Billion")]
    usd: f64,
    #[serde(rename = "MC_GBP_Billion")]
    gbp: f64,
    #[serde(rename = "MC_EUR_Billion")]
    eur: f64,
    #[serde(rename = "MC_INR_Billion")]
    inr: f64,
}

/// The ranking of the largest banks by market capitalization, from an
/// archived copy of the Wikipedia page.
#[derive(Debug, Clone)]
pub struct LargestBanksArchive {
    pub page_url: String,
    pub csv_path: String,
    pub duckdb_path: String,
    pub table_name: String,
}

impl LargestBanksArchive {
    /// Download the page and scrape the first table on it.
    pub fn extract(&self) -> Result<Vec<RawRow>, EtlError> {
        let body = get_bytes(&self.page_url)?;
        let html = String::from_utf8_lossy(&body);
        let rows = parse_table(&html)?;
        info!("Extracted {} rows from {}", rows.len(), self.page_url);
        Ok(rows)
    }

    pub fn write_csv(&self, records: &[BankRecord]) -> Result<(), EtlError> {
        write_csv(records, Path::new(&self.csv_path))
    }

    pub fn write_table(
        &self,
        conn: &mut Connection,
        records: &[BankRecord],
    ) -> Result<usize, EtlError> {
        write_table(conn, &self.table_name, records)
    }

    /// Average market cap in GBP over all the banks in the table
    pub fn average_gbp_query(&self) -> String {
        format!(
            r#"SELECT AVG(MC_GBP_Billion) AS "average market capitalization" FROM {}"#,
            self.table_name
        )
    }

    pub fn select_all_query(&self) -> String {
        format!("SELECT * FROM {}", self.table_name)
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid css selector")
}

/// Get the trimmed text content of a cell.
fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parse the first `<table>` of the page.  The first row is the header,
/// every other row needs at least 3 `<td>` cells: rank, bank name and
/// market cap.
pub fn parse_table(html: &str) -> Result<Vec<RawRow>, EtlError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&selector("table"))
        .next()
        .ok_or_else(|| EtlError::MalformedPage("no table found".to_string()))?;

    let td = selector("td");
    let mut rows = Vec::new();
    for (i, tr) in table.select(&selector("tr")).enumerate().skip(1) {
        let cells: Vec<ElementRef> = tr.select(&td).collect();
        if cells.len() < 3 {
            return Err(EtlError::MalformedPage(format!(
                "table row {} has {} cells, expected at least 3",
                i,
                cells.len()
            )));
        }
        rows.push(RawRow {
            name: cell_text(&cells[1]),
            market_cap_usd: cell_text(&cells[2]),
        });
    }
    Ok(rows)
}

/// Round half away from zero to 2 decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn parse_amount(field: &str, value: &str) -> Result<f64, EtlError> {
    value.trim().parse::<f64>().map_err(|_| EtlError::Parse {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Convert the USD market caps to GBP, EUR and INR.  Row order is kept.
/// Fails without producing anything if a rate or a market cap is bad.
pub fn transform(rows: &[RawRow], rates: &ExchangeRates) -> Result<Vec<BankRecord>, EtlError> {
    let gbp = rates.rate("GBP")?;
    let eur = rates.rate("EUR")?;
    let inr = rates.rate("INR")?;

    rows.iter()
        .map(|row| {
            let usd = parse_amount("MC_USD_Billion", &row.market_cap_usd)?;
            Ok(BankRecord {
                name: row.name.clone(),
                market_cap_usd: usd,
                market_cap_gbp: round2(usd * gbp),
                market_cap_eur: round2(usd * eur),
                market_cap_inr: round2(usd * inr),
            })
        })
        .collect()
}

/// Overwrite the CSV file at `path`.  The leading column is the row index.
pub fn write_csv(records: &[BankRecord], path: &Path) -> Result<(), EtlError> {
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(CSV_HEADER)?;
    for (i, record) in records.iter().enumerate() {
        wtr.write_record(&[
            i.to_string(),
            record.name.clone(),
            format!("{:?}", record.market_cap_usd),
            format!("{:?}", record.market_cap_gbp),
            format!("{:?}", record.market_cap_eur),
            format!("{:?}", record.market_cap_inr),
        ])?;
    }
    wtr.flush()?;
    info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

/// Read a file written by [`write_csv`], in row index order.
pub fn read_csv(path: &Path) -> Result<Vec<BankRecord>, EtlError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows: Vec<CsvRow> = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    rows.sort_by_key(|row| row.index);
    Ok(rows
        .into_iter()
        .map(|row| BankRecord {
            name: row.name,
            market_cap_usd: row.usd,
            market_cap_gbp: row.gbp,
            market_cap_eur: row.eur,
            market_cap_inr: row.inr,
        })
        .collect())
}

/// Replace the table `table_name` with the records, in order.
/// Returns the number of rows inserted.
pub fn write_table(
    conn: &mut Connection,
    table_name: &str,
    records: &[BankRecord],
) -> Result<usize, EtlError> {
    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        r"
DROP TABLE IF EXISTS {table_name};
CREATE TABLE {table_name} (
    Name VARCHAR,
    MC_USD_Billion DOUBLE,
    MC_GBP_Billion DOUBLE,
    MC_EUR_Billion DOUBLE,
    MC_INR_Billion DOUBLE
);"
    ))?;
    {
        let mut appender = tx.appender(table_name)?;
        for record in records {
            appender.append_row(params![
                record.name,
                record.market_cap_usd,
                record.market_cap_gbp,
                record.market_cap_eur,
                record.market_cap_inr
            ])?;
        }
        appender.flush()?;
    }
    tx.commit()?;
    info!("Loaded {} rows into table {}", records.len(), table_name);
    Ok(records.len())
}
