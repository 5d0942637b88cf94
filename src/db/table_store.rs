use std::{fmt::Display, fs, path::Path};

use duckdb::{types::Value, Connection};
use itertools::Itertools;
use log::info;
use tabled::{builder::Builder, settings::Style};

use crate::errors::EtlError;

/// A DuckDB connection owned for the duration of the load and query
/// stages.  The connection is released when the store is dropped, so an
/// early return on any path closes it.  Use [`TableStore::close`] on the
/// happy path to see close errors.
pub struct TableStore {
    path: String,
    conn: Connection,
}

impl TableStore {
    pub fn open(duckdb_path: &str) -> Result<Self, EtlError> {
        if let Some(dir) = Path::new(duckdb_path).parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(duckdb_path)?;
        info!("Opened DuckDB {}", duckdb_path);
        Ok(TableStore {
            path: duckdb_path.to_string(),
            conn,
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, EtlError> {
        Ok(TableStore {
            path: ":memory:".to_string(),
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Run a read-only query and collect all the rows.
    pub fn query(&self, sql: &str) -> Result<QueryResult, EtlError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let columns = rows.as_ref().map(|s| s.column_names()).unwrap_or_default();
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let mut one = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                one.push(row.get::<usize, Value>(i)?);
            }
            values.push(one);
        }
        Ok(QueryResult {
            columns,
            rows: values,
        })
    }

    /// Print the query, run it and print the result.
    pub fn run_query(&self, sql: &str) -> Result<QueryResult, EtlError> {
        println!("{}", sql);
        let result = self.query(sql)?;
        println!("{}", result);
        Ok(result)
    }

    pub fn close(self) -> Result<(), EtlError> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| EtlError::DuckDb(e))?;
        info!("Closed DuckDB {}", path);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// The first column of the first row as a float, if there is one and
    /// it is not NULL.
    pub fn scalar_f64(&self) -> Option<f64> {
        match self.rows.first()?.first()? {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(*v as f64),
            Value::BigInt(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Make an ASCII table with a leading row number column.
    pub fn ascii_table(&self) -> tabled::Table {
        let mut builder = Builder::new();
        let header = std::iter::once(String::new()).chain(self.columns.iter().cloned());
        builder.push_record(header);
        for (i, row) in self.rows.iter().enumerate() {
            builder.push_record(
                std::iter::once(i.to_string()).chain(row.iter().map(format_value)),
            );
        }
        let mut table = builder.build();
        table.with(Style::empty());
        table
    }
}

impl Display for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.rows.is_empty() {
            return write!(
                f,
                "Empty result\nColumns: [{}]",
                self.columns.iter().join(", ")
            );
        }
        write!(f, "{}", self.ascii_table())
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(s) => s.clone(),
        Value::Double(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        other => format!("{:?}", other),
    }
}
