//! Parser for InfluxDB annotated CSV query responses.
//!
//! A response holds one or more tables. Each table starts with optional
//! `#` annotation rows and a header row, followed by data rows; tables are
//! separated by blank lines. Flux reports runtime failures as a table whose
//! header has an `error` column.
//!
//! Only the `_value` column is of interest, and only its last occurrence
//! across the whole response.

use crate::error::{InfluxError, ResponseError};

/// The header and data rows of one table, as CSV text.
struct Table {
    /// 1-based line of the header row within the response.
    header_line: usize,
    text: String,
}

/// Return the `_value` of the last data row, or `None` for an empty result.
///
/// # Errors
///
/// Returns [`InfluxError::Query`] for an error table and
/// [`InfluxError::Response`] when a row cannot be interpreted.
pub fn last_value(body: &str) -> Result<Option<f64>, InfluxError> {
    let mut last = None;
    for table in tables(body) {
        if let Some(value) = table.last_value()? {
            last = Some(value);
        }
    }
    Ok(last)
}

/// Split a response into tables at blank lines and annotation rows.
fn tables(body: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Option<Table> = None;

    for (index, raw) in body.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() || line.starts_with('#') {
            tables.extend(current.take());
            continue;
        }
        let table = current.get_or_insert_with(|| Table {
            header_line: index + 1,
            text: String::new(),
        });
        table.text.push_str(line);
        table.text.push('\n');
    }
    tables.extend(current);
    tables
}

impl Table {
    fn last_value(&self) -> Result<Option<f64>, InfluxError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(self.text.as_bytes());

        let (value_column, error_column) = {
            let headers = reader.headers().map_err(unreadable)?;
            (
                headers.iter().position(|f| f == "_value"),
                headers.iter().position(|f| f == "error"),
            )
        };

        let mut last = None;
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(unreadable)?;

            if let Some(column) = error_column {
                let message = record.get(column).unwrap_or_default();
                return Err(InfluxError::Query(message.to_string()));
            }

            let line = self.header_line + row + 1;
            let column = value_column
                .ok_or(InfluxError::Response(ResponseError::MissingValueColumn))?;
            let field = record.get(column).ok_or(InfluxError::Response(
                ResponseError::ShortRow { line, column },
            ))?;
            let value = field.parse::<f64>().map_err(|_| {
                InfluxError::Response(ResponseError::InvalidValue {
                    line,
                    value: field.to_string(),
                })
            })?;
            last = Some(value);
        }

        Ok(last)
    }
}

fn unreadable(err: csv::Error) -> InfluxError {
    InfluxError::Response(ResponseError::Csv(err))
}
