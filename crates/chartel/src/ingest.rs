// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{ChartServiceError, Result};
use polars::prelude::*;
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;

fn unsupported(reason: impl Into<String>) -> ChartServiceError {
    ChartServiceError::UnsupportedFormat {
        reason: reason.into(),
    }
}

/// Parses an uploaded file into a dataframe, dispatching on the file
/// extension. Only `.csv` and `.json` are accepted; content that fails to
/// parse is reported the same way as a bad extension.
pub fn load_dataset(bytes: &[u8], filename: &str) -> Result<DataFrame> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());
    match extension.as_deref() {
        Some("csv") => read_csv(bytes),
        Some("json") => read_json(bytes),
        _ => Err(unsupported(format!(
            "'{filename}' (expected .csv or .json)"
        ))),
    }
}

fn read_csv(bytes: &[u8]) -> Result<DataFrame> {
    CsvReader::new(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| unsupported(format!("csv: {e}")))
}

/// Array-of-records JSON goes through polars directly; column-oriented
/// objects (`{"col": [..]}`) get rebuilt series by series.
fn read_json(bytes: &[u8]) -> Result<DataFrame> {
    match JsonReader::new(Cursor::new(bytes.to_vec())).finish() {
        Ok(frame) => Ok(frame),
        Err(record_error) => read_column_oriented(bytes)
            .map_err(|_| unsupported(format!("json: {record_error}"))),
    }
}

fn read_column_oriented(bytes: &[u8]) -> Result<DataFrame> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| unsupported(format!("json: {e}")))?;
    let Value::Object(map) = value else {
        return Err(unsupported("json: expected an object of columns"));
    };
    let mut columns: Vec<Column> = Vec::with_capacity(map.len());
    let mut expected_rows: Option<usize> = None;
    for (name, cells) in map {
        let Value::Array(items) = cells else {
            return Err(unsupported(format!("json: column '{name}' is not an array")));
        };
        match expected_rows {
            None => expected_rows = Some(items.len()),
            Some(expected) if expected != items.len() => {
                return Err(unsupported(format!(
                    "json: column '{name}' has {} rows, expected {expected}",
                    items.len()
                )));
            }
            Some(_) => {}
        }
        columns.push(json_column(&name, &items));
    }
    if columns.is_empty() {
        return Err(unsupported("json: no columns present"));
    }
    DataFrame::new(columns).map_err(|e| unsupported(format!("json: {e}")))
}

fn json_column(name: &str, items: &[Value]) -> Column {
    let all_numeric = items
        .iter()
        .all(|item| matches!(item, Value::Number(_) | Value::Null));
    if all_numeric {
        let values: Vec<Option<f64>> = items.iter().map(Value::as_f64).collect();
        Series::new(name.into(), values).into_column()
    } else {
        let values: Vec<Option<String>> = items
            .iter()
            .map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), values).into_column()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_upload_yields_named_columns() {
        let bytes = b"month,sales\njan,10\nfeb,20\n";
        let frame = load_dataset(bytes, "report.csv").unwrap();
        assert_eq!(frame.height(), 2);
        assert!(frame.column("month").is_ok());
        assert!(frame.column("sales").is_ok());
    }

    #[test]
    fn json_records_upload_is_parsed() {
        let bytes = br#"[{"city": "oslo", "temp": 3.5}, {"city": "rome", "temp": 17.0}]"#;
        let frame = load_dataset(bytes, "weather.json").unwrap();
        assert_eq!(frame.height(), 2);
        assert!(frame.column("city").is_ok());
    }

    #[test]
    fn column_oriented_json_is_rebuilt() {
        let bytes = br#"{"city": ["oslo", "rome"], "temp": [3.5, 17.0]}"#;
        let frame = load_dataset(bytes, "weather.json").unwrap();
        assert_eq!(frame.height(), 2);
        let temp = frame.column("temp").unwrap().as_series().unwrap().clone();
        assert_eq!(temp.f64().unwrap().get(1), Some(17.0));
    }

    #[test]
    fn ragged_column_oriented_json_is_rejected() {
        let bytes = br#"{"a": [1, 2], "b": [1]}"#;
        assert!(matches!(
            load_dataset(bytes, "x.json"),
            Err(ChartServiceError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn other_extensions_are_rejected() {
        let err = load_dataset(b"a,b\n1,2\n", "table.xlsx").unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");
    }
}
