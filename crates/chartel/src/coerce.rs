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

use crate::error::{render_error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Formats tried in order when a timestamp column arrives as strings.
pub const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y%m%d",
];

pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Numeric view of a column; values that fail the cast become `None`.
pub fn numeric_options(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64).map_err(render_error)?;
    let ca = cast.f64().map_err(render_error)?;
    Ok(ca.into_iter().collect())
}

/// Numeric view with nulls carried as NaN, for gap-aware series drawing.
pub fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    Ok(numeric_options(series)?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Only the finite values of a column, nulls and NaNs dropped.
pub fn finite_values(series: &Series) -> Result<Vec<f64>> {
    Ok(numeric_options(series)?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect())
}

/// Timestamp view of a column. Native datetime/date storage is read
/// directly; anything else is stringified and parsed with the format list.
pub fn datetime_options(series: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    match series.dtype() {
        DataType::Datetime(_, _) => {
            let ca = series.datetime().map_err(render_error)?;
            Ok(ca.as_datetime_iter().collect())
        }
        DataType::Date => {
            let ca = series.date().map_err(render_error)?;
            Ok(ca
                .as_date_iter()
                .map(|opt| opt.and_then(|d| d.and_hms_opt(0, 0, 0)))
                .collect())
        }
        _ => {
            let cast = series.cast(&DataType::String).map_err(render_error)?;
            let ca = cast.str().map_err(render_error)?;
            Ok(ca
                .into_iter()
                .map(|opt| opt.and_then(parse_datetime))
                .collect())
        }
    }
}

/// Labels for a categorical axis; nulls render as empty strings.
pub fn string_values(series: &Series) -> Result<Vec<String>> {
    let cast = series.cast(&DataType::String).map_err(render_error)?;
    let ca = cast.str().map_err(render_error)?;
    Ok(ca
        .into_iter()
        .map(|opt| opt.unwrap_or_default().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn numeric_options_masks_unparseable_rows() {
        let frame = df!("v" => ["10", "x", "3.5", ""]).unwrap();
        let series = frame.column("v").unwrap().as_series().unwrap().clone();
        let values = numeric_options(&series).unwrap();
        assert_eq!(values, vec![Some(10.0), None, Some(3.5), None]);
    }

    #[test]
    fn datetime_parsing_tries_each_format() {
        assert_eq!(
            parse_datetime("2024-03-01 09:30:00").map(|dt| dt.to_string()),
            Some("2024-03-01 09:30:00".to_string())
        );
        assert!(parse_datetime("03/15/2024").is_some());
        assert!(parse_datetime("20240315").is_some());
        assert!(parse_datetime("not a date").is_none());
    }

    #[test]
    fn string_column_coerces_to_timestamps() {
        let frame = df!("t" => ["2024-01-01", "junk", "2024-01-02"]).unwrap();
        let series = frame.column("t").unwrap().as_series().unwrap().clone();
        let parsed = datetime_options(&series).unwrap();
        assert!(parsed[0].is_some());
        assert!(parsed[1].is_none());
        assert!(parsed[2].is_some());
    }
}
