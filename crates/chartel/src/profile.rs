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

use crate::error::{render_error, ChartServiceError, Result};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Lower/upper bounds of the open range a numeric column must fall in to
/// plausibly encode calendar years.
const TEMPORAL_NUMERIC_MIN: f64 = 1900.0;
const TEMPORAL_NUMERIC_MAX: f64 = 2100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Numeric,
    Categorical,
    Datetime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub semantic_type: SemanticType,
    pub unique_values: Option<usize>,
    pub is_temporal_numeric: bool,
}

/// Classifies the requested columns by storage type. Columns the dataset
/// does not have are skipped, so callers may over-specify. An empty
/// request is the only error.
pub fn classify_columns(frame: &DataFrame, columns: &[String]) -> Result<Vec<ColumnProfile>> {
    if columns.is_empty() {
        return Err(ChartServiceError::InvalidInput {
            reason: "No columns provided for analysis".to_string(),
        });
    }
    let present: Vec<&Series> = columns
        .iter()
        .filter_map(|name| frame.column(name).ok().and_then(|c| c.as_series()))
        .collect();
    present.into_par_iter().map(profile_column).collect()
}

fn profile_column(series: &Series) -> Result<ColumnProfile> {
    let name = series.name().to_string();
    match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => Ok(ColumnProfile {
            name,
            semantic_type: SemanticType::Datetime,
            unique_values: None,
            is_temporal_numeric: false,
        }),
        dtype if crate::coerce::is_numeric_dtype(dtype) => {
            let unique = series.drop_nulls().n_unique().map_err(render_error)?;
            Ok(ColumnProfile {
                name,
                semantic_type: SemanticType::Numeric,
                unique_values: Some(unique),
                is_temporal_numeric: is_temporal_numeric(series)?,
            })
        }
        _ => {
            let unique = series.drop_nulls().n_unique().map_err(render_error)?;
            Ok(ColumnProfile {
                name,
                semantic_type: SemanticType::Categorical,
                unique_values: Some(unique),
                is_temporal_numeric: false,
            })
        }
    }
}

/// True iff every value is present and sits strictly inside (1900, 2100),
/// which usually means the column holds years rather than measurements.
fn is_temporal_numeric(series: &Series) -> Result<bool> {
    if series.is_empty() || series.null_count() > 0 {
        return Ok(false);
    }
    let cast = series.cast(&DataType::Float64).map_err(render_error)?;
    let ca = cast.f64().map_err(render_error)?;
    Ok(match (ca.min(), ca.max()) {
        (Some(min), Some(max)) => min > TEMPORAL_NUMERIC_MIN && max < TEMPORAL_NUMERIC_MAX,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn sample_frame() -> DataFrame {
        df!(
            "region" => ["north", "south", "north", "east"],
            "revenue" => [120.5, 98.2, 101.0, 77.7],
            "year" => [1950i64, 1999, 2020, 2001],
        )
        .unwrap()
    }

    #[test]
    fn buckets_columns_by_storage_type() {
        let frame = sample_frame();
        let profiles = classify_columns(
            &frame,
            &[
                "region".to_string(),
                "revenue".to_string(),
                "year".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].semantic_type, SemanticType::Categorical);
        assert_eq!(profiles[0].unique_values, Some(3));
        assert_eq!(profiles[1].semantic_type, SemanticType::Numeric);
        assert!(!profiles[1].is_temporal_numeric);
        assert_eq!(profiles[2].semantic_type, SemanticType::Numeric);
        assert!(profiles[2].is_temporal_numeric);
    }

    #[test]
    fn absent_columns_are_silently_skipped() {
        let frame = sample_frame();
        let profiles =
            classify_columns(&frame, &["revenue".to_string(), "ghost".to_string()]).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "revenue");
    }

    #[test]
    fn empty_request_is_rejected() {
        let frame = sample_frame();
        assert!(matches!(
            classify_columns(&frame, &[]),
            Err(ChartServiceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn values_outside_the_year_range_clear_the_flag() {
        let frame = df!("v" => [1900i64, 1950, 2000]).unwrap();
        let profiles = classify_columns(&frame, &["v".to_string()]).unwrap();
        // 1900 sits on the boundary of the open range.
        assert!(!profiles[0].is_temporal_numeric);
    }
}
