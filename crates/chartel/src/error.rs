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

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartServiceError {
    #[error("No data uploaded yet")]
    DataNotLoaded,
    #[error("Unsupported file format: {reason}")]
    UnsupportedFormat { reason: String },
    #[error("{reason}")]
    InvalidRequest { reason: String },
    #[error("{reason}")]
    InvalidInput { reason: String },
    #[error("{reason}")]
    ChartType { reason: String },
    #[error("Column '{column}' must contain numeric values")]
    NoNumericData { column: String },
    #[error("Invalid timeframe '{token}'. Use 1M,5M,10M,15M,30M,1H,4H,1D,1W,1MO")]
    InvalidTimeframe { token: String },
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },
    #[error("Graph generation failed: {reason}")]
    Render { reason: String },
}

impl ChartServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartServiceError::DataNotLoaded => "data_not_loaded",
            ChartServiceError::UnsupportedFormat { .. } => "unsupported_format",
            ChartServiceError::InvalidRequest { .. } => "invalid_request",
            ChartServiceError::InvalidInput { .. } => "invalid_input",
            ChartServiceError::ChartType { .. } => "chart_type",
            ChartServiceError::NoNumericData { .. } => "no_numeric_data",
            ChartServiceError::InvalidTimeframe { .. } => "invalid_timeframe",
            ChartServiceError::InsufficientData { .. } => "insufficient_data",
            ChartServiceError::Render { .. } => "render_failure",
        }
    }
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ChartServiceError::Render { .. })
    }
    pub fn response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, ChartServiceError>;

pub fn invalid_request(reason: impl Into<String>) -> ChartServiceError {
    ChartServiceError::InvalidRequest {
        reason: reason.into(),
    }
}

pub fn chart_type_error(reason: impl Into<String>) -> ChartServiceError {
    ChartServiceError::ChartType {
        reason: reason.into(),
    }
}

pub fn render_error(reason: impl std::fmt::Display) -> ChartServiceError {
    ChartServiceError::Render {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_tags() {
        let err = ChartServiceError::InvalidTimeframe {
            token: "2D".to_string(),
        };
        assert_eq!(err.kind(), "invalid_timeframe");
        assert!(err.is_client_error());
        let err = render_error("backend exploded");
        assert_eq!(err.kind(), "render_failure");
        assert!(!err.is_client_error());
    }

    #[test]
    fn response_carries_kind_and_message() {
        let resp = ChartServiceError::DataNotLoaded.response();
        assert_eq!(resp.kind, "data_not_loaded");
        assert_eq!(resp.message, "No data uploaded yet");
    }
}
