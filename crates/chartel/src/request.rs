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

use crate::error::{invalid_request, Result};
use crate::session::SessionDataset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    Line,
    Bar,
    Pie,
    Area,
    Scatter,
    Histogram,
    Box,
    Violin,
    Funnel,
    Sunburst,
    Waterfall,
    Combo,
    Stock,
}

impl GraphType {
    pub const ALL: [GraphType; 13] = [
        GraphType::Line,
        GraphType::Bar,
        GraphType::Pie,
        GraphType::Area,
        GraphType::Scatter,
        GraphType::Histogram,
        GraphType::Box,
        GraphType::Violin,
        GraphType::Funnel,
        GraphType::Sunburst,
        GraphType::Waterfall,
        GraphType::Combo,
        GraphType::Stock,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphType::Line => "line",
            GraphType::Bar => "bar",
            GraphType::Pie => "pie",
            GraphType::Area => "area",
            GraphType::Scatter => "scatter",
            GraphType::Histogram => "histogram",
            GraphType::Box => "box",
            GraphType::Violin => "violin",
            GraphType::Funnel => "funnel",
            GraphType::Sunburst => "sunburst",
            GraphType::Waterfall => "waterfall",
            GraphType::Combo => "combo",
            GraphType::Stock => "stock",
        }
    }
    /// "Line Chart", "Histogram Chart", ... the shared figure title.
    pub fn chart_title(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{}{} Chart", first.to_uppercase(), chars.as_str()),
            None => "Chart".to_string(),
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphType {
    type Err = crate::error::ChartServiceError;
    fn from_str(s: &str) -> Result<Self> {
        GraphType::ALL
            .iter()
            .find(|kind| kind.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| invalid_request(format!("Unknown graph type: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRequest {
    pub x_column: String,
    pub y_columns: Vec<String>,
    pub graph_type: GraphType,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub color_all: bool,
    #[serde(default)]
    pub timeframe: Option<String>,
}

impl ChartRequest {
    pub fn new(x_column: impl Into<String>, y_columns: Vec<String>, graph_type: GraphType) -> Self {
        Self {
            x_column: x_column.into(),
            y_columns,
            graph_type,
            colors: Vec::new(),
            color_all: false,
            timeframe: None,
        }
    }
}

/// Boundary checks, short-circuiting in request order. Per-kind arity
/// rules live with the chart strategies.
pub fn validate_request(dataset: &SessionDataset, request: &ChartRequest) -> Result<()> {
    if request.y_columns.is_empty() {
        return Err(invalid_request("Please provide a list of Y-axis columns"));
    }
    if !dataset.has_column(&request.x_column) {
        return Err(invalid_request("Invalid X-axis column selection"));
    }
    for y_column in &request.y_columns {
        if !dataset.has_column(y_column) {
            return Err(invalid_request(format!("Invalid Y-axis column: {y_column}")));
        }
    }
    Ok(())
}
