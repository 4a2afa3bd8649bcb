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

use super::{axis_values, series, styled_figure, ChartStrategy};
use crate::coerce;
use crate::error::{chart_type_error, ChartServiceError, Result};
use crate::figure::{
    CartesianPlot, FigureSpec, Geometry, HorizontalBarPlot, PlotData, SeriesSpec, SlicePlot,
};
use crate::request::{ChartRequest, GraphType};
use polars::prelude::DataFrame;

/// Labels paired with the numeric value of the first y column, rows whose
/// value fails coercion masked out. Errors when nothing numeric is left.
fn masked_label_values(
    frame: &DataFrame,
    request: &ChartRequest,
) -> Result<(Vec<String>, Vec<f64>)> {
    let y_column = &request.y_columns[0];
    let labels = coerce::string_values(series(frame, &request.x_column)?)?;
    let values = coerce::numeric_options(series(frame, y_column)?)?;
    let mut kept_labels = Vec::new();
    let mut kept_values = Vec::new();
    for (label, value) in labels.into_iter().zip(values) {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            kept_labels.push(label);
            kept_values.push(value);
        }
    }
    if kept_values.is_empty() {
        return Err(ChartServiceError::NoNumericData {
            column: y_column.clone(),
        });
    }
    Ok((kept_labels, kept_values))
}

fn slice_figure(
    kind: GraphType,
    frame: &DataFrame,
    request: &ChartRequest,
    colors: &[String],
    donut: bool,
) -> Result<FigureSpec> {
    let (labels, values) = masked_label_values(frame, request)?;
    let plot = SlicePlot {
        labels,
        values,
        colors: colors.to_vec(),
        donut,
    };
    Ok(styled_figure(kind, &request.x_column, PlotData::Slices(plot)))
}

pub struct PieChart;

impl ChartStrategy for PieChart {
    fn kind(&self) -> GraphType {
        GraphType::Pie
    }
    fn validate(&self, request: &ChartRequest) -> Result<()> {
        if request.y_columns.len() != 1 {
            return Err(chart_type_error("Pie chart supports only one Y column"));
        }
        Ok(())
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        slice_figure(self.kind(), frame, request, colors, false)
    }
}

pub struct SunburstChart;

impl ChartStrategy for SunburstChart {
    fn kind(&self) -> GraphType {
        GraphType::Sunburst
    }
    fn validate(&self, request: &ChartRequest) -> Result<()> {
        if request.y_columns.len() != 1 {
            return Err(chart_type_error("Sunburst chart needs exactly one Y column"));
        }
        Ok(())
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        // Identical to pie apart from the ring rendering hint.
        slice_figure(self.kind(), frame, request, colors, true)
    }
}

pub struct FunnelChart;

impl ChartStrategy for FunnelChart {
    fn kind(&self) -> GraphType {
        GraphType::Funnel
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        let (labels, values) = masked_label_values(frame, request)?;
        let plot = HorizontalBarPlot {
            labels,
            values,
            colors: colors.to_vec(),
        };
        Ok(styled_figure(
            self.kind(),
            &request.x_column,
            PlotData::HorizontalBars(plot),
        ))
    }
}

pub struct WaterfallChart;

impl ChartStrategy for WaterfallChart {
    fn kind(&self) -> GraphType {
        GraphType::Waterfall
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        let y_column = &request.y_columns[0];
        let values = coerce::numeric_values(series(frame, y_column)?)?;
        // Each bar starts where the running total stood before it.
        let mut baselines = Vec::with_capacity(values.len());
        let mut running = 0.0;
        for value in &values {
            baselines.push(running);
            if value.is_finite() {
                running += value;
            }
        }
        let plot = CartesianPlot {
            x: axis_values(frame, &request.x_column)?,
            series: vec![SeriesSpec {
                name: y_column.clone(),
                color: colors[0].clone(),
                values,
                geometry: Geometry::BaselineBars { baselines },
            }],
        };
        Ok(styled_figure(
            self.kind(),
            &request.x_column,
            PlotData::Cartesian(plot),
        ))
    }
}
