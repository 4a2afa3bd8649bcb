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
use crate::error::{chart_type_error, Result};
use crate::figure::{
    AxisValues, CartesianPlot, FigureSpec, Geometry, Marker, PlotData, SeriesSpec, COMBO_MARKERS,
};
use crate::request::{ChartRequest, GraphType};
use polars::prelude::DataFrame;

/// Markers clutter dense line charts; they stay on below this many series.
const LINE_MARKER_LIMIT: usize = 5;

fn value_series(
    frame: &DataFrame,
    request: &ChartRequest,
    colors: &[String],
    geometry_for: impl Fn(usize) -> Result<Geometry>,
) -> Result<Vec<SeriesSpec>> {
    request
        .y_columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            Ok(SeriesSpec {
                name: name.clone(),
                color: colors[i % colors.len()].clone(),
                values: coerce::numeric_values(series(frame, name)?)?,
                geometry: geometry_for(i)?,
            })
        })
        .collect()
}

pub struct LineChart;

impl ChartStrategy for LineChart {
    fn kind(&self) -> GraphType {
        GraphType::Line
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        let marker = (request.y_columns.len() < LINE_MARKER_LIMIT).then_some(Marker::Circle);
        let series = value_series(frame, request, colors, |_| {
            Ok(Geometry::Line { width: 2, marker })
        })?;
        let plot = CartesianPlot {
            x: axis_values(frame, &request.x_column)?,
            series,
        };
        Ok(styled_figure(
            self.kind(),
            &request.x_column,
            PlotData::Cartesian(plot),
        ))
    }
}

pub struct BarChart;

impl ChartStrategy for BarChart {
    fn kind(&self) -> GraphType {
        GraphType::Bar
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        let n = request.y_columns.len();
        let width = 0.8 / n as f64;
        // Bars always sit on positional ticks labelled by the x column.
        let labels = coerce::string_values(series(frame, &request.x_column)?)?;
        let series = value_series(frame, request, colors, |i| {
            // Offsets fan the group out around the tick it belongs to.
            Ok(Geometry::Bars {
                width,
                offset: i as f64 * width - (n as f64 - 1.0) * width / 2.0,
            })
        })?;
        let plot = CartesianPlot {
            x: AxisValues::Categories(labels),
            series,
        };
        Ok(styled_figure(
            self.kind(),
            &request.x_column,
            PlotData::Cartesian(plot),
        ))
    }
}

pub struct AreaChart;

impl ChartStrategy for AreaChart {
    fn kind(&self) -> GraphType {
        GraphType::Area
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        let series = value_series(frame, request, colors, |_| Ok(Geometry::Area))?;
        let plot = CartesianPlot {
            x: axis_values(frame, &request.x_column)?,
            series,
        };
        Ok(styled_figure(
            self.kind(),
            &request.x_column,
            PlotData::Cartesian(plot),
        ))
    }
}

pub struct ScatterChart;

impl ChartStrategy for ScatterChart {
    fn kind(&self) -> GraphType {
        GraphType::Scatter
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        let series = value_series(frame, request, colors, |_| Ok(Geometry::Points { radius: 5 }))?;
        let plot = CartesianPlot {
            x: axis_values(frame, &request.x_column)?,
            series,
        };
        Ok(styled_figure(
            self.kind(),
            &request.x_column,
            PlotData::Cartesian(plot),
        ))
    }
}

pub struct ComboChart;

impl ChartStrategy for ComboChart {
    fn kind(&self) -> GraphType {
        GraphType::Combo
    }
    fn validate(&self, request: &ChartRequest) -> Result<()> {
        if request.y_columns.len() < 2 {
            return Err(chart_type_error("Combo chart needs at least 2 Y columns"));
        }
        Ok(())
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        let series = value_series(frame, request, colors, |i| {
            Ok(match i {
                0 => Geometry::Bars {
                    width: 0.8,
                    offset: 0.0,
                },
                1 => Geometry::Line {
                    width: 2,
                    marker: Some(Marker::Circle),
                },
                i => Geometry::Line {
                    width: 2,
                    marker: Some(COMBO_MARKERS[(i - 2) % COMBO_MARKERS.len()]),
                },
            })
        })?;
        let plot = CartesianPlot {
            x: axis_values(frame, &request.x_column)?,
            series,
        };
        Ok(styled_figure(
            self.kind(),
            &request.x_column,
            PlotData::Cartesian(plot),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::resolve_colors;
    use polars::df;

    fn frame() -> DataFrame {
        df!(
            "month" => ["jan", "feb", "mar"],
            "a" => [1.0, 2.0, 3.0],
            "b" => [4.0, 5.0, 6.0],
            "c" => [7.0, 8.0, 9.0],
        )
        .unwrap()
    }

    fn request(kind: GraphType, ys: &[&str]) -> ChartRequest {
        ChartRequest::new("month", ys.iter().map(|s| s.to_string()).collect(), kind)
    }

    fn shape(kind: GraphType, ys: &[&str]) -> FigureSpec {
        let frame = frame();
        let request = request(kind, ys);
        let colors = resolve_colors(ys.len(), &[], false);
        strategy_for_test(kind).shape(&frame, &request, &colors).unwrap()
    }

    fn strategy_for_test(kind: GraphType) -> &'static dyn ChartStrategy {
        crate::charts::strategy_for(kind)
    }

    fn cartesian(figure: &FigureSpec) -> &CartesianPlot {
        match &figure.plot {
            PlotData::Cartesian(plot) => plot,
            other => panic!("expected cartesian plot, got {other:?}"),
        }
    }

    #[test]
    fn line_markers_disappear_at_five_series() {
        let figure = shape(GraphType::Line, &["a", "b"]);
        let plot = cartesian(&figure);
        assert!(matches!(
            plot.series[0].geometry,
            Geometry::Line {
                marker: Some(Marker::Circle),
                ..
            }
        ));

        let frame = df!(
            "month" => ["jan"],
            "a" => [1.0], "b" => [1.0], "c" => [1.0], "d" => [1.0], "e" => [1.0],
        )
        .unwrap();
        let request = request(GraphType::Line, &["a", "b", "c", "d", "e"]);
        let colors = resolve_colors(5, &[], false);
        let figure = LineChart.shape(&frame, &request, &colors).unwrap();
        let plot = cartesian(&figure);
        assert!(matches!(
            plot.series[0].geometry,
            Geometry::Line { marker: None, .. }
        ));
    }

    #[test]
    fn grouped_bars_split_the_tick_evenly() {
        let figure = shape(GraphType::Bar, &["a", "b"]);
        let plot = cartesian(&figure);
        assert!(matches!(plot.x, AxisValues::Categories(_)));
        let widths: Vec<(f64, f64)> = plot
            .series
            .iter()
            .map(|s| match s.geometry {
                Geometry::Bars { width, offset } => (width, offset),
                _ => panic!("expected bars"),
            })
            .collect();
        assert_eq!(widths[0].0, 0.4);
        assert_eq!(widths[1].0, 0.4);
        // Two bars of width 0.4 centred on the tick.
        assert!((widths[0].1 + 0.2).abs() < 1e-9);
        assert!((widths[1].1 - 0.2).abs() < 1e-9);
    }

    #[test]
    fn combo_rotates_overlay_markers() {
        let figure = shape(GraphType::Combo, &["a", "b", "c"]);
        let plot = cartesian(&figure);
        assert!(matches!(plot.series[0].geometry, Geometry::Bars { .. }));
        assert!(matches!(
            plot.series[1].geometry,
            Geometry::Line {
                marker: Some(Marker::Circle),
                ..
            }
        ));
        assert!(matches!(
            plot.series[2].geometry,
            Geometry::Line {
                marker: Some(Marker::Square),
                ..
            }
        ));
    }

    #[test]
    fn combo_rejects_a_single_series() {
        let request = request(GraphType::Combo, &["a"]);
        let err = ComboChart.validate(&request).unwrap_err();
        assert_eq!(err.kind(), "chart_type");
    }

    #[test]
    fn colors_line_up_with_series_order() {
        let figure = shape(GraphType::Scatter, &["a", "b", "c"]);
        let plot = cartesian(&figure);
        let colors: Vec<&str> = plot.series.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, vec!["#1f77b4", "#ff7f0e", "#2ca02c"]);
    }
}
