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

pub mod cartesian;
pub mod distribution;
pub mod proportion;
pub mod stock;

use crate::coerce;
use crate::error::{render_error, Result};
use crate::figure::{AxisValues, FigureSpec, PlotData, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::request::{ChartRequest, GraphType};
use polars::prelude::{DataFrame, Series};

/// One chart kind: its arity rules and how it shapes columns into the
/// renderer's figure. Strategies hold no state; dispatch is a lookup.
pub trait ChartStrategy: Send + Sync {
    fn kind(&self) -> GraphType;
    fn validate(&self, _request: &ChartRequest) -> Result<()> {
        Ok(())
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec>;
}

pub fn strategy_for(kind: GraphType) -> &'static dyn ChartStrategy {
    match kind {
        GraphType::Line => &cartesian::LineChart,
        GraphType::Bar => &cartesian::BarChart,
        GraphType::Area => &cartesian::AreaChart,
        GraphType::Scatter => &cartesian::ScatterChart,
        GraphType::Combo => &cartesian::ComboChart,
        GraphType::Histogram => &distribution::HistogramChart,
        GraphType::Box => &distribution::BoxChart,
        GraphType::Violin => &distribution::ViolinChart,
        GraphType::Pie => &proportion::PieChart,
        GraphType::Sunburst => &proportion::SunburstChart,
        GraphType::Funnel => &proportion::FunnelChart,
        GraphType::Waterfall => &proportion::WaterfallChart,
        GraphType::Stock => &stock::StockChart,
    }
}

pub(crate) fn series<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Series> {
    frame
        .column(name)
        .map_err(render_error)?
        .as_series()
        .ok_or_else(|| render_error(format!("column '{name}' holds no series")))
}

/// The shared x domain: numeric columns keep their positions, everything
/// else becomes category labels at 0..n.
pub(crate) fn axis_values(frame: &DataFrame, x_column: &str) -> Result<AxisValues> {
    let x = series(frame, x_column)?;
    if coerce::is_numeric_dtype(x.dtype()) {
        Ok(AxisValues::Numeric(coerce::numeric_values(x)?))
    } else {
        Ok(AxisValues::Categories(coerce::string_values(x)?))
    }
}

/// Common post-shape styling for every non-stock kind: axis labels, the
/// capitalised title, and legend/grid suppression for the shapes that
/// carry their own labels.
pub(crate) fn styled_figure(kind: GraphType, x_column: &str, plot: PlotData) -> FigureSpec {
    let labelled = !matches!(
        kind,
        GraphType::Pie | GraphType::Sunburst | GraphType::Funnel
    );
    FigureSpec {
        title: kind.chart_title(),
        x_label: Some(x_column.to_string()),
        y_label: Some("Values".to_string()),
        show_legend: labelled,
        show_grid: labelled,
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        plot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_strategy() {
        for kind in GraphType::ALL {
            assert_eq!(strategy_for(kind).kind(), kind);
        }
    }

    #[test]
    fn proportion_kinds_suppress_legend_and_grid() {
        for kind in [GraphType::Pie, GraphType::Sunburst, GraphType::Funnel] {
            let figure = styled_figure(
                kind,
                "x",
                PlotData::Slices(crate::figure::SlicePlot {
                    labels: vec![],
                    values: vec![],
                    colors: vec![],
                    donut: false,
                }),
            );
            assert!(!figure.show_legend);
            assert!(!figure.show_grid);
        }
        let figure = styled_figure(
            GraphType::Line,
            "x",
            PlotData::Slices(crate::figure::SlicePlot {
                labels: vec![],
                values: vec![],
                colors: vec![],
                donut: false,
            }),
        );
        assert!(figure.show_legend);
        assert_eq!(figure.title, "Line Chart");
        assert_eq!(figure.y_label.as_deref(), Some("Values"));
    }
}
