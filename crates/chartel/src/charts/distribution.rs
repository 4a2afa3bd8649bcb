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

use super::{series, styled_figure, ChartStrategy};
use crate::coerce;
use crate::error::{ChartServiceError, Result};
use crate::figure::{
    DistributionGroup, DistributionKind, DistributionPlot, FigureSpec, PlotData,
};
use crate::request::{ChartRequest, GraphType};
use polars::prelude::DataFrame;

/// One group of finite values per y column; a column with nothing numeric
/// left after coercion is an error rather than an invisible distribution.
fn distribution_groups(
    frame: &DataFrame,
    request: &ChartRequest,
    colors: &[String],
) -> Result<Vec<DistributionGroup>> {
    request
        .y_columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values = coerce::finite_values(series(frame, name)?)?;
            if values.is_empty() {
                return Err(ChartServiceError::NoNumericData {
                    column: name.clone(),
                });
            }
            Ok(DistributionGroup {
                name: name.clone(),
                color: colors[i % colors.len()].clone(),
                values,
            })
        })
        .collect()
}

fn distribution_figure(
    kind: GraphType,
    distribution: DistributionKind,
    frame: &DataFrame,
    request: &ChartRequest,
    colors: &[String],
) -> Result<FigureSpec> {
    let plot = DistributionPlot {
        kind: distribution,
        groups: distribution_groups(frame, request, colors)?,
    };
    Ok(styled_figure(
        kind,
        &request.x_column,
        PlotData::Distribution(plot),
    ))
}

pub struct HistogramChart;

impl ChartStrategy for HistogramChart {
    fn kind(&self) -> GraphType {
        GraphType::Histogram
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        distribution_figure(self.kind(), DistributionKind::Histogram, frame, request, colors)
    }
}

pub struct BoxChart;

impl ChartStrategy for BoxChart {
    fn kind(&self) -> GraphType {
        GraphType::Box
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        distribution_figure(self.kind(), DistributionKind::Box, frame, request, colors)
    }
}

pub struct ViolinChart;

impl ChartStrategy for ViolinChart {
    fn kind(&self) -> GraphType {
        GraphType::Violin
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        colors: &[String],
    ) -> Result<FigureSpec> {
        distribution_figure(self.kind(), DistributionKind::Violin, frame, request, colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::resolve_colors;
    use polars::df;

    fn frame() -> DataFrame {
        df!(
            "label" => ["a", "b", "c", "d"],
            "score" => [1.0, 2.0, 2.5, 9.0],
            "noise" => ["1", "x", "3", ""],
        )
        .unwrap()
    }

    fn request(kind: GraphType, ys: &[&str]) -> ChartRequest {
        ChartRequest::new("label", ys.iter().map(|s| s.to_string()).collect(), kind)
    }

    #[test]
    fn each_y_column_becomes_its_own_group() {
        let frame = frame();
        let figure = BoxChart
            .shape(
                &frame,
                &request(GraphType::Box, &["score", "noise"]),
                &resolve_colors(2, &[], false),
            )
            .unwrap();
        match figure.plot {
            PlotData::Distribution(plot) => {
                assert_eq!(plot.kind, DistributionKind::Box);
                assert_eq!(plot.groups.len(), 2);
                assert_eq!(plot.groups[0].values.len(), 4);
                // Unparseable and empty cells dropped, numeric kept.
                assert_eq!(plot.groups[1].values, vec![1.0, 3.0]);
            }
            other => panic!("expected distribution, got {other:?}"),
        }
    }

    #[test]
    fn violin_and_histogram_tag_their_kind() {
        let frame = frame();
        let violin = ViolinChart
            .shape(
                &frame,
                &request(GraphType::Violin, &["score"]),
                &resolve_colors(1, &[], false),
            )
            .unwrap();
        assert!(matches!(
            violin.plot,
            PlotData::Distribution(DistributionPlot {
                kind: DistributionKind::Violin,
                ..
            })
        ));
        let histogram = HistogramChart
            .shape(
                &frame,
                &request(GraphType::Histogram, &["score"]),
                &resolve_colors(1, &[], false),
            )
            .unwrap();
        assert_eq!(histogram.title, "Histogram Chart");
        assert!(matches!(
            histogram.plot,
            PlotData::Distribution(DistributionPlot {
                kind: DistributionKind::Histogram,
                ..
            })
        ));
    }

    #[test]
    fn a_fully_non_numeric_column_errors() {
        let frame = df!("label" => ["a"], "text" => ["hello"]).unwrap();
        let err = HistogramChart
            .shape(
                &frame,
                &request(GraphType::Histogram, &["text"]),
                &resolve_colors(1, &[], false),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "no_numeric_data");
    }
}
