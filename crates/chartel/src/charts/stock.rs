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

use super::ChartStrategy;
use crate::error::{chart_type_error, Result};
use crate::figure::{CandlePlot, FigureSpec, PlotData, STOCK_HEIGHT, STOCK_WIDTH};
use crate::request::{ChartRequest, GraphType};
use crate::resample::{resample_ohlc, Timeframe};
use polars::prelude::DataFrame;

const DEFAULT_TIMEFRAME: &str = "1D";

pub struct StockChart;

impl ChartStrategy for StockChart {
    fn kind(&self) -> GraphType {
        GraphType::Stock
    }
    fn validate(&self, request: &ChartRequest) -> Result<()> {
        if request.y_columns.len() < 4 {
            return Err(chart_type_error(
                "Stock chart requires Open, High, Low, Close columns",
            ));
        }
        Ok(())
    }
    fn shape(
        &self,
        frame: &DataFrame,
        request: &ChartRequest,
        _colors: &[String],
    ) -> Result<FigureSpec> {
        let token = request.timeframe.as_deref().unwrap_or(DEFAULT_TIMEFRAME);
        let timeframe = Timeframe::parse(token)?;
        let bars = resample_ohlc(frame, &request.x_column, &request.y_columns, timeframe)?;
        let plot = CandlePlot {
            bars,
            timeframe,
            bucket_seconds: timeframe.approx_seconds(),
            volume_label: request.y_columns.get(4).cloned(),
        };
        Ok(FigureSpec {
            title: format!("Stock Price ({} timeframe)", timeframe.token()),
            x_label: Some("Date/Time".to_string()),
            y_label: Some("Price".to_string()),
            show_legend: false,
            show_grid: false,
            width: STOCK_WIDTH,
            height: STOCK_HEIGHT,
            plot: PlotData::Candles(plot),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartServiceError;
    use polars::df;

    fn ohlc_request(ys: &[&str], timeframe: Option<&str>) -> ChartRequest {
        let mut request = ChartRequest::new(
            "time",
            ys.iter().map(|s| s.to_string()).collect(),
            GraphType::Stock,
        );
        request.timeframe = timeframe.map(|s| s.to_string());
        request
    }

    fn ohlc_frame() -> DataFrame {
        df!(
            "time" => ["2024-01-01 09:00:00", "2024-01-01 09:02:00"],
            "open" => [1.0, 1.5],
            "high" => [2.0, 3.0],
            "low" => [0.5, 1.0],
            "close" => [1.5, 2.0],
            "volume" => [10i64, 20],
        )
        .unwrap()
    }

    #[test]
    fn fewer_than_four_columns_is_an_arity_error() {
        let request = ohlc_request(&["open", "high", "low"], None);
        assert_eq!(StockChart.validate(&request).unwrap_err().kind(), "chart_type");
    }

    #[test]
    fn unknown_timeframe_produces_no_partial_output() {
        let frame = ohlc_frame();
        let request = ohlc_request(&["open", "high", "low", "close"], Some("2D"));
        let err = StockChart.shape(&frame, &request, &[]).unwrap_err();
        assert!(matches!(err, ChartServiceError::InvalidTimeframe { token } if token == "2D"));
    }

    #[test]
    fn timeframe_defaults_to_daily() {
        let frame = ohlc_frame();
        let request = ohlc_request(&["open", "high", "low", "close"], None);
        let figure = StockChart.shape(&frame, &request, &[]).unwrap();
        assert_eq!(figure.title, "Stock Price (1D timeframe)");
        assert_eq!(figure.x_label.as_deref(), Some("Date/Time"));
        assert_eq!(figure.y_label.as_deref(), Some("Price"));
    }

    #[test]
    fn fifth_column_flows_through_as_volume() {
        let frame = ohlc_frame();
        let request = ohlc_request(&["open", "high", "low", "close", "volume"], Some("5m"));
        let figure = StockChart.shape(&frame, &request, &[]).unwrap();
        match figure.plot {
            PlotData::Candles(plot) => {
                assert_eq!(plot.volume_label.as_deref(), Some("volume"));
                assert_eq!(plot.bars.len(), 1);
                assert_eq!(plot.bars[0].volume, Some(30.0));
                assert_eq!(plot.bucket_seconds, 300);
            }
            other => panic!("expected candles, got {other:?}"),
        }
    }
}
