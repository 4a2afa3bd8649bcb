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

use crate::resample::{OhlcBar, Timeframe};

pub const DEFAULT_WIDTH: u32 = 1000;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const STOCK_WIDTH: u32 = 1500;
pub const STOCK_HEIGHT: u32 = 700;

/// The shape descriptor handed to the renderer: shaped series plus the
/// styling the chart kind dictates. The renderer treats this as a closed
/// world; nothing in here refers back to the dataset.
#[derive(Debug, Clone)]
pub struct FigureSpec {
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub show_legend: bool,
    pub show_grid: bool,
    pub width: u32,
    pub height: u32,
    pub plot: PlotData,
}

#[derive(Debug, Clone)]
pub enum PlotData {
    Cartesian(CartesianPlot),
    Slices(SlicePlot),
    HorizontalBars(HorizontalBarPlot),
    Distribution(DistributionPlot),
    Candles(CandlePlot),
}

/// Shared x domain with one or more overlaid series.
#[derive(Debug, Clone)]
pub struct CartesianPlot {
    pub x: AxisValues,
    pub series: Vec<SeriesSpec>,
}

#[derive(Debug, Clone)]
pub enum AxisValues {
    /// Numeric positions used as-is.
    Numeric(Vec<f64>),
    /// Labels drawn at positions 0..n.
    Categories(Vec<String>),
}

impl AxisValues {
    pub fn len(&self) -> usize {
        match self {
            AxisValues::Numeric(values) => values.len(),
            AxisValues::Categories(labels) => labels.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Plot-space positions; categories sit at their index.
    pub fn positions(&self) -> Vec<f64> {
        match self {
            AxisValues::Numeric(values) => values.clone(),
            AxisValues::Categories(labels) => (0..labels.len()).map(|i| i as f64).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesSpec {
    pub name: String,
    pub color: String,
    /// One value per x position; NaN marks a gap.
    pub values: Vec<f64>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone)]
pub enum Geometry {
    Line {
        width: u32,
        marker: Option<Marker>,
    },
    /// Filled region under the series plus an outline.
    Area,
    Points {
        radius: u32,
    },
    /// Grouped bars: `width` in category units, the bar centre shifted
    /// by `offset` from the tick.
    Bars {
        width: f64,
        offset: f64,
    },
    /// One bar per x position starting at its own baseline (waterfall).
    BaselineBars {
        baselines: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
    Triangle,
    Diamond,
    InvertedTriangle,
    Pentagon,
    Star,
}

/// Marker rotation for combo-chart overlay lines, cycled every six.
pub const COMBO_MARKERS: [Marker; 6] = [
    Marker::Square,
    Marker::Triangle,
    Marker::Diamond,
    Marker::InvertedTriangle,
    Marker::Pentagon,
    Marker::Star,
];

#[derive(Debug, Clone)]
pub struct SlicePlot {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Cycled over the slices, matching how a short color list cycles.
    pub colors: Vec<String>,
    /// Ring rendering (sunburst) instead of a full disc.
    pub donut: bool,
}

/// Horizontal bars, first row drawn at the top (funnel).
#[derive(Debug, Clone)]
pub struct HorizontalBarPlot {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DistributionPlot {
    pub kind: DistributionKind,
    pub groups: Vec<DistributionGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Histogram,
    Box,
    /// Kernel-density outline with mean and median ticks.
    Violin,
}

#[derive(Debug, Clone)]
pub struct DistributionGroup {
    pub name: String,
    pub color: String,
    /// Finite values only; coercion drops the rest upstream.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct CandlePlot {
    pub bars: Vec<OhlcBar>,
    pub timeframe: Timeframe,
    /// Candle bodies span 80% of this on the time axis.
    pub bucket_seconds: i64,
    /// Present when a fifth y column contributed volume bars.
    pub volume_label: Option<String>,
}
