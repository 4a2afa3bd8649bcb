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

use crate::color::DEFAULT_PALETTE;
use crate::figure::{
    AxisValues, CandlePlot, CartesianPlot, DistributionGroup, DistributionKind, DistributionPlot,
    FigureSpec, Geometry, HorizontalBarPlot, Marker, PlotData, SlicePlot,
};
use chrono::DateTime;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::{FRAC_PI_2, TAU};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("drawing backend error: {0}")]
    Backend(String),
    #[error("invalid figure: {0}")]
    InvalidFigure(String),
    #[error("unrecognised color '{0}'")]
    InvalidColor(String),
}

/// Black-box drawing capability: shaped series and styling in, raster or
/// vector image bytes out. Deterministic for deterministic input.
pub trait Renderer: Send + Sync {
    fn render(&self, figure: &FigureSpec) -> Result<Vec<u8>, RenderError>;
}

/// Default renderer on plotters' SVG backend. The buffer is local to each
/// call, so an error exit leaves nothing half-drawn behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render(&self, figure: &FigureSpec) -> Result<Vec<u8>, RenderError> {
        let mut buffer = String::new();
        {
            let root = SVGBackend::with_string(&mut buffer, (figure.width, figure.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(to_backend)?;
            match &figure.plot {
                PlotData::Cartesian(plot) => draw_cartesian(&root, figure, plot)?,
                PlotData::Slices(plot) => draw_slices(&root, figure, plot)?,
                PlotData::HorizontalBars(plot) => draw_horizontal_bars(&root, figure, plot)?,
                PlotData::Distribution(plot) => draw_distribution(&root, figure, plot)?,
                PlotData::Candles(plot) => draw_candles(&root, figure, plot)?,
            }
            root.present().map_err(to_backend)?;
        }
        Ok(buffer.into_bytes())
    }
}

fn to_backend<E: std::fmt::Display>(error: E) -> RenderError {
    RenderError::Backend(error.to_string())
}

fn parse_color(spec: &str) -> Result<RGBColor, RenderError> {
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16);
            let g = u8::from_str_radix(&hex[2..4], 16);
            let b = u8::from_str_radix(&hex[4..6], 16);
            if let (Ok(r), Ok(g), Ok(b)) = (r, g, b) {
                return Ok(RGBColor(r, g, b));
            }
        }
        return Err(RenderError::InvalidColor(spec.to_string()));
    }
    match spec.to_lowercase().as_str() {
        "black" | "k" => Ok(RGBColor(0, 0, 0)),
        "white" | "w" => Ok(RGBColor(255, 255, 255)),
        "red" | "r" => Ok(RGBColor(214, 39, 40)),
        "green" | "g" => Ok(RGBColor(44, 160, 44)),
        "blue" | "b" => Ok(RGBColor(31, 119, 180)),
        "orange" => Ok(RGBColor(255, 127, 14)),
        "purple" => Ok(RGBColor(148, 103, 189)),
        "brown" => Ok(RGBColor(140, 86, 75)),
        "pink" => Ok(RGBColor(227, 119, 194)),
        "gray" | "grey" => Ok(RGBColor(127, 127, 127)),
        "olive" => Ok(RGBColor(188, 189, 34)),
        "cyan" | "c" => Ok(RGBColor(23, 190, 207)),
        "magenta" | "m" => Ok(RGBColor(255, 0, 255)),
        "yellow" | "y" => Ok(RGBColor(255, 221, 51)),
        _ => Err(RenderError::InvalidColor(spec.to_string())),
    }
}

fn slice_color(colors: &[String], index: usize) -> Result<RGBColor, RenderError> {
    if colors.is_empty() {
        return parse_color(DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()]);
    }
    parse_color(&colors[index % colors.len()])
}

fn finite_bounds<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let mut bounds: Option<(f64, f64)> = None;
    for &value in values {
        if !value.is_finite() {
            continue;
        }
        bounds = Some(match bounds {
            None => (value, value),
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
        });
    }
    bounds
}

fn padded_range(bounds: Option<(f64, f64)>) -> (f64, f64) {
    let (lo, hi) = bounds.unwrap_or((0.0, 1.0));
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn format_axis_number(value: f64) -> String {
    if value.abs() >= 1000.0 || value.fract().abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Formatter for a shared x/y axis: category lookup when labels exist,
/// plain numbers otherwise.
fn axis_formatter(labels: Vec<String>) -> impl Fn(&f64) -> String {
    move |value: &f64| {
        if labels.is_empty() {
            return format_axis_number(*value);
        }
        let index = value.round();
        if index < 0.0 || (value - index).abs() > 0.35 {
            return String::new();
        }
        labels.get(index as usize).cloned().unwrap_or_default()
    }
}

/// Splits a polyline at NaN gaps so missing rows break the line instead
/// of producing stray segments.
fn segments(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in points {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn regular_polygon(sides: usize, radius: f64) -> Vec<(i32, i32)> {
    (0..sides)
        .map(|k| {
            let angle = -FRAC_PI_2 + k as f64 * TAU / sides as f64;
            (
                (radius * angle.cos()).round() as i32,
                (radius * angle.sin()).round() as i32,
            )
        })
        .collect()
}

fn star_points() -> Vec<(i32, i32)> {
    (0..10)
        .map(|k| {
            let radius = if k % 2 == 0 { 5.0 } else { 2.0 };
            let angle = -FRAC_PI_2 + k as f64 * TAU / 10.0;
            (
                (radius * angle.cos()).round() as i32,
                (radius * angle.sin()).round() as i32,
            )
        })
        .collect()
}

fn marker_element<'a, DB: DrawingBackend + 'a>(
    marker: Marker,
    pos: (f64, f64),
    color: RGBColor,
) -> DynElement<'a, DB, (f64, f64)> {
    let style = color.filled();
    let anchor = EmptyElement::<(f64, f64), DB>::at(pos);
    match marker {
        Marker::Circle => (anchor + Circle::new((0, 0), 3, style)).into_dyn(),
        Marker::Square => (anchor + Rectangle::new([(-3, -3), (3, 3)], style)).into_dyn(),
        Marker::Triangle => {
            (anchor + Polygon::new(vec![(0, -4), (4, 3), (-4, 3)], style)).into_dyn()
        }
        Marker::InvertedTriangle => {
            (anchor + Polygon::new(vec![(0, 4), (4, -3), (-4, -3)], style)).into_dyn()
        }
        Marker::Diamond => {
            (anchor + Polygon::new(vec![(0, -5), (5, 0), (0, 5), (-5, 0)], style)).into_dyn()
        }
        Marker::Pentagon => (anchor + Polygon::new(regular_polygon(5, 4.5), style)).into_dyn(),
        Marker::Star => (anchor + Polygon::new(star_points(), style)).into_dyn(),
    }
}

fn cartesian_y_bounds(plot: &CartesianPlot) -> Option<(f64, f64)> {
    let mut all = Vec::new();
    for series in &plot.series {
        match &series.geometry {
            Geometry::Bars { .. } => {
                all.push(0.0);
                all.extend(series.values.iter().copied());
            }
            Geometry::BaselineBars { baselines } => {
                for (value, base) in series.values.iter().zip(baselines) {
                    all.push(*base);
                    if value.is_finite() {
                        all.push(base + value);
                    }
                }
            }
            _ => all.extend(series.values.iter().copied()),
        }
    }
    finite_bounds(all.iter())
}

fn draw_cartesian<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    plot: &CartesianPlot,
) -> Result<(), RenderError> {
    let positions = plot.x.positions();
    let (x_min, x_max) = match &plot.x {
        AxisValues::Numeric(values) => padded_range(finite_bounds(values.iter())),
        AxisValues::Categories(labels) => (-0.6, labels.len().max(1) as f64 - 0.4),
    };
    let (y_min, y_max) = padded_range(cartesian_y_bounds(plot));

    let mut chart = ChartBuilder::on(root)
        .caption(&figure.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(to_backend)?;

    let category_labels = match &plot.x {
        AxisValues::Categories(labels) => labels.clone(),
        AxisValues::Numeric(_) => Vec::new(),
    };
    let label_count = category_labels.len();
    let x_formatter = axis_formatter(category_labels);
    {
        let mut mesh = chart.configure_mesh();
        if !figure.show_grid {
            mesh.disable_mesh();
        }
        if let Some(label) = &figure.x_label {
            mesh.x_desc(label);
        }
        if let Some(label) = &figure.y_label {
            mesh.y_desc(label);
        }
        mesh.x_label_formatter(&x_formatter);
        if label_count > 0 {
            mesh.x_labels(label_count.min(12));
        }
        mesh.draw().map_err(to_backend)?;
    }

    for series in &plot.series {
        let color = parse_color(&series.color)?;
        let points: Vec<(f64, f64)> = positions
            .iter()
            .zip(&series.values)
            .map(|(&x, &y)| (x, y))
            .collect();
        match &series.geometry {
            Geometry::Line { width, marker } => {
                let style = color.stroke_width(*width);
                let mut labelled = false;
                for segment in segments(&points) {
                    let anno = chart
                        .draw_series(std::iter::once(PathElement::new(segment, style)))
                        .map_err(to_backend)?;
                    if !labelled {
                        anno.label(series.name.as_str()).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 18, y)], style)
                        });
                        labelled = true;
                    }
                }
                if let Some(marker) = marker {
                    chart
                        .draw_series(
                            points
                                .iter()
                                .filter(|(x, y)| x.is_finite() && y.is_finite())
                                .map(|&p| marker_element(*marker, p, color)),
                        )
                        .map_err(to_backend)?;
                }
            }
            Geometry::Area => {
                let fill = color.mix(0.4);
                let mut labelled = false;
                for segment in segments(&points) {
                    let anno = chart
                        .draw_series(AreaSeries::new(segment.iter().copied(), 0.0, fill.filled()))
                        .map_err(to_backend)?;
                    if !labelled {
                        anno.label(series.name.as_str()).legend(move |(x, y)| {
                            Rectangle::new([(x, y - 5), (x + 12, y + 5)], fill.filled())
                        });
                        labelled = true;
                    }
                    chart
                        .draw_series(std::iter::once(PathElement::new(
                            segment.clone(),
                            color.mix(0.8).stroke_width(1),
                        )))
                        .map_err(to_backend)?;
                }
            }
            Geometry::Points { radius } => {
                let style = color.mix(0.7).filled();
                let radius = *radius as i32;
                chart
                    .draw_series(
                        points
                            .iter()
                            .filter(|(x, y)| x.is_finite() && y.is_finite())
                            .map(|&(x, y)| Circle::new((x, y), radius, style)),
                    )
                    .map_err(to_backend)?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| Circle::new((x + 9, y), 4, style));
            }
            Geometry::Bars { width, offset } => {
                let style = color.mix(0.8).filled();
                let half = width / 2.0;
                let offset = *offset;
                chart
                    .draw_series(
                        points
                            .iter()
                            .filter(|(_, y)| y.is_finite())
                            .map(|&(x, y)| {
                                Rectangle::new(
                                    [(x + offset - half, 0.0), (x + offset + half, y)],
                                    style,
                                )
                            }),
                    )
                    .map_err(to_backend)?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], style)
                    });
            }
            Geometry::BaselineBars { baselines } => {
                let style = color.mix(0.9).filled();
                chart
                    .draw_series(
                        points
                            .iter()
                            .zip(baselines)
                            .filter(|((_, y), _)| y.is_finite())
                            .map(|(&(x, y), &base)| {
                                Rectangle::new([(x - 0.4, base), (x + 0.4, base + y)], style)
                            }),
                    )
                    .map_err(to_backend)?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], style)
                    });
            }
        }
    }

    if figure.show_legend && !plot.series.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(to_backend)?;
    }
    Ok(())
}

fn sector_points(start: f64, end: f64, inner: f64, steps: usize) -> Vec<(f64, f64)> {
    let steps = steps.max(2);
    let arc = |t: f64, radius: f64| (radius * t.cos(), radius * t.sin());
    let mut points = Vec::with_capacity(steps * 2 + 2);
    for k in 0..=steps {
        let t = start + (end - start) * k as f64 / steps as f64;
        points.push(arc(t, 1.0));
    }
    if inner > 0.0 {
        for k in (0..=steps).rev() {
            let t = start + (end - start) * k as f64 / steps as f64;
            points.push(arc(t, inner));
        }
    } else {
        points.push((0.0, 0.0));
    }
    points
}

fn draw_slices<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    plot: &SlicePlot,
) -> Result<(), RenderError> {
    let total: f64 = plot.values.iter().sum();
    if total <= 0.0 {
        return Err(RenderError::InvalidFigure(
            "slice values sum to zero".to_string(),
        ));
    }
    let aspect = figure.width as f64 / figure.height as f64;
    let mut chart = ChartBuilder::on(root)
        .caption(&figure.title, ("sans-serif", 28))
        .margin(10)
        .build_cartesian_2d(-1.45 * aspect..1.45 * aspect, -1.45..1.45)
        .map_err(to_backend)?;

    let inner = if plot.donut { 0.5 } else { 0.0 };
    let mut start = FRAC_PI_2;
    for (i, &value) in plot.values.iter().enumerate() {
        let frac = value / total;
        let end = start + frac * TAU;
        let color = slice_color(&plot.colors, i)?;
        let steps = ((frac * 72.0).ceil() as usize).clamp(2, 72);
        let outline = sector_points(start, end, inner, steps);
        chart
            .draw_series(std::iter::once(Polygon::new(outline.clone(), color.filled())))
            .map_err(to_backend)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                outline,
                WHITE.stroke_width(1),
            )))
            .map_err(to_backend)?;

        let mid = (start + end) / 2.0;
        if let Some(label) = plot.labels.get(i) {
            chart
                .draw_series(std::iter::once(Text::new(
                    label.clone(),
                    (1.12 * mid.cos(), 1.12 * mid.sin()),
                    ("sans-serif", 16).into_font(),
                )))
                .map_err(to_backend)?;
        }
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{:.1}%", frac * 100.0),
                (0.75 * mid.cos(), 0.75 * mid.sin()),
                ("sans-serif", 14).into_font().color(&BLACK),
            )))
            .map_err(to_backend)?;
        start = end;
    }
    Ok(())
}

fn draw_horizontal_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    plot: &HorizontalBarPlot,
) -> Result<(), RenderError> {
    let n = plot.values.len();
    let mut x_values: Vec<f64> = plot.values.clone();
    x_values.push(0.0);
    let (x_min, x_max) = padded_range(finite_bounds(x_values.iter()));
    let y_max = n.max(1) as f64 - 0.4;

    let mut chart = ChartBuilder::on(root)
        .caption(&figure.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(90)
        .build_cartesian_2d(x_min..x_max, -0.6..y_max)
        .map_err(to_backend)?;

    // Row 0 is drawn at the top.
    let mut top_down = plot.labels.clone();
    top_down.reverse();
    let y_formatter = axis_formatter(top_down);
    {
        let mut mesh = chart.configure_mesh();
        if !figure.show_grid {
            mesh.disable_mesh();
        }
        if let Some(label) = &figure.x_label {
            mesh.x_desc(label);
        }
        if let Some(label) = &figure.y_label {
            mesh.y_desc(label);
        }
        mesh.y_label_formatter(&y_formatter).y_labels(n.clamp(1, 16));
        mesh.draw().map_err(to_backend)?;
    }

    for (i, &value) in plot.values.iter().enumerate() {
        if !value.is_finite() {
            continue;
        }
        let y = (n - 1 - i) as f64;
        let color = slice_color(&plot.colors, i)?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(0.0, y - 0.4), (value, y + 0.4)],
                color.mix(0.85).filled(),
            )))
            .map_err(to_backend)?;
    }
    Ok(())
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = pos - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

fn histogram_bins(values: &[f64]) -> Vec<(f64, f64, usize)> {
    let Some((min, max)) = finite_bounds(values.iter()) else {
        return Vec::new();
    };
    if (max - min).abs() < f64::EPSILON {
        return vec![(min - 0.5, max + 0.5, values.len())];
    }
    // Sturges' rule, the usual "auto" choice for modest samples.
    let bins = ((values.len() as f64).log2().ceil() as usize + 1).clamp(1, 60);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &value in values {
        let index = (((value - min) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (min + i as f64 * width, min + (i + 1) as f64 * width, count))
        .collect()
}

fn kde_curve(values: &[f64]) -> Vec<(f64, f64)> {
    let n = values.len();
    let Some((min, max)) = finite_bounds(values.iter()) else {
        return Vec::new();
    };
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
    let spread = if iqr > 0.0 { std.min(iqr / 1.34) } else { std };
    let mut bandwidth = 0.9 * spread * (n as f64).powf(-0.2);
    if !(bandwidth > 0.0) {
        bandwidth = ((max - min) / 10.0).max(1e-3);
    }
    let lo = min - 2.0 * bandwidth;
    let hi = max + 2.0 * bandwidth;
    let steps = 48;
    let norm = 1.0 / (n as f64 * bandwidth * (TAU).sqrt());
    (0..=steps)
        .map(|k| {
            let y = lo + (hi - lo) * k as f64 / steps as f64;
            let density: f64 = values
                .iter()
                .map(|v| (-0.5 * ((y - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (y, density)
        })
        .collect()
}

fn draw_distribution<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    plot: &DistributionPlot,
) -> Result<(), RenderError> {
    match plot.kind {
        DistributionKind::Histogram => draw_histogram(root, figure, &plot.groups),
        DistributionKind::Box | DistributionKind::Violin => {
            draw_group_summaries(root, figure, plot)
        }
    }
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    groups: &[DistributionGroup],
) -> Result<(), RenderError> {
    let binned: Vec<(&DistributionGroup, Vec<(f64, f64, usize)>)> = groups
        .iter()
        .map(|group| (group, histogram_bins(&group.values)))
        .collect();
    let all_edges: Vec<f64> = binned
        .iter()
        .flat_map(|(_, bins)| bins.iter().flat_map(|&(lo, hi, _)| [lo, hi]))
        .collect();
    let (x_min, x_max) = padded_range(finite_bounds(all_edges.iter()));
    let max_count = binned
        .iter()
        .flat_map(|(_, bins)| bins.iter().map(|&(_, _, count)| count))
        .max()
        .unwrap_or(1);

    let mut chart = ChartBuilder::on(root)
        .caption(&figure.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0.0..max_count as f64 * 1.08)
        .map_err(to_backend)?;
    {
        let mut mesh = chart.configure_mesh();
        if !figure.show_grid {
            mesh.disable_mesh();
        }
        if let Some(label) = &figure.x_label {
            mesh.x_desc(label);
        }
        if let Some(label) = &figure.y_label {
            mesh.y_desc(label);
        }
        mesh.draw().map_err(to_backend)?;
    }

    for (group, bins) in &binned {
        let color = parse_color(&group.color)?;
        let style = color.mix(0.7).filled();
        chart
            .draw_series(
                bins.iter()
                    .filter(|(_, _, count)| *count > 0)
                    .map(|&(lo, hi, count)| {
                        Rectangle::new([(lo, 0.0), (hi, count as f64)], style)
                    }),
            )
            .map_err(to_backend)?
            .label(group.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], style));
    }

    if figure.show_legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(to_backend)?;
    }
    Ok(())
}

fn draw_group_summaries<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    plot: &DistributionPlot,
) -> Result<(), RenderError> {
    let n = plot.groups.len();
    let all_values: Vec<f64> = plot
        .groups
        .iter()
        .flat_map(|g| g.values.iter().copied())
        .collect();
    let (y_min, y_max) = padded_range(finite_bounds(all_values.iter()));

    let mut chart = ChartBuilder::on(root)
        .caption(&figure.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.6..n.max(1) as f64 - 0.4, y_min..y_max)
        .map_err(to_backend)?;

    let names: Vec<String> = plot.groups.iter().map(|g| g.name.clone()).collect();
    let x_formatter = axis_formatter(names);
    {
        let mut mesh = chart.configure_mesh();
        if !figure.show_grid {
            mesh.disable_mesh();
        }
        if let Some(label) = &figure.x_label {
            mesh.x_desc(label);
        }
        if let Some(label) = &figure.y_label {
            mesh.y_desc(label);
        }
        mesh.x_label_formatter(&x_formatter).x_labels(n.clamp(1, 12));
        mesh.draw().map_err(to_backend)?;
    }

    for (i, group) in plot.groups.iter().enumerate() {
        let pos = i as f64;
        let color = parse_color(&group.color)?;
        match plot.kind {
            DistributionKind::Box => draw_box(&mut chart, pos, group, color)?,
            DistributionKind::Violin => draw_violin(&mut chart, pos, group, color)?,
            DistributionKind::Histogram => unreachable!("handled by draw_histogram"),
        }
    }
    Ok(())
}

type SummaryChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_box<DB: DrawingBackend>(
    chart: &mut SummaryChart<'_, DB>,
    pos: f64,
    group: &DistributionGroup,
    color: RGBColor,
) -> Result<(), RenderError> {
    let mut sorted = group.values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = quantile(&sorted, 0.25);
    let q2 = quantile(&sorted, 0.50);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let fence_lo = q1 - 1.5 * iqr;
    let fence_hi = q3 + 1.5 * iqr;
    let whisker_lo = sorted
        .iter()
        .copied()
        .find(|&v| v >= fence_lo)
        .unwrap_or(q1);
    let whisker_hi = sorted
        .iter()
        .rev()
        .copied()
        .find(|&v| v <= fence_hi)
        .unwrap_or(q3);

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(pos - 0.25, q1), (pos + 0.25, q3)],
            color.mix(0.7).filled(),
        )))
        .map_err(to_backend)?;
    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(pos - 0.25, q1), (pos + 0.25, q3)],
            BLACK.stroke_width(1),
        )))
        .map_err(to_backend)?;
    let lines = vec![
        vec![(pos - 0.25, q2), (pos + 0.25, q2)],
        vec![(pos, q1), (pos, whisker_lo)],
        vec![(pos, q3), (pos, whisker_hi)],
        vec![(pos - 0.12, whisker_lo), (pos + 0.12, whisker_lo)],
        vec![(pos - 0.12, whisker_hi), (pos + 0.12, whisker_hi)],
    ];
    chart
        .draw_series(
            lines
                .into_iter()
                .map(|line| PathElement::new(line, BLACK.stroke_width(1))),
        )
        .map_err(to_backend)?;
    chart
        .draw_series(
            sorted
                .iter()
                .filter(|&&v| v < whisker_lo || v > whisker_hi)
                .map(|&v| Circle::new((pos, v), 2, BLACK.stroke_width(1))),
        )
        .map_err(to_backend)?;
    Ok(())
}

fn draw_violin<DB: DrawingBackend>(
    chart: &mut SummaryChart<'_, DB>,
    pos: f64,
    group: &DistributionGroup,
    color: RGBColor,
) -> Result<(), RenderError> {
    let curve = kde_curve(&group.values);
    if curve.is_empty() {
        return Ok(());
    }
    let max_density = curve
        .iter()
        .map(|&(_, d)| d)
        .fold(f64::MIN_POSITIVE, f64::max);
    let half_width = 0.25;
    let mut outline: Vec<(f64, f64)> = curve
        .iter()
        .map(|&(y, d)| (pos + half_width * d / max_density, y))
        .collect();
    outline.extend(
        curve
            .iter()
            .rev()
            .map(|&(y, d)| (pos - half_width * d / max_density, y)),
    );
    chart
        .draw_series(std::iter::once(Polygon::new(
            outline,
            color.mix(0.7).filled(),
        )))
        .map_err(to_backend)?;

    let n = group.values.len() as f64;
    let mean = group.values.iter().sum::<f64>() / n;
    let mut sorted = group.values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = quantile(&sorted, 0.5);
    let ticks = vec![
        vec![(pos - half_width, mean), (pos + half_width, mean)],
        vec![(pos - half_width, median), (pos + half_width, median)],
    ];
    chart
        .draw_series(
            ticks
                .into_iter()
                .map(|line| PathElement::new(line, BLACK.stroke_width(1))),
        )
        .map_err(to_backend)?;
    Ok(())
}

fn draw_candles<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    plot: &CandlePlot,
) -> Result<(), RenderError> {
    if plot.bars.is_empty() {
        return Err(RenderError::InvalidFigure("no candles to draw".to_string()));
    }
    let times: Vec<f64> = plot
        .bars
        .iter()
        .map(|bar| bar.timestamp.and_utc().timestamp() as f64)
        .collect();
    let span = plot.bucket_seconds as f64;
    // Body width follows the actual bucket duration, 80% of the span.
    let half = 0.4 * span;
    let x_lo = times.first().copied().unwrap_or(0.0) - span;
    let x_hi = times.last().copied().unwrap_or(1.0) + span;
    let lows: Vec<f64> = plot.bars.iter().map(|b| b.low).collect();
    let highs: Vec<f64> = plot.bars.iter().map(|b| b.high).collect();
    let (y_lo, _) = padded_range(finite_bounds(lows.iter()));
    let (_, y_hi) = padded_range(finite_bounds(highs.iter()));

    let has_volume = plot.volume_label.is_some();
    let volume_max = plot
        .bars
        .iter()
        .filter_map(|b| b.volume)
        .fold(0.0f64, f64::max)
        .max(1.0)
        * 1.05;

    let mut builder = ChartBuilder::on(root);
    builder
        .caption(&figure.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(55)
        .y_label_area_size(70);
    if has_volume {
        builder.right_y_label_area_size(70);
    }
    let mut chart = builder
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(to_backend)?
        .set_secondary_coord(x_lo..x_hi, 0.0..volume_max);

    let x_formatter = |value: &f64| {
        DateTime::from_timestamp(*value as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    };
    {
        let mut mesh = chart.configure_mesh();
        if !figure.show_grid {
            mesh.disable_mesh();
        }
        if let Some(label) = &figure.x_label {
            mesh.x_desc(label);
        }
        if let Some(label) = &figure.y_label {
            mesh.y_desc(label);
        }
        mesh.x_label_formatter(&x_formatter).x_labels(8);
        mesh.draw().map_err(to_backend)?;
    }
    if has_volume {
        chart
            .configure_secondary_axes()
            .y_desc("Volume")
            .draw()
            .map_err(to_backend)?;
        chart
            .draw_secondary_series(
                plot.bars
                    .iter()
                    .zip(&times)
                    .filter_map(|(bar, &t)| bar.volume.map(|v| (t, v)))
                    .map(|(t, v)| {
                        Rectangle::new([(t - half, 0.0), (t + half, v)], BLUE.mix(0.3).filled())
                    }),
            )
            .map_err(to_backend)?;
    }

    // Wicks first, then bodies, up candles green and down candles red.
    chart
        .draw_series(plot.bars.iter().zip(&times).map(|(bar, &t)| {
            let color = if bar.close >= bar.open { GREEN } else { RED };
            PathElement::new(vec![(t, bar.low), (t, bar.high)], color.stroke_width(1))
        }))
        .map_err(to_backend)?;
    chart
        .draw_series(plot.bars.iter().zip(&times).map(|(bar, &t)| {
            let color = if bar.close >= bar.open { GREEN } else { RED };
            Rectangle::new([(t - half, bar.open), (t + half, bar.close)], color.filled())
        }))
        .map_err(to_backend)?;
    Ok(())
}
