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

use anyhow::{Context, Result};
use chartel::{ChartRequest, ChartService, GraphType};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};

/// Upload a CSV/JSON dataset, print chart recommendations and render one
/// chart to SVG.
#[derive(Debug, Parser)]
#[command(name = "chartel-demo")]
struct Args {
    /// Dataset file (.csv or .json)
    file: PathBuf,
    /// X-axis column
    #[arg(long)]
    x: String,
    /// Y-axis columns, repeatable
    #[arg(long = "y", required = true)]
    y: Vec<String>,
    /// Chart kind (line, bar, pie, area, scatter, histogram, box, violin,
    /// funnel, sunburst, waterfall, combo, stock)
    #[arg(long = "type", default_value = "line")]
    graph_type: String,
    /// Custom series colors, repeatable
    #[arg(long = "color")]
    colors: Vec<String>,
    /// Paint every series with the first custom color
    #[arg(long)]
    color_all: bool,
    /// Stock bucket token (1M,5M,10M,15M,30M,1H,4H,1D,1W,1MO)
    #[arg(long)]
    timeframe: Option<String>,
    /// Output image path
    #[arg(long, default_value = "chart.svg")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .init();
    let args = Args::parse();

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file.display().to_string());

    let service = ChartService::new();
    let summary = match service.upload(&bytes, &filename) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.response())?);
            std::process::exit(1);
        }
    };
    info!(rows = summary.rows, "uploaded {}", filename);
    println!("columns: {}", summary.columns.join(", "));

    let mut analysis_columns = vec![args.x.clone()];
    analysis_columns.extend(args.y.iter().cloned());
    match service.recommend(&analysis_columns) {
        Ok(recommendations) => {
            for rec in &recommendations {
                println!("suggested: {} ({:.2})", rec.chart_type, rec.confidence);
            }
        }
        Err(e) => eprintln!("recommendation failed: {e}"),
    }

    let graph_type: GraphType = args.graph_type.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut request = ChartRequest::new(args.x, args.y, graph_type);
    request.colors = args.colors;
    request.color_all = args.color_all;
    request.timeframe = args.timeframe;

    match service.generate(&request) {
        Ok(rendered) => {
            std::fs::write(&args.out, &rendered.image)
                .with_context(|| format!("failed to write {}", args.out.display()))?;
            println!(
                "wrote {} ({} chart, colors: {})",
                args.out.display(),
                rendered.graph_type,
                rendered.colors_used.join(", ")
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.response())?);
            std::process::exit(1);
        }
    }
}
