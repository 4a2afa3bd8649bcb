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

pub mod charts;
pub mod coerce;
pub mod color;
pub mod error;
pub mod figure;
pub mod ingest;
pub mod profile;
pub mod recommend;
pub mod render;
pub mod request;
pub mod resample;
pub mod session;

pub use charts::{strategy_for, ChartStrategy};
pub use color::{resolve_colors, DEFAULT_PALETTE};
pub use error::{ChartServiceError, ErrorResponse, Result};
pub use figure::{FigureSpec, PlotData};
pub use profile::{classify_columns, ColumnProfile, SemanticType};
pub use recommend::{Recommendation, MAX_RECOMMENDATIONS};
pub use render::{RenderError, Renderer, SvgRenderer};
pub use request::{validate_request, ChartRequest, GraphType};
pub use resample::{resample_ohlc, OhlcBar, Timeframe};
pub use session::{DatasetId, SessionDataset, SessionStore};

use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub columns: Vec<String>,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct RenderResult {
    pub image: Vec<u8>,
    pub graph_type: GraphType,
    pub colors_used: Vec<String>,
}

/// The three request operations over one session dataset: upload,
/// recommend, generate. Holds the store and the renderer; everything else
/// is stateless dispatch.
pub struct ChartService {
    store: SessionStore,
    renderer: Box<dyn Renderer>,
}

impl ChartService {
    pub fn new() -> Self {
        Self::with_renderer(Box::new(SvgRenderer))
    }
    pub fn with_renderer(renderer: Box<dyn Renderer>) -> Self {
        Self {
            store: SessionStore::new(),
            renderer,
        }
    }
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Replaces the session dataset and reports its column names.
    pub fn upload(&self, bytes: &[u8], filename: &str) -> Result<UploadSummary> {
        let frame = ingest::load_dataset(bytes, filename)?;
        let dataset = self
            .store
            .replace(SessionDataset::new(filename.to_string(), frame));
        info!(
            dataset = %dataset.id,
            name = %dataset.name,
            rows = dataset.frame.height(),
            columns = dataset.frame.width(),
            "dataset replaced"
        );
        Ok(UploadSummary {
            columns: dataset.column_names(),
            rows: dataset.frame.height(),
        })
    }

    /// Classifies the requested columns and ranks chart suggestions.
    pub fn recommend(&self, columns: &[String]) -> Result<Vec<Recommendation>> {
        let dataset = self.store.snapshot()?;
        let profiles = classify_columns(&dataset.frame, columns)?;
        let recommendations = recommend::recommend(&profiles);
        debug!(
            requested = columns.len(),
            classified = profiles.len(),
            produced = recommendations.len(),
            "chart recommendations computed"
        );
        Ok(recommendations)
    }

    /// Validates, shapes and renders one chart request.
    pub fn generate(&self, request: &ChartRequest) -> Result<RenderResult> {
        let dataset = self.store.snapshot()?;
        validate_request(&dataset, request)?;
        let strategy = strategy_for(request.graph_type);
        strategy.validate(request)?;
        let colors = resolve_colors(request.y_columns.len(), &request.colors, request.color_all);
        let figure = strategy.shape(&dataset.frame, request, &colors)?;
        debug!(
            graph_type = %request.graph_type,
            series = request.y_columns.len(),
            "figure shaped"
        );
        let image = self
            .renderer
            .render(&figure)
            .map_err(|e| ChartServiceError::Render {
                reason: e.to_string(),
            })?;
        Ok(RenderResult {
            image,
            graph_type: request.graph_type,
            colors_used: colors,
        })
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
