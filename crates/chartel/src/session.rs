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

use crate::error::{ChartServiceError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use polars::prelude::DataFrame;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The single "current dataset" of a session, replaced wholesale on upload.
#[derive(Debug)]
pub struct SessionDataset {
    pub id: DatasetId,
    pub name: String,
    pub frame: DataFrame,
    pub uploaded_at: DateTime<Utc>,
}

impl SessionDataset {
    pub fn new(name: String, frame: DataFrame) -> Self {
        Self {
            id: DatasetId::new(),
            name,
            frame,
            uploaded_at: Utc::now(),
        }
    }
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }
}

/// Holds at most one dataset. Requests take an `Arc` snapshot so a
/// concurrent upload cannot swap the data out from under a running
/// chart generation.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Arc<SessionDataset>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }
    pub fn replace(&self, dataset: SessionDataset) -> Arc<SessionDataset> {
        let dataset = Arc::new(dataset);
        *self.current.write() = Some(Arc::clone(&dataset));
        dataset
    }
    pub fn snapshot(&self) -> Result<Arc<SessionDataset>> {
        self.current
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(ChartServiceError::DataNotLoaded)
    }
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
    pub fn clear(&self) {
        *self.current.write() = None;
    }
}
