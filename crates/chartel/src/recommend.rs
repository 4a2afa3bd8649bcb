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

use crate::profile::{ColumnProfile, SemanticType};
use crate::request::GraphType;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub chart_type: GraphType,
    pub confidence: f64,
}

impl Recommendation {
    fn new(chart_type: GraphType, confidence: f64) -> Self {
        Self {
            chart_type,
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TypeCounts {
    numeric: usize,
    categorical: usize,
    datetime: usize,
}

impl TypeCounts {
    fn from_profiles(profiles: &[ColumnProfile]) -> Self {
        profiles.iter().fold(Self::default(), |mut counts, p| {
            match p.semantic_type {
                SemanticType::Numeric => counts.numeric += 1,
                SemanticType::Categorical => counts.categorical += 1,
                SemanticType::Datetime => counts.datetime += 1,
            }
            counts
        })
    }
}

/// Applies the fixed rule table over the classified columns and returns
/// at most three suggestions, deduplicated (first occurrence wins) and
/// ordered by descending confidence. The confidences are heuristic
/// literals, not statistics.
pub fn recommend(profiles: &[ColumnProfile]) -> Vec<Recommendation> {
    let counts = TypeCounts::from_profiles(profiles);
    let mut suggestions = Vec::new();

    if counts.datetime >= 1 && counts.numeric >= 1 {
        suggestions.push(Recommendation::new(GraphType::Line, 0.95));
        suggestions.push(Recommendation::new(GraphType::Area, 0.85));
    }
    if counts.categorical >= 1 && counts.numeric >= 1 {
        suggestions.push(Recommendation::new(GraphType::Bar, 0.90));
        if counts.categorical == 1 && counts.numeric == 1 {
            suggestions.push(Recommendation::new(GraphType::Pie, 0.75));
            suggestions.push(Recommendation::new(GraphType::Sunburst, 0.65));
        }
    }
    if counts.numeric >= 2 {
        suggestions.push(Recommendation::new(GraphType::Scatter, 0.85));
    }
    if counts.numeric >= 1 {
        suggestions.push(Recommendation::new(GraphType::Histogram, 0.80));
        suggestions.push(Recommendation::new(GraphType::Box, 0.75));
        suggestions.push(Recommendation::new(GraphType::Violin, 0.70));
    }
    if counts.numeric >= 4 && counts.datetime >= 1 {
        suggestions.push(Recommendation::new(GraphType::Stock, 0.85));
    }
    if counts.categorical >= 1 && counts.numeric == 1 {
        suggestions.push(Recommendation::new(GraphType::Funnel, 0.70));
    }

    let mut ranked: Vec<Recommendation> = suggestions
        .into_iter()
        .unique_by(|r| r.chart_type)
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(MAX_RECOMMENDATIONS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, semantic_type: SemanticType) -> ColumnProfile {
        ColumnProfile {
            name: name.to_string(),
            semantic_type,
            unique_values: Some(4),
            is_temporal_numeric: false,
        }
    }

    #[test]
    fn timeseries_columns_lead_with_line() {
        let profiles = vec![
            profile("date", SemanticType::Datetime),
            profile("price", SemanticType::Numeric),
        ];
        let recs = recommend(&profiles);
        assert_eq!(recs[0].chart_type, GraphType::Line);
        assert_eq!(recs[0].confidence, 0.95);
        assert_eq!(recs[1].chart_type, GraphType::Area);
    }

    #[test]
    fn one_categorical_one_numeric_offers_proportions() {
        let profiles = vec![
            profile("region", SemanticType::Categorical),
            profile("sales", SemanticType::Numeric),
        ];
        let recs = recommend(&profiles);
        let types: Vec<GraphType> = recs.iter().map(|r| r.chart_type).collect();
        assert_eq!(types, vec![GraphType::Bar, GraphType::Histogram, GraphType::Pie]);
    }

    #[test]
    fn never_more_than_three_and_sorted() {
        let profiles = vec![
            profile("date", SemanticType::Datetime),
            profile("open", SemanticType::Numeric),
            profile("high", SemanticType::Numeric),
            profile("low", SemanticType::Numeric),
            profile("close", SemanticType::Numeric),
        ];
        let recs = recommend(&profiles);
        assert!(recs.len() <= MAX_RECOMMENDATIONS);
        for pair in recs.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn idempotent_over_identical_input() {
        let profiles = vec![
            profile("region", SemanticType::Categorical),
            profile("sales", SemanticType::Numeric),
            profile("cost", SemanticType::Numeric),
        ];
        assert_eq!(recommend(&profiles), recommend(&profiles));
    }

    #[test]
    fn no_rules_fire_for_datetime_only_input() {
        let profiles = vec![profile("date", SemanticType::Datetime)];
        assert!(recommend(&profiles).is_empty());
    }
}
