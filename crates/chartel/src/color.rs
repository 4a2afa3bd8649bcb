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

/// Categorical default palette (tab10), cycled when a request needs more
/// than ten series.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Resolves one color per y column. Rules, in order:
/// a non-empty custom list with `color_all` repeats its first entry;
/// a custom list covering every series is taken in order;
/// anything else falls through to the default palette.
pub fn resolve_colors(y_count: usize, custom_colors: &[String], color_all: bool) -> Vec<String> {
    if color_all && !custom_colors.is_empty() {
        return vec![custom_colors[0].clone(); y_count];
    }
    if !custom_colors.is_empty() && custom_colors.len() >= y_count {
        return custom_colors[..y_count].to_vec();
    }
    (0..y_count)
        .map(|i| DEFAULT_PALETTE[i % DEFAULT_PALETTE.len()].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn customs(colors: &[&str]) -> Vec<String> {
        colors.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn color_all_repeats_the_first_custom_color() {
        let resolved = resolve_colors(3, &customs(&["red", "blue"]), true);
        assert_eq!(resolved, vec!["red", "red", "red"]);
    }

    #[test]
    fn sufficient_custom_colors_are_taken_in_order() {
        let resolved = resolve_colors(2, &customs(&["red", "blue", "green"]), false);
        assert_eq!(resolved, vec!["red", "blue"]);
    }

    #[test]
    fn short_custom_list_falls_through_to_the_palette() {
        let resolved = resolve_colors(3, &customs(&["a", "b"]), false);
        assert_eq!(
            resolved,
            vec!["#1f77b4".to_string(), "#ff7f0e".to_string(), "#2ca02c".to_string()]
        );
    }

    #[test]
    fn palette_cycles_past_ten_series() {
        let resolved = resolve_colors(12, &[], false);
        assert_eq!(resolved[10], DEFAULT_PALETTE[0]);
        assert_eq!(resolved[11], DEFAULT_PALETTE[1]);
    }

    proptest! {
        #[test]
        fn output_length_always_matches_series_count(
            y_count in 0usize..40,
            custom in proptest::collection::vec("[a-z#0-9]{1,9}", 0..8),
            color_all in any::<bool>(),
        ) {
            let resolved = resolve_colors(y_count, &custom, color_all);
            prop_assert_eq!(resolved.len(), y_count);
        }
    }
}
