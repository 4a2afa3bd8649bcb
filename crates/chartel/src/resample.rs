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

use crate::coerce;
use crate::error::{ChartServiceError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

const DAY_SECONDS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Min1,
    Min5,
    Min10,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Month1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 10] = [
        Timeframe::Min1,
        Timeframe::Min5,
        Timeframe::Min10,
        Timeframe::Min15,
        Timeframe::Min30,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Day1,
        Timeframe::Week1,
        Timeframe::Month1,
    ];

    pub fn parse(token: &str) -> Result<Self> {
        match token.to_uppercase().as_str() {
            "1M" => Ok(Timeframe::Min1),
            "5M" => Ok(Timeframe::Min5),
            "10M" => Ok(Timeframe::Min10),
            "15M" => Ok(Timeframe::Min15),
            "30M" => Ok(Timeframe::Min30),
            "1H" => Ok(Timeframe::Hour1),
            "4H" => Ok(Timeframe::Hour4),
            "1D" => Ok(Timeframe::Day1),
            "1W" => Ok(Timeframe::Week1),
            "1MO" => Ok(Timeframe::Month1),
            _ => Err(ChartServiceError::InvalidTimeframe {
                token: token.to_string(),
            }),
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Timeframe::Min1 => "1M",
            Timeframe::Min5 => "5M",
            Timeframe::Min10 => "10M",
            Timeframe::Min15 => "15M",
            Timeframe::Min30 => "30M",
            Timeframe::Hour1 => "1H",
            Timeframe::Hour4 => "4H",
            Timeframe::Day1 => "1D",
            Timeframe::Week1 => "1W",
            Timeframe::Month1 => "1MO",
        }
    }

    /// Nominal bucket span, used to size candle bodies on the time axis.
    pub fn approx_seconds(&self) -> i64 {
        match self {
            Timeframe::Min1 => 60,
            Timeframe::Min5 => 300,
            Timeframe::Min10 => 600,
            Timeframe::Min15 => 900,
            Timeframe::Min30 => 1_800,
            Timeframe::Hour1 => 3_600,
            Timeframe::Hour4 => 4 * 3_600,
            Timeframe::Day1 => DAY_SECONDS,
            Timeframe::Week1 => 7 * DAY_SECONDS,
            Timeframe::Month1 => 30 * DAY_SECONDS,
        }
    }

    /// Floor of `ts` to the start of its bucket. Weeks anchor on Monday,
    /// months on the first.
    pub fn bucket_start(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let secs = ts.and_utc().timestamp();
        let from_epoch = |bucket_secs: i64| {
            DateTime::from_timestamp(bucket_secs, 0)
                .map(|dt| dt.naive_utc())
                .unwrap_or(ts)
        };
        match self {
            Timeframe::Min1
            | Timeframe::Min5
            | Timeframe::Min10
            | Timeframe::Min15
            | Timeframe::Min30
            | Timeframe::Hour1
            | Timeframe::Hour4
            | Timeframe::Day1 => {
                let span = self.approx_seconds();
                from_epoch(secs - secs.rem_euclid(span))
            }
            Timeframe::Week1 => {
                // Epoch day 0 is a Thursday; +3 aligns the modulus on Mondays.
                let days = secs.div_euclid(DAY_SECONDS);
                let start_day = days - (days + 3).rem_euclid(7);
                from_epoch(start_day * DAY_SECONDS)
            }
            Timeframe::Month1 => NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or(ts),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

struct BucketAccum {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Resamples the x column plus the first four y columns (and an optional
/// fifth volume column) into OHLC bars: Open=first, High=max, Low=min,
/// Close=last, Volume=sum. Rows whose timestamp or any OHLC value fails
/// coercion are dropped before bucketing; buckets only exist where rows
/// landed, so there is nothing incomplete to emit.
pub fn resample_ohlc(
    frame: &DataFrame,
    x_column: &str,
    y_columns: &[String],
    timeframe: Timeframe,
) -> Result<Vec<OhlcBar>> {
    let column = |name: &str| -> Result<Vec<Option<f64>>> {
        let series = frame
            .column(name)
            .ok()
            .and_then(|c| c.as_series())
            .ok_or_else(|| crate::error::invalid_request(format!("Invalid Y-axis column: {name}")))?;
        coerce::numeric_options(series)
    };
    let x_series = frame
        .column(x_column)
        .ok()
        .and_then(|c| c.as_series())
        .ok_or_else(|| crate::error::invalid_request("Invalid X-axis column selection"))?;
    let timestamps = coerce::datetime_options(x_series)?;
    let opens = column(&y_columns[0])?;
    let highs = column(&y_columns[1])?;
    let lows = column(&y_columns[2])?;
    let closes = column(&y_columns[3])?;
    let with_volume = y_columns.len() > 4;
    let volumes = if with_volume {
        Some(column(&y_columns[4])?)
    } else {
        None
    };

    let mut rows: Vec<(NaiveDateTime, f64, f64, f64, f64, Option<f64>)> = Vec::new();
    for i in 0..timestamps.len() {
        let (Some(ts), Some(open), Some(high), Some(low), Some(close)) = (
            timestamps[i],
            opens.get(i).copied().flatten(),
            highs.get(i).copied().flatten(),
            lows.get(i).copied().flatten(),
            closes.get(i).copied().flatten(),
        ) else {
            continue;
        };
        let volume = volumes.as_ref().and_then(|v| v.get(i).copied().flatten());
        rows.push((ts, open, high, low, close, volume));
    }
    if rows.is_empty() {
        return Err(ChartServiceError::InsufficientData {
            reason: "no rows with parseable timestamps and OHLC values".to_string(),
        });
    }
    rows.sort_by_key(|row| row.0);

    let mut buckets: BTreeMap<NaiveDateTime, BucketAccum> = BTreeMap::new();
    for (ts, open, high, low, close, volume) in rows {
        let key = timeframe.bucket_start(ts);
        let entry = buckets.entry(key).or_insert(BucketAccum {
            open,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            close,
            volume: 0.0,
        });
        entry.high = entry.high.max(high);
        entry.low = entry.low.min(low);
        entry.close = close;
        entry.volume += volume.unwrap_or(0.0);
    }

    Ok(buckets
        .into_iter()
        .map(|(timestamp, accum)| OhlcBar {
            timestamp,
            open: accum.open,
            high: accum.high,
            low: accum.low,
            close: accum.close,
            volume: with_volume.then_some(accum.volume),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn ohlc_columns() -> Vec<String> {
        ["open", "high", "low", "close"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn unknown_token_is_rejected_before_any_work() {
        let err = Timeframe::parse("2D").unwrap_err();
        assert!(matches!(err, ChartServiceError::InvalidTimeframe { token } if token == "2D"));
    }

    #[test]
    fn tokens_round_trip_case_insensitively() {
        for timeframe in Timeframe::ALL {
            assert_eq!(Timeframe::parse(timeframe.token()).unwrap(), timeframe);
        }
        assert_eq!(Timeframe::parse("1mo").unwrap(), Timeframe::Month1);
    }

    #[test]
    fn two_rows_in_one_five_minute_bucket() {
        let frame = df!(
            "t" => ["2024-01-01 09:00:00", "2024-01-01 09:02:00"],
            "open" => [1.0, 1.5],
            "high" => [2.0, 3.0],
            "low" => [0.5, 1.0],
            "close" => [1.5, 2.0],
        )
        .unwrap();
        let bars = resample_ohlc(&frame, "t", &ohlc_columns(), Timeframe::Min5).unwrap();
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.open, 1.0);
        assert_eq!(bar.high, 3.0);
        assert_eq!(bar.low, 0.5);
        assert_eq!(bar.close, 2.0);
        assert_eq!(bar.volume, None);
        assert_eq!(bar.timestamp, coerce::parse_datetime("2024-01-01 09:00:00").unwrap());
    }

    #[test]
    fn volume_column_is_summed_per_bucket() {
        let frame = df!(
            "t" => ["2024-01-01 09:00:00", "2024-01-01 09:02:00", "2024-01-01 09:06:00"],
            "open" => [1.0, 1.5, 2.0],
            "high" => [2.0, 3.0, 2.5],
            "low" => [0.5, 1.0, 1.8],
            "close" => [1.5, 2.0, 2.2],
            "volume" => [100i64, 250, 40],
        )
        .unwrap();
        let mut columns = ohlc_columns();
        columns.push("volume".to_string());
        let bars = resample_ohlc(&frame, "t", &columns, Timeframe::Min5).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].volume, Some(350.0));
        assert_eq!(bars[1].volume, Some(40.0));
    }

    #[test]
    fn rows_are_sorted_and_invalid_rows_dropped() {
        let frame = df!(
            "t" => ["2024-01-01 09:02:00", "junk", "2024-01-01 09:00:00"],
            "open" => ["1.5", "9", "1.0"],
            "high" => ["3.0", "9", "2.0"],
            "low" => ["1.0", "9", "0.5"],
            "close" => ["2.0", "x", "1.5"],
        )
        .unwrap();
        let bars = resample_ohlc(&frame, "t", &ohlc_columns(), Timeframe::Min5).unwrap();
        assert_eq!(bars.len(), 1);
        // First by time, not first by row order.
        assert_eq!(bars[0].open, 1.0);
        assert_eq!(bars[0].close, 2.0);
    }

    #[test]
    fn all_rows_invalid_means_insufficient_data() {
        let frame = df!(
            "t" => ["nope", "also nope"],
            "open" => ["a", "b"],
            "high" => ["a", "b"],
            "low" => ["a", "b"],
            "close" => ["a", "b"],
        )
        .unwrap();
        let err = resample_ohlc(&frame, "t", &ohlc_columns(), Timeframe::Day1).unwrap_err();
        assert!(matches!(err, ChartServiceError::InsufficientData { .. }));
    }

    #[test]
    fn week_buckets_anchor_on_monday() {
        // 2024-01-10 is a Wednesday; its week starts on the 8th.
        let ts = coerce::parse_datetime("2024-01-10 15:30:00").unwrap();
        let start = Timeframe::Week1.bucket_start(ts);
        assert_eq!(start, coerce::parse_datetime("2024-01-08 00:00:00").unwrap());
    }

    #[test]
    fn month_buckets_anchor_on_the_first() {
        let ts = coerce::parse_datetime("2024-02-29 23:59:59").unwrap();
        let start = Timeframe::Month1.bucket_start(ts);
        assert_eq!(start, coerce::parse_datetime("2024-02-01 00:00:00").unwrap());
    }

    #[test]
    fn four_hour_buckets_truncate_from_midnight() {
        let ts = coerce::parse_datetime("2024-01-01 07:59:00").unwrap();
        assert_eq!(
            Timeframe::Hour4.bucket_start(ts),
            coerce::parse_datetime("2024-01-01 04:00:00").unwrap()
        );
    }
}
