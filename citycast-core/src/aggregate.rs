//! Day bucketing of a forecast.
//!
//! The daily summary and the 3-hour forecast come back as two unrelated
//! lists. [`aggregate`] pairs every daily entry with the hourly slots that
//! fall on the same local calendar day and splits today off from the rest.
//!
//! Day `i` is the local date of `reference_now` plus `i` days. Its window runs
//! from that date's local midnight to the next local midnight minus one
//! millisecond, so consecutive windows touch without overlapping. A slot that
//! lands exactly on a midnight belongs to the day that midnight ends, never to
//! the day it starts; the midnight opening day 0 therefore has no owner.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::AggregateError,
    model::{DailyEntry, HourlyEntry},
    palette::{ColorPair, Palette},
};

/// Local calendar day expressed in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    /// Local midnight opening the day.
    pub start_ms: i64,
    /// Last millisecond before the next local midnight.
    pub end_ms: i64,
}

impl DayWindow {
    /// Whether an hourly slot at `timestamp_ms` is attributed to this day.
    ///
    /// A slot at exactly 00:00 counts toward the day that midnight closes,
    /// not the one it opens.
    pub fn claims(&self, timestamp_ms: i64) -> bool {
        timestamp_ms > self.start_ms && timestamp_ms <= self.end_ms + 1
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherBucket {
    pub day_index: usize,
    pub daily: DailyEntry,
    pub colors: ColorPair,
    pub window: DayWindow,
    pub hourly: Vec<HourlyEntry>,
}

/// Buckets of one search. `today` is `None` only when the daily summary was
/// empty; a today bucket without hourly slots is still `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AggregationResult {
    pub today: Option<WeatherBucket>,
    pub upcoming: Vec<WeatherBucket>,
}

impl AggregationResult {
    fn from_buckets(buckets: Vec<WeatherBucket>) -> Self {
        let mut buckets = buckets.into_iter();
        let today = buckets.next();
        Self { today, upcoming: buckets.collect() }
    }

    pub fn today(&self) -> Option<&WeatherBucket> {
        self.today.as_ref()
    }

    pub fn upcoming(&self) -> &[WeatherBucket] {
        &self.upcoming
    }

    /// Number of buckets including today.
    pub fn len(&self) -> usize {
        self.upcoming.len() + usize::from(self.today.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.today.is_none()
    }

    /// All buckets in day order, today first.
    pub fn buckets(&self) -> impl Iterator<Item = &WeatherBucket> {
        self.today.iter().chain(self.upcoming.iter())
    }
}

/// Resolves the instant a local date begins in `tz`.
///
/// A DST jump at 00:00 skips midnight; the first local minute that exists is
/// used instead. An ambiguous midnight resolves to the earlier instant.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Tz>, AggregateError> {
    let midnight = date.and_time(NaiveTime::MIN);

    (0..=24 * 60)
        .map(|minutes| midnight + Duration::minutes(minutes))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .ok_or(AggregateError::NoLocalMidnight { date })
}

/// Windows of the first `days` local days starting at `reference_now`'s date.
pub fn day_windows<Tz: TimeZone>(
    reference_now: &DateTime<Tz>,
    days: usize,
) -> Result<Vec<DayWindow>, AggregateError> {
    let tz = reference_now.timezone();
    let today = reference_now.date_naive();

    let mut windows = Vec::with_capacity(days);
    let mut start_ms = local_midnight(&tz, today)?.timestamp_millis();

    for offset in 1..=days {
        let next = today
            .checked_add_days(Days::new(offset as u64))
            .ok_or(AggregateError::NoLocalMidnight { date: today })?;
        let next_start_ms = local_midnight(&tz, next)?.timestamp_millis();

        windows.push(DayWindow { start_ms, end_ms: next_start_ms - 1 });
        start_ms = next_start_ms;
    }

    Ok(windows)
}

/// Window of the single day `day_index` days after `reference_now`'s date.
pub fn day_window<Tz: TimeZone>(
    reference_now: &DateTime<Tz>,
    day_index: usize,
) -> Result<DayWindow, AggregateError> {
    let tz = reference_now.timezone();
    let today = reference_now.date_naive();
    let overflow = AggregateError::NoLocalMidnight { date: today };

    let date = today
        .checked_add_days(Days::new(day_index as u64))
        .ok_or_else(|| overflow.clone())?;
    let next = date.succ_opt().ok_or(overflow)?;

    Ok(DayWindow {
        start_ms: local_midnight(&tz, date)?.timestamp_millis(),
        end_ms: local_midnight(&tz, next)?.timestamp_millis() - 1,
    })
}

/// Buckets `hourly` into the days of `daily`.
///
/// Fails with [`AggregateError::PaletteTooShort`] when there are more days
/// than color pairs. Hourly slots outside every window are dropped.
pub fn aggregate<Tz: TimeZone>(
    daily: &[DailyEntry],
    hourly: &[HourlyEntry],
    reference_now: &DateTime<Tz>,
    palette: &Palette,
) -> Result<AggregationResult, AggregateError> {
    palette.ensure_covers(daily.len())?;

    let windows = day_windows(reference_now, daily.len())?;

    let mut buckets: Vec<WeatherBucket> = daily
        .iter()
        .zip(windows)
        .zip(palette.pairs())
        .enumerate()
        .map(|(day_index, ((entry, window), &colors))| WeatherBucket {
            day_index,
            daily: entry.clone(),
            colors,
            window,
            hourly: Vec::new(),
        })
        .collect();

    let mut dropped = 0usize;
    for entry in hourly {
        let ts = entry.timestamp_millis();
        match buckets.iter_mut().find(|bucket| bucket.window.claims(ts)) {
            Some(bucket) => bucket.hourly.push(entry.clone()),
            None => dropped += 1,
        }
    }

    debug!(days = daily.len(), hourly = hourly.len(), dropped, "aggregated forecast");

    Ok(AggregationResult::from_buckets(buckets))
}
