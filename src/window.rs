//! Maintenance window evaluation.
//!
//! Decides whether a UTC instant, seen from a named IANA time zone, falls
//! inside a local `HH:MM-HH:MM` interval. Zones are explicit `chrono_tz::Tz`
//! values, so evaluation never touches process-wide state and is safe to run
//! from several threads at once.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use hypercore_common::prelude::{Error, Result};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Format of the local time returned by [`convert_instant_to_local`].
const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S GMT%z";

/// Replaces spaces by underscores, matching tz database file names.
///
/// `"America/North Dakota/New Salem"` becomes
/// `"America/North_Dakota/New_Salem"`.
///
pub fn normalize_time_zone(name: &str) -> String {
    name.trim().replace(' ', "_")
}

/// Looks up a time zone by name, after normalization.
///
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    normalize_time_zone(name)
        .parse::<Tz>()
        .map_err(|_| Error::TimeZone(name.to_owned()))
}

/// Converts a UTC timestamp into the wall-clock time of `time_zone`.
///
/// # Returns
///
/// The local date and time, and the same instant formatted with its UTC
/// offset, e.g. `2022-10-30 02:59:59 GMT+0200`.
///
pub fn convert_instant_to_local(utc_ts: i64, time_zone: &str) -> Result<(NaiveDateTime, String)> {
    let tz = parse_time_zone(time_zone)?;
    let utc = DateTime::<Utc>::from_timestamp(utc_ts, 0)
        .ok_or_else(|| Error::Any(format!("Timestamp {} is out of range", utc_ts)))?;
    let local = utc.with_timezone(&tz);

    Ok((local.naive_local(), local.format(LOCAL_FORMAT).to_string()))
}

/// Whether `utc_ts` seen from `time_zone` lies inside `window`.
///
/// # Errors
///
/// `Error::Window` for a malformed window, `Error::TimeZone` for an unknown
/// zone.
///
pub fn is_local_time_in_window(utc_ts: i64, time_zone: &str, window: &str) -> Result<bool> {
    let window = window.parse::<TimeWindow>()?;
    let (local, formatted) = convert_instant_to_local(utc_ts, time_zone)?;
    let inside = window.contains(local.time());

    tracing::debug!(target: "window", %window, local = %formatted, inside, "Window evaluated");
    Ok(inside)
}

// -----------------------------------------------------------------------------

/// Local time-of-day interval, start inclusive and end exclusive.
///
/// A window whose start is not before its end wraps midnight: `22:00-05:00`
/// covers the night. Equal bounds cover the whole day, so [`TimeWindow::swapped`]
/// is only a complement for distinct bounds.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn contains(&self, local: NaiveTime) -> bool {
        let t = local.num_seconds_from_midnight();
        let start = self.start.num_seconds_from_midnight();
        let end = self.end.num_seconds_from_midnight();

        if start < end {
            start <= t && t < end
        } else {
            t >= start || t < end
        }
    }

    /// The complementary window: same bounds, start and end exchanged.
    ///
    pub fn swapped(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();

        match compact.split('-').collect::<Vec<_>>().as_slice() {
            [start, end] => Ok(Self {
                start: parse_clock(start, value)?,
                end: parse_clock(end, value)?,
            }),
            _ => Err(Error::Window(format!(
                "'{}' must contain exactly one '-'",
                value
            ))),
        }
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

fn parse_clock(clock: &str, window: &str) -> Result<NaiveTime> {
    let malformed = || Error::Window(format!("'{}' in '{}' is not HH:MM", clock, window));

    let (hours, minutes) = clock.split_once(':').ok_or_else(malformed)?;
    let digits = |field: &str, widths: std::ops::RangeInclusive<usize>| {
        (widths.contains(&field.len()) && field.bytes().all(|b| b.is_ascii_digit()))
            .then(|| field.parse::<u32>().ok())
            .flatten()
    };
    // Hours may drop the leading zero (`1:00`), minutes may not.
    let hours = digits(hours, 1..=2).ok_or_else(malformed)?;
    let minutes = digits(minutes, 2..=2).ok_or_else(malformed)?;

    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(malformed)
}

// -----------------------------------------------------------------------------

/// Configured maintenance window used to gate disruptive operations.
///
/// # Fields
///
/// * `time_zone`: IANA zone name, spaces allowed.
/// * `window`: `HH:MM-HH:MM` in that zone.
///
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceWindow {
    pub time_zone: String,
    pub window: String,
}

impl MaintenanceWindow {
    pub fn new(time_zone: &str, window: &str) -> Self {
        Self {
            time_zone: time_zone.to_owned(),
            window: window.to_owned(),
        }
    }

    pub fn is_open_at(&self, utc_ts: i64) -> Result<bool> {
        is_local_time_in_window(utc_ts, &self.time_zone, &self.window)
    }

    pub fn is_open_now(&self) -> Result<bool> {
        self.is_open_at(Utc::now().timestamp())
    }

    /// Fails with `Error::OutsideWindow` unless the window is open at `utc_ts`.
    ///
    pub fn ensure_open_at(&self, utc_ts: i64) -> Result<()> {
        if self.is_open_at(utc_ts)? {
            return Ok(());
        }

        let (_, local) = convert_instant_to_local(utc_ts, &self.time_zone)?;
        Err(Error::OutsideWindow(format!(
            "{} is outside {} ({})",
            local, self.window, self.time_zone
        )))
    }
}
