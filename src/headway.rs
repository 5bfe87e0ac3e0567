//! Headway statistics over a route's origin-stop departures.
//!
//! Zero-minute intervals come from trips that share an origin timestamp
//! (duplicated or overlapping service patterns). They are dropped before any
//! average is taken, both for the whole day and inside each hourly bucket,
//! while the raw trip counts keep every departure.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::analyzers::utility::{mean, round1};

/// Hours covered by the hourly profile, 04:00 up to midnight.
pub const PROFILE_HOURS: Range<u32> = 4..24;

/// One origin-stop departure: the time as written in the feed plus its
/// minutes since midnight.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub minutes: f64,
    pub time: String,
}

/// Why a route produced no frequency entry. Not an error: the route is simply
/// left out and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The route has no trips at all.
    NoTrips,
    /// None of the route's trips run on every weekday.
    NoWeekdayTrips,
    /// Fewer than two weekday origin departures.
    TooFewDepartures,
    /// Every interval between departures is zero.
    NoNonZeroIntervals,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::NoTrips => "no trips",
            SkipReason::NoWeekdayTrips => "no weekday trips",
            SkipReason::TooFewDepartures => "fewer than 2 departures",
            SkipReason::NoNonZeroIntervals => "only zero-minute headways",
        };
        f.write_str(label)
    }
}

/// Frequency inside one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyFrequency {
    pub hour: u32,
    pub trips: usize,
    pub avg_headway_minutes: f64,
    pub buses_per_hour: f64,
}

/// Day-level headway statistics of a route plus its hourly breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadwayProfile {
    pub num_trips: usize,
    pub first_departure: String,
    pub last_departure: String,
    pub avg_headway_minutes: f64,
    pub min_headway_minutes: f64,
    pub max_headway_minutes: f64,
    pub hourly_profile: Vec<HourlyFrequency>,
}

impl HeadwayProfile {
    /// Highest buses-per-hour value over the hourly profile.
    pub fn peak_buses_per_hour(&self) -> f64 {
        self.hourly_profile
            .iter()
            .map(|h| h.buses_per_hour)
            .fold(0.0, f64::max)
    }
}

/// Departures and average headway inside a time window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFrequency {
    pub trips: usize,
    /// Average of the non-zero intervals, or `None` with fewer than two
    /// departures or only zero intervals.
    pub avg_headway: Option<f64>,
}

/// Differences between consecutive values of an ascending slice.
pub fn intervals(sorted_minutes: &[f64]) -> Vec<f64> {
    sorted_minutes.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Intervals with the zero-minute ones removed.
pub fn non_zero_intervals(sorted_minutes: &[f64]) -> Vec<f64> {
    intervals(sorted_minutes)
        .into_iter()
        .filter(|h| *h > 0.0)
        .collect()
}

/// Sorts departures by time of day. Ties keep their input order.
pub fn sort_departures(departures: &mut [Departure]) {
    departures.sort_by(|a, b| a.minutes.total_cmp(&b.minutes));
}

/// Computes the headway profile of a route.
///
/// The input does not need to be sorted.
///
/// # Errors
///
/// Returns [`SkipReason::TooFewDepartures`] with fewer than two departures
/// and [`SkipReason::NoNonZeroIntervals`] when all departures coincide.
pub fn compute_profile(mut departures: Vec<Departure>) -> Result<HeadwayProfile, SkipReason> {
    if departures.len() < 2 {
        return Err(SkipReason::TooFewDepartures);
    }
    sort_departures(&mut departures);

    let minutes: Vec<f64> = departures.iter().map(|d| d.minutes).collect();
    let headways = non_zero_intervals(&minutes);
    if headways.is_empty() {
        return Err(SkipReason::NoNonZeroIntervals);
    }

    let min = headways.iter().copied().fold(f64::INFINITY, f64::min);
    let max = headways.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (Some(first), Some(last)) = (departures.first(), departures.last()) else {
        return Err(SkipReason::TooFewDepartures);
    };

    Ok(HeadwayProfile {
        num_trips: departures.len(),
        first_departure: first.time.clone(),
        last_departure: last.time.clone(),
        avg_headway_minutes: round1(mean(&headways)),
        min_headway_minutes: round1(min),
        max_headway_minutes: round1(max),
        hourly_profile: hourly_profile(&minutes),
    })
}

/// Frequency of the departures falling in `[start, end)` minutes.
pub fn window_frequency(sorted_minutes: &[f64], window: Range<f64>) -> WindowFrequency {
    let inside: Vec<f64> = sorted_minutes
        .iter()
        .copied()
        .filter(|m| window.contains(m))
        .collect();

    let avg_headway = if inside.len() > 1 {
        let headways = non_zero_intervals(&inside);
        (!headways.is_empty()).then(|| mean(&headways))
    } else {
        None
    };

    WindowFrequency {
        trips: inside.len(),
        avg_headway,
    }
}

/// One entry per hour of [`PROFILE_HOURS`], empty hours included.
pub fn hourly_profile(sorted_minutes: &[f64]) -> Vec<HourlyFrequency> {
    PROFILE_HOURS
        .map(|hour| {
            let start = f64::from(hour * 60);
            let window = window_frequency(sorted_minutes, start..start + 60.0);

            match window.avg_headway {
                Some(avg) => HourlyFrequency {
                    hour,
                    trips: window.trips,
                    avg_headway_minutes: round1(avg),
                    buses_per_hour: if avg > 0.0 { round1(60.0 / avg) } else { 0.0 },
                },
                None => HourlyFrequency {
                    hour,
                    trips: window.trips,
                    avg_headway_minutes: 0.0,
                    buses_per_hour: 0.0,
                },
            }
        })
        .collect()
}
