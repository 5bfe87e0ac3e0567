//! Headway diagnostics for the route variants sharing one short name.
//!
//! Unlike the frequency pipeline this looks at every trip of the route,
//! whatever its service days, so the departures of overlapping service
//! patterns show up side by side.

use std::collections::BTreeSet;
use std::ops::Range;

use tracing::{info, warn};

use crate::config::FieldDefaults;
use crate::error::Result;
use crate::feed::CalendarEntry;
use crate::headway::{
    Departure, HeadwayProfile, PROFILE_HOURS, SkipReason, WindowFrequency, compute_profile,
    window_frequency,
};
use crate::join::{FeedJoin, RouteMeta};

use super::utility::round1;

/// Departures listed in the report.
pub const LISTED_DEPARTURES: usize = 20;

/// Time-of-day periods of the breakdown, in minutes since midnight.
pub const PERIODS: [(&str, Range<f64>); 3] = [
    ("Morning (06:00-09:00)", 360.0..540.0),
    ("Midday (09:00-16:00)", 540.0..960.0),
    ("Evening (16:00-19:00)", 960.0..1140.0),
];

/// Day flags, Monday first, of one service used by the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePattern {
    pub service_id: String,
    /// `None` when the service has no calendar entry.
    pub days: Option<[bool; 7]>,
}

/// One row of the hour-by-hour table. Averages are `None` when the hour has
/// fewer than two departures or only coinciding ones.
#[derive(Debug, Clone, PartialEq)]
pub struct HourRow {
    pub hour: u32,
    pub trips: usize,
    pub avg_headway: Option<f64>,
    pub buses_per_hour: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteInspection {
    pub meta: RouteMeta,
    pub trip_count: usize,
    pub service_patterns: Vec<ServicePattern>,
    /// Origin departures of all trips, ascending.
    pub departures: Vec<Departure>,
    pub profile: std::result::Result<HeadwayProfile, SkipReason>,
    pub periods: Vec<(&'static str, WindowFrequency)>,
    /// Hours of the profile range with at least one departure.
    pub hours: Vec<HourRow>,
}

/// Inspects every route whose short name is `short_name`, in feed order.
///
/// # Errors
///
/// Returns [`crate::error::AtlasError::InvalidTime`] on an unparseable
/// origin departure.
pub fn inspect_routes(
    join: &FeedJoin<'_>,
    short_name: &str,
    defaults: &FieldDefaults,
) -> Result<Vec<RouteInspection>> {
    let feed = join.feed();
    let mut inspections = Vec::new();

    for route in feed
        .routes
        .iter()
        .filter(|r| r.short_name.as_deref() == Some(short_name))
    {
        let trips = join.trips_of(&route.id);
        let service_ids: BTreeSet<&str> = trips.iter().map(|t| t.service_id.as_str()).collect();
        let service_patterns = service_ids
            .into_iter()
            .map(|service_id| ServicePattern {
                service_id: service_id.to_string(),
                days: feed
                    .calendar
                    .iter()
                    .find(|c| c.service_id == service_id)
                    .map(CalendarEntry::day_flags),
            })
            .collect();

        let departures = join.origin_departures(trips)?;
        let minutes: Vec<f64> = departures.iter().map(|d| d.minutes).collect();

        inspections.push(RouteInspection {
            meta: RouteMeta::resolve(route, defaults),
            trip_count: trips.len(),
            service_patterns,
            profile: compute_profile(departures.clone()),
            periods: PERIODS
                .iter()
                .map(|(label, window)| (*label, window_frequency(&minutes, window.clone())))
                .collect(),
            hours: hour_rows(&minutes),
            departures,
        });
    }

    Ok(inspections)
}

fn hour_rows(sorted_minutes: &[f64]) -> Vec<HourRow> {
    PROFILE_HOURS
        .filter_map(|hour| {
            let start = f64::from(hour * 60);
            let window = window_frequency(sorted_minutes, start..start + 60.0);
            (window.trips > 0).then(|| HourRow {
                hour,
                trips: window.trips,
                avg_headway: window.avg_headway.map(round1),
                buses_per_hour: window.avg_headway.map(|avg| round1(60.0 / avg)),
            })
        })
        .collect()
}

/// Logs an inspection the way the diagnostics report reads.
pub fn log_inspection(inspection: &RouteInspection) {
    let meta = &inspection.meta;
    info!(
        route_id = %meta.route_id,
        short_name = %meta.route_short_name,
        long_name = %meta.route_long_name,
        trips = inspection.trip_count,
        "Route variant"
    );

    for pattern in &inspection.service_patterns {
        match pattern.days {
            Some(days) => info!(service_id = %pattern.service_id, days = %day_string(days), "Service pattern"),
            None => warn!(service_id = %pattern.service_id, "Service has no calendar entry"),
        }
    }

    info!(count = inspection.departures.len(), "First stop departures");
    for departure in inspection.departures.iter().take(LISTED_DEPARTURES) {
        info!("  {}", departure.time);
    }

    match &inspection.profile {
        Ok(profile) => info!(
            trips = profile.num_trips,
            first = %profile.first_departure,
            last = %profile.last_departure,
            avg_headway = profile.avg_headway_minutes,
            min_headway = profile.min_headway_minutes,
            max_headway = profile.max_headway_minutes,
            "Headway statistics"
        ),
        Err(reason) => {
            warn!(%reason, "No headway statistics");
            return;
        }
    }

    for (label, window) in &inspection.periods {
        if let Some(line) = period_line(label, window) {
            info!("{line}");
        }
    }

    info!("Hour        | Trips | Avg Headway | Buses/Hour");
    for row in &inspection.hours {
        let label = format!("{:02}:00-{:02}:00", row.hour, row.hour + 1);
        info!(
            "{label:11} | {:5} | {:>11} | {:>10}",
            row.trips,
            or_na(row.avg_headway),
            or_na(row.buses_per_hour)
        );
    }
}

/// Report line of a period, `None` with fewer than two departures. Periods
/// whose departures all coincide show `N/A` as their headway.
fn period_line(label: &str, window: &WindowFrequency) -> Option<String> {
    match window.avg_headway {
        Some(avg) => Some(format!("{label}: {} trips, avg headway {avg:.1} min", window.trips)),
        None if window.trips > 1 => Some(format!("{label}: {} trips, avg headway N/A", window.trips)),
        None => None,
    }
}

fn or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}"))
}

/// Compact day mask, e.g. `MTWTF--`.
fn day_string(days: [bool; 7]) -> String {
    days.iter()
        .zip("MTWTFSS".chars())
        .map(|(&runs, day)| if runs { day } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Feed, Route, StopTimeEvent, Trip};

    #[test]
    fn test_inspects_all_variants_with_short_name() {
        let feed = create_feed();
        let join = FeedJoin::new(&feed);
        let inspections = inspect_routes(&join, "539", &FieldDefaults::default()).unwrap();

        let ids: Vec<&str> = inspections.iter().map(|i| i.meta.route_id.as_str()).collect();
        assert_eq!(ids, vec!["Z_4628", "Z_4629"]);
        assert!(inspect_routes(&join, "999", &FieldDefaults::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_includes_weekend_trips() {
        let feed = create_feed();
        let join = FeedJoin::new(&feed);
        let inspections = inspect_routes(&join, "539", &FieldDefaults::default()).unwrap();
        let engativa = &inspections[0];

        assert_eq!(engativa.trip_count, 4);
        assert_eq!(engativa.departures.len(), 4);
        assert_eq!(
            engativa.service_patterns,
            vec![
                ServicePattern {
                    service_id: "SAT".into(),
                    days: Some([false, false, false, false, false, true, false]),
                },
                ServicePattern {
                    service_id: "WK".into(),
                    days: Some([true, true, true, true, true, false, false]),
                },
            ]
        );
    }

    #[test]
    fn test_periods_and_hours() {
        let feed = create_feed();
        let join = FeedJoin::new(&feed);
        let inspections = inspect_routes(&join, "539", &FieldDefaults::default()).unwrap();
        let engativa = &inspections[0];

        // 06:00, 06:20, 06:20 and 10:00
        let (label, morning) = engativa.periods[0];
        assert_eq!(label, "Morning (06:00-09:00)");
        assert_eq!(morning.trips, 3);
        assert_eq!(morning.avg_headway, Some(20.0));
        assert_eq!(engativa.periods[1].1.avg_headway, None);

        assert_eq!(
            engativa.hours,
            vec![
                HourRow {
                    hour: 6,
                    trips: 3,
                    avg_headway: Some(20.0),
                    buses_per_hour: Some(3.0),
                },
                HourRow {
                    hour: 10,
                    trips: 1,
                    avg_headway: None,
                    buses_per_hour: None,
                },
            ]
        );
    }

    #[test]
    fn test_missing_calendar_entry() {
        let feed = create_feed();
        let join = FeedJoin::new(&feed);
        let inspections = inspect_routes(&join, "539", &FieldDefaults::default()).unwrap();
        let suba = &inspections[1];

        assert_eq!(suba.service_patterns[0].days, None);
        assert_eq!(suba.profile, Err(SkipReason::TooFewDepartures));
    }

    #[test]
    fn test_period_with_coinciding_departures() {
        let window = window_frequency(&[400.0, 400.0, 400.0], 360.0..540.0);
        assert_eq!(window.avg_headway, None);
        assert_eq!(
            period_line("Morning (06:00-09:00)", &window).as_deref(),
            Some("Morning (06:00-09:00): 3 trips, avg headway N/A")
        );
    }

    #[test]
    fn test_period_lines() {
        let busy = window_frequency(&[360.0, 380.0, 420.0], 360.0..540.0);
        assert_eq!(
            period_line("Morning (06:00-09:00)", &busy).as_deref(),
            Some("Morning (06:00-09:00): 3 trips, avg headway 30.0 min")
        );

        let single = window_frequency(&[600.0], 540.0..960.0);
        assert_eq!(period_line("Midday (09:00-16:00)", &single), None);
    }

    #[test]
    fn test_day_string() {
        assert_eq!(day_string([true, true, true, true, true, false, false]), "MTWTF--");
        assert_eq!(or_na(None), "N/A");
        assert_eq!(or_na(Some(12.0)), "12.0");
    }

    fn create_feed() -> Feed {
        Feed {
            routes: vec![
                create_route("Z_4628", "539"),
                create_route("OTHER", "540"),
                create_route("Z_4629", "539"),
            ],
            trips: vec![
                create_trip("T1", "Z_4628", "WK"),
                create_trip("T2", "Z_4628", "WK"),
                create_trip("T3", "Z_4628", "SAT"),
                create_trip("T4", "Z_4628", "WK"),
                create_trip("T5", "Z_4629", "HOLIDAY"),
            ],
            stop_times: vec![
                create_origin("T1", "06:00:00"),
                create_origin("T2", "06:20:00"),
                create_origin("T3", "06:20:00"),
                create_origin("T4", "10:00:00"),
                create_origin("T5", "07:00:00"),
            ],
            calendar: vec![
                CalendarEntry {
                    service_id: "WK".into(),
                    monday: true,
                    tuesday: true,
                    wednesday: true,
                    thursday: true,
                    friday: true,
                    saturday: false,
                    sunday: false,
                    start_date: None,
                    end_date: None,
                },
                CalendarEntry {
                    service_id: "SAT".into(),
                    monday: false,
                    tuesday: false,
                    wednesday: false,
                    thursday: false,
                    friday: false,
                    saturday: true,
                    sunday: false,
                    start_date: None,
                    end_date: None,
                },
            ],
            ..Default::default()
        }
    }

    fn create_route(id: &str, short_name: &str) -> Route {
        Route {
            id: id.to_string(),
            short_name: Some(short_name.to_string()),
            long_name: Some("Engativá".to_string()),
            color: None,
            text_color: None,
        }
    }

    fn create_trip(id: &str, route_id: &str, service_id: &str) -> Trip {
        Trip {
            id: id.to_string(),
            route_id: route_id.to_string(),
            service_id: service_id.to_string(),
            shape_id: None,
        }
    }

    fn create_origin(trip_id: &str, time: &str) -> StopTimeEvent {
        StopTimeEvent {
            trip_id: trip_id.to_string(),
            stop_id: "S1".to_string(),
            stop_sequence: 1,
            arrival_time: Some(time.to_string()),
            departure_time: Some(time.to_string()),
        }
    }
}
