use serde::Serialize;

use crate::frequency::FrequencyDocument;
use crate::xref::{RouteStops, StopWithRoutes};

/// Summary of the stop/route cross-reference, logged after the stops pipeline.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StopNetworkStats {
    pub total_stops: usize,
    pub total_routes: usize,
    pub avg_routes_per_stop: f64,
    /// Name and route count of the stop served by the most routes. The
    /// first such stop in stop-id order wins ties.
    pub busiest_stop: Option<(String, usize)>,
}

impl StopNetworkStats {
    pub fn from_index(stops: &[StopWithRoutes], route_stops: &[RouteStops]) -> Self {
        let mut busiest: Option<&StopWithRoutes> = None;
        for stop in stops {
            if busiest.is_none_or(|b| stop.route_count > b.route_count) {
                busiest = Some(stop);
            }
        }

        let total_served: usize = stops.iter().map(|s| s.route_count).sum();
        let avg_routes_per_stop = if stops.is_empty() {
            0.0
        } else {
            total_served as f64 / stops.len() as f64
        };

        StopNetworkStats {
            total_stops: stops.len(),
            total_routes: route_stops.len(),
            avg_routes_per_stop,
            busiest_stop: busiest.map(|s| (s.stop_name.clone(), s.route_count)),
        }
    }
}

/// A route's headline numbers, as shown in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencySample {
    pub route_short_name: String,
    pub route_long_name: String,
    pub num_trips: usize,
    pub first_departure: String,
    pub last_departure: String,
    pub avg_headway_minutes: f64,
    pub peak_buses_per_hour: f64,
}

/// The first `limit` entries of the frequency document, in route-id order.
pub fn frequency_samples(document: &FrequencyDocument, limit: usize) -> Vec<FrequencySample> {
    document
        .values()
        .take(limit)
        .map(|entry| FrequencySample {
            route_short_name: entry.meta.route_short_name.clone(),
            route_long_name: entry.meta.route_long_name.clone(),
            num_trips: entry.profile.num_trips,
            first_departure: entry.profile.first_departure.clone(),
            last_departure: entry.profile.last_departure.clone(),
            avg_headway_minutes: entry.profile.avg_headway_minutes,
            peak_buses_per_hour: entry.profile.peak_buses_per_hour(),
        })
        .collect()
}
