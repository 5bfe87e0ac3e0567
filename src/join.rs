//! In-memory joins between the feed tables.
//!
//! Every join key gets a hash map built once in [`FeedJoin::new`]; the
//! pipelines then look rows up instead of rescanning tables:
//! trip → route by `route_id`, trip → calendar by `service_id`,
//! stop time → trip by `trip_id`, and stop → route through the stop times.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::FieldDefaults;
use crate::error::{AtlasError, Result};
use crate::feed::{Feed, Route, Stop, StopTimeEvent, Trip};
use crate::headway::{Departure, sort_departures};
use crate::time::time_to_minutes;

/// Route display fields with defaults applied. Colors carry no leading `#`.
///
/// Serialized as-is into the route index and the stop-centric document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta {
    pub route_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_color: String,
    pub route_text_color: String,
}

impl RouteMeta {
    pub fn resolve(route: &Route, defaults: &FieldDefaults) -> Self {
        Self {
            route_id: route.id.clone(),
            route_short_name: FieldDefaults::resolve(
                route.short_name.as_deref(),
                &defaults.route_short_name,
            ),
            route_long_name: FieldDefaults::resolve(
                route.long_name.as_deref(),
                &defaults.route_long_name,
            ),
            route_color: FieldDefaults::resolve(route.color.as_deref(), &defaults.route_color),
            route_text_color: FieldDefaults::resolve(
                route.text_color.as_deref(),
                &defaults.route_text_color,
            ),
        }
    }

    /// Route color as a CSS hex color, with the leading `#`.
    pub fn css_color(&self) -> String {
        format!("#{}", self.route_color)
    }

    /// Text color as a CSS hex color, with the leading `#`.
    pub fn css_text_color(&self) -> String {
        format!("#{}", self.route_text_color)
    }
}

/// A stop with the distinct routes whose trips call at it, ordered by route id.
#[derive(Debug, Clone)]
pub struct StopRoutes<'a> {
    pub stop: &'a Stop,
    pub routes: Vec<&'a Route>,
}

/// Indexed view over a loaded [`Feed`].
pub struct FeedJoin<'a> {
    feed: &'a Feed,
    routes: HashMap<&'a str, &'a Route>,
    stops: HashMap<&'a str, &'a Stop>,
    trips: HashMap<&'a str, &'a Trip>,
    trips_by_route: HashMap<&'a str, Vec<&'a Trip>>,
    origins_by_trip: HashMap<&'a str, Vec<&'a StopTimeEvent>>,
    weekday_services: HashSet<&'a str>,
}

impl<'a> FeedJoin<'a> {
    pub fn new(feed: &'a Feed) -> Self {
        let routes = feed.routes.iter().map(|r| (r.id.as_str(), r)).collect();
        let stops = feed.stops.iter().map(|s| (s.id.as_str(), s)).collect();
        let trips = feed.trips.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut trips_by_route: HashMap<&str, Vec<&Trip>> = HashMap::new();
        for trip in &feed.trips {
            trips_by_route
                .entry(trip.route_id.as_str())
                .or_default()
                .push(trip);
        }

        let mut origins_by_trip: HashMap<&str, Vec<&StopTimeEvent>> = HashMap::new();
        for event in feed.stop_times.iter().filter(|e| e.is_origin()) {
            origins_by_trip
                .entry(event.trip_id.as_str())
                .or_default()
                .push(event);
        }

        let weekday_services = feed
            .calendar
            .iter()
            .filter(|c| c.runs_every_weekday())
            .map(|c| c.service_id.as_str())
            .collect();

        Self {
            feed,
            routes,
            stops,
            trips,
            trips_by_route,
            origins_by_trip,
            weekday_services,
        }
    }

    pub fn feed(&self) -> &'a Feed {
        self.feed
    }

    pub fn route(&self, route_id: &str) -> Option<&'a Route> {
        self.routes.get(route_id).copied()
    }

    /// All trips of a route, in feed order.
    pub fn trips_of(&self, route_id: &str) -> &[&'a Trip] {
        self.trips_by_route
            .get(route_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of calendar entries running on all five weekdays.
    pub fn weekday_service_count(&self) -> usize {
        self.weekday_services.len()
    }

    pub fn is_weekday_service(&self, service_id: &str) -> bool {
        self.weekday_services.contains(service_id)
    }

    /// Trips of a route whose calendar entry runs every weekday.
    pub fn weekday_trips(&self, route_id: &str) -> Vec<&'a Trip> {
        self.trips_of(route_id)
            .iter()
            .copied()
            .filter(|t| self.is_weekday_service(&t.service_id))
            .collect()
    }

    /// Origin-stop departures of `trips`, ascending by time of day.
    ///
    /// Trips without an origin event (sequence 1) contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::MissingOriginTime`] if an origin event has no
    /// time at all and [`AtlasError::InvalidTime`] if its time does not parse.
    pub fn origin_departures(&self, trips: &[&Trip]) -> Result<Vec<Departure>> {
        let mut departures = Vec::new();
        for trip in trips {
            let Some(origins) = self.origins_by_trip.get(trip.id.as_str()) else {
                continue;
            };
            for event in origins {
                let time = event
                    .departure()
                    .ok_or_else(|| AtlasError::MissingOriginTime {
                        trip_id: trip.id.clone(),
                    })?;
                departures.push(Departure {
                    minutes: time_to_minutes(time)?,
                    time: time.to_string(),
                });
            }
        }
        sort_departures(&mut departures);
        Ok(departures)
    }

    /// Every stop that at least one known route calls at, ordered by stop id.
    ///
    /// Stop times of unknown trips, trips of unknown routes and unknown stops
    /// are left out. A route reached through many trips is listed once.
    pub fn stop_routes(&self) -> Vec<StopRoutes<'a>> {
        let feed = self.feed;
        let mut by_stop: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for event in &feed.stop_times {
            let Some(trip) = self.trips.get(event.trip_id.as_str()) else {
                continue;
            };
            if !self.routes.contains_key(trip.route_id.as_str()) {
                continue;
            }
            by_stop
                .entry(event.stop_id.as_str())
                .or_default()
                .insert(trip.route_id.as_str());
        }

        by_stop
            .into_iter()
            .filter_map(|(stop_id, route_ids)| {
                let stop = *self.stops.get(stop_id)?;
                let routes = route_ids
                    .into_iter()
                    .filter_map(|id| self.route(id))
                    .collect();
                Some(StopRoutes { stop, routes })
            })
            .collect()
    }

    /// Distinct shape ids used by each known route's trips, both ordered by id.
    pub fn route_shapes(&self) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
        let feed = self.feed;
        let mut shapes: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for trip in &feed.trips {
            let Some(shape_id) = trip.shape_id.as_deref() else {
                continue;
            };
            if !self.routes.contains_key(trip.route_id.as_str()) {
                continue;
            }
            shapes
                .entry(trip.route_id.as_str())
                .or_default()
                .insert(shape_id);
        }
        shapes
    }
}
