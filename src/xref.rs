//! Stop → routes and route → stops cross-reference indices.

use std::collections::BTreeMap;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::FieldDefaults;
use crate::geometry::feature_collection;
use crate::join::{FeedJoin, RouteMeta};

/// A stop with the routes serving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopWithRoutes {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub stop_code: String,
    pub routes: Vec<RouteMeta>,
    pub route_count: usize,
}

/// A route with the stops it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStops {
    pub route_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
    pub stop_ids: Vec<String>,
}

/// One record per served stop, ordered by stop id, routes ordered by route id.
pub fn stops_with_routes(join: &FeedJoin<'_>, defaults: &FieldDefaults) -> Vec<StopWithRoutes> {
    join.stop_routes()
        .into_iter()
        .map(|entry| {
            let routes: Vec<RouteMeta> = entry
                .routes
                .iter()
                .map(|route| RouteMeta::resolve(route, defaults))
                .collect();
            let stop = entry.stop;

            StopWithRoutes {
                stop_id: stop.id.clone(),
                stop_name: FieldDefaults::resolve(stop.name.as_deref(), &defaults.stop_name),
                stop_lat: stop.latitude,
                stop_lon: stop.longitude,
                stop_code: FieldDefaults::resolve(stop.code.as_deref(), &defaults.stop_code),
                route_count: routes.len(),
                routes,
            }
        })
        .collect()
}

/// Point features of the stops, for map display.
pub fn stops_feature_collection(stops: &[StopWithRoutes]) -> FeatureCollection {
    let features = stops
        .iter()
        .map(|stop| {
            let mut properties = JsonObject::new();
            properties.insert("stop_id".to_string(), json!(stop.stop_id));
            properties.insert("stop_name".to_string(), json!(stop.stop_name));
            properties.insert("stop_code".to_string(), json!(stop.stop_code));
            properties.insert("route_count".to_string(), json!(stop.route_count));
            properties.insert(
                "route_ids".to_string(),
                json!(stop.routes.iter().map(|r| &r.route_id).collect::<Vec<_>>()),
            );
            properties.insert(
                "route_names".to_string(),
                json!(stop.routes.iter().map(|r| &r.route_short_name).collect::<Vec<_>>()),
            );

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![stop.stop_lon, stop.stop_lat]))),
                id: Some(Id::String(stop.stop_id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    feature_collection(features)
}

/// Inverse of the stop index: every route with the ids of the stops it serves,
/// ordered by route id. Stop ids follow stop-id order.
///
/// The stop index lists each route at most once per stop, so a stop id
/// appears at most once per route here as well.
pub fn routes_to_stops(stops: &[StopWithRoutes]) -> Vec<RouteStops> {
    let mut by_route: BTreeMap<&str, RouteStops> = BTreeMap::new();
    for stop in stops {
        for route in &stop.routes {
            by_route
                .entry(route.route_id.as_str())
                .or_insert_with(|| RouteStops {
                    route_id: route.route_id.clone(),
                    route_short_name: route.route_short_name.clone(),
                    route_long_name: route.route_long_name.clone(),
                    stop_ids: Vec::new(),
                })
                .stop_ids
                .push(stop.stop_id.clone());
        }
    }
    by_route.into_values().collect()
}
