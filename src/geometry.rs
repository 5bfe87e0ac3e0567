//! Route line geometries as GeoJSON feature collections.

use std::collections::BTreeMap;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::config::FieldDefaults;
use crate::feed::ShapePoint;
use crate::join::{FeedJoin, RouteMeta};

/// The line features of one route.
#[derive(Debug, Clone)]
pub struct RouteGeometry {
    pub meta: RouteMeta,
    pub collection: FeatureCollection,
}

/// Geometry output for the whole network.
#[derive(Debug, Clone)]
pub struct NetworkGeometry {
    /// One entry per route with at least one known shape, by route id.
    pub routes: Vec<RouteGeometry>,
    /// Every route's features in one collection.
    pub all_routes: FeatureCollection,
}

impl NetworkGeometry {
    /// Route index records, in the same order as [`NetworkGeometry::routes`].
    pub fn index(&self) -> Vec<RouteMeta> {
        self.routes.iter().map(|r| r.meta.clone()).collect()
    }
}

/// Groups shape points by shape id and orders each group by sequence.
/// Coordinates are `[lon, lat]`.
pub fn shape_lines(points: &[ShapePoint]) -> BTreeMap<&str, Vec<Vec<f64>>> {
    let mut grouped: BTreeMap<&str, Vec<&ShapePoint>> = BTreeMap::new();
    for point in points {
        grouped.entry(point.shape_id.as_str()).or_default().push(point);
    }

    grouped
        .into_iter()
        .map(|(shape_id, mut points)| {
            points.sort_by_key(|p| p.sequence);
            let coords = points
                .iter()
                .map(|p| vec![p.longitude, p.latitude])
                .collect();
            (shape_id, coords)
        })
        .collect()
}

/// Builds the line feature of one shape of a route. Returns `None` for a
/// shape with fewer than two points.
///
/// The feature id is the shape id so the viewer can address each line on
/// its own. Colors get a leading `#` here, unlike in the route index.
pub fn line_feature(meta: &RouteMeta, shape_id: &str, coords: &[Vec<f64>]) -> Option<Feature> {
    if coords.len() < 2 {
        return None;
    }

    let mut properties = JsonObject::new();
    properties.insert("route_id".to_string(), json!(meta.route_id));
    properties.insert("route_short_name".to_string(), json!(meta.route_short_name));
    properties.insert("route_long_name".to_string(), json!(meta.route_long_name));
    properties.insert("route_color".to_string(), json!(meta.css_color()));
    properties.insert("route_text_color".to_string(), json!(meta.css_text_color()));
    properties.insert("shape_id".to_string(), json!(shape_id));

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coords.to_vec()))),
        id: Some(Id::String(shape_id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Folds every route's shapes into per-route and network-wide collections.
///
/// A route appears once it uses at least one shape present in the shapes
/// table, even if all of its shapes turn out to be degenerate.
pub fn assemble(join: &FeedJoin<'_>, defaults: &FieldDefaults) -> NetworkGeometry {
    let lines = shape_lines(&join.feed().shapes);
    let mut routes = Vec::new();
    let mut all_features = Vec::new();

    for (route_id, shape_ids) in join.route_shapes() {
        let Some(route) = join.route(route_id) else {
            continue;
        };
        let known: Vec<(&str, &Vec<Vec<f64>>)> = shape_ids
            .into_iter()
            .filter_map(|id| lines.get(id).map(|coords| (id, coords)))
            .collect();
        if known.is_empty() {
            continue;
        }

        let meta = RouteMeta::resolve(route, defaults);
        let features: Vec<Feature> = known
            .into_iter()
            .filter_map(|(shape_id, coords)| line_feature(&meta, shape_id, coords))
            .collect();
        all_features.extend(features.iter().cloned());

        routes.push(RouteGeometry {
            meta,
            collection: feature_collection(features),
        });
    }

    NetworkGeometry {
        routes,
        all_routes: feature_collection(all_features),
    }
}

pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
