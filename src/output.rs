//! Serialization of the output documents.
//!
//! Every document is written whole, replacing what a previous run left.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::frequency::FrequencyDocument;
use crate::geometry::NetworkGeometry;
use crate::xref::{RouteStops, StopWithRoutes};

pub const ROUTES_INDEX_FILE: &str = "routes_index.json";
pub const ALL_ROUTES_FILE: &str = "all_routes.geojson";
pub const STOPS_WITH_ROUTES_FILE: &str = "stops_with_routes.json";
pub const STOPS_GEOJSON_FILE: &str = "stops.geojson";
pub const ROUTES_TO_STOPS_FILE: &str = "routes_to_stops.json";
pub const ROUTE_FREQUENCIES_FILE: &str = "route_frequencies.json";

/// Documents that share the output directory with the per-route files.
pub const RESERVED_FILES: &[&str] = &[
    ROUTES_INDEX_FILE,
    ALL_ROUTES_FILE,
    STOPS_WITH_ROUTES_FILE,
    STOPS_GEOJSON_FILE,
    ROUTES_TO_STOPS_FILE,
    ROUTE_FREQUENCIES_FILE,
];

/// Keeps alphanumerics, `-` and `_` of an identifier so it can be used as a
/// file name.
pub fn sanitize_file_stem(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Stem used when an identifier has no usable character.
const FALLBACK_STEM: &str = "route";

/// File stems of the per-route documents, one per id and in the same order.
///
/// A stem is the sanitized id unless that is empty, names a reserved document
/// or was already given to an earlier id; then `_2`, `_3`, ... is appended
/// until it is free. Ids are expected in route-id order so the outcome does
/// not change between runs.
pub fn route_file_stems<'a, I>(route_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken: HashSet<String> = HashSet::new();
    route_ids
        .into_iter()
        .map(|route_id| {
            let sanitized = sanitize_file_stem(route_id);
            let base = if sanitized.is_empty() {
                FALLBACK_STEM.to_string()
            } else {
                sanitized.clone()
            };

            let mut stem = base.clone();
            let mut suffix = 2;
            while is_reserved_stem(&stem) || taken.contains(&stem) {
                stem = format!("{base}_{suffix}");
                suffix += 1;
            }
            if stem != sanitized {
                warn!(route_id, file_stem = %stem, "Route document renamed to avoid a clash");
            }

            taken.insert(stem.clone());
            stem
        })
        .collect()
}

fn is_reserved_stem(stem: &str) -> bool {
    RESERVED_FILES
        .iter()
        .any(|name| name.strip_suffix(".json") == Some(stem))
}

/// Path of the per-route geometry document with the given stem.
pub fn route_document_path(dir: &Path, file_stem: &str) -> PathBuf {
    dir.join(format!("{file_stem}.json"))
}

/// Writes `value` as compact JSON.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_vec(value).context("Failed to serialize document")?;
    write_document(path, &body)
}

/// Writes `value` as indented JSON.
pub fn write_json_pretty(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_vec_pretty(value).context("Failed to serialize document")?;
    write_document(path, &body)
}

fn write_document(path: &Path, body: &[u8]) -> Result<()> {
    debug!(path = %path.display(), bytes = body.len(), "Writing document");
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

/// Creates the output directory if it doesn't exist.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}

/// Writes one document per route, the aggregate collection and the route index.
pub fn write_geometry(dir: &Path, network: &NetworkGeometry) -> Result<()> {
    ensure_output_dir(dir)?;
    let stems = route_file_stems(network.routes.iter().map(|r| r.meta.route_id.as_str()));
    for (route, stem) in network.routes.iter().zip(&stems) {
        write_json(&route_document_path(dir, stem), &route.collection)?;
    }
    write_json(&dir.join(ROUTES_INDEX_FILE), &network.index())?;
    write_json(&dir.join(ALL_ROUTES_FILE), &network.all_routes)?;
    Ok(())
}

/// Writes the stop-centric list, its point collection and the route-to-stops list.
pub fn write_cross_reference(
    dir: &Path,
    stops: &[StopWithRoutes],
    stops_geojson: &geojson::FeatureCollection,
    route_stops: &[RouteStops],
) -> Result<()> {
    ensure_output_dir(dir)?;
    write_json_pretty(&dir.join(STOPS_WITH_ROUTES_FILE), &stops)?;
    write_json_pretty(&dir.join(STOPS_GEOJSON_FILE), stops_geojson)?;
    write_json_pretty(&dir.join(ROUTES_TO_STOPS_FILE), &route_stops)?;
    Ok(())
}

pub fn write_frequencies(dir: &Path, document: &FrequencyDocument) -> Result<()> {
    ensure_output_dir(dir)?;
    write_json_pretty(&dir.join(ROUTE_FREQUENCIES_FILE), document)
}
