//! Structural sanity check of a written per-route document.

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AtlasError, Result};
use crate::output::RESERVED_FILES;

/// What the validator saw in the checked document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub file: PathBuf,
    pub feature_count: usize,
    /// Geometry type of the first feature, if any.
    pub first_geometry: Option<String>,
}

/// Per-route documents in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`AtlasError::Validation`] if `dir` is not a directory.
pub fn route_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(failure(dir, "directory does not exist"));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.extension().and_then(|e| e.to_str()) == Some("json")
            && !RESERVED_FILES.contains(&name)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Validates one per-route document picked at random from `dir`.
///
/// # Errors
///
/// Returns [`AtlasError::Validation`] if there is no document to pick or the
/// picked one fails [`validate_document`].
pub fn validate_random<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Result<ValidationReport> {
    let files = route_documents(dir)?;
    info!(count = files.len(), "Found route files");

    let file = files
        .choose(rng)
        .ok_or_else(|| failure(dir, "no route documents found"))?;
    validate_document(file)
}

/// Checks that `path` holds a `FeatureCollection` whose first feature, if any,
/// has a `route_id` property and a line geometry.
///
/// # Errors
///
/// Returns [`AtlasError::Validation`] describing the first failed check.
pub fn validate_document(path: &Path) -> Result<ValidationReport> {
    info!(file = %path.display(), "Validating route document");

    let content = std::fs::read_to_string(path)?;
    let document: Value =
        serde_json::from_str(&content).map_err(|e| failure(path, &format!("invalid JSON: {e}")))?;

    if document.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(failure(path, "not a FeatureCollection"));
    }
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| failure(path, "features array missing"))?;

    let Some(first) = features.first() else {
        warn!(file = %path.display(), "No features in this route");
        return Ok(ValidationReport {
            file: path.to_path_buf(),
            feature_count: 0,
            first_geometry: None,
        });
    };

    if first.pointer("/properties/route_id").is_none() {
        return Err(failure(path, "route_id missing in properties"));
    }
    let geometry_type = first
        .pointer("/geometry/type")
        .and_then(Value::as_str)
        .unwrap_or("none");
    if !matches!(geometry_type, "LineString" | "MultiLineString") {
        return Err(failure(
            path,
            &format!("unexpected geometry type {geometry_type}"),
        ));
    }

    info!(features = features.len(), geometry = geometry_type, "Validation successful");
    Ok(ValidationReport {
        file: path.to_path_buf(),
        feature_count: features.len(),
        first_geometry: Some(geometry_type.to_string()),
    })
}

fn failure(path: &Path, reason: &str) -> AtlasError {
    AtlasError::Validation {
        file: path.display().to_string(),
        reason: reason.to_string(),
    }
}
