//! Audit of stop codes against stop identifiers in the written stop list.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::xref::StopWithRoutes;

use super::utility::pct;

/// Stops quoted in the report.
pub const EXAMPLE_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopExample {
    pub stop_id: String,
    pub stop_code: String,
    pub stop_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopCodeReport {
    pub total_stops: usize,
    pub with_code: usize,
    pub without_code: usize,
    pub unique_codes: usize,
    pub unique_ids: usize,
    pub ids_unique: bool,
    /// Whether the non-empty codes are unique.
    pub codes_unique: bool,
    pub examples: Vec<StopExample>,
}

impl StopCodeReport {
    pub fn from_stops(stops: &[StopWithRoutes]) -> Self {
        let codes: Vec<&str> = stops
            .iter()
            .map(|s| s.stop_code.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        let unique_codes: HashSet<&str> = codes.iter().copied().collect();
        let unique_ids: HashSet<&str> = stops.iter().map(|s| s.stop_id.as_str()).collect();

        StopCodeReport {
            total_stops: stops.len(),
            with_code: codes.len(),
            without_code: stops.len() - codes.len(),
            unique_codes: unique_codes.len(),
            unique_ids: unique_ids.len(),
            ids_unique: unique_ids.len() == stops.len(),
            codes_unique: unique_codes.len() == codes.len(),
            examples: stops
                .iter()
                .take(EXAMPLE_COUNT)
                .map(|s| StopExample {
                    stop_id: s.stop_id.clone(),
                    stop_code: s.stop_code.clone(),
                    stop_name: s.stop_name.clone(),
                })
                .collect(),
        }
    }
}

/// Reads the stop-centric document at `path` and audits it.
pub fn audit_file(path: &Path) -> Result<StopCodeReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let stops: Vec<StopWithRoutes> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(StopCodeReport::from_stops(&stops))
}

pub fn log_report(report: &StopCodeReport) {
    info!(
        total_stops = report.total_stops,
        with_code = report.with_code,
        with_code_pct = format!("{:.1}", pct(report.with_code, report.total_stops)),
        without_code = report.without_code,
        unique_codes = report.unique_codes,
        unique_ids = report.unique_ids,
        "Stop code summary"
    );
    info!(
        ids_unique = report.ids_unique,
        codes_unique = report.codes_unique,
        "Uniqueness"
    );
    for example in &report.examples {
        info!(
            "  ID: {:20} | Code: {:10} | Name: {}",
            example.stop_id, example.stop_code, example.stop_name
        );
    }
}
