//! The three processing pipelines, each split into a compute and a write step.
//!
//! Computing never touches the output directory. `build_all` computes all
//! three document sets before writing the first one, so a feed that fails
//! anywhere (e.g. an unparseable departure time) leaves the previous run's
//! documents as they were.

use std::path::Path;

use anyhow::Result;
use geojson::FeatureCollection;
use tracing::info;

use crate::config::FieldDefaults;
use crate::feed::{Feed, Table};
use crate::frequency::{FrequencyDocument, FrequencyTally, route_frequencies};
use crate::geometry::{NetworkGeometry, assemble};
use crate::join::FeedJoin;
use crate::output::{self, ALL_ROUTES_FILE, ROUTE_FREQUENCIES_FILE, ROUTES_INDEX_FILE};
use crate::stats::{StopNetworkStats, frequency_samples};
use crate::xref::{
    RouteStops, StopWithRoutes, routes_to_stops, stops_feature_collection, stops_with_routes,
};

/// Counts reported at the end of a geometry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySummary {
    pub routes: usize,
    pub features: usize,
}

/// The three cross-reference documents.
#[derive(Debug, Clone)]
pub struct CrossReference {
    pub stops: Vec<StopWithRoutes>,
    pub stops_geojson: FeatureCollection,
    pub route_stops: Vec<RouteStops>,
}

/// Every document of a full build, computed and not yet written.
#[derive(Debug, Clone)]
pub struct Build {
    pub geometry: NetworkGeometry,
    pub cross_reference: CrossReference,
    pub frequencies: FrequencyDocument,
    pub tally: FrequencyTally,
}

pub fn compute_routes(join: &FeedJoin<'_>, defaults: &FieldDefaults) -> NetworkGeometry {
    info!("Processing route geometries");
    assemble(join, defaults)
}

pub fn compute_stops(join: &FeedJoin<'_>, defaults: &FieldDefaults) -> CrossReference {
    let feed = join.feed();
    info!(
        stops = feed.stops.len(),
        stop_times = feed.stop_times.len(),
        trips = feed.trips.len(),
        routes = feed.routes.len(),
        "Processing stops"
    );
    let stops = stops_with_routes(join, defaults);
    let stops_geojson = stops_feature_collection(&stops);
    let route_stops = routes_to_stops(&stops);
    CrossReference {
        stops,
        stops_geojson,
        route_stops,
    }
}

/// # Errors
///
/// Fails on the first unparseable origin departure time.
pub fn compute_frequencies(
    join: &FeedJoin<'_>,
    defaults: &FieldDefaults,
) -> Result<(FrequencyDocument, FrequencyTally)> {
    Ok(route_frequencies(join, defaults)?)
}

/// Writes per-route geometries, the aggregate collection and the route index.
pub fn write_routes(network: &NetworkGeometry, output_dir: &Path) -> Result<GeometrySummary> {
    output::write_geometry(output_dir, network)?;

    let summary = GeometrySummary {
        routes: network.routes.len(),
        features: network.all_routes.features.len(),
    };
    info!(routes = summary.routes, "Saved route files");
    info!(features = summary.features, file = ALL_ROUTES_FILE, "Saved aggregate collection");
    info!(file = ROUTES_INDEX_FILE, "Saved route index");
    Ok(summary)
}

/// Writes the stop-centric list, the stop points and the route-to-stops list.
pub fn write_stops(xref: &CrossReference, output_dir: &Path) -> Result<StopNetworkStats> {
    output::write_cross_reference(
        output_dir,
        &xref.stops,
        &xref.stops_geojson,
        &xref.route_stops,
    )?;

    let stats = StopNetworkStats::from_index(&xref.stops, &xref.route_stops);
    info!(
        total_stops = stats.total_stops,
        total_routes = stats.total_routes,
        avg_routes_per_stop = format!("{:.2}", stats.avg_routes_per_stop),
        "Saved stops with route information"
    );
    if let Some((name, count)) = &stats.busiest_stop {
        info!(stop_name = %name, routes = count, "Stop with most routes");
    }
    Ok(stats)
}

/// Writes the frequency document and logs the tally with a few sample routes.
pub fn write_frequencies(
    document: &FrequencyDocument,
    tally: &FrequencyTally,
    output_dir: &Path,
) -> Result<()> {
    output::write_frequencies(output_dir, document)?;

    info!(
        processed = tally.processed,
        skipped = tally.skipped_total(),
        "Frequency computation complete"
    );
    for (reason, count) in &tally.skipped {
        info!(%reason, count, "Skipped routes");
    }
    info!(file = ROUTE_FREQUENCIES_FILE, "Saved frequency data");

    for sample in frequency_samples(document, 5) {
        info!(
            route = %sample.route_short_name,
            name = %sample.route_long_name,
            trips = sample.num_trips,
            service_hours = format!("{} - {}", sample.first_departure, sample.last_departure),
            avg_headway = sample.avg_headway_minutes,
            peak_buses_per_hour = sample.peak_buses_per_hour,
            "Sample route"
        );
    }
    Ok(())
}

#[tracing::instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn build_routes(feed: &Feed, defaults: &FieldDefaults, output_dir: &Path) -> Result<GeometrySummary> {
    let join = FeedJoin::new(feed);
    write_routes(&compute_routes(&join, defaults), output_dir)
}

#[tracing::instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn build_stops(feed: &Feed, defaults: &FieldDefaults, output_dir: &Path) -> Result<StopNetworkStats> {
    let join = FeedJoin::new(feed);
    write_stops(&compute_stops(&join, defaults), output_dir)
}

#[tracing::instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn build_frequencies(
    feed: &Feed,
    defaults: &FieldDefaults,
    output_dir: &Path,
) -> Result<FrequencyTally> {
    let join = FeedJoin::new(feed);
    let (document, tally) = compute_frequencies(&join, defaults)?;
    write_frequencies(&document, &tally, output_dir)?;
    Ok(tally)
}

/// Computes every document of the feed without writing any.
pub fn compute_all(feed: &Feed, defaults: &FieldDefaults) -> Result<Build> {
    let join = FeedJoin::new(feed);
    let geometry = compute_routes(&join, defaults);
    let cross_reference = compute_stops(&join, defaults);
    let (frequencies, tally) = compute_frequencies(&join, defaults)?;
    Ok(Build {
        geometry,
        cross_reference,
        frequencies,
        tally,
    })
}

/// Loads every table once, computes all three document sets, then writes them.
#[tracing::instrument(skip(defaults, output_dir), fields(output_dir = %output_dir.display()))]
pub fn build_all(source: &str, defaults: &FieldDefaults, output_dir: &Path) -> Result<()> {
    let feed = Feed::load(source, Table::ALL)?;
    let build = compute_all(&feed, defaults)?;

    write_routes(&build.geometry, output_dir)?;
    write_stops(&build.cross_reference, output_dir)?;
    write_frequencies(&build.frequencies, &build.tally, output_dir)?;
    Ok(())
}
