use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use gtfs_route_atlas::analyzers::stop_codes;
use gtfs_route_atlas::config::FieldDefaults;
use gtfs_route_atlas::error::AtlasError;
use gtfs_route_atlas::feed::{Feed, Table};
use gtfs_route_atlas::headway::SkipReason;
use gtfs_route_atlas::join::RouteMeta;
use gtfs_route_atlas::output::{
    ALL_ROUTES_FILE, ROUTE_FREQUENCIES_FILE, ROUTES_INDEX_FILE, ROUTES_TO_STOPS_FILE,
    STOPS_GEOJSON_FILE, STOPS_WITH_ROUTES_FILE, route_document_path, route_file_stems,
};
use gtfs_route_atlas::pipeline;
use gtfs_route_atlas::validate::{route_documents, validate_document};
use gtfs_route_atlas::xref::{RouteStops, StopWithRoutes};
use serde_json::Value;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/feed")
}

fn fixture_source() -> String {
    fixture_dir().display().to_string()
}

fn output_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("Failed to read document"))
        .expect("Document is not valid JSON")
}

/// Copies the fixture feed to a temp dir, replacing `from` by `to` in `file`.
fn edited_fixture(name: &str, file: &str, from: &str, to: &str) -> PathBuf {
    let dir = output_dir(name);
    fs::create_dir_all(&dir).unwrap();
    for entry in fs::read_dir(fixture_dir()).unwrap() {
        let path = entry.unwrap().path();
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        let mut content = fs::read_to_string(&path).unwrap();
        if file_name == file {
            assert!(content.contains(from), "{from} not found in {file}");
            content = content.replace(from, to);
        }
        fs::write(dir.join(&file_name), content).unwrap();
    }
    dir
}

fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            (name, fs::read(&path).unwrap())
        })
        .collect()
}

#[test]
fn test_full_pipeline() {
    let out = output_dir("gtfs_route_atlas_it_full");
    pipeline::build_all(&fixture_source(), &FieldDefaults::default(), &out)
        .expect("Pipeline failed");

    for name in [
        ROUTES_INDEX_FILE,
        ALL_ROUTES_FILE,
        STOPS_WITH_ROUTES_FILE,
        STOPS_GEOJSON_FILE,
        ROUTES_TO_STOPS_FILE,
        ROUTE_FREQUENCIES_FILE,
    ] {
        assert!(out.join(name).is_file(), "{name} was not written");
    }

    let index: Vec<RouteMeta> =
        serde_json::from_value(read_json(&out.join(ROUTES_INDEX_FILE))).unwrap();
    let ids: Vec<&str> = index.iter().map(|r| r.route_id.as_str()).collect();
    assert_eq!(ids, vec!["R-4/B", "R1", "R2", "R3"]);
    assert_eq!(index[2].route_color, "000000");
    assert_eq!(index[2].route_text_color, "FFFFFF");

    // The one-point shape of R1 is dropped
    let all_routes = read_json(&out.join(ALL_ROUTES_FILE));
    assert_eq!(all_routes["features"].as_array().unwrap().len(), 4);

    let r1 = read_json(&out.join("R1.json"));
    let features = r1["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["id"], "SH1");
    assert_eq!(features[0]["properties"]["route_color"], "#D52B1E");
    assert_eq!(
        features[0]["geometry"]["coordinates"][0],
        serde_json::json!([-74.0462, 4.7546])
    );
    assert!(out.join("R-4B.json").is_file());

    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_index_round_trips_to_route_documents() {
    let out = output_dir("gtfs_route_atlas_it_round_trip");
    let feed = Feed::load(&fixture_source(), Table::GEOMETRY).unwrap();
    pipeline::build_routes(&feed, &FieldDefaults::default(), &out).unwrap();

    let index: Vec<RouteMeta> =
        serde_json::from_value(read_json(&out.join(ROUTES_INDEX_FILE))).unwrap();
    let stems = route_file_stems(index.iter().map(|r| r.route_id.as_str()));
    for (route, stem) in index.iter().zip(&stems) {
        let document = read_json(&route_document_path(&out, stem));
        for feature in document["features"].as_array().unwrap() {
            assert_eq!(feature["properties"]["route_id"], route.route_id.as_str());
        }
    }
    let distinct: std::collections::BTreeSet<&str> =
        index.iter().map(|r| r.route_id.as_str()).collect();
    assert_eq!(distinct.len(), index.len());
    assert_eq!(route_documents(&out).unwrap().len(), index.len());

    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_reruns_are_byte_identical() {
    let out = output_dir("gtfs_route_atlas_it_idempotent");
    let defaults = FieldDefaults::default();

    pipeline::build_all(&fixture_source(), &defaults, &out).unwrap();
    let first = snapshot(&out);
    pipeline::build_all(&fixture_source(), &defaults, &out).unwrap();
    let second = snapshot(&out);

    assert_eq!(first, second);
    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_zip_source_matches_directory() {
    let zip_path = env::temp_dir().join("gtfs_route_atlas_it_feed.zip");
    let mut writer = zip::ZipWriter::new(fs::File::create(&zip_path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for entry in fs::read_dir(fixture_dir()).unwrap() {
        let path = entry.unwrap().path();
        // Nested entries are matched by file name
        let name = format!("gtfs/{}", path.file_name().unwrap().to_string_lossy());
        writer.start_file(name, options).unwrap();
        writer.write_all(&fs::read(&path).unwrap()).unwrap();
    }
    writer.finish().unwrap();

    let from_dir = output_dir("gtfs_route_atlas_it_from_dir");
    let from_zip = output_dir("gtfs_route_atlas_it_from_zip");
    let defaults = FieldDefaults::default();
    pipeline::build_all(&fixture_source(), &defaults, &from_dir).unwrap();
    pipeline::build_all(&zip_path.display().to_string(), &defaults, &from_zip).unwrap();

    assert_eq!(snapshot(&from_dir), snapshot(&from_zip));

    fs::remove_file(&zip_path).unwrap();
    fs::remove_dir_all(&from_dir).unwrap();
    fs::remove_dir_all(&from_zip).unwrap();
}

#[test]
fn test_stop_cross_reference() {
    let out = output_dir("gtfs_route_atlas_it_stops");
    let feed = Feed::load(&fixture_source(), Table::CROSS_REFERENCE).unwrap();
    let stats = pipeline::build_stops(&feed, &FieldDefaults::default(), &out).unwrap();

    let stops: Vec<StopWithRoutes> =
        serde_json::from_value(read_json(&out.join(STOPS_WITH_ROUTES_FILE))).unwrap();
    let ids: Vec<&str> = stops.iter().map(|s| s.stop_id.as_str()).collect();
    // S6 is unserved and S99 is unknown
    assert_eq!(ids, vec!["S1", "S2", "S3", "S4", "S5"]);

    // Five R1 trips call at S1, the route is listed once
    assert_eq!(stops[0].route_count, 1);
    for stop in &stops {
        assert_eq!(stop.route_count, stop.routes.len());
    }
    assert_eq!(stops[2].stop_code, "");
    assert_eq!(stops[2].stop_name, "Héroes");

    let route_stops: Vec<RouteStops> =
        serde_json::from_value(read_json(&out.join(ROUTES_TO_STOPS_FILE))).unwrap();
    let summary: Vec<(&str, Vec<&str>)> = route_stops
        .iter()
        .map(|r| {
            (
                r.route_id.as_str(),
                r.stop_ids.iter().map(String::as_str).collect(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("R-4/B", vec!["S4"]),
            ("R1", vec!["S1", "S2", "S3"]),
            ("R2", vec!["S2", "S4"]),
            ("R3", vec!["S5"]),
        ]
    );

    // Every stop/route pair appears once in each direction
    let forward: usize = stops.iter().map(|s| s.route_count).sum();
    let backward: usize = route_stops.iter().map(|r| r.stop_ids.len()).sum();
    assert_eq!(forward, backward);

    let geojson = read_json(&out.join(STOPS_GEOJSON_FILE));
    let s2 = &geojson["features"][1];
    assert_eq!(s2["properties"]["route_ids"], serde_json::json!(["R1", "R2"]));
    assert_eq!(s2["geometry"]["coordinates"], serde_json::json!([-74.0565, 4.6867]));

    assert_eq!(stats.total_stops, 5);
    assert_eq!(stats.total_routes, 4);
    assert_eq!(stats.busiest_stop, Some(("Calle 100".to_string(), 2)));

    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_route_frequencies() {
    let out = output_dir("gtfs_route_atlas_it_frequencies");
    let feed = Feed::load(&fixture_source(), Table::FREQUENCIES).unwrap();
    let tally = pipeline::build_frequencies(&feed, &FieldDefaults::default(), &out).unwrap();

    assert_eq!(tally.processed, 2);
    assert_eq!(tally.skipped.get(&SkipReason::NoWeekdayTrips), Some(&1));
    assert_eq!(tally.skipped.get(&SkipReason::TooFewDepartures), Some(&1));
    assert_eq!(tally.skipped.get(&SkipReason::NoTrips), Some(&1));

    let document = read_json(&out.join(ROUTE_FREQUENCIES_FILE));
    let keys: Vec<&String> = document.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["R1", "R2"]);

    // 06:00, 06:15, 06:15, 06:30 and the arrival-only 07:00
    let r1 = &document["R1"];
    assert_eq!(r1["num_trips"], 5);
    assert_eq!(r1["first_departure"], "06:00:00");
    assert_eq!(r1["last_departure"], "07:00:00");
    assert_eq!(r1["avg_headway_minutes"], 20.0);
    assert_eq!(r1["min_headway_minutes"], 15.0);
    assert_eq!(r1["max_headway_minutes"], 30.0);
    assert_eq!(r1["route_color"], "D52B1E");

    let hours = r1["hourly_profile"].as_array().unwrap();
    assert_eq!(hours.len(), 20);
    assert_eq!(hours[2]["hour"], 6);
    assert_eq!(hours[2]["trips"], 4);
    assert_eq!(hours[2]["avg_headway_minutes"], 15.0);
    assert_eq!(hours[2]["buses_per_hour"], 4.0);
    assert_eq!(hours[3]["trips"], 1);
    assert_eq!(hours[3]["buses_per_hour"], 0.0);

    let r2 = &document["R2"];
    assert_eq!(r2["last_departure"], "25:10:00");
    assert_eq!(r2["avg_headway_minutes"], 1030.0);

    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_validator_accepts_every_route_document() {
    let out = output_dir("gtfs_route_atlas_it_validate");
    pipeline::build_all(&fixture_source(), &FieldDefaults::default(), &out).unwrap();

    for path in route_documents(&out).unwrap() {
        let report = validate_document(&path).unwrap();
        assert_eq!(report.first_geometry.as_deref(), Some("LineString"));
    }

    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_stop_code_audit_of_written_stops() {
    let out = output_dir("gtfs_route_atlas_it_stop_codes");
    let feed = Feed::load(&fixture_source(), Table::CROSS_REFERENCE).unwrap();
    pipeline::build_stops(&feed, &FieldDefaults::default(), &out).unwrap();

    let report = stop_codes::audit_file(&out.join(STOPS_WITH_ROUTES_FILE)).unwrap();
    assert_eq!(report.total_stops, 5);
    assert_eq!(report.with_code, 4);
    assert_eq!(report.unique_codes, 3);
    assert!(report.ids_unique);
    assert!(!report.codes_unique);

    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_missing_source() {
    let result = Feed::load("/nonexistent/gtfs_route_atlas_feed", Table::GEOMETRY);
    assert!(matches!(result, Err(AtlasError::SourceUnavailable(_))));
}

#[test]
fn test_malformed_time_writes_nothing() {
    let feed_dir = edited_fixture(
        "gtfs_route_atlas_it_bad_time_feed",
        "stop_times.txt",
        "T2,06:15:00,06:15:00,S1,1",
        "T2,6h15,6h15,S1,1",
    );
    let out = output_dir("gtfs_route_atlas_it_bad_time_out");

    let result = pipeline::build_all(
        &feed_dir.display().to_string(),
        &FieldDefaults::default(),
        &out,
    );

    let err = result.expect_err("Malformed time must abort the build");
    assert!(matches!(
        err.downcast_ref::<AtlasError>(),
        Some(AtlasError::InvalidTime(t)) if t == "6h15"
    ));
    assert!(!out.exists() || fs::read_dir(&out).unwrap().next().is_none());

    fs::remove_dir_all(&feed_dir).unwrap();
}

#[test]
fn test_malformed_time_keeps_previous_documents() {
    let out = output_dir("gtfs_route_atlas_it_bad_time_rerun");
    let defaults = FieldDefaults::default();
    pipeline::build_all(&fixture_source(), &defaults, &out).unwrap();
    let before = snapshot(&out);

    let feed_dir = edited_fixture(
        "gtfs_route_atlas_it_bad_time_rerun_feed",
        "stop_times.txt",
        "T2,06:15:00,06:15:00,S1,1",
        "T2,6h15,6h15,S1,1",
    );
    assert!(pipeline::build_all(&feed_dir.display().to_string(), &defaults, &out).is_err());
    assert_eq!(snapshot(&out), before);

    fs::remove_dir_all(&feed_dir).unwrap();
    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn test_route_named_like_reserved_document() {
    let feed_dir = edited_fixture(
        "gtfs_route_atlas_it_reserved_feed",
        "trips.txt",
        "R-4/B,WK,T10,0,SH5",
        "route_frequencies,WK,T10,0,SH5",
    );
    let routes = fs::read_to_string(feed_dir.join("routes.txt"))
        .unwrap()
        .replace("R-4/B,TM,4", "route_frequencies,TM,4");
    fs::write(feed_dir.join("routes.txt"), routes).unwrap();
    let out = output_dir("gtfs_route_atlas_it_reserved_out");

    pipeline::build_all(&feed_dir.display().to_string(), &FieldDefaults::default(), &out)
        .unwrap();

    // The frequency mapping stays intact next to the renamed route document
    let frequencies = read_json(&out.join(ROUTE_FREQUENCIES_FILE));
    assert!(frequencies.get("R1").is_some());
    let renamed = read_json(&out.join("route_frequencies_2.json"));
    assert_eq!(renamed["type"], "FeatureCollection");
    assert_eq!(renamed["features"][0]["properties"]["route_id"], "route_frequencies");

    let index: Vec<RouteMeta> =
        serde_json::from_value(read_json(&out.join(ROUTES_INDEX_FILE))).unwrap();
    assert_eq!(route_documents(&out).unwrap().len(), index.len());

    fs::remove_dir_all(&feed_dir).unwrap();
    fs::remove_dir_all(&out).unwrap();
}
