//! Records of the static feed tables.
//!
//! Identifiers and color fields stay textual from ingestion on, even when a
//! feed writes them as numbers.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// A row of `stops.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct Stop {
    #[serde(rename = "stop_id")]
    pub id: String,
    /// Rider-facing short code. May be empty and is not unique.
    #[serde(rename = "stop_code", default)]
    pub code: Option<String>,
    #[serde(rename = "stop_name", default)]
    pub name: Option<String>,
    #[serde(rename = "stop_lat")]
    pub latitude: f64,
    #[serde(rename = "stop_lon")]
    pub longitude: f64,
}

/// A row of `routes.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    #[serde(rename = "route_id")]
    pub id: String,
    #[serde(rename = "route_short_name", default)]
    pub short_name: Option<String>,
    #[serde(rename = "route_long_name", default)]
    pub long_name: Option<String>,
    #[serde(rename = "route_color", default)]
    pub color: Option<String>,
    #[serde(rename = "route_text_color", default)]
    pub text_color: Option<String>,
}

/// A row of `trips.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct Trip {
    #[serde(rename = "trip_id")]
    pub id: String,
    pub route_id: String,
    pub service_id: String,
    #[serde(default)]
    pub shape_id: Option<String>,
}

/// A row of `stop_times.txt`. Identity is `(trip_id, stop_sequence)`.
#[derive(Debug, Clone, Deserialize)]
pub struct StopTimeEvent {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
}

impl StopTimeEvent {
    /// Sequence value of a trip's origin stop.
    pub const ORIGIN_SEQUENCE: u32 = 1;

    pub fn is_origin(&self) -> bool {
        self.stop_sequence == Self::ORIGIN_SEQUENCE
    }

    /// Departure time, falling back to the arrival time for events that only
    /// carry one of the two.
    pub fn departure(&self) -> Option<&str> {
        let present = |t: &&str| !t.is_empty();
        self.departure_time
            .as_deref()
            .filter(present)
            .or_else(|| self.arrival_time.as_deref().filter(present))
    }
}

/// A row of `calendar.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEntry {
    pub service_id: String,
    #[serde(deserialize_with = "deserialize_day_flag")]
    pub monday: bool,
    #[serde(deserialize_with = "deserialize_day_flag")]
    pub tuesday: bool,
    #[serde(deserialize_with = "deserialize_day_flag")]
    pub wednesday: bool,
    #[serde(deserialize_with = "deserialize_day_flag")]
    pub thursday: bool,
    #[serde(deserialize_with = "deserialize_day_flag")]
    pub friday: bool,
    #[serde(deserialize_with = "deserialize_day_flag")]
    pub saturday: bool,
    #[serde(deserialize_with = "deserialize_day_flag")]
    pub sunday: bool,
    #[serde(default, deserialize_with = "deserialize_option_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_option_date")]
    pub end_date: Option<NaiveDate>,
}

impl CalendarEntry {
    /// True when the service runs on all of Monday through Friday. Weekend
    /// flags are not considered.
    pub fn runs_every_weekday(&self) -> bool {
        self.monday && self.tuesday && self.wednesday && self.thursday && self.friday
    }

    /// Day flags in Monday..Sunday order.
    pub fn day_flags(&self) -> [bool; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }
}

/// A row of `shapes.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapePoint {
    pub shape_id: String,
    #[serde(rename = "shape_pt_lat")]
    pub latitude: f64,
    #[serde(rename = "shape_pt_lon")]
    pub longitude: f64,
    #[serde(rename = "shape_pt_sequence")]
    pub sequence: u32,
}

fn deserialize_day_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.trim() {
        "1" => Ok(true),
        "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "'{other}' is not a valid day flag; 0 or 1 is expected"
        ))),
    }
}

fn deserialize_option_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), "%Y%m%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
