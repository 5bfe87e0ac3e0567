//! Loading of the static feed tables into memory.
//!
//! Each pipeline asks only for the tables it needs. A run works on a fully
//! loaded [`Feed`]; a required table that is missing aborts the load before
//! anything is computed.

mod source;
mod types;

pub use source::{DirectorySource, TableSource, ZipSource, open_source};
pub use types::{CalendarEntry, Route, ShapePoint, Stop, StopTimeEvent, Trip};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{AtlasError, Result};

/// One table of the static feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Stops,
    Routes,
    Trips,
    StopTimes,
    Calendar,
    Shapes,
}

impl Table {
    pub fn file_name(self) -> &'static str {
        match self {
            Table::Stops => "stops.txt",
            Table::Routes => "routes.txt",
            Table::Trips => "trips.txt",
            Table::StopTimes => "stop_times.txt",
            Table::Calendar => "calendar.txt",
            Table::Shapes => "shapes.txt",
        }
    }

    /// Tables read by the route geometry pipeline.
    pub const GEOMETRY: &'static [Table] = &[Table::Routes, Table::Trips, Table::Shapes];
    /// Tables read by the stop/route cross-reference pipeline.
    pub const CROSS_REFERENCE: &'static [Table] =
        &[Table::Stops, Table::StopTimes, Table::Trips, Table::Routes];
    /// Tables read by the frequency pipeline.
    pub const FREQUENCIES: &'static [Table] =
        &[Table::Routes, Table::Trips, Table::StopTimes, Table::Calendar];
    pub const ALL: &'static [Table] = &[
        Table::Stops,
        Table::Routes,
        Table::Trips,
        Table::StopTimes,
        Table::Calendar,
        Table::Shapes,
    ];
}

/// The raw tables of a feed. Tables that were not requested stay empty.
#[derive(Debug, Default)]
pub struct Feed {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub stop_times: Vec<StopTimeEvent>,
    pub calendar: Vec<CalendarEntry>,
    pub shapes: Vec<ShapePoint>,
}

impl Feed {
    /// Opens `source` and loads `tables` from it.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::SourceUnavailable`] if the source cannot be opened,
    /// [`AtlasError::MissingTable`] if a requested table is absent and
    /// [`AtlasError::Csv`] if a table cannot be parsed.
    #[tracing::instrument(skip(tables))]
    pub fn load(source: &str, tables: &[Table]) -> Result<Self> {
        let mut source = open_source(source)?;
        Self::from_source(source.as_mut(), tables)
    }

    /// Loads `tables` from an already opened source.
    pub fn from_source(source: &mut dyn TableSource, tables: &[Table]) -> Result<Self> {
        info!(tables = ?source.table_names(), "Files in feed");

        let mut feed = Feed::default();
        for &table in tables {
            let name = table.file_name();
            let bytes = source
                .read_table(name)?
                .ok_or_else(|| AtlasError::MissingTable(name.to_owned()))?;

            let records = match table {
                Table::Stops => {
                    feed.stops = read_records(&bytes, name)?;
                    feed.stops.len()
                }
                Table::Routes => {
                    feed.routes = read_records(&bytes, name)?;
                    feed.routes.len()
                }
                Table::Trips => {
                    feed.trips = read_records(&bytes, name)?;
                    feed.trips.len()
                }
                Table::StopTimes => {
                    feed.stop_times = read_records(&bytes, name)?;
                    feed.stop_times.len()
                }
                Table::Calendar => {
                    feed.calendar = read_records(&bytes, name)?;
                    feed.calendar.len()
                }
                Table::Shapes => {
                    feed.shapes = read_records(&bytes, name)?;
                    feed.shapes.len()
                }
            };
            debug!(table = name, records, "Table loaded");
        }

        info!(
            stops = feed.stops.len(),
            routes = feed.routes.len(),
            trips = feed.trips.len(),
            stop_times = feed.stop_times.len(),
            calendar = feed.calendar.len(),
            shape_points = feed.shapes.len(),
            "Feed loaded"
        );
        if let Some((start, end)) = feed.service_window() {
            info!(%start, %end, "Calendar service window");
        }

        Ok(feed)
    }

    /// Earliest start and latest end date over all calendar entries.
    pub fn service_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.calendar.iter().filter_map(|c| c.start_date).min()?;
        let end = self.calendar.iter().filter_map(|c| c.end_date).max()?;
        Some((start, end))
    }
}

fn read_records<T: DeserializeOwned>(bytes: &[u8], file_name: &str) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.map_err(|source| AtlasError::Csv {
            file_name: file_name.to_owned(),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
