//! Per-route weekday service frequency.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::FieldDefaults;
use crate::error::Result;
use crate::headway::{HeadwayProfile, SkipReason, compute_profile};
use crate::join::{FeedJoin, RouteMeta};

/// Frequency document entry of one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteFrequency {
    #[serde(flatten)]
    pub meta: RouteMeta,
    #[serde(flatten)]
    pub profile: HeadwayProfile,
}

/// Frequency entries keyed and ordered by route id.
pub type FrequencyDocument = BTreeMap<String, RouteFrequency>;

/// How many routes made it into the frequency document and why the others
/// did not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyTally {
    pub processed: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl FrequencyTally {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }
}

/// Headway profile of one route over its weekday trips.
///
/// # Errors
///
/// Fails only on an unparseable origin departure time. The inner `Err` is
/// the reason the route has no profile.
pub fn route_profile(
    join: &FeedJoin<'_>,
    route_id: &str,
) -> Result<std::result::Result<HeadwayProfile, SkipReason>> {
    if join.trips_of(route_id).is_empty() {
        return Ok(Err(SkipReason::NoTrips));
    }
    let weekday_trips = join.weekday_trips(route_id);
    if weekday_trips.is_empty() {
        return Ok(Err(SkipReason::NoWeekdayTrips));
    }
    let departures = join.origin_departures(&weekday_trips)?;
    Ok(compute_profile(departures))
}

/// Computes the frequency entry of every route of the feed.
///
/// # Errors
///
/// Returns [`crate::error::AtlasError::InvalidTime`] or
/// [`crate::error::AtlasError::MissingOriginTime`] on the first unusable
/// origin departure; nothing is returned for the other routes in that case.
pub fn route_frequencies(
    join: &FeedJoin<'_>,
    defaults: &FieldDefaults,
) -> Result<(FrequencyDocument, FrequencyTally)> {
    let routes = &join.feed().routes;
    info!(
        weekday_services = join.weekday_service_count(),
        routes = routes.len(),
        "Computing route frequencies"
    );

    let mut document = FrequencyDocument::new();
    let mut tally = FrequencyTally::default();

    for route in routes {
        match route_profile(join, &route.id)? {
            Ok(profile) => {
                document.insert(
                    route.id.clone(),
                    RouteFrequency {
                        meta: RouteMeta::resolve(route, defaults),
                        profile,
                    },
                );
                tally.processed += 1;
                if tally.processed % 50 == 0 {
                    info!(processed = tally.processed, "Processed routes");
                }
            }
            Err(reason) => {
                debug!(route_id = %route.id, %reason, "Route skipped");
                tally.skip(reason);
            }
        }
    }

    Ok((document, tally))
}
