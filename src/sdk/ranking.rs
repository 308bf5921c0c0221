//! Nearest drop-off ranking.
//!
//! Today's deliveries are ordered by straight-line distance from the selected
//! warehouse. Rows whose address could not be geocoded are kept, unranked, at
//! the end in their original order so the dashboard still lists them.

use super::clock::{manila_date, manila_today, Clock, SystemClock};
use super::config::DEFAULT_CONCURRENCY;
use super::deliveries::{received_by, DeliveryRecord, PreDeliveryRecord};
use super::geocoding::{Coordinate, GeocodingCache};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    /// Rounded to two decimals.
    Km(f64),
    Unavailable,
}

impl Serialize for Distance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Distance::Km(km) => serializer.serialize_f64(*km),
            Distance::Unavailable => serializer.serialize_str("unavailable"),
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Km(km) => write!(f, "{:.2} km", km),
            Distance::Unavailable => f.write_str("Distance not available"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    /// 1-based.
    Position(u32),
    NotApplicable,
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rank::Position(n) => serializer.serialize_u32(*n),
            Rank::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Position(n) => write!(f, "{}", n),
            Rank::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// Output columns a ranking run owns. Same-named columns on an input row are
/// dropped from the copy so the JSON never carries a key twice.
const ANNOTATION_KEYS: [&str; 3] = ["distance_km", "rank", "received_by"];

/// A delivery row annotated for the dashboard. Built fresh on every ranking run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedDelivery {
    #[serde(flatten)]
    pub record: DeliveryRecord,
    pub distance_km: Distance,
    pub rank: Rank,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
}

impl RankedDelivery {
    fn annotate(record: &DeliveryRecord, distance_km: Distance, rank: Rank) -> Self {
        let mut record = record.clone();
        for key in ANNOTATION_KEYS {
            record.extra.remove(key);
        }
        Self {
            record,
            distance_km,
            rank,
            received_by: None,
        }
    }

    fn unavailable(record: &DeliveryRecord) -> Self {
        Self::annotate(record, Distance::Unavailable, Rank::NotApplicable)
    }
}

fn shipped_on(record: &DeliveryRecord, day: NaiveDate) -> bool {
    record.shipped_date.is_some_and(|shipped| manila_date(shipped) == day)
}

/// The I/O-free half of ranking: coordinates are already known.
///
/// `coords` maps an address to its coordinate, or `None` if the lookup failed.
/// Addresses missing from the map count as failed.
pub fn rank_with_coordinates(
    origin: Coordinate,
    coords: &HashMap<String, Option<Coordinate>>,
    records: &[DeliveryRecord],
    today: NaiveDate,
) -> Vec<RankedDelivery> {
    let mut resolved: Vec<(f64, &DeliveryRecord)> = Vec::new();
    let mut unavailable = Vec::new();

    for record in records.iter().filter(|r| shipped_on(r, today)) {
        let distance = coords
            .get(&record.address)
            .copied()
            .flatten()
            .map(|drop_off| haversine_km(origin, drop_off))
            .filter(|km| km.is_finite())
            .map(round_km);

        match distance {
            Some(km) => resolved.push((km, record)),
            None => unavailable.push(RankedDelivery::unavailable(record)),
        }
    }

    // sort_by is stable: equal distances keep input order
    resolved.sort_by(|a, b| a.0.total_cmp(&b.0));

    resolved
        .into_iter()
        .zip(1u32..)
        .map(|((km, record), position)| {
            RankedDelivery::annotate(record, Distance::Km(km), Rank::Position(position))
        })
        .chain(unavailable)
        .collect()
}

/// Fills `received_by` from the drivers' pre-delivery confirmations.
pub fn attach_received_by(ranked: &mut [RankedDelivery], pre_deliveries: &[PreDeliveryRecord]) {
    for row in ranked.iter_mut() {
        row.received_by = received_by(pre_deliveries, &row.record.tracking_no).map(str::to_string);
    }
}

pub struct DropOffRanker {
    cache: GeocodingCache,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl DropOffRanker {
    pub fn new(cache: GeocodingCache) -> Self {
        Self {
            cache,
            clock: Arc::new(SystemClock),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Ranks today's deliveries by distance from `reference`.
    ///
    /// Returns an empty list when there is nothing to rank or the reference
    /// address can't be geocoded; neither case is an error for the caller.
    pub async fn rank(&self, reference: &str, records: &[DeliveryRecord]) -> Vec<RankedDelivery> {
        if records.is_empty() {
            return Vec::new();
        }

        let Some(origin) = self.cache.resolve(reference).await else {
            log::warn!("Reference address \"{}\" did not resolve; skipping ranking", reference);
            return Vec::new();
        };

        let coords = self.resolve_all(records).await;
        let today = manila_today(self.clock.as_ref());
        let ranked = rank_with_coordinates(origin, &coords, records, today);

        let unavailable = ranked
            .iter()
            .filter(|r| r.distance_km == Distance::Unavailable)
            .count();
        log::info!(
            "Ranked {} of {} deliveries for {} from \"{}\" ({} without distance)",
            ranked.len() - unavailable,
            records.len(),
            today,
            reference,
            unavailable
        );
        ranked
    }

    /// Geocodes each distinct address once, at most `concurrency` lookups in flight.
    async fn resolve_all(&self, records: &[DeliveryRecord]) -> HashMap<String, Option<Coordinate>> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = records
            .iter()
            .map(|r| r.address.as_str())
            .filter(|address| seen.insert(*address))
            .collect();

        stream::iter(unique)
            .map(|address| async move { (address.to_string(), self.cache.resolve(address).await) })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
