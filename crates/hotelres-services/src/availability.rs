//! Availability engine
//!
//! Decides whether rooms fit over a date range, one night at a time, using
//! the cache first and the record store as the authority on a miss.
//!
//! - `make_reservation` checks every night of a single hotel in date order
//!   and only then commits: pending counts are flushed to the cache and one
//!   record per night is inserted. A rejected request leaves no trace.
//! - `check_availability` answers for many hotels at once with two batched
//!   cache reads and one concurrent task per night and hotel.
//!
//! Check-then-commit is not atomic across concurrent requests: two bookings
//! for the same night can both pass the check against the same count.

use hotelres_cache::keys::{capacity_key, decode_count, encode_count, segment_key};
use hotelres_cache::{CacheItem, ResilientCache};
use hotelres_core::{
    models::{
        rooms_fit, AvailabilityResult, CapacityRecord, DateRange, DateSegment,
        ReservationOutcome, ReservationRecord,
    },
    traits::RecordStore,
    AppError, AppResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::fanin::FanIn;

/// Where a value came from
#[derive(Debug, Clone, Copy)]
enum Lookup {
    Hit(i64),
    /// Read from the store; the cache should be repopulated
    Filled(i64),
    /// Read from the store because the cache was unreachable
    Fallback(i64),
}

impl Lookup {
    fn value(&self) -> i64 {
        match self {
            Lookup::Hit(v) | Lookup::Filled(v) | Lookup::Fallback(v) => *v,
        }
    }
}

pub struct AvailabilityEngine<S: RecordStore> {
    store: Arc<S>,
    cache: ResilientCache,
}

impl<S: RecordStore> AvailabilityEngine<S> {
    pub fn new(store: Arc<S>, cache: ResilientCache) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &ResilientCache {
        &self.cache
    }

    /// Book `room_count` rooms in one hotel for every night of `[in, out)`.
    ///
    /// Insufficient capacity is returned as a rejected outcome, not an error.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidInput` for malformed dates, an empty range, an empty
    ///   hotel id or a non-positive room count
    /// - `AppError::CapacityNotFound` if the hotel has no capacity record
    /// - `AppError::Database` if the store fails; nothing is committed unless
    ///   the failure happens while inserting
    #[instrument(skip(self, customer_name))]
    pub async fn make_reservation(
        &self,
        hotel_id: &str,
        customer_name: &str,
        in_iso: &str,
        out_iso: &str,
        room_count: i32,
    ) -> AppResult<ReservationOutcome> {
        validate_hotel_id(hotel_id)?;
        validate_room_count(room_count)?;
        let range = DateRange::parse(in_iso, out_iso)?;
        let started = Instant::now();
        let requested = i64::from(room_count);

        let mut pending: Vec<(String, i64)> = Vec::new();
        let mut store_counts: Vec<(String, i64)> = Vec::new();

        for segment in range.segments() {
            let key = segment_key(hotel_id, &segment);

            let booked = self.booked_rooms(hotel_id, &segment, &key).await?;
            if let Lookup::Filled(count) = booked {
                store_counts.push((key.clone(), count));
            }

            let capacity = self.capacity(hotel_id).await?;

            if !capacity.fits(booked.value(), requested) {
                info!(
                    segment = %segment,
                    booked = booked.value(),
                    requested,
                    total = capacity.total_rooms,
                    "Reservation rejected, not enough rooms"
                );
                // Counts read from the store are still accurate.
                for (key, count) in store_counts {
                    spawn_cache_fill(self.cache.clone(), key, encode_count(count));
                }
                return Ok(ReservationOutcome::rejected());
            }

            pending.push((key, booked.value() + requested));
        }

        // Every night fits; the pending counts supersede anything read above.
        for (key, count) in &pending {
            let item = CacheItem::new(key.clone(), encode_count(*count));
            if let Err(e) = self.cache.set(&item).await {
                warn!(key = %key, error = %e, "Failed to write pending count");
            }
        }

        for segment in range.segments() {
            let record =
                ReservationRecord::for_segment(hotel_id, customer_name, segment, room_count);
            self.store.insert_reservation(&record).await?;
        }

        info!(
            nights = range.nights(),
            rooms = room_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reservation committed"
        );
        Ok(ReservationOutcome::accepted(hotel_id))
    }

    /// Find the hotels that can take `room_count` more rooms on every night
    /// of `[in, out)`.
    ///
    /// Hotels are returned once each, in request order. A hotel with no
    /// capacity record counts as having no rooms.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidInput` for malformed input or an empty hotel list
    /// - `AppError::Database` if any store lookup fails
    #[instrument(skip(self), fields(hotels = hotel_ids.len()))]
    pub async fn check_availability(
        &self,
        hotel_ids: &[String],
        in_iso: &str,
        out_iso: &str,
        room_count: i32,
    ) -> AppResult<AvailabilityResult> {
        if hotel_ids.is_empty() {
            return Err(AppError::InvalidInput("hotel_ids must not be empty".into()));
        }
        for hotel_id in hotel_ids {
            validate_hotel_id(hotel_id)?;
        }
        validate_room_count(room_count)?;
        let range = DateRange::parse(in_iso, out_iso)?;
        let started = Instant::now();
        let requested = i64::from(room_count);

        let mut seen = HashSet::new();
        let hotels: Vec<String> = hotel_ids
            .iter()
            .filter(|h| seen.insert(h.as_str()))
            .cloned()
            .collect();

        let capacities = self.capacities(&hotels).await?;

        let mut plan: Vec<(String, String, DateSegment)> = Vec::new();
        for hotel in &hotels {
            for segment in range.segments() {
                plan.push((segment_key(hotel, &segment), hotel.clone(), segment));
            }
        }
        let keys: Vec<String> = plan.iter().map(|(key, _, _)| key.clone()).collect();

        let (cached, cache_ok) = match self.cache.get_multi(&keys).await {
            Ok(found) => (found, true),
            Err(e) => {
                warn!(error = %e, "Segment counts unavailable from cache, using store");
                (HashMap::new(), false)
            }
        };
        debug!(
            segments = keys.len(),
            hits = cached.len(),
            "Segment counts read from cache"
        );

        let mut fanin: FanIn<AppResult<(String, bool)>> = FanIn::new();
        for (key, hotel, segment) in plan {
            let capacity = capacities.get(&hotel).copied().unwrap_or(0);

            let hit = cached.get(&key).and_then(|v| decode_count(v));
            match hit {
                Some(booked) => fanin.spawn(async move {
                    Ok((hotel, rooms_fit(booked, requested, capacity)))
                }),
                None => {
                    let store = Arc::clone(&self.store);
                    let cache = self.cache.clone();
                    fanin.spawn(async move {
                        let records = store
                            .find_reservation_segments(&hotel, segment.in_date, segment.out_date)
                            .await?;
                        let booked = ReservationRecord::total_rooms(&records);
                        if cache_ok {
                            spawn_cache_fill(cache, key, encode_count(booked));
                        }
                        Ok::<_, AppError>((hotel, rooms_fit(booked, requested, capacity)))
                    });
                }
            }
        }

        let tasks = fanin.spawned();
        let mut available: HashMap<String, bool> =
            hotels.iter().map(|h| (h.clone(), true)).collect();
        let mut first_err = None;
        for result in fanin.finish().await? {
            match result {
                Ok((hotel, true)) => debug!(hotel_id = %hotel, "Segment fits"),
                Ok((hotel, false)) => {
                    available.insert(hotel, false);
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        let available_hotel_ids: Vec<String> = hotels
            .into_iter()
            .filter(|h| available.get(h).copied().unwrap_or(false))
            .collect();

        info!(
            tasks,
            available = available_hotel_ids.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Availability checked"
        );
        Ok(AvailabilityResult {
            available_hotel_ids,
        })
    }

    async fn booked_rooms(
        &self,
        hotel_id: &str,
        segment: &DateSegment,
        key: &str,
    ) -> AppResult<Lookup> {
        let cache_ok = match self.cache.get(key).await {
            Ok(Some(value)) => match decode_count(&value) {
                Some(count) => {
                    debug!(key, count, "Segment count cache hit");
                    return Ok(Lookup::Hit(count));
                }
                None => {
                    warn!(key, value = %value, "Unreadable segment count in cache");
                    true
                }
            },
            Ok(None) => {
                debug!(key, "Segment count cache miss");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Cache unavailable, reading segment from store");
                false
            }
        };

        let records = self
            .store
            .find_reservation_segments(hotel_id, segment.in_date, segment.out_date)
            .await?;
        let count = ReservationRecord::total_rooms(&records);

        Ok(if cache_ok {
            Lookup::Filled(count)
        } else {
            Lookup::Fallback(count)
        })
    }

    async fn capacity(&self, hotel_id: &str) -> AppResult<CapacityRecord> {
        let key = capacity_key(hotel_id);
        let cache_ok = match self.cache.get(&key).await {
            Ok(Some(value)) => match decode_count(&value).and_then(|v| i32::try_from(v).ok()) {
                Some(total) => return Ok(CapacityRecord::new(hotel_id, total)),
                None => {
                    warn!(key = %key, value = %value, "Unreadable capacity in cache");
                    true
                }
            },
            Ok(None) => {
                debug!(key = %key, "Capacity cache miss");
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache unavailable, reading capacity from store");
                false
            }
        };

        let record = self
            .store
            .find_capacity(hotel_id)
            .await?
            .ok_or_else(|| AppError::CapacityNotFound(hotel_id.to_string()))?;

        if cache_ok {
            spawn_cache_fill(
                self.cache.clone(),
                key,
                encode_count(i64::from(record.total_rooms)),
            );
        }
        Ok(record)
    }

    async fn capacities(&self, hotels: &[String]) -> AppResult<HashMap<String, i64>> {
        let keys: Vec<String> = hotels.iter().map(|h| capacity_key(h)).collect();
        let (cached, cache_ok) = match self.cache.get_multi(&keys).await {
            Ok(found) => (found, true),
            Err(e) => {
                warn!(error = %e, "Capacities unavailable from cache, using store");
                (HashMap::new(), false)
            }
        };

        let mut capacities = HashMap::with_capacity(hotels.len());
        let mut missing = Vec::new();
        for (hotel, key) in hotels.iter().zip(&keys) {
            match cached.get(key).and_then(|v| decode_count(v)) {
                Some(total) => {
                    capacities.insert(hotel.clone(), total);
                }
                None => missing.push(hotel.clone()),
            }
        }

        if !missing.is_empty() {
            debug!(missing = missing.len(), "Capacities read from store");
            for record in self.store.find_capacity_batch(&missing).await? {
                let total = i64::from(record.total_rooms);
                if cache_ok {
                    spawn_cache_fill(
                        self.cache.clone(),
                        capacity_key(&record.hotel_id),
                        encode_count(total),
                    );
                }
                capacities.insert(record.hotel_id, total);
            }
            for hotel in missing.iter().filter(|h| !capacities.contains_key(*h)) {
                warn!(hotel_id = %hotel, "No capacity record, treating as full");
            }
        }

        Ok(capacities)
    }
}

/// Write `value` under `key` in the background.
///
/// The outcome is only logged; callers never wait on it.
pub fn spawn_cache_fill(cache: ResilientCache, key: String, value: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let item = CacheItem::new(key, value);
        match cache.set(&item).await {
            Ok(()) => debug!(key = %item.key, "Cache repopulated"),
            Err(e) => warn!(key = %item.key, error = %e, "Cache repopulation failed"),
        }
    })
}

fn validate_hotel_id(hotel_id: &str) -> AppResult<()> {
    if hotel_id.trim().is_empty() {
        return Err(AppError::InvalidInput("hotel_id must not be empty".into()));
    }
    Ok(())
}

fn validate_room_count(room_count: i32) -> AppResult<()> {
    if room_count <= 0 {
        return Err(AppError::InvalidInput(format!(
            "room_count must be positive, got {}",
            room_count
        )));
    }
    Ok(())
}
