//! # Route Recorder
//!
//! Turns a stream of smoothed positions into a recorded path plus inferred
//! stops, without any per-step user action.
//!
//! ## States
//!
//! ```text
//!            start()                finalize() / discard()
//!   Idle ─────────────▶ Recording ─────────────────────────▶ Idle
//! ```
//!
//! ## Per-update rules (Recording only)
//!
//! 1. **Path sampling**: a position at least [`PATH_MIN_SPACING_M`] from the
//!    last path point is appended. Smaller moves are GPS jitter and dropped.
//! 2. **Stop detection**: a position within [`DWELL_RADIUS_M`] of the dwell
//!    anchor increments the dwell counter; reaching exactly
//!    [`DWELL_SAMPLES`] emits one [`StopPoint`]. Any farther position resets
//!    the counter and moves the anchor there.
//!
//! The counter is not reset after a stop is emitted, so a long stay yields a
//! single stop. A second stop needs a move beyond the dwell radius first.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{
    AREA_LOOKUP_RADIUS_M, DWELL_RADIUS_M, DWELL_SAMPLES, FIELD_POINT_LABEL, PATH_MIN_SPACING_M,
};
use crate::geo_utils::{haversine_distance, path_length};
use crate::{GeoPoint, OptionExt, Result, ShopRegistry, TrackerError};

static ROUTE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_route_id(now: &DateTime<Utc>) -> String {
    let seq = ROUTE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("route-{}-{}", now.timestamp_millis(), seq)
}

// ============================================================================
// Types
// ============================================================================

/// A stop inferred from dwell behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPoint {
    pub location: GeoPoint,
    pub area_name: String,
    /// 1-based, no gaps
    pub stop_number: u32,
    pub timestamp: DateTime<Utc>,
}

/// A recorded route. Handed to the persistence layer on finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub date: NaiveDate,
    pub area_id: String,
    /// Time ordered, append-only while recording
    pub path: Vec<GeoPoint>,
    pub stops: Vec<StopPoint>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_archived: bool,
    /// Day label chosen at finalize, e.g. "Saturday"
    pub day_label: Option<String>,
    /// User-facing area/trip name chosen at finalize
    pub custom_area_name: Option<String>,
}

impl Route {
    fn begin(initial: GeoPoint, area_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: next_route_id(&now),
            date: now.date_naive(),
            area_id: area_id.to_string(),
            path: vec![initial],
            stops: Vec::new(),
            start_time: now,
            end_time: None,
            is_archived: false,
            day_label: None,
            custom_area_name: None,
        }
    }

    /// Length of the recorded path in meters.
    pub fn total_distance_m(&self) -> f64 {
        path_length(&self.path)
    }

    /// Elapsed time between start and end; `None` while still recording.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Recorder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    Idle,
    Recording,
}

/// What one location update did to the active route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOutcome {
    pub path_appended: bool,
    pub stop: Option<StopPoint>,
}

/// Recorder statistics for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderStats {
    pub state: RecorderState,
    pub path_len: usize,
    pub stop_count: usize,
    pub dwell_counter: u32,
    pub distance_m: f64,
}

#[derive(Debug, Clone)]
struct ActiveRecording {
    route: Route,
    dwell_counter: u32,
    dwell_anchor: GeoPoint,
}

// ============================================================================
// Route Recorder
// ============================================================================

/// Idle/Recording state machine for a single device.
#[derive(Debug, Clone, Default)]
pub struct RouteRecorder {
    active: Option<ActiveRecording>,
}

impl RouteRecorder {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn state(&self) -> RecorderState {
        if self.active.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// The in-progress route, if recording.
    pub fn active_route(&self) -> Option<&Route> {
        self.active.as_ref().map(|a| &a.route)
    }

    pub fn dwell_counter(&self) -> u32 {
        self.active.as_ref().map_or(0, |a| a.dwell_counter)
    }

    pub fn dwell_anchor(&self) -> Option<GeoPoint> {
        self.active.as_ref().map(|a| a.dwell_anchor)
    }

    /// Begin recording a new route seeded with `initial`.
    ///
    /// Rejected with [`TrackerError::RecordingConflict`] while already
    /// recording; the active route is left untouched.
    pub fn start(&mut self, initial: GeoPoint, area_hint: &str) -> Result<&Route> {
        if let Some(active) = &self.active {
            warn!(
                "[RouteRecorder] start() ignored, route {} is already recording",
                active.route.id
            );
            return Err(TrackerError::RecordingConflict {
                route_id: active.route.id.clone(),
            });
        }

        let route = Route::begin(initial, area_hint, Utc::now());
        info!(
            "[RouteRecorder] Started route {} in area '{}'",
            route.id, area_hint
        );

        let active = self.active.insert(ActiveRecording {
            route,
            dwell_counter: 0,
            dwell_anchor: initial,
        });
        Ok(&active.route)
    }

    /// Feed one smoothed position. No-op unless recording.
    pub fn on_location_update(
        &mut self,
        location: GeoPoint,
        registry: &ShopRegistry,
    ) -> RecordOutcome {
        let Some(active) = self.active.as_mut() else {
            return RecordOutcome::default();
        };
        let mut outcome = RecordOutcome::default();

        // Path sampling
        let far_enough = active
            .route
            .path
            .last()
            .map_or(true, |last| haversine_distance(&location, last) >= PATH_MIN_SPACING_M);
        if far_enough {
            active.route.path.push(location);
            outcome.path_appended = true;
            debug!(
                "[RouteRecorder] Path point {} accepted",
                active.route.path.len()
            );
        }

        // Stop detection
        if haversine_distance(&location, &active.dwell_anchor) < DWELL_RADIUS_M {
            active.dwell_counter = active.dwell_counter.saturating_add(1);
            debug!("[RouteRecorder] Dwell counter {}", active.dwell_counter);

            if active.dwell_counter == DWELL_SAMPLES {
                let stop = StopPoint {
                    location,
                    area_name: resolve_area_name(&location, registry),
                    stop_number: active.route.stops.len() as u32 + 1,
                    timestamp: Utc::now(),
                };
                info!(
                    "[RouteRecorder] Stop #{} at {}",
                    stop.stop_number, stop.area_name
                );
                active.route.stops.push(stop.clone());
                outcome.stop = Some(stop);
            }
        } else {
            active.dwell_counter = 0;
            active.dwell_anchor = location;
        }

        outcome
    }

    /// Close the active route with user-supplied labels and return it.
    pub fn finalize(&mut self, day_label: &str, custom_area_name: &str) -> Result<Route> {
        let mut route = self.active.take().ok_or_not_recording()?.route;
        route.end_time = Some(Utc::now());
        route.day_label = Some(day_label.to_string());
        route.custom_area_name = Some(custom_area_name.to_string());
        route.is_archived = false;

        info!(
            "[RouteRecorder] Finalized route {} ({} points, {} stops, {:.0}m)",
            route.id,
            route.path.len(),
            route.stops.len(),
            route.total_distance_m()
        );
        Ok(route)
    }

    /// Drop the active route without returning it.
    pub fn discard(&mut self) -> Result<()> {
        let active = self.active.take().ok_or_not_recording()?;
        info!("[RouteRecorder] Discarded route {}", active.route.id);
        Ok(())
    }

    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            state: self.state(),
            path_len: self.active_route().map_or(0, |r| r.path.len()),
            stop_count: self.active_route().map_or(0, |r| r.stops.len()),
            dwell_counter: self.dwell_counter(),
            distance_m: self.active_route().map_or(0.0, Route::total_distance_m),
        }
    }
}

/// Area name of the nearest shop within the lookup radius, or the field label.
fn resolve_area_name(location: &GeoPoint, registry: &ShopRegistry) -> String {
    registry
        .nearest_within(location, AREA_LOOKUP_RADIUS_M)
        .and_then(|hit| registry.area_name(&hit.shop.area_id))
        .unwrap_or(FIELD_POINT_LABEL)
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::offset_meters;
    use crate::{AreaRecord, ShopRecord};

    fn origin() -> GeoPoint {
        GeoPoint::new(23.8103, 90.4125)
    }

    fn recording() -> RouteRecorder {
        let mut recorder = RouteRecorder::new();
        recorder.start(origin(), "area-1").unwrap();
        recorder
    }

    #[test]
    fn test_start_seeds_path() {
        let recorder = recording();
        let route = recorder.active_route().unwrap();
        assert_eq!(route.path, vec![origin()]);
        assert!(route.stops.is_empty());
        assert_eq!(route.area_id, "area-1");
        assert!(route.end_time.is_none());
        assert_eq!(recorder.dwell_counter(), 0);
        assert_eq!(recorder.dwell_anchor(), Some(origin()));
    }

    #[test]
    fn test_start_while_recording_is_rejected() {
        let mut recorder = recording();
        let id = recorder.active_route().unwrap().id.clone();

        let err = recorder.start(offset_meters(&origin(), 500.0, 0.0), "area-2");
        assert_eq!(err.unwrap_err(), TrackerError::RecordingConflict { route_id: id.clone() });

        let route = recorder.active_route().unwrap();
        assert_eq!(route.id, id);
        assert_eq!(route.area_id, "area-1");
    }

    #[test]
    fn test_updates_ignored_when_idle() {
        let mut recorder = RouteRecorder::new();
        let outcome = recorder.on_location_update(origin(), &ShopRegistry::empty());
        assert_eq!(outcome, RecordOutcome::default());
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn test_jitter_does_not_grow_path() {
        let mut recorder = recording();
        let registry = ShopRegistry::empty();
        for (n, e) in [(1.0, 0.5), (-1.5, 0.0), (0.5, 1.8), (2.0, -1.0), (-0.5, -2.0)] {
            let outcome = recorder.on_location_update(offset_meters(&origin(), n, e), &registry);
            assert!(!outcome.path_appended);
        }
        assert_eq!(recorder.active_route().unwrap().path.len(), 1);
    }

    #[test]
    fn test_path_spacing_is_measured_from_last_point() {
        let mut recorder = recording();
        let registry = ShopRegistry::empty();

        assert!(recorder.on_location_update(offset_meters(&origin(), 5.0, 0.0), &registry).path_appended);
        // 2m beyond the last accepted point, 7m from the start
        assert!(!recorder.on_location_update(offset_meters(&origin(), 7.0, 0.0), &registry).path_appended);
        assert!(recorder.on_location_update(offset_meters(&origin(), 8.5, 0.0), &registry).path_appended);
        assert_eq!(recorder.active_route().unwrap().path.len(), 3);
    }

    #[test]
    fn test_path_spacing_edge() {
        let registry = ShopRegistry::empty();

        let mut recorder = recording();
        assert!(!recorder.on_location_update(offset_meters(&origin(), 2.9, 0.0), &registry).path_appended);

        let mut recorder = recording();
        assert!(recorder.on_location_update(offset_meters(&origin(), 3.1, 0.0), &registry).path_appended);
    }

    #[test]
    fn test_dwell_radius_edge() {
        let registry = ShopRegistry::empty();
        let mut recorder = recording();

        recorder.on_location_update(offset_meters(&origin(), 14.9, 0.0), &registry);
        assert_eq!(recorder.dwell_counter(), 1);
        assert_eq!(recorder.dwell_anchor(), Some(origin()));

        let outside = offset_meters(&origin(), -15.1, 0.0);
        recorder.on_location_update(outside, &registry);
        assert_eq!(recorder.dwell_counter(), 0);
        assert_eq!(recorder.dwell_anchor(), Some(outside));
    }

    #[test]
    fn test_three_dwell_samples_emit_one_stop() {
        let mut recorder = recording();
        let registry = ShopRegistry::empty();

        let mut stops = Vec::new();
        for i in 0..4 {
            let p = offset_meters(&origin(), i as f64, 0.0);
            if let Some(stop) = recorder.on_location_update(p, &registry).stop {
                stops.push(stop);
            }
        }

        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].stop_number, 1);
        assert_eq!(stops[0].area_name, FIELD_POINT_LABEL);
        assert_eq!(recorder.active_route().unwrap().stops.len(), 1);
        assert_eq!(recorder.dwell_counter(), 4);
    }

    #[test]
    fn test_move_away_resets_dwell_and_allows_second_stop() {
        let mut recorder = recording();
        let registry = ShopRegistry::empty();

        for _ in 0..3 {
            recorder.on_location_update(origin(), &registry);
        }
        let elsewhere = offset_meters(&origin(), 200.0, 0.0);
        recorder.on_location_update(elsewhere, &registry);
        assert_eq!(recorder.dwell_counter(), 0);
        assert_eq!(recorder.dwell_anchor(), Some(elsewhere));

        let mut second = None;
        for _ in 0..3 {
            second = recorder.on_location_update(elsewhere, &registry).stop.or(second);
        }
        let second = second.unwrap();
        assert_eq!(second.stop_number, 2);

        let numbers: Vec<u32> = recorder
            .active_route()
            .unwrap()
            .stops
            .iter()
            .map(|s| s.stop_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_stop_area_from_nearest_shop() {
        let registry = ShopRegistry::new(
            vec![
                ShopRecord::new("s1", "Far", "O", offset_meters(&origin(), 90.0, 0.0), "area-far"),
                ShopRecord::new("s2", "Near", "O", offset_meters(&origin(), 40.0, 0.0), "area-near"),
            ],
            vec![
                AreaRecord::new("area-far", "Banani"),
                AreaRecord::new("area-near", "Uttara"),
            ],
        );
        let mut recorder = recording();
        let mut stop = None;
        for _ in 0..3 {
            stop = recorder.on_location_update(origin(), &registry).stop.or(stop);
        }
        assert_eq!(stop.unwrap().area_name, "Uttara");
    }

    #[test]
    fn test_stop_area_ignores_shops_beyond_lookup_radius() {
        let registry = ShopRegistry::new(
            vec![ShopRecord::new("s1", "Far", "O", offset_meters(&origin(), 130.0, 0.0), "area-1")],
            vec![AreaRecord::new("area-1", "Banani")],
        );
        let mut recorder = recording();
        let mut stop = None;
        for _ in 0..3 {
            stop = recorder.on_location_update(origin(), &registry).stop.or(stop);
        }
        assert_eq!(stop.unwrap().area_name, FIELD_POINT_LABEL);
    }

    #[test]
    fn test_finalize_returns_labelled_route() {
        let mut recorder = recording();
        recorder.on_location_update(offset_meters(&origin(), 10.0, 0.0), &ShopRegistry::empty());

        let route = recorder.finalize("Saturday", "Uttara Trip").unwrap();
        assert!(route.end_time.is_some());
        assert!(!route.is_archived);
        assert_eq!(route.day_label.as_deref(), Some("Saturday"));
        assert_eq!(route.custom_area_name.as_deref(), Some("Uttara Trip"));
        assert!(route.duration().unwrap() >= chrono::Duration::zero());
        assert!((route.total_distance_m() - 10.0).abs() < 0.5);
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn test_finalize_and_discard_require_recording() {
        let mut recorder = RouteRecorder::new();
        assert_eq!(recorder.finalize("Sunday", "x"), Err(TrackerError::NotRecording));
        assert_eq!(recorder.discard(), Err(TrackerError::NotRecording));
    }

    #[test]
    fn test_discard_returns_to_idle() {
        let mut recorder = recording();
        recorder.discard().unwrap();
        assert!(!recorder.is_recording());
        assert!(recorder.active_route().is_none());
        assert!(recorder.start(origin(), "area-1").is_ok());
    }

    #[test]
    fn test_route_ids_are_unique() {
        let mut recorder = RouteRecorder::new();
        let first = recorder.start(origin(), "a").unwrap().id.clone();
        recorder.discard().unwrap();
        let second = recorder.start(origin(), "a").unwrap().id.clone();
        assert_ne!(first, second);
    }

    #[test]
    fn test_route_json_round_trip() {
        let mut recorder = recording();
        for _ in 0..3 {
            recorder.on_location_update(origin(), &ShopRegistry::empty());
        }
        let route = recorder.finalize("Monday", "Mirpur").unwrap();

        let json = route.to_json().unwrap();
        assert!(json.contains("\"isArchived\":false"));
        assert!(json.contains("\"stopNumber\":1"));

        let parsed = Route::from_json(&json).unwrap();
        assert_eq!(parsed.id, route.id);
        assert_eq!(parsed.stops.len(), 1);
        assert_eq!(parsed.end_time, route.end_time);
        assert_eq!(parsed.day_label.as_deref(), Some("Monday"));
    }

    #[test]
    fn test_stats() {
        let mut recorder = recording();
        recorder.on_location_update(origin(), &ShopRegistry::empty());
        let stats = recorder.stats();
        assert_eq!(stats.state, RecorderState::Recording);
        assert_eq!(stats.path_len, 1);
        assert_eq!(stats.stop_count, 0);
        assert_eq!(stats.dwell_counter, 1);
    }
}
