//! # Tracking Session
//!
//! Owns all per-session tracking state and runs every incoming fix through
//! the pipeline in strict order:
//!
//! ```text
//! RawFix ─▶ PositionFilter ─▶ ProximityDetector ─▶ RouteRecorder (if recording)
//! ```
//!
//! A session is an explicit owned object, not a global. The host keeps exactly
//! one per device and feeds it one fix at a time; `&mut self` on every mutating
//! call means a second concurrent delivery cannot compile.

use log::{info, warn};

use crate::proximity::NearbyShop;
use crate::recorder::RecordOutcome;
use crate::{
    GeoPoint, OptionExt, PositionFilter, ProximityDetector, ProximityEvent, RangeConfig, RawFix,
    RecorderStats, Result, Route, RouteRecorder, ShopRecord, ShopRegistry, StopPoint,
    TrackerConfig, TrackerError,
};

/// How to end an active recording when tracking stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopAction {
    /// Keep the route, labelled for the persistence layer
    Finalize {
        day_label: String,
        custom_area_name: String,
    },
    /// Drop the route, nothing is persisted
    Discard,
}

/// Everything one fix produced, for the display layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingUpdate {
    /// Smoothed position
    pub position: GeoPoint,
    /// Shops that newly came within alerting range
    pub entered: Vec<ProximityEvent>,
    pub at_shop: Option<ShopRecord>,
    pub nearby_shops: Vec<NearbyShop>,
    /// Whether the recorder appended this position to the path
    pub path_appended: bool,
    /// Stop emitted by this fix, if any
    pub stop: Option<StopPoint>,
}

/// The single active tracking session of a device.
#[derive(Debug, Clone, Default)]
pub struct TrackingSession {
    filter: PositionFilter,
    detector: ProximityDetector,
    recorder: RouteRecorder,
    last_position: Option<GeoPoint>,
}

impl TrackingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranges(ranges: RangeConfig) -> Self {
        Self {
            detector: ProximityDetector::new(ranges.clamped()),
            ..Self::default()
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::with_ranges(config.ranges)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start recording a route from `initial` (current or last-known location).
    ///
    /// Resets the position filter and the alert set so nothing from a
    /// previous session biases this one.
    pub fn start(&mut self, initial: GeoPoint, area_hint: &str) -> Result<()> {
        if !initial.is_valid() {
            return Err(TrackerError::InvalidFix {
                message: format!("start location ({}, {}) is out of range", initial.lat, initial.lng),
            });
        }

        self.recorder.start(initial, area_hint)?;
        self.filter.reset();
        self.detector.reset_alerts();
        self.last_position = Some(initial);

        info!("[TrackingSession] Tracking started");
        Ok(())
    }

    /// Start recording from the last smoothed (or seeded) position.
    ///
    /// Fails with [`TrackerError::PositionUnavailable`] before any fix has
    /// been seen.
    pub fn start_at_last_position(&mut self, area_hint: &str) -> Result<()> {
        let initial = self
            .last_position
            .ok_or_unavailable("no position has been received yet")?;
        self.start(initial, area_hint)
    }

    /// Finish the active recording and return the route to persist.
    pub fn finalize(&mut self, day_label: &str, custom_area_name: &str) -> Result<Route> {
        self.recorder.finalize(day_label, custom_area_name)
    }

    /// Drop the active recording.
    pub fn discard(&mut self) -> Result<()> {
        self.recorder.discard()
    }

    /// End the active recording per `action`.
    ///
    /// The caller must already have unsubscribed from the position source;
    /// see `source::stop_tracking` for the combined operation.
    pub fn stop(&mut self, action: StopAction) -> Result<Option<Route>> {
        match action {
            StopAction::Finalize {
                day_label,
                custom_area_name,
            } => self.finalize(&day_label, &custom_area_name).map(Some),
            StopAction::Discard => self.discard().map(|_| None),
        }
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Run one raw fix through filter, proximity detector and recorder.
    ///
    /// Fixes with non-finite or out-of-range values are rejected without
    /// touching any state.
    pub fn on_fix(&mut self, fix: RawFix, registry: &ShopRegistry) -> Result<TrackingUpdate> {
        if !fix.point().is_valid() {
            warn!(
                "[TrackingSession] Dropping invalid fix ({}, {})",
                fix.lat, fix.lng
            );
            return Err(TrackerError::InvalidFix {
                message: format!("coordinates ({}, {}) are out of range", fix.lat, fix.lng),
            });
        }

        let position = self
            .filter
            .update(fix.lat, fix.lng, fix.accuracy_meters)
            .with_motion(fix.heading_degrees, fix.speed_meters_per_second);
        self.last_position = Some(position);

        let entered = self.detector.evaluate(&position, registry);
        let at_shop = self.detector.at_shop(&position, registry).cloned();
        let nearby_shops = self.detector.nearby_shops(&position, registry);

        let RecordOutcome {
            path_appended,
            stop,
        } = self.recorder.on_location_update(position, registry);

        Ok(TrackingUpdate {
            position,
            entered,
            at_shop,
            nearby_shops,
            path_appended,
            stop,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn active_route(&self) -> Option<&Route> {
        self.recorder.active_route()
    }

    /// Last smoothed (or seeded) position.
    pub fn last_position(&self) -> Option<GeoPoint> {
        self.last_position
    }

    pub fn ranges(&self) -> RangeConfig {
        self.detector.ranges()
    }

    pub fn set_ranges(&mut self, ranges: RangeConfig) {
        self.detector.set_ranges(ranges);
    }

    pub fn detector(&self) -> &ProximityDetector {
        &self.detector
    }

    pub fn filter(&self) -> &PositionFilter {
        &self.filter
    }

    pub fn stats(&self) -> RecorderStats {
        self.recorder.stats()
    }
}
