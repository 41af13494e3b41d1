//! Tracker configuration.
//!
//! Two user-tunable radii live in [`RangeConfig`] and are clamped rather than
//! rejected. Everything else the detector and recorder compare against is a
//! fixed constant.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GeoPoint, Result, TrackerError};

// Proximity alert hysteresis (meters)
pub const ENTER_RADIUS_M: f64 = 40.0;
pub const EXIT_RADIUS_M: f64 = 100.0;

// Route recording (meters / samples)
pub const PATH_MIN_SPACING_M: f64 = 3.0;
pub const DWELL_RADIUS_M: f64 = 15.0;
pub const DWELL_SAMPLES: u32 = 3;
pub const AREA_LOOKUP_RADIUS_M: f64 = 100.0;

/// Label for stops that are not near any registered shop.
pub const FIELD_POINT_LABEL: &str = "Field Point";

// Kalman filter
pub const PROCESS_NOISE: f64 = 1e-6;
/// Accuracy floor so a reported accuracy of 0 never zeroes the measurement variance
pub const MIN_ACCURACY_M: f64 = 0.1;

pub const DETECTION_RADIUS_BOUNDS: (f64, f64) = (1.0, 50.0);
pub const NEARBY_RADIUS_BOUNDS: (f64, f64) = (10.0, 500.0);
const FIX_TIMEOUT_BOUNDS_MS: (u64, u64) = (1_000, 30_000);

fn clamp_radius(value: f64, bounds: (f64, f64)) -> f64 {
    if value.is_nan() {
        return bounds.0;
    }
    value.clamp(bounds.0, bounds.1)
}

/// User-tunable radii consumed by the proximity detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase", default)]
pub struct RangeConfig {
    /// "At shop" radius in meters. Bounds [1, 50], default 1.
    pub detection_radius: f64,
    /// "Nearby shops" radius in meters. Bounds [10, 500], default 20.
    pub nearby_radius: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            detection_radius: 1.0,
            nearby_radius: 20.0,
        }
    }
}

impl RangeConfig {
    /// Build a config, clamping both radii into their bounds.
    pub fn new(detection_radius: f64, nearby_radius: f64) -> Self {
        let mut config = Self::default();
        config.set_detection_radius(detection_radius);
        config.set_nearby_radius(nearby_radius);
        config
    }

    /// Strict constructor: non-finite input is an error, finite input is clamped.
    pub fn validated(detection_radius: f64, nearby_radius: f64) -> Result<Self> {
        if !detection_radius.is_finite() || !nearby_radius.is_finite() {
            return Err(TrackerError::InvalidConfiguration {
                message: format!(
                    "radii must be finite (detection={}, nearby={})",
                    detection_radius, nearby_radius
                ),
            });
        }
        Ok(Self::new(detection_radius, nearby_radius))
    }

    pub fn set_detection_radius(&mut self, meters: f64) {
        self.detection_radius = clamp_radius(meters, DETECTION_RADIUS_BOUNDS);
    }

    pub fn set_nearby_radius(&mut self, meters: f64) {
        self.nearby_radius = clamp_radius(meters, NEARBY_RADIUS_BOUNDS);
    }

    /// Copy with both radii forced into bounds (used after deserialization).
    pub fn clamped(self) -> Self {
        Self::new(self.detection_radius, self.nearby_radius)
    }
}

/// Options passed to the position source subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase", default)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    /// 0 rejects cached fixes
    pub max_age_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 10_000,
            max_age_ms: 0,
        }
    }
}

/// Complete tracker configuration, persisted by the host as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    pub ranges: RangeConfig,
    /// Used when no fix can be obtained at all (Dhaka city center by default)
    pub fallback_location: GeoPoint,
    /// Bound for single-shot fix requests
    pub fix_timeout_ms: u64,
    pub watch: WatchOptions,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ranges: RangeConfig::default(),
            fallback_location: GeoPoint::new(23.8103, 90.4125),
            fix_timeout_ms: 8_000,
            watch: WatchOptions::default(),
        }
    }
}

impl TrackerConfig {
    /// Parse a config from JSON, clamping out-of-range values.
    ///
    /// Missing fields take their defaults. A fallback location that is not a
    /// valid coordinate is rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: TrackerConfig =
            serde_json::from_str(json).map_err(|e| TrackerError::InvalidConfiguration {
                message: e.to_string(),
            })?;

        if !parsed.fallback_location.is_valid() {
            return Err(TrackerError::InvalidConfiguration {
                message: format!(
                    "fallback location ({}, {}) is not a valid coordinate",
                    parsed.fallback_location.lat, parsed.fallback_location.lng
                ),
            });
        }

        Ok(Self {
            ranges: parsed.ranges.clamped(),
            fix_timeout_ms: parsed
                .fix_timeout_ms
                .clamp(FIX_TIMEOUT_BOUNDS_MS.0, FIX_TIMEOUT_BOUNDS_MS.1),
            ..parsed
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Bound for single-shot fix requests, clamped into [1 s, 30 s].
    pub fn fix_timeout(&self) -> Duration {
        Duration::from_millis(
            self.fix_timeout_ms
                .clamp(FIX_TIMEOUT_BOUNDS_MS.0, FIX_TIMEOUT_BOUNDS_MS.1),
        )
    }
}
