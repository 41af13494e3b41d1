//! # Route Tracker
//!
//! Real-time location tracking and route recording for field sales agents.
//!
//! This library provides:
//! - GPS jitter reduction with a scalar Kalman filter
//! - Shop proximity detection with enter/exit hysteresis
//! - Autonomous route recording with dwell-based stop inference
//!
//! ## Features
//!
//! - **`runtime`** (default) - Position source subscription and timeout-bounded fixes (tokio)
//! - **`http`** - Enable HTTP client for the external routing service
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_tracker::{GeoPoint, RawFix, ShopRecord, ShopRegistry, TrackingSession};
//!
//! let shops = vec![ShopRecord::new(
//!     "shop-1",
//!     "Rahman Store",
//!     "Abdur Rahman",
//!     GeoPoint::new(23.8106, 90.4125),
//!     "area-1",
//! )];
//! let registry = ShopRegistry::new(shops, Vec::new());
//!
//! let mut session = TrackingSession::new();
//! session.start(GeoPoint::new(23.8103, 90.4125), "area-1").unwrap();
//!
//! let update = session
//!     .on_fix(RawFix::new(23.8104, 90.4125, 5.0), &registry)
//!     .unwrap();
//! for event in &update.entered {
//!     println!("Arrived near {} ({})", event.shop_name, event.owner_name);
//! }
//!
//! let route = session.finalize("Saturday", "Uttara Trip").unwrap();
//! assert!(route.end_time.is_some());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackerError};

// Geographic utilities (distance, degree conversion, path length)
pub mod geo_utils;

// Validated radii and fixed thresholds
pub mod config;
pub use config::{RangeConfig, TrackerConfig, WatchOptions};

// Kalman smoothing of raw fixes
pub mod filter;
pub use filter::{FilterState, PositionFilter};

// Read-only shop/area snapshot with spatial index
pub mod registry;
pub use registry::{ShopHit, ShopRegistry};

// Shop proximity and alert hysteresis
pub mod proximity;
pub use proximity::{AlertedSet, NearbyShop, ProximityDetector, ProximityEvent};

// Route recording state machine
pub mod recorder;
pub use recorder::{RecordOutcome, RecorderState, RecorderStats, Route, RouteRecorder, StopPoint};

// Per-session pipeline (filter -> proximity -> recorder)
pub mod session;
pub use session::{StopAction, TrackingSession, TrackingUpdate};

// Turn-by-turn data supplied by an external routing service
pub mod navigation;
pub use navigation::{parse_osrm_steps, ManeuverStep};

// Position source subscription (async boundary)
#[cfg(feature = "runtime")]
pub mod source;
#[cfg(feature = "runtime")]
pub use source::{
    current_fix_or_fallback, current_fix_with_config, drive, request_fix, stop_tracking,
    subscribe, subscribe_with_config, PositionFeed, Subscription,
};

// HTTP client for the routing service
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{RoutingClient, TravelProfile};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RouteTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with optional heading and speed.
///
/// # Example
/// ```
/// use route_tracker::GeoPoint;
/// let point = GeoPoint::new(23.8103, 90.4125); // Dhaka
/// assert!(point.heading.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    /// Degrees clockwise from true north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Meters per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl GeoPoint {
    /// Create a new point without motion data.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            heading: None,
            speed: None,
        }
    }

    /// Attach heading and speed reported by the position source.
    pub fn with_motion(self, heading: Option<f64>, speed: Option<f64>) -> Self {
        Self {
            heading,
            speed,
            ..self
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }
}

/// A raw fix as delivered by the platform position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct RawFix {
    pub lat: f64,
    pub lng: f64,
    /// Reported horizontal accuracy (1 sigma) in meters
    pub accuracy_meters: f64,
    #[serde(default)]
    pub heading_degrees: Option<f64>,
    #[serde(default)]
    pub speed_meters_per_second: Option<f64>,
}

impl RawFix {
    /// Create a fix without heading/speed.
    pub fn new(lat: f64, lng: f64, accuracy_meters: f64) -> Self {
        Self {
            lat,
            lng,
            accuracy_meters,
            heading_degrees: None,
            speed_meters_per_second: None,
        }
    }

    /// The raw position, ignoring accuracy.
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
            .with_motion(self.heading_degrees, self.speed_meters_per_second)
    }
}

/// A registered shop. Read-only to the tracking core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct ShopRecord {
    pub id: String,
    pub name: String,
    pub owner_name: String,
    pub location: GeoPoint,
    pub area_id: String,
}

impl ShopRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_name: impl Into<String>,
        location: GeoPoint,
        area_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_name: owner_name.into(),
            location,
            area_id: area_id.into(),
        }
    }
}

/// A named sales area that shops belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct AreaRecord {
    pub id: String,
    pub name: String,
}

impl AreaRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
