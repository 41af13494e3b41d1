//! FFI bindings for mobile platforms (iOS/Android).
//!
//! Exposes one tracking session object to Kotlin and Swift. The platform
//! location callback calls `on_fix` for every delivery; routes leave the
//! session as JSON for the app's persistence layer.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};

use crate::{
    init_logging, AreaRecord, GeoPoint, ProximityEvent, RangeConfig, RawFix, ShopRecord,
    ShopRegistry, TrackingSession,
};

/// Flattened [`crate::TrackingUpdate`] for the FFI boundary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrackingUpdate {
    pub position: GeoPoint,
    pub entered: Vec<ProximityEvent>,
    pub at_shop_id: Option<String>,
    /// Nearest first
    pub nearby_shop_ids: Vec<String>,
    pub path_appended: bool,
    pub stop_number: Option<u32>,
    pub stop_area_name: Option<String>,
}

/// A tracking session plus the shop snapshot it evaluates against.
#[derive(uniffi::Object)]
pub struct FfiTrackingSession {
    session: Mutex<TrackingSession>,
    registry: Mutex<ShopRegistry>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[uniffi::export]
impl FfiTrackingSession {
    #[uniffi::constructor]
    pub fn new(ranges: RangeConfig) -> Arc<Self> {
        init_logging();
        info!("[RouteTrackerRust] Session created");
        Arc::new(Self {
            session: Mutex::new(TrackingSession::with_ranges(ranges)),
            registry: Mutex::new(ShopRegistry::empty()),
        })
    }

    /// Replace the shop/area snapshot.
    pub fn set_registry(&self, shops: Vec<ShopRecord>, areas: Vec<AreaRecord>) {
        info!("[RouteTrackerRust] Registry updated ({} shops)", shops.len());
        *lock(&self.registry) = ShopRegistry::new(shops, areas);
    }

    pub fn set_ranges(&self, ranges: RangeConfig) {
        lock(&self.session).set_ranges(ranges);
    }

    pub fn ranges(&self) -> RangeConfig {
        lock(&self.session).ranges()
    }

    /// Start recording. Returns false if a route is already recording.
    pub fn start(&self, initial: GeoPoint, area_hint: String) -> bool {
        match lock(&self.session).start(initial, &area_hint) {
            Ok(()) => true,
            Err(e) => {
                warn!("[RouteTrackerRust] start failed: {}", e);
                false
            }
        }
    }

    /// Process one platform fix. Returns None for invalid fixes.
    pub fn on_fix(&self, fix: RawFix) -> Option<FfiTrackingUpdate> {
        let registry = lock(&self.registry);
        let update = lock(&self.session).on_fix(fix, &registry).ok()?;

        Some(FfiTrackingUpdate {
            position: update.position,
            entered: update.entered,
            at_shop_id: update.at_shop.map(|s| s.id),
            nearby_shop_ids: update.nearby_shops.into_iter().map(|n| n.shop.id).collect(),
            path_appended: update.path_appended,
            stop_number: update.stop.as_ref().map(|s| s.stop_number),
            stop_area_name: update.stop.map(|s| s.area_name),
        })
    }

    /// Finalize the active route and return it as JSON (None if idle).
    pub fn finalize_json(&self, day_label: String, custom_area_name: String) -> Option<String> {
        let route = lock(&self.session)
            .finalize(&day_label, &custom_area_name)
            .ok()?;
        match route.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("[RouteTrackerRust] Route serialization failed: {}", e);
                None
            }
        }
    }

    /// Discard the active route. Returns false if idle.
    pub fn discard(&self) -> bool {
        lock(&self.session).discard().is_ok()
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.session).is_recording()
    }

    /// Current path of the active route as flat [lat, lng, ...] coordinates.
    pub fn active_path_flat(&self) -> Vec<f64> {
        lock(&self.session)
            .active_route()
            .map(|route| route.path.iter().flat_map(|p| [p.lat, p.lng]).collect())
            .unwrap_or_default()
    }
}
