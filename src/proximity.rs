//! Shop proximity detection with enter/exit hysteresis.
//!
//! Two lookups serve the display layer:
//! - "at shop": the nearest shop within the detection radius
//! - "nearby shops": every shop within the nearby radius, nearest first
//!
//! Alerts are edge-triggered. A shop fires ENTER once when it comes closer
//! than [`ENTER_RADIUS_M`] and is re-armed only after a reading farther than
//! [`EXIT_RADIUS_M`]. Readings in between leave the alert state alone.

use std::collections::HashSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{ENTER_RADIUS_M, EXIT_RADIUS_M};
use crate::{GeoPoint, RangeConfig, ShopRecord, ShopRegistry};

/// Edge-triggered notification that a shop came within alerting range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct ProximityEvent {
    pub shop_id: String,
    pub shop_name: String,
    pub owner_name: String,
}

impl ProximityEvent {
    fn for_shop(shop: &ShopRecord) -> Self {
        Self {
            shop_id: shop.id.clone(),
            shop_name: shop.name.clone(),
            owner_name: shop.owner_name.clone(),
        }
    }
}

/// A shop inside the nearby radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyShop {
    pub shop: ShopRecord,
    /// Meters from the current position
    pub distance: f64,
}

/// Ids of shops currently inside the alert radius. Session scoped, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertedSet {
    ids: HashSet<String>,
}

impl AlertedSet {
    pub fn contains(&self, shop_id: &str) -> bool {
        self.ids.contains(shop_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Computes shop proximity for a stream of smoothed positions.
#[derive(Debug, Clone, Default)]
pub struct ProximityDetector {
    ranges: RangeConfig,
    alerted: AlertedSet,
}

impl ProximityDetector {
    pub fn new(ranges: RangeConfig) -> Self {
        Self {
            ranges,
            alerted: AlertedSet::default(),
        }
    }

    pub fn ranges(&self) -> RangeConfig {
        self.ranges
    }

    /// Replace the tunable radii; values are clamped into bounds.
    pub fn set_ranges(&mut self, ranges: RangeConfig) {
        self.ranges = ranges.clamped();
    }

    pub fn alerted(&self) -> &AlertedSet {
        &self.alerted
    }

    /// Start a fresh alert epoch for a new tracking session.
    pub fn reset_alerts(&mut self) {
        self.alerted.ids.clear();
    }

    /// The nearest shop within the detection radius; registry order breaks ties.
    pub fn at_shop<'a>(
        &self,
        location: &GeoPoint,
        registry: &'a ShopRegistry,
    ) -> Option<&'a ShopRecord> {
        registry
            .nearest_within(location, self.ranges.detection_radius)
            .map(|hit| hit.shop)
    }

    /// Every shop within the nearby radius, nearest first.
    pub fn nearby_shops(&self, location: &GeoPoint, registry: &ShopRegistry) -> Vec<NearbyShop> {
        registry
            .within_sorted(location, self.ranges.nearby_radius)
            .into_iter()
            .map(|hit| NearbyShop {
                shop: hit.shop.clone(),
                distance: hit.distance,
            })
            .collect()
    }

    /// Update alert state for `location` and return newly entered shops.
    ///
    /// Events come out in registry order. Leaving the exit radius re-arms a
    /// shop silently.
    pub fn evaluate(&mut self, location: &GeoPoint, registry: &ShopRegistry) -> Vec<ProximityEvent> {
        // Exit rule: only shops already alerted can be re-armed
        let rearmed: Vec<String> = self
            .alerted
            .iter()
            .filter(|id| {
                registry
                    .distance_to(id, location)
                    .is_some_and(|d| d > EXIT_RADIUS_M)
            })
            .map(str::to_string)
            .collect();
        for id in rearmed {
            debug!("[ProximityDetector] Re-armed alert for shop {}", id);
            self.alerted.ids.remove(&id);
        }

        // Enter rule (strictly closer than the enter radius)
        let mut events = Vec::new();
        for hit in registry.within(location, ENTER_RADIUS_M) {
            if hit.distance < ENTER_RADIUS_M && !self.alerted.contains(&hit.shop.id) {
                info!(
                    "[ProximityDetector] Entered {} ({:.0}m)",
                    hit.shop.name, hit.distance
                );
                self.alerted.ids.insert(hit.shop.id.clone());
                events.push(ProximityEvent::for_shop(hit.shop));
            }
        }
        events
    }
}
