//! Read-only shop and area snapshot.
//!
//! Shops are indexed in an R-tree so radius queries only compute haversine
//! distances for shops inside a bounding envelope that always encloses the
//! query circle (split at the antimeridian, widened to every longitude near a
//! pole). Results are
//! always reported in registry order (or sorted by distance with registry
//! order breaking ties), so they match a plain linear scan exactly.

use std::collections::HashMap;

use log::warn;
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::{haversine_distance, search_half_widths};
use crate::{AreaRecord, GeoPoint, ShopRecord};

/// Position of a shop in the spatial index, pointing back into registry order.
#[derive(Debug, Clone)]
struct ShopLocation {
    index: usize,
    position: [f64; 2], // [lng, lat]
}

impl RTreeObject for ShopLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// A shop matched by a radius query, with its distance in meters.
#[derive(Debug, Clone, Copy)]
pub struct ShopHit<'a> {
    pub index: usize,
    pub shop: &'a ShopRecord,
    pub distance: f64,
}

/// Immutable shop/area snapshot supplied to the tracking core.
#[derive(Debug, Clone)]
pub struct ShopRegistry {
    shops: Vec<ShopRecord>,
    area_names: HashMap<String, String>,
    by_id: HashMap<String, usize>,
    spatial_index: RTree<ShopLocation>,
}

impl ShopRegistry {
    /// Build a registry from shop and area records.
    ///
    /// Duplicate shop ids are a caller error; they are kept (registry order is
    /// preserved) but only the first is reachable by id.
    pub fn new(shops: Vec<ShopRecord>, areas: Vec<AreaRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(shops.len());
        for (index, shop) in shops.iter().enumerate() {
            if by_id.contains_key(&shop.id) {
                warn!("[ShopRegistry] Duplicate shop id '{}'", shop.id);
                continue;
            }
            by_id.insert(shop.id.clone(), index);
        }

        let locations: Vec<ShopLocation> = shops
            .iter()
            .enumerate()
            .filter(|(_, shop)| shop.location.is_valid())
            .map(|(index, shop)| ShopLocation {
                index,
                position: [shop.location.lng, shop.location.lat],
            })
            .collect();

        let area_names = areas.into_iter().map(|a| (a.id, a.name)).collect();

        Self {
            shops,
            area_names,
            by_id,
            spatial_index: RTree::bulk_load(locations),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.shops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shops.is_empty()
    }

    /// Shops in registry order.
    pub fn shops(&self) -> &[ShopRecord] {
        &self.shops
    }

    pub fn get(&self, shop_id: &str) -> Option<&ShopRecord> {
        self.by_id.get(shop_id).map(|&i| &self.shops[i])
    }

    pub fn area_name(&self, area_id: &str) -> Option<&str> {
        self.area_names.get(area_id).map(String::as_str)
    }

    /// Distance in meters from `point` to the shop with `shop_id`.
    pub fn distance_to(&self, shop_id: &str, point: &GeoPoint) -> Option<f64> {
        self.get(shop_id)
            .map(|shop| haversine_distance(&shop.location, point))
    }

    /// All shops with distance ≤ `radius` meters, in registry order.
    pub fn within(&self, point: &GeoPoint, radius: f64) -> Vec<ShopHit<'_>> {
        if self.shops.is_empty() || !point.is_valid() || radius < 0.0 {
            return Vec::new();
        }

        let (dlat, dlng) = search_half_widths(radius, point.lat);
        let min_lat = (point.lat - dlat).max(-90.0);
        let max_lat = (point.lat + dlat).min(90.0);

        let mut hits: Vec<ShopHit<'_>> = Vec::new();
        for (west, east) in longitude_spans(point.lng, dlng) {
            let envelope = AABB::from_corners([west, min_lat], [east, max_lat]);
            hits.extend(
                self.spatial_index
                    .locate_in_envelope_intersecting(&envelope)
                    .filter_map(|loc| {
                        let shop = &self.shops[loc.index];
                        let distance = haversine_distance(&shop.location, point);
                        (distance <= radius).then_some(ShopHit {
                            index: loc.index,
                            shop,
                            distance,
                        })
                    }),
            );
        }

        hits.sort_by_key(|hit| hit.index);
        // A shop on the ±180 seam can sit in both spans
        hits.dedup_by_key(|hit| hit.index);
        hits
    }

    /// Shops within `radius`, nearest first; equal distances keep registry order.
    pub fn within_sorted(&self, point: &GeoPoint, radius: f64) -> Vec<ShopHit<'_>> {
        let mut hits = self.within(point, radius);
        // Stable sort keeps registry order among ties
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// The nearest shop within `radius`, first in registry order on ties.
    pub fn nearest_within(&self, point: &GeoPoint, radius: f64) -> Option<ShopHit<'_>> {
        self.within_sorted(point, radius).into_iter().next()
    }
}

/// Longitude spans `[west, east]` covering `lng ± half_width`, split at the antimeridian.
fn longitude_spans(lng: f64, half_width: f64) -> Vec<(f64, f64)> {
    if half_width >= 180.0 {
        return vec![(-180.0, 180.0)];
    }

    let west = lng - half_width;
    let east = lng + half_width;
    if west < -180.0 {
        vec![(west + 360.0, 180.0), (-180.0, east)]
    } else if east > 180.0 {
        vec![(west, 180.0), (-180.0, east - 360.0)]
    } else {
        vec![(west, east)]
    }
}

impl Default for ShopRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
