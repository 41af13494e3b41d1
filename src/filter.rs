//! Scalar Kalman smoothing of raw GPS fixes.
//!
//! Latitude and longitude share a single variance channel instead of a full
//! 2D covariance. Reported accuracy (meters) is used directly as the
//! measurement standard deviation, which is good enough at the tens-to-hundreds
//! of meters scale the tracker works at.

use log::debug;

use crate::config::{MIN_ACCURACY_M, PROCESS_NOISE};
use crate::GeoPoint;

/// Variance value marking a filter that has not seen a fix yet.
const UNINITIALIZED: f64 = -1.0;

/// Internal filter state. `variance < 0` means uninitialized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    pub lat: f64,
    pub lng: f64,
    pub variance: f64,
}

impl FilterState {
    fn uninitialized() -> Self {
        Self {
            lat: 0.0,
            lng: 0.0,
            variance: UNINITIALIZED,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.variance >= 0.0
    }
}

/// Smooths a stream of (lat, lng, accuracy) samples.
///
/// # Example
/// ```
/// use route_tracker::PositionFilter;
///
/// let mut filter = PositionFilter::new();
/// let first = filter.update(23.8103, 90.4125, 10.0);
/// assert_eq!((first.lat, first.lng), (23.8103, 90.4125));
/// ```
#[derive(Debug, Clone)]
pub struct PositionFilter {
    state: FilterState,
}

impl PositionFilter {
    pub fn new() -> Self {
        Self {
            state: FilterState::uninitialized(),
        }
    }

    /// Forget all history. Must be called once per tracking session.
    pub fn reset(&mut self) {
        self.state = FilterState::uninitialized();
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// Feed one measurement and return the smoothed estimate.
    ///
    /// The first measurement after a reset is returned unchanged.
    pub fn update(&mut self, lat: f64, lng: f64, accuracy_meters: f64) -> GeoPoint {
        let accuracy = if accuracy_meters.is_finite() {
            accuracy_meters.max(MIN_ACCURACY_M)
        } else {
            MIN_ACCURACY_M
        };
        let measurement_variance = accuracy * accuracy;

        if !self.state.is_initialized() {
            self.state = FilterState {
                lat,
                lng,
                variance: measurement_variance,
            };
            return GeoPoint::new(lat, lng);
        }

        self.state.variance += PROCESS_NOISE;
        let gain = self.state.variance / (self.state.variance + measurement_variance);
        self.state.lat += gain * (lat - self.state.lat);
        self.state.lng += gain * (lng - self.state.lng);
        self.state.variance *= 1.0 - gain;

        debug!(
            "[PositionFilter] gain={:.4} variance={:.6}",
            gain, self.state.variance
        );

        GeoPoint::new(self.state.lat, self.state.lng)
    }
}

impl Default for PositionFilter {
    fn default() -> Self {
        Self::new()
    }
}
