//! HTTP client for an external OSRM-compatible routing service.
//!
//! Only fetches maneuver steps for display; routes are computed by the
//! service, never here.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Client;

use crate::navigation::{parse_osrm_steps, ManeuverStep};
use crate::{GeoPoint, Result, TrackerError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Routing profile understood by OSRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelProfile {
    Driving,
    Walking,
    Cycling,
}

impl TravelProfile {
    fn as_str(&self) -> &'static str {
        match self {
            TravelProfile::Driving => "driving",
            TravelProfile::Walking => "foot",
            TravelProfile::Cycling => "bike",
        }
    }
}

/// Client for fetching turn-by-turn steps.
pub struct RoutingClient {
    client: Client,
    base_url: String,
}

impl RoutingClient {
    /// Create a client for the service at `base_url`, e.g. `https://router.project-osrm.org`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TrackerError::Routing {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, from: &GeoPoint, to: &GeoPoint, profile: TravelProfile) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?steps=true&overview=false",
            self.base_url,
            profile.as_str(),
            from.lng,
            from.lat,
            to.lng,
            to.lat
        )
    }

    /// Fetch maneuver steps from `from` to `to`.
    pub async fn fetch_steps(
        &self,
        from: &GeoPoint,
        to: &GeoPoint,
        profile: TravelProfile,
    ) -> Result<Vec<ManeuverStep>> {
        if !from.is_valid() || !to.is_valid() {
            return Err(TrackerError::Routing {
                message: "route endpoints must be valid coordinates".to_string(),
                status_code: None,
            });
        }

        let url = self.route_url(from, to, profile);
        debug!("[RoutingClient] GET {}", url);
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::Routing {
                message: e.to_string(),
                status_code: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TrackerError::Routing {
            message: e.to_string(),
            status_code: Some(status.as_u16()),
        })?;

        // OSRM reports NoRoute etc. as 400 with a JSON body; prefer its message
        if !status.is_success() {
            warn!("[RoutingClient] HTTP {} from routing service", status);
            return Err(match parse_osrm_steps(&body) {
                Err(TrackerError::Routing { message, .. }) => TrackerError::Routing {
                    message,
                    status_code: Some(status.as_u16()),
                },
                _ => TrackerError::Routing {
                    message: format!("HTTP {}", status),
                    status_code: Some(status.as_u16()),
                },
            });
        }

        let steps = parse_osrm_steps(&body)?;
        info!(
            "[RoutingClient] {} steps in {:?}",
            steps.len(),
            start.elapsed()
        );
        Ok(steps)
    }
}
