//! Turn-by-turn maneuver data from an external routing service.
//!
//! The tracker never computes road routes and never advances through steps;
//! it only turns a routing response into display-ready [`ManeuverStep`]s.
//! Responses follow the OSRM `route/v1` JSON shape with `steps=true`.

use serde::{Deserialize, Serialize};

use crate::{GeoPoint, Result, TrackerError};

/// One maneuver, treated as opaque display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManeuverStep {
    /// Human-readable instruction, e.g. "Turn left onto Road 11"
    pub instruction: String,
    /// Direction modifier as reported ("left", "slight right", ...)
    pub modifier: Option<String>,
    /// Length of the step in meters
    pub distance_m: f64,
    /// Where the maneuver happens
    pub waypoint: GeoPoint,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    #[serde(default)]
    name: String,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    modifier: Option<String>,
    /// [lng, lat]
    location: [f64; 2],
}

/// Parse the steps of the first route in an OSRM response.
///
/// A response whose `code` is not `"Ok"` becomes [`TrackerError::Routing`].
///
/// # Example
/// ```
/// use route_tracker::parse_osrm_steps;
///
/// let json = r#"{"code":"Ok","routes":[{"legs":[{"steps":[
///     {"distance":120.5,"name":"Road 11",
///      "maneuver":{"type":"turn","modifier":"left","location":[90.4125,23.8103]}}
/// ]}]}]}"#;
/// let steps = parse_osrm_steps(json).unwrap();
/// assert_eq!(steps[0].instruction, "Turn left onto Road 11");
/// ```
pub fn parse_osrm_steps(json: &str) -> Result<Vec<ManeuverStep>> {
    let response: OsrmResponse = serde_json::from_str(json)?;

    if response.code != "Ok" {
        return Err(TrackerError::Routing {
            message: response.message.unwrap_or(response.code),
            status_code: None,
        });
    }

    let steps = response
        .routes
        .into_iter()
        .next()
        .map(|route| {
            route
                .legs
                .into_iter()
                .flat_map(|leg| leg.steps)
                .map(|step| ManeuverStep {
                    instruction: describe(&step.maneuver.kind, step.maneuver.modifier.as_deref(), &step.name),
                    modifier: step.maneuver.modifier,
                    distance_m: step.distance,
                    waypoint: GeoPoint::new(step.maneuver.location[1], step.maneuver.location[0]),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(steps)
}

fn describe(kind: &str, modifier: Option<&str>, road: &str) -> String {
    let action = match (kind, modifier) {
        ("depart", _) => "Head out".to_string(),
        ("arrive", _) => return "Arrive at destination".to_string(),
        ("roundabout" | "rotary", _) => "Enter the roundabout".to_string(),
        ("continue" | "new name", Some("straight")) | ("continue" | "new name", None) => {
            "Continue".to_string()
        }
        ("continue" | "new name", Some(m)) => format!("Keep {}", m),
        (_, Some("uturn")) => "Make a U-turn".to_string(),
        (_, Some("straight")) => "Go straight".to_string(),
        (_, Some(m)) => format!("Turn {}", m),
        (other, None) => capitalize(other),
    };

    if road.is_empty() {
        action
    } else {
        format!("{} onto {}", action, road)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
