use std::str::FromStr;

use anyhow::Result;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

/// How to get from one place to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Car,
    Foot,
    Bus,
}

impl TravelMode {
    pub fn all() -> Vec<Self> {
        vec![TravelMode::Car, TravelMode::Bus, TravelMode::Foot]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Car => "car",
            TravelMode::Foot => "foot",
            TravelMode::Bus => "bus",
        }
    }

    /// Bus routes come from their own endpoint, which doesn't take a mode.
    pub fn endpoint(self) -> &'static str {
        match self {
            TravelMode::Bus => "/route_bus",
            TravelMode::Car | TravelMode::Foot => "/route",
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = anyhow::Error;

    fn from_str(x: &str) -> Result<Self> {
        match x.trim().to_lowercase().as_str() {
            "car" => Ok(TravelMode::Car),
            "foot" | "walk" => Ok(TravelMode::Foot),
            "bus" => Ok(TravelMode::Bus),
            _ => bail!("Unknown travel mode {x}; use car, foot, or bus"),
        }
    }
}

/// One routing response: drawable geometry, plus a summary for bus routes.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteResponse {
    pub geometry: FeatureCollection,
    pub summary: Option<BusSummary>,
}

impl RouteResponse {
    pub fn empty() -> Self {
        Self {
            geometry: FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
            summary: None,
        }
    }

    /// Fails if the body isn't a FeatureCollection at all. A summary that doesn't parse is
    /// dropped, keeping the geometry.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let mut geometry: FeatureCollection = serde_json::from_value(value)?;
        let mut summary = None;
        if let Some(raw) = geometry
            .foreign_members
            .as_mut()
            .and_then(|members| members.remove("summary"))
        {
            match serde_json::from_value::<BusSummary>(raw) {
                Ok(s) => summary = Some(s),
                Err(err) => warn!("Ignoring malformed bus summary: {err}"),
            }
        }
        Ok(Self { geometry, summary })
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.features.is_empty()
    }

    fn first_number(&self, key: &str) -> Option<f64> {
        self.geometry
            .features
            .first()
            .and_then(|f| f.property(key))
            .and_then(|x| x.as_f64())
    }

    pub fn duration_s(&self) -> Option<f64> {
        self.first_number("duration_s")
    }

    pub fn distance_m(&self) -> Option<f64> {
        self.first_number("distance_m")
    }

    /// The reported duration, or else the reported distance at a fixed speed.
    pub fn estimated_duration_s(&self, fallback_speed_kmh: f64) -> Option<f64> {
        if let Some(s) = self.duration_s() {
            return Some(s);
        }
        let meters = self.distance_m()?;
        if fallback_speed_kmh <= 0.0 {
            return None;
        }
        Some(meters * 3600.0 / (fallback_speed_kmh * 1000.0))
    }

    pub fn bus_total_s(&self) -> Option<f64> {
        self.summary
            .as_ref()
            .and_then(|s| s.times.as_ref())
            .and_then(|t| t.total_time_s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BusSummary {
    pub start_stop: Option<StopRef>,
    pub end_stop: Option<StopRef>,
    #[serde(default)]
    pub intermediate_stops: Vec<StopRef>,
    pub times: Option<BusTimes>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StopRef {
    // Bus stop IDs come from several sources and aren't always numeric
    pub id: Option<serde_json::Value>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BusTimes {
    #[serde(default)]
    pub segments: SegmentTimes,
    #[serde(default)]
    pub distances_m: SegmentDistances,
    pub total_time_s: Option<f64>,
    #[serde(default)]
    pub car_only: CarOnly,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentTimes {
    pub walk_to_stop_s: Option<f64>,
    pub bus_s: Option<f64>,
    pub walk_from_stop_s: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentDistances {
    pub walk_to_stop: Option<f64>,
    pub bus: Option<f64>,
    pub walk_from_stop: Option<f64>,
}

/// What the same trip would take by car, for comparison.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CarOnly {
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bus_response() {
        let resp = RouteResponse::from_json(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[106.9, 47.9], [106.91, 47.91]]},
                    "properties": {"segment": "walk-to-stop", "mode": "foot", "distance_m": 120.0, "duration_s": 86.4}
                }
            ],
            "summary": {
                "start_stop": {"id": 4, "name": "Sukhbaatar Square"},
                "end_stop": {"id": "osm:99", "name": "Zaisan"},
                "intermediate_stops": [{"id": 5, "name": "Bus stop"}],
                "times": {
                    "segments": {"walk_to_stop_s": 86.4, "bus_s": 600, "walk_from_stop_s": 120},
                    "distances_m": {"walk_to_stop": 120, "bus": 3300, "walk_from_stop": 160},
                    "total_time_s": 806.4,
                    "car_only": {"distance_m": 3500, "duration_s": 420}
                }
            }
        }))
        .unwrap();

        assert!(!resp.is_empty());
        assert_eq!(resp.duration_s(), Some(86.4));
        assert_eq!(resp.bus_total_s(), Some(806.4));
        let summary = resp.summary.unwrap();
        assert_eq!(
            summary.end_stop.unwrap().name.as_deref(),
            Some("Zaisan")
        );
        assert_eq!(summary.intermediate_stops.len(), 1);
        assert_eq!(summary.times.unwrap().car_only.duration_s, Some(420.0));
        // The summary is pulled out of the collection
        assert!(resp
            .geometry
            .foreign_members
            .map(|m| !m.contains_key("summary"))
            .unwrap_or(true));
    }

    #[test]
    fn malformed_summary_keeps_geometry() {
        let resp = RouteResponse::from_json(serde_json::json!({
            "type": "FeatureCollection",
            "features": [],
            "summary": {"intermediate_stops": "nope"}
        }))
        .unwrap();
        assert!(resp.summary.is_none());
        assert!(resp.is_empty());
    }

    #[test]
    fn not_a_collection() {
        assert!(RouteResponse::from_json(serde_json::json!({"error": "no route"})).is_err());
    }

    #[test]
    fn duration_falls_back_to_distance() {
        let resp = RouteResponse::from_json(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[106.9, 47.9], [106.91, 47.91]]},
                "properties": {"distance_m": 2500.0, "mode": "straight-line"}
            }]
        }))
        .unwrap();
        assert_eq!(resp.duration_s(), None);
        // 2.5km at 30km/h is 5 minutes
        assert_eq!(resp.estimated_duration_s(30.0), Some(300.0));
        // and at 5km/h, half an hour
        assert_eq!(resp.estimated_duration_s(5.0), Some(1800.0));
        assert_eq!(RouteResponse::empty().estimated_duration_s(30.0), None);
    }

    #[test]
    fn travel_modes() {
        assert_eq!("Bus".parse::<TravelMode>().unwrap(), TravelMode::Bus);
        assert_eq!("walk".parse::<TravelMode>().unwrap(), TravelMode::Foot);
        assert!("plane".parse::<TravelMode>().is_err());
        assert_eq!(TravelMode::Bus.endpoint(), "/route_bus");
        assert_eq!(TravelMode::Foot.endpoint(), "/route");
    }
}
