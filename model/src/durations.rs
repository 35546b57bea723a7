use futures::future::join_all;

use api::{LonLat, RouteResponse, TravelMode};

use crate::backend::{route_or_empty, RoutingBackend};
use crate::legs::Leg;

/// Assumed speeds when a route only reports its distance.
pub const CAR_FALLBACK_KMH: f64 = 30.0;
pub const FOOT_FALLBACK_KMH: f64 = 5.0;

/// Total trip time under each travel mode, in seconds. None means unknown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DurationBadges {
    pub car: Option<f64>,
    pub bus: Option<f64>,
    pub foot: Option<f64>,
}

impl DurationBadges {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn get(&self, mode: TravelMode) -> Option<f64> {
        match mode {
            TravelMode::Car => self.car,
            TravelMode::Bus => self.bus,
            TravelMode::Foot => self.foot,
        }
    }
}

/// How long a car or foot leg takes, from what the backend said.
pub fn leg_duration(response: &RouteResponse, mode: TravelMode) -> Option<f64> {
    match mode {
        TravelMode::Car => response.estimated_duration_s(CAR_FALLBACK_KMH),
        TravelMode::Foot => response.estimated_duration_s(FOOT_FALLBACK_KMH),
        TravelMode::Bus => response.bus_total_s(),
    }
}

async fn direct_estimate(
    backend: &dyn RoutingBackend,
    from: LonLat,
    to: LonLat,
    mode: TravelMode,
) -> f64 {
    let (resp, _) = route_or_empty(backend, from, to, mode).await;
    leg_duration(&resp, mode).unwrap_or(0.0)
}

/// Seconds for one leg. Anything missing or broken counts as 0. A bus leg without a total
/// falls back to the car estimate.
pub async fn leg_estimate(backend: &dyn RoutingBackend, leg: &Leg, mode: TravelMode) -> f64 {
    match mode {
        TravelMode::Car | TravelMode::Foot => {
            direct_estimate(backend, leg.from, leg.to, mode).await
        }
        TravelMode::Bus => {
            let (resp, _) = route_or_empty(backend, leg.from, leg.to, TravelMode::Bus).await;
            match resp.bus_total_s() {
                Some(s) => s,
                None => direct_estimate(backend, leg.from, leg.to, TravelMode::Car).await,
            }
        }
    }
}

async fn total(backend: &dyn RoutingBackend, legs: &[Leg], mode: TravelMode) -> f64 {
    join_all(legs.iter().map(|leg| leg_estimate(backend, leg, mode)))
        .await
        .into_iter()
        .sum()
}

/// Sums every leg under all three modes. The modes and the legs within each are requested
/// concurrently. With no legs, every badge is unknown.
pub async fn aggregate(backend: &dyn RoutingBackend, legs: &[Leg]) -> DurationBadges {
    if legs.is_empty() {
        return DurationBadges::unknown();
    }
    let (car, bus, foot) = futures::join!(
        total(backend, legs, TravelMode::Car),
        total(backend, legs, TravelMode::Bus),
        total(backend, legs, TravelMode::Foot)
    );
    DurationBadges {
        car: Some(car),
        bus: Some(bus),
        foot: Some(foot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    type Script = fn(LonLat, TravelMode) -> Result<RouteResponse>;

    struct Scripted(Script);

    #[async_trait]
    impl RoutingBackend for Scripted {
        async fn route(&self, _: LonLat, end: LonLat, mode: TravelMode) -> Result<RouteResponse> {
            (self.0)(end, mode)
        }
    }

    fn line(props: serde_json::Value, summary: Option<serde_json::Value>) -> RouteResponse {
        let mut json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 0.0]]},
                "properties": props
            }]
        });
        if let Some(summary) = summary {
            json["summary"] = summary;
        }
        RouteResponse::from_json(json).unwrap()
    }

    fn two_legs() -> Vec<Leg> {
        let a = LonLat::new(0.0, 0.0);
        let b = LonLat::new(1.0, 0.0);
        let c = LonLat::new(2.0, 0.0);
        vec![
            Leg {
                idx: 0,
                from_label: "U".to_string(),
                to_label: "A".to_string(),
                from: a,
                to: b,
            },
            Leg {
                idx: 1,
                from_label: "A".to_string(),
                to_label: "B".to_string(),
                from: b,
                to: c,
            },
        ]
    }

    fn healthy(end: LonLat, mode: TravelMode) -> Result<RouteResponse> {
        let first = end.x() < 1.5;
        Ok(match mode {
            TravelMode::Car => line(
                serde_json::json!({"duration_s": if first { 300.0 } else { 420.0 }}),
                None,
            ),
            TravelMode::Foot => line(serde_json::json!({"distance_m": 1000.0}), None),
            // Only the first leg has a bus summary
            TravelMode::Bus if first => line(
                serde_json::json!({}),
                Some(serde_json::json!({"times": {"total_time_s": 600.0}})),
            ),
            TravelMode::Bus => line(serde_json::json!({}), None),
        })
    }

    fn second_leg_broken(end: LonLat, mode: TravelMode) -> Result<RouteResponse> {
        if end.x() > 1.5 {
            bail!("backend exploded");
        }
        healthy(end, mode)
    }

    #[tokio::test]
    async fn sums_each_mode() {
        let badges = aggregate(&Scripted(healthy), &two_legs()).await;
        assert_eq!(badges.car, Some(720.0));
        // 1km at 5km/h is 12 minutes, twice
        assert_eq!(badges.foot, Some(1440.0));
        // The second leg has no bus total and borrows its car time
        assert_eq!(badges.bus, Some(1020.0));
        assert_eq!(badges.get(TravelMode::Car), Some(720.0));
    }

    #[tokio::test]
    async fn a_broken_leg_counts_as_zero() {
        let badges = aggregate(&Scripted(second_leg_broken), &two_legs()).await;
        assert_eq!(badges.car, Some(300.0));
        assert_eq!(badges.bus, Some(600.0));
        assert_eq!(badges.foot, Some(720.0));
    }

    #[tokio::test]
    async fn no_legs_is_unknown() {
        let badges = aggregate(&Scripted(healthy), &[]).await;
        assert_eq!(badges, DurationBadges::unknown());
        assert_eq!(badges.get(TravelMode::Bus), None);
    }
}
