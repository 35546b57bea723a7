use futures::stream::{self, StreamExt};

use api::{LonLat, RouteResponse, TravelMode};

use crate::backend::{route_or_empty, RoutingBackend};

pub const MY_LOCATION: &str = "My location";

/// A numbered stop on the trip. Position 0 is always the user's location.
#[derive(Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub position: usize,
    pub label: String,
    pub pos: LonLat,
}

/// One hop between consecutive waypoints.
#[derive(Clone, Debug, PartialEq)]
pub struct Leg {
    pub idx: usize,
    pub from_label: String,
    pub to_label: String,
    pub from: LonLat,
    pub to: LonLat,
}

/// A leg together with what the backend answered for it.
#[derive(Clone, Debug)]
pub struct LegRoute {
    pub leg: Leg,
    pub response: RouteResponse,
    pub failed: bool,
}

/// The user's location followed by each stop, numbered in visiting order.
pub fn waypoints(user: LonLat, stops: &[(String, LonLat)]) -> Vec<Waypoint> {
    let mut list = vec![Waypoint {
        position: 0,
        label: MY_LOCATION.to_string(),
        pos: user,
    }];
    for (name, pos) in stops {
        list.push(Waypoint {
            position: list.len(),
            label: name.clone(),
            pos: *pos,
        });
    }
    list
}

/// Chains consecutive waypoints: 0 to 1, 1 to 2, and so on.
pub fn legs_between(waypoints: &[Waypoint]) -> Vec<Leg> {
    waypoints
        .windows(2)
        .enumerate()
        .map(|(idx, pair)| Leg {
            idx,
            from_label: pair[0].label.clone(),
            to_label: pair[1].label.clone(),
            from: pair[0].pos,
            to: pair[1].pos,
        })
        .collect()
}

/// Fetches every leg, at most `concurrency` at a time. Results come back in leg order no matter
/// which request finishes first.
pub async fn fetch_legs(
    backend: &dyn RoutingBackend,
    legs: &[Leg],
    mode: TravelMode,
    concurrency: usize,
) -> Vec<LegRoute> {
    stream::iter(legs.iter().cloned())
        .map(|leg| async move {
            let (response, failed) = route_or_empty(backend, leg.from, leg.to, mode).await;
            LegRoute {
                leg,
                response,
                failed,
            }
        })
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
}
