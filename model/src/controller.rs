use std::fmt;

use api::{GPSBounds, LonLat, TravelMode};

use crate::backend::RoutingBackend;
use crate::bucket::BucketStore;
use crate::bus::BusOverview;
use crate::durations::{aggregate, DurationBadges};
use crate::legs::{fetch_legs, legs_between, waypoints, Leg, LegRoute, Waypoint, MY_LOCATION};
use crate::location::UserLocation;
use crate::view::{MapView, Marker, START_COLOR, STOP_COLOR};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RouteType {
    #[default]
    None,
    Direct,
    Bucket,
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouteType::None => write!(f, "none"),
            RouteType::Direct => write!(f, "direct"),
            RouteType::Bucket => write!(f, "bucket"),
        }
    }
}

/// Which route gets recomputed when the travel mode changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteRequestState {
    pub current: RouteType,
    pub last_direct_destination: Option<LonLat>,
}

/// Why a route wasn't requested. Checked before any network call.
#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    NoUserLocation,
    EmptyBucket,
    NoValidItems,
    NoActiveRoute,
    UnknownLeg(usize),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::NoUserLocation => {
                write!(f, "Set your location first (locate <lon> <lat>)")
            }
            Rejection::EmptyBucket => write!(f, "Add at least one place to build a trip"),
            Rejection::NoValidItems => {
                write!(f, "None of the places in your list have a usable position")
            }
            Rejection::NoActiveRoute => write!(f, "No route is shown"),
            Rejection::UnknownLeg(idx) => write!(f, "The current route has no leg {}", idx + 1),
        }
    }
}

impl std::error::Error for Rejection {}

/// The route currently drawn on the map.
#[derive(Clone, Debug)]
pub struct ActiveRoute {
    pub route_type: RouteType,
    pub mode: TravelMode,
    pub waypoints: Vec<Waypoint>,
    /// In visiting order
    pub legs: Vec<LegRoute>,
    /// Only for bus mode
    pub bus: Option<BusOverview>,
}

impl ActiveRoute {
    /// Indices of legs whose request failed and were drawn empty.
    pub fn failed_legs(&self) -> Vec<usize> {
        self.legs
            .iter()
            .filter(|l| l.failed)
            .map(|l| l.leg.idx)
            .collect()
    }

    pub fn bounds(&self) -> GPSBounds {
        GPSBounds::from(&self.waypoints.iter().map(|w| w.pos).collect::<Vec<_>>())
    }

    pub fn plain_legs(&self) -> Vec<Leg> {
        self.legs.iter().map(|l| l.leg.clone()).collect()
    }
}

/// Turns trip-planning intents into routing requests, and keeps exactly one route on the map.
pub struct RouteController {
    state: RouteRequestState,
    last_direct_label: String,
    mode: TravelMode,
    active: Option<ActiveRoute>,
    durations: DurationBadges,
    leg_concurrency: usize,
}

impl Default for RouteController {
    fn default() -> Self {
        Self::new(TravelMode::Car, 1)
    }
}

impl RouteController {
    pub fn new(mode: TravelMode, leg_concurrency: usize) -> Self {
        Self {
            state: RouteRequestState::default(),
            last_direct_label: String::new(),
            mode,
            active: None,
            durations: DurationBadges::unknown(),
            leg_concurrency: leg_concurrency.max(1),
        }
    }

    pub fn state(&self) -> &RouteRequestState {
        &self.state
    }

    pub fn route_type(&self) -> RouteType {
        self.state.current
    }

    pub fn mode(&self) -> TravelMode {
        self.mode
    }

    pub fn active(&self) -> Option<&ActiveRoute> {
        self.active.as_ref()
    }

    pub fn durations(&self) -> &DurationBadges {
        &self.durations
    }

    /// One leg from the user to a single place.
    pub async fn show_direct(
        &mut self,
        user: Option<&UserLocation>,
        dest: LonLat,
        label: &str,
        backend: &dyn RoutingBackend,
        map: &mut dyn MapView,
    ) -> Result<&ActiveRoute, Rejection> {
        let user = user.ok_or(Rejection::NoUserLocation)?;
        self.state.current = RouteType::Direct;
        self.state.last_direct_destination = Some(dest);
        self.last_direct_label = label.to_string();
        Ok(self.draw_direct(user.pos, dest, backend, map).await)
    }

    /// The whole trip: the user, then every bucket item with a usable position, in list order.
    pub async fn show_bucket(
        &mut self,
        bucket: &BucketStore,
        user: Option<&UserLocation>,
        backend: &dyn RoutingBackend,
        map: &mut dyn MapView,
    ) -> Result<&ActiveRoute, Rejection> {
        let stops = bucket_stops(bucket, user)?;
        let user = user.ok_or(Rejection::NoUserLocation)?;
        self.state.current = RouteType::Bucket;
        Ok(self.draw_bucket(user.pos, &stops, backend, map).await)
    }

    /// Switches the travel mode and recomputes whatever route is active. The route type stays
    /// the same.
    pub async fn set_mode(
        &mut self,
        mode: TravelMode,
        bucket: &BucketStore,
        user: Option<&UserLocation>,
        backend: &dyn RoutingBackend,
        map: &mut dyn MapView,
    ) -> Result<Option<&ActiveRoute>, Rejection> {
        self.mode = mode;
        info!("Travel mode is now {mode}");
        match self.state.current {
            RouteType::None => Ok(None),
            RouteType::Direct => {
                let user = user.ok_or(Rejection::NoUserLocation)?;
                let dest = self
                    .state
                    .last_direct_destination
                    .ok_or(Rejection::NoActiveRoute)?;
                Ok(Some(self.draw_direct(user.pos, dest, backend, map).await))
            }
            RouteType::Bucket => {
                let stops = bucket_stops(bucket, user)?;
                let user = user.ok_or(Rejection::NoUserLocation)?;
                Ok(Some(self.draw_bucket(user.pos, &stops, backend, map).await))
            }
        }
    }

    /// Removes every route layer and forgets the active route.
    pub fn clear(&mut self, map: &mut dyn MapView) {
        map.clear_route();
        self.active = None;
        self.durations = DurationBadges::unknown();
        self.state.current = RouteType::None;
        info!("Route cleared");
    }

    /// Draws one leg of the active route in the highlight overlay and zooms to it.
    pub fn highlight_leg(&self, idx: usize, map: &mut dyn MapView) -> Result<&Leg, Rejection> {
        let active = self.active.as_ref().ok_or(Rejection::NoActiveRoute)?;
        let leg = active.legs.get(idx).ok_or(Rejection::UnknownLeg(idx))?;
        map.highlight(Some(&leg.response.geometry));
        map.fit_bounds(&GPSBounds::from(&[leg.leg.from, leg.leg.to]));
        Ok(&leg.leg)
    }

    /// Recomputes the car, bus and foot totals for the active route.
    pub async fn update_durations(&mut self, backend: &dyn RoutingBackend) -> &DurationBadges {
        let legs = self
            .active
            .as_ref()
            .map(|a| a.plain_legs())
            .unwrap_or_default();
        self.durations = aggregate(backend, &legs).await;
        &self.durations
    }

    async fn draw_direct(
        &mut self,
        user: LonLat,
        dest: LonLat,
        backend: &dyn RoutingBackend,
        map: &mut dyn MapView,
    ) -> &ActiveRoute {
        let wps = waypoints(user, &[(self.last_direct_label.clone(), dest)]);
        let markers = vec![
            Marker::new(user, "📍", START_COLOR, format!("Start: {MY_LOCATION}")),
            Marker::new(
                dest,
                "🎯",
                STOP_COLOR,
                format!("Destination: {}", self.last_direct_label),
            ),
        ];
        self.draw(RouteType::Direct, wps, markers, backend, map).await
    }

    async fn draw_bucket(
        &mut self,
        user: LonLat,
        stops: &[(String, LonLat)],
        backend: &dyn RoutingBackend,
        map: &mut dyn MapView,
    ) -> &ActiveRoute {
        let wps = waypoints(user, stops);
        let markers = wps
            .iter()
            .map(|w| {
                if w.position == 0 {
                    Marker::new(w.pos, "0", START_COLOR, format!("Start: {MY_LOCATION}"))
                } else {
                    Marker::new(
                        w.pos,
                        w.position.to_string(),
                        STOP_COLOR,
                        format!("{}. {}", w.position, w.label),
                    )
                }
            })
            .collect();
        self.draw(RouteType::Bucket, wps, markers, backend, map).await
    }

    // Every leg is fetched before the map is touched, so the route layers never show a mix of
    // old and new legs.
    async fn draw(
        &mut self,
        route_type: RouteType,
        wps: Vec<Waypoint>,
        markers: Vec<Marker>,
        backend: &dyn RoutingBackend,
        map: &mut dyn MapView,
    ) -> &ActiveRoute {
        let legs = legs_between(&wps);
        let fetched = fetch_legs(backend, &legs, self.mode, self.leg_concurrency).await;

        map.clear_route();
        for leg in &fetched {
            map.add_route_geometry(&leg.response.geometry);
        }
        for marker in markers {
            map.add_marker(marker);
        }

        let bus = if self.mode == TravelMode::Bus {
            let summaries: Vec<_> = fetched.iter().map(|l| l.response.summary.as_ref()).collect();
            Some(BusOverview::new(&summaries))
        } else {
            None
        };
        let route = ActiveRoute {
            route_type,
            mode: self.mode,
            waypoints: wps,
            legs: fetched,
            bus,
        };
        map.fit_bounds(&route.bounds());

        let failed = route.failed_legs().len();
        if failed > 0 {
            warn!("{failed} of {} legs failed and are drawn empty", route.legs.len());
        }
        info!(
            "Showing {route_type} route by {} with {} legs",
            self.mode,
            route.legs.len()
        );
        self.active.insert(route)
    }
}

/// The routable bucket items, after checking the trip preconditions in order.
fn bucket_stops(
    bucket: &BucketStore,
    user: Option<&UserLocation>,
) -> Result<Vec<(String, LonLat)>, Rejection> {
    if bucket.is_empty() {
        return Err(Rejection::EmptyBucket);
    }
    if user.is_none() {
        return Err(Rejection::NoUserLocation);
    }
    let stops: Vec<(String, LonLat)> = bucket
        .valid_items()
        .into_iter()
        .map(|(item, pos)| (item.name.clone(), pos))
        .collect();
    if stops.is_empty() {
        return Err(Rejection::NoValidItems);
    }
    Ok(stops)
}
