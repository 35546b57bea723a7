#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod admin;
mod backend;
mod bucket;
mod bus;
mod catalog;
mod controller;
mod debounce;
mod durations;
mod generation;
mod legs;
mod location;
mod storage;
mod view;

use std::path::Path;

use api::TravelMode;

pub use self::admin::{AdminSession, ADMIN_SECRET_KEY};
pub use self::backend::{route_or_empty, AdminCheck, PlaceSource, RoutingBackend};
pub use self::bucket::{BucketItem, BucketStore, BUCKET_KEY};
pub use self::bus::{
    combine_stops, normalize_stop_name, BusOverview, BusTotals, CombinedStops, StopSequence,
};
pub use self::catalog::PlaceCatalog;
pub use self::controller::{
    ActiveRoute, Rejection, RouteController, RouteRequestState, RouteType,
};
pub use self::debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use self::durations::{
    aggregate, leg_duration, leg_estimate, DurationBadges, CAR_FALLBACK_KMH, FOOT_FALLBACK_KMH,
};
pub use self::generation::{Generation, Ticket};
pub use self::legs::{fetch_legs, legs_between, waypoints, Leg, LegRoute, Waypoint, MY_LOCATION};
pub use self::location::UserLocation;
pub use self::storage::{write_atomically, FileStorage, MemoryStorage, Storage};
pub use self::view::{MapView, Marker, START_COLOR, STOP_COLOR};

/// Everything the client knows, created once at startup and handed to whoever needs it.
pub struct AppState {
    pub bucket: BucketStore,
    /// The latest fix. Every route starts here.
    pub user_location: Option<UserLocation>,
    pub routes: RouteController,
    pub catalog: PlaceCatalog,
    pub admin: AdminSession,
}

impl AppState {
    /// The bucket list comes from `data_dir`; the admin session starts empty.
    pub fn load(data_dir: &Path, mode: TravelMode, leg_concurrency: usize) -> Self {
        Self::new(
            Box::new(FileStorage::new(data_dir)),
            mode,
            leg_concurrency,
        )
    }

    pub fn new(durable: Box<dyn Storage>, mode: TravelMode, leg_concurrency: usize) -> Self {
        let bucket = BucketStore::load(durable);
        info!("Bucket list has {} places", bucket.len());
        Self {
            bucket,
            user_location: None,
            routes: RouteController::new(mode, leg_concurrency),
            catalog: PlaceCatalog::new(),
            admin: AdminSession::new(Box::new(MemoryStorage::new())),
        }
    }

    /// Overwrites the previous fix.
    pub fn set_user_location(&mut self, location: UserLocation) {
        info!("Located at {} (±{:?} m)", location.pos, location.accuracy_m);
        self.user_location = Some(location);
    }
}
