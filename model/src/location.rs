use chrono::{DateTime, Utc};

use api::LonLat;

/// The latest geolocation fix. Every route starts here. Never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct UserLocation {
    pub pos: LonLat,
    /// Radius in meters, if the fix reported one
    pub accuracy_m: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl UserLocation {
    pub fn new(pos: LonLat, accuracy_m: Option<f64>) -> Self {
        Self {
            pos,
            accuracy_m,
            observed_at: Utc::now(),
        }
    }
}
