use geojson::FeatureCollection;

use api::{GPSBounds, LonLat, Place};

use crate::location::UserLocation;

pub const START_COLOR: &str = "#3b82f6";
pub const STOP_COLOR: &str = "#ef4444";

/// A labelled pin on the route layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub pos: LonLat,
    pub label: String,
    pub color: &'static str,
    pub popup: String,
}

impl Marker {
    pub fn new(
        pos: LonLat,
        label: impl Into<String>,
        color: &'static str,
        popup: impl Into<String>,
    ) -> Self {
        Self {
            pos,
            label: label.into(),
            color,
            popup: popup.into(),
        }
    }
}

/// Whatever draws the map. Every call replaces or adds to one layer; nothing is read back.
pub trait MapView {
    /// Replaces all place pins.
    fn replace_places(&mut self, places: &[Place]);
    /// Empties the route lines, the waypoint markers and the highlight overlay.
    fn clear_route(&mut self);
    fn add_route_geometry(&mut self, geometry: &FeatureCollection);
    fn add_marker(&mut self, marker: Marker);
    /// Draws one leg on top of the route, or removes the overlay with None.
    fn highlight(&mut self, geometry: Option<&FeatureCollection>);
    fn fit_bounds(&mut self, bounds: &GPSBounds);
    fn show_user_location(&mut self, location: &UserLocation);
}
