//! Wire formats and the HTTP client for the places and routing backend.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod admin;
mod client;
mod ids;
mod lonlat;
mod places;
mod route;

pub use admin::{created_place_id, ImageUpload, PlaceForm, Unauthorized};
pub use client::Client;
pub use ids::PlaceID;
pub use lonlat::{GPSBounds, LonLat};
pub use places::{parse_places, Place, PlaceQuery, BUS_STOP};
pub use route::{
    BusSummary, BusTimes, CarOnly, RouteResponse, SegmentDistances, SegmentTimes, StopRef,
    TravelMode,
};
