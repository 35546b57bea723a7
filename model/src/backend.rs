use anyhow::Result;
use async_trait::async_trait;

use api::{Client, LonLat, Place, PlaceQuery, RouteResponse, TravelMode};

/// Computes one leg of a route.
#[async_trait]
pub trait RoutingBackend: Send + Sync {
    async fn route(&self, start: LonLat, end: LonLat, mode: TravelMode) -> Result<RouteResponse>;
}

/// Serves categories and places.
#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn categories(&self) -> Result<Vec<String>>;
    async fn places(&self, query: &PlaceQuery) -> Result<Vec<Place>>;
}

/// Verifies admin credentials.
#[async_trait]
pub trait AdminCheck: Send + Sync {
    async fn admin_check(&self, secret: &str) -> Result<bool>;
}

#[async_trait]
impl RoutingBackend for Client {
    async fn route(&self, start: LonLat, end: LonLat, mode: TravelMode) -> Result<RouteResponse> {
        self.fetch_route(start, end, mode).await
    }
}

#[async_trait]
impl PlaceSource for Client {
    async fn categories(&self) -> Result<Vec<String>> {
        self.fetch_categories().await
    }

    async fn places(&self, query: &PlaceQuery) -> Result<Vec<Place>> {
        self.fetch_places(query).await
    }
}

#[async_trait]
impl AdminCheck for Client {
    async fn admin_check(&self, secret: &str) -> Result<bool> {
        Client::admin_check(self, secret).await
    }
}

/// Failures and malformed answers become an empty route, so one bad leg doesn't sink the rest.
/// The flag says whether the request failed.
pub async fn route_or_empty(
    backend: &dyn RoutingBackend,
    start: LonLat,
    end: LonLat,
    mode: TravelMode,
) -> (RouteResponse, bool) {
    match backend.route(start, end, mode).await {
        Ok(resp) => (resp, false),
        Err(err) => {
            warn!(
                "{mode} route from {} to {} failed: {err:#}",
                start.to_query(),
                end.to_query()
            );
            (RouteResponse::empty(), true)
        }
    }
}
