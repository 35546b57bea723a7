use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};

use crate::admin::Unauthorized;
use crate::places::parse_places;
use crate::{LonLat, Place, PlaceID, PlaceQuery, RouteResponse, TravelMode};

/// Talks to the places and routing backend. Cheap to share behind an `Arc`.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("The API base URL must start with http:// or https://, not {base_url}");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Couldn't build the HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn fetch_categories(&self) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(self.url("/categories"))
            .send()
            .await
            .context("Failed to fetch categories")?;
        let resp = check_status(resp).await?;
        resp.json().await.context("Failed to parse categories")
    }

    pub async fn fetch_places(&self, query: &PlaceQuery) -> Result<Vec<Place>> {
        let resp = self
            .http
            .get(self.url("/places"))
            .query(&query.to_params())
            .send()
            .await
            .context("Failed to fetch places")?;
        let resp = check_status(resp).await?;
        let collection: geojson::FeatureCollection =
            resp.json().await.context("Failed to parse places")?;
        Ok(parse_places(&collection))
    }

    pub async fn fetch_place(&self, id: PlaceID) -> Result<Place> {
        let resp = self
            .http
            .get(self.url(&format!("/places/{id}")))
            .send()
            .await
            .with_context(|| format!("Failed to fetch place {id}"))?;
        let resp = check_status(resp).await?;
        let feature: geojson::Feature = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse place {id}"))?;
        Place::from_feature(&feature)
    }

    /// One leg of a route. Bus mode also returns a stop and timing summary.
    pub async fn fetch_route(
        &self,
        start: LonLat,
        end: LonLat,
        mode: TravelMode,
    ) -> Result<RouteResponse> {
        let mut params = vec![("start", start.to_query()), ("end", end.to_query())];
        if mode != TravelMode::Bus {
            params.push(("mode", mode.as_str().to_string()));
        }
        let resp = self
            .http
            .get(self.url(mode.endpoint()))
            .query(&params)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {mode} route"))?;
        let resp = check_status(resp).await?;
        let value: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse {mode} route"))?;
        RouteResponse::from_json(value)
    }
}

/// Turns a non-2xx response into an error, preferring the backend's own `error` message.
/// 401 becomes `Unauthorized`, so callers can tell a bad credential apart from other failures.
pub(crate) async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(Unauthorized.into());
    }
    let url = resp.url().path().to_string();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(|e| e.to_string()))
        .unwrap_or(body);
    bail!("{url} returned {status}: {message}")
}

#[cfg(test)]
pub(crate) mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Answers exactly one HTTP request with a canned response, and hands back the raw request
    /// head that was received.
    pub(crate) async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (Client, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8_lossy(&buf).to_string()
        });
        (Client::new(&format!("http://{addr}/")).unwrap(), handle)
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(Client::new("localhost:5000").is_err());
        assert_eq!(
            Client::new("http://localhost:5000/").unwrap().url("/places"),
            "http://localhost:5000/places"
        );
    }

    #[tokio::test]
    async fn route_request_shape() {
        let (client, request) = serve_once(
            "200 OK",
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"LineString","coordinates":[[106.9,47.9],[107.0,48.0]]},"properties":{"duration_s":300.0,"distance_m":2500.0,"mode":"foot"}}]}"#,
        )
        .await;
        let resp = client
            .fetch_route(
                LonLat::new(106.9, 47.9),
                LonLat::new(107.0, 48.0),
                TravelMode::Foot,
            )
            .await
            .unwrap();
        assert_eq!(resp.duration_s(), Some(300.0));

        let head = request.await.unwrap();
        let line = head.lines().next().unwrap();
        assert!(line.starts_with("GET /route?"), "{line}");
        assert!(line.contains("start=106.9%2C47.9"), "{line}");
        assert!(line.contains("end=107%2C48"), "{line}");
        assert!(line.contains("mode=foot"), "{line}");
    }

    #[tokio::test]
    async fn bus_route_has_no_mode() {
        let (client, request) =
            serve_once("200 OK", r#"{"type":"FeatureCollection","features":[]}"#).await;
        let resp = client
            .fetch_route(
                LonLat::new(106.9, 47.9),
                LonLat::new(107.0, 48.0),
                TravelMode::Bus,
            )
            .await
            .unwrap();
        assert!(resp.is_empty());
        let head = request.await.unwrap();
        let line = head.lines().next().unwrap();
        assert!(line.starts_with("GET /route_bus?"), "{line}");
        assert!(!line.contains("mode="), "{line}");
    }

    #[tokio::test]
    async fn error_status_uses_backend_message() {
        let (client, _) =
            serve_once("500 Internal Server Error", r#"{"error":"OSRM is down"}"#).await;
        let err = client.fetch_categories().await.unwrap_err();
        assert!(err.to_string().contains("OSRM is down"), "{err}");
    }

    #[tokio::test]
    async fn places_are_parsed() {
        let (client, request) = serve_once(
            "200 OK",
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[106.9,47.9]},"properties":{"id":1,"name":"Museum","type":"museum"}}]}"#,
        )
        .await;
        let places = client
            .fetch_places(&PlaceQuery::search("museum"))
            .await
            .unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, PlaceID(1));
        let head = request.await.unwrap();
        assert!(head.starts_with("GET /places?q=museum "), "{head}");
    }
}
