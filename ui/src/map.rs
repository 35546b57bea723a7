use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};

use api::{GPSBounds, LonLat, Place};
use model::{write_atomically, MapView, Marker, UserLocation};

use crate::components::Text;

/// Where the map opens when there's no saved view.
pub const DEFAULT_CENTER: (f64, f64) = (106.917, 47.918);

pub fn default_viewport() -> GPSBounds {
    GPSBounds::around(LonLat::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1), 0.05, 0.03)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseLayer {
    #[default]
    OpenStreetMap,
    EsriWorldImagery,
    OpenTopoMap,
    CartoLight,
}

impl BaseLayer {
    pub fn all() -> Vec<Self> {
        vec![
            BaseLayer::OpenStreetMap,
            BaseLayer::EsriWorldImagery,
            BaseLayer::OpenTopoMap,
            BaseLayer::CartoLight,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "OpenStreetMap",
            BaseLayer::EsriWorldImagery => "Esri World Imagery",
            BaseLayer::OpenTopoMap => "OpenTopoMap",
            BaseLayer::CartoLight => "Carto Light",
        }
    }

    pub fn tile_url(self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            BaseLayer::EsriWorldImagery => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            BaseLayer::OpenTopoMap => "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            BaseLayer::CartoLight => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
            }
        }
    }

    pub fn max_zoom(self) -> u8 {
        match self {
            BaseLayer::OpenStreetMap | BaseLayer::EsriWorldImagery => 19,
            BaseLayer::OpenTopoMap => 17,
            BaseLayer::CartoLight => 20,
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "© OpenStreetMap contributors",
            BaseLayer::EsriWorldImagery => "Tiles © Esri",
            BaseLayer::OpenTopoMap => {
                "Map data: © OpenStreetMap contributors, SRTM | Map style: © OpenTopoMap"
            }
            BaseLayer::CartoLight => "© OpenStreetMap contributors & CARTO",
        }
    }
}

impl std::fmt::Display for BaseLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BaseLayer {
    type Err = anyhow::Error;

    /// Case and spacing don't matter, and "osm", "esri", "topo" and "carto" work too.
    fn from_str(x: &str) -> Result<Self> {
        let key: String = x
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect();
        for layer in BaseLayer::all() {
            let name: String = layer
                .name()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if name == key {
                return Ok(layer);
            }
        }
        match key.as_str() {
            "osm" => Ok(BaseLayer::OpenStreetMap),
            "esri" | "imagery" | "satellite" => Ok(BaseLayer::EsriWorldImagery),
            "topo" => Ok(BaseLayer::OpenTopoMap),
            "carto" | "light" => Ok(BaseLayer::CartoLight),
            _ => bail!(
                "Unknown base layer {x}; pick one of {}",
                BaseLayer::all()
                    .into_iter()
                    .map(|l| l.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// How one route line is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteStyle {
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub dash: Option<&'static str>,
}

/// Walking is green and dashed, bus blue, straight-line fallbacks grey and dashed, car dark blue.
pub fn route_style(properties: Option<&JsonObject>) -> RouteStyle {
    let get = |key: &str| {
        properties
            .and_then(|p| p.get(key))
            .and_then(|x| x.as_str())
            .unwrap_or("")
            .to_lowercase()
    };
    let segment = get("segment");
    let mode = get("mode");

    if segment == "walk-to-stop" || segment == "walk-from-stop" || mode.contains("foot") {
        return RouteStyle {
            color: "#24d52d",
            weight: 4.0,
            opacity: 0.95,
            dash: Some("6 8"),
        };
    }
    if segment == "bus" || mode.contains("bus") {
        return RouteStyle {
            color: "#2563eb",
            weight: 5.0,
            opacity: 0.9,
            dash: None,
        };
    }
    if mode == "straight-line" {
        return RouteStyle {
            color: "#94a3b8",
            weight: 3.0,
            opacity: 0.9,
            dash: Some("4 6"),
        };
    }
    if mode == "car" {
        return RouteStyle {
            color: "#010def",
            weight: 5.0,
            opacity: 0.85,
            dash: None,
        };
    }
    RouteStyle {
        color: "#2563eb",
        weight: 5.0,
        opacity: 0.85,
        dash: None,
    }
}

const HIGHLIGHT: RouteStyle = RouteStyle {
    color: "#f59e0b",
    weight: 8.0,
    opacity: 0.9,
    dash: None,
};

/// The drawable state of the map. Every layer is replaced wholesale, never patched.
pub struct LayerMap {
    base: BaseLayer,
    viewport: GPSBounds,
    places: Vec<Place>,
    route: Vec<FeatureCollection>,
    markers: Vec<Marker>,
    highlight: Option<FeatureCollection>,
    user: Option<UserLocation>,
}

impl LayerMap {
    pub fn new(base: BaseLayer, viewport: GPSBounds) -> Self {
        Self {
            base,
            viewport,
            places: Vec::new(),
            route: Vec::new(),
            markers: Vec::new(),
            highlight: None,
            user: None,
        }
    }

    pub fn base(&self) -> BaseLayer {
        self.base
    }

    pub fn set_base(&mut self, base: BaseLayer) {
        self.base = base;
    }

    pub fn viewport(&self) -> &GPSBounds {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: GPSBounds) {
        self.viewport = viewport;
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn route_lines(&self) -> &[FeatureCollection] {
        &self.route
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn highlighted(&self) -> Option<&FeatureCollection> {
        self.highlight.as_ref()
    }

    pub fn describe(&self) -> Text {
        let mut txt = Text::from(format!(
            "Map: {} (max zoom {}), {}",
            self.base,
            self.base.max_zoom(),
            self.base.attribution()
        ));
        let v = &self.viewport;
        txt.add_line(format!(
            "Centred on {}, viewing {:.4},{:.4} to {:.4},{:.4}",
            v.center(),
            v.min_lon,
            v.min_lat,
            v.max_lon,
            v.max_lat
        ));
        txt.add_line(format!(
            "{} places, {} route legs, {} markers{}",
            self.places.len(),
            self.route.len(),
            self.markers.len(),
            if self.highlight.is_some() {
                ", one leg highlighted"
            } else {
                ""
            }
        ));
        txt
    }

    /// Every layer as one collection. Each feature says which layer it's from, and lines and pins
    /// carry simplestyle properties.
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = Vec::new();
        for place in &self.places {
            let mut f = place.to_feature();
            f.set_property("layer", "places");
            if place.is_bus_stop() {
                f.set_property("marker-symbol", "bus");
            }
            features.push(f);
        }
        for collection in &self.route {
            for f in &collection.features {
                let style = route_style(f.properties.as_ref());
                features.push(styled(f, "route", &style));
            }
        }
        if let Some(ref collection) = self.highlight {
            for f in &collection.features {
                features.push(styled(f, "highlight", &HIGHLIGHT));
            }
        }
        for marker in &self.markers {
            let mut f = point(marker.pos);
            f.set_property("layer", "markers");
            f.set_property("marker-symbol", marker.label.clone());
            f.set_property("marker-color", marker.color);
            f.set_property("popup", marker.popup.clone());
            features.push(f);
        }
        if let Some(ref user) = self.user {
            let mut f = point(user.pos);
            f.set_property("layer", "user");
            if let Some(accuracy) = user.accuracy_m {
                f.set_property("accuracy_m", accuracy);
            }
            f.set_property("observed_at", user.observed_at.to_rfc3339());
            features.push(f);
        }

        let mut foreign_members = JsonObject::new();
        foreign_members.insert(
            "base_layer".to_string(),
            serde_json::json!({
                "name": self.base.name(),
                "tiles": self.base.tile_url(),
                "max_zoom": self.base.max_zoom(),
                "attribution": self.base.attribution(),
            }),
        );
        let v = &self.viewport;
        foreign_members.insert(
            "viewport".to_string(),
            serde_json::json!([v.min_lon, v.min_lat, v.max_lon, v.max_lat]),
        );
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_geojson())?;
        write_atomically(path, &json)
    }
}

fn point(pos: LonLat) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(pos.to_coords()))),
        id: None,
        properties: Some(JsonObject::new()),
        foreign_members: None,
    }
}

fn styled(f: &Feature, layer: &str, style: &RouteStyle) -> Feature {
    let mut f = f.clone();
    f.set_property("layer", layer);
    f.set_property("stroke", style.color);
    f.set_property("stroke-width", style.weight);
    f.set_property("stroke-opacity", style.opacity);
    if let Some(dash) = style.dash {
        f.set_property("stroke-dasharray", dash);
    }
    f
}

impl MapView for LayerMap {
    fn replace_places(&mut self, places: &[Place]) {
        self.places = places.to_vec();
    }

    fn clear_route(&mut self) {
        self.route.clear();
        self.markers.clear();
        self.highlight = None;
    }

    fn add_route_geometry(&mut self, geometry: &FeatureCollection) {
        self.route.push(geometry.clone());
    }

    fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    fn highlight(&mut self, geometry: Option<&FeatureCollection>) {
        self.highlight = geometry.cloned();
    }

    fn fit_bounds(&mut self, bounds: &GPSBounds) {
        if bounds.is_empty() {
            return;
        }
        self.viewport = bounds.padded(0.1, 0.002);
    }

    fn show_user_location(&mut self, location: &UserLocation) {
        self.user = Some(location.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{START_COLOR, STOP_COLOR};

    fn props(json: serde_json::Value) -> JsonObject {
        match json {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn line(properties: serde_json::Value) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::LineString(vec![
                    vec![106.9, 47.9],
                    vec![106.91, 47.91],
                ]))),
                id: None,
                properties: Some(props(properties)),
                foreign_members: None,
            }],
            foreign_members: None,
        }
    }

    #[test]
    fn styles_by_segment_and_mode() {
        let style = |json| route_style(Some(&props(json)));
        assert_eq!(style(serde_json::json!({"segment": "walk-to-stop"})).dash, Some("6 8"));
        assert_eq!(style(serde_json::json!({"mode": "Foot"})).color, "#24d52d");
        assert_eq!(style(serde_json::json!({"segment": "bus"})).color, "#2563eb");
        assert_eq!(style(serde_json::json!({"mode": "straight-line"})).color, "#94a3b8");
        assert_eq!(style(serde_json::json!({"mode": "car"})).color, "#010def");
        assert_eq!(route_style(None).opacity, 0.85);
    }

    #[test]
    fn base_layer_names() {
        assert_eq!("osm".parse::<BaseLayer>().unwrap(), BaseLayer::OpenStreetMap);
        assert_eq!(
            "esri world imagery".parse::<BaseLayer>().unwrap(),
            BaseLayer::EsriWorldImagery
        );
        assert_eq!("Carto-Light".parse::<BaseLayer>().unwrap(), BaseLayer::CartoLight);
        assert!("google".parse::<BaseLayer>().is_err());
        assert_eq!(BaseLayer::OpenTopoMap.max_zoom(), 17);
    }

    #[test]
    fn layers_replace_and_clear() {
        let mut map = LayerMap::new(BaseLayer::default(), default_viewport());
        assert!(map.viewport().contains(LonLat::new(106.917, 47.918)));
        assert!(map
            .describe()
            .to_string()
            .contains("Centred on 47.91800, 106.91700"));

        map.add_route_geometry(&line(serde_json::json!({"mode": "car"})));
        map.add_marker(Marker::new(LonLat::new(106.9, 47.9), "0", START_COLOR, "Start"));
        map.add_marker(Marker::new(LonLat::new(106.91, 47.91), "1", STOP_COLOR, "1. A"));
        map.highlight(Some(&line(serde_json::json!({}))));
        map.fit_bounds(&GPSBounds::from(&[
            LonLat::new(106.9, 47.9),
            LonLat::new(106.91, 47.91),
        ]));
        assert!(map.viewport().contains(LonLat::new(106.9, 47.9)));
        assert!(!map.viewport().contains(LonLat::new(106.917, 47.95)));

        map.clear_route();
        assert!(map.route_lines().is_empty());
        assert!(map.markers().is_empty());
        assert!(map.highlighted().is_none());

        // An empty box leaves the view alone
        let before = map.viewport().clone();
        map.fit_bounds(&GPSBounds::new());
        assert_eq!(map.viewport(), &before);
    }

    #[test]
    fn export_tags_every_layer() {
        let mut map = LayerMap::new(BaseLayer::CartoLight, default_viewport());
        map.add_route_geometry(&line(serde_json::json!({"segment": "walk-from-stop"})));
        map.add_marker(Marker::new(LonLat::new(106.91, 47.91), "🎯", STOP_COLOR, "Destination"));
        map.show_user_location(&UserLocation::new(LonLat::new(106.9, 47.9), Some(20.0)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.geojson");
        map.export(&path).unwrap();
        let raw = fs_err::read_to_string(&path).unwrap();
        let collection: FeatureCollection = serde_json::from_str(&raw).unwrap();

        let layers: Vec<String> = collection
            .features
            .iter()
            .map(|f| f.property("layer").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(layers, vec!["route", "markers", "user"]);
        assert_eq!(
            collection.features[0].property("stroke-dasharray"),
            Some(&serde_json::json!("6 8"))
        );
        assert_eq!(
            collection.features[1].property("marker-color"),
            Some(&serde_json::json!(STOP_COLOR))
        );
        let members = collection.foreign_members.unwrap();
        assert_eq!(members["base_layer"]["name"], "Carto Light");
    }
}
