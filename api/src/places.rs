use anyhow::Result;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::{GPSBounds, LonLat, PlaceID};

/// Bus stops are places too, but most screens hide them by default.
pub const BUS_STOP: &str = "bus_stop";

/// A point of interest, as served by `/places`. Read-only on the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceID,
    pub name: Option<String>,
    pub place_type: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub gallery: Vec<String>,
    pub phone: Option<String>,
    pub website_url: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub pos: LonLat,
}

impl Place {
    pub fn from_feature(feature: &Feature) -> Result<Self> {
        let id = match feature.property("id").and_then(|x| x.as_i64()) {
            Some(id) => PlaceID(id),
            None => bail!("Place feature has no integer id: {:?}", feature.properties),
        };
        let pos = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(coords)) => match LonLat::from_coords(coords) {
                Some(pos) => pos,
                None => bail!("Place {id} has bad coordinates {coords:?}"),
            },
            _ => bail!("Place {id} isn't a point"),
        };

        let mut gallery = Vec::new();
        if let Some(list) = feature.property("gallery").and_then(|x| x.as_array()) {
            for entry in list {
                let url = entry
                    .as_str()
                    .or_else(|| entry.get("url").and_then(|x| x.as_str()))
                    .or_else(|| entry.get("image_url").and_then(|x| x.as_str()));
                if let Some(url) = url {
                    gallery.push(url.to_string());
                }
            }
        }

        Ok(Self {
            id,
            name: string_property(feature, "name"),
            place_type: string_property(feature, "type"),
            description: string_property(feature, "description"),
            image_url: string_property(feature, "image_url"),
            gallery,
            phone: string_property(feature, "phone"),
            website_url: string_property(feature, "website_url"),
            facebook_url: string_property(feature, "facebook_url"),
            instagram_url: string_property(feature, "instagram_url"),
            pos,
        })
    }

    pub fn is_bus_stop(&self) -> bool {
        self.place_type.as_deref() == Some(BUS_STOP)
    }

    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(self.pos.to_coords()))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property("id", self.id.0);
        if let Some(ref name) = self.name {
            feature.set_property("name", name.clone());
        }
        if let Some(ref place_type) = self.place_type {
            feature.set_property("type", place_type.clone());
        }
        if let Some(ref description) = self.description {
            feature.set_property("description", description.clone());
        }
        feature
    }
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(|x| x.as_str())
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
}

/// Keeps every usable place, skipping (and logging) malformed features.
pub fn parse_places(collection: &FeatureCollection) -> Vec<Place> {
    let mut places = Vec::new();
    for feature in &collection.features {
        match Place::from_feature(feature) {
            Ok(place) => places.push(place),
            Err(err) => warn!("Skipping place: {err}"),
        }
    }
    places
}

/// Filters for `GET /places`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaceQuery {
    pub bbox: Option<GPSBounds>,
    /// Sent as `types=a,b,c`. Takes precedence over `place_type` on the backend.
    pub types: Vec<String>,
    pub text: Option<String>,
    pub place_type: Option<String>,
}

impl PlaceQuery {
    pub fn viewport(bbox: GPSBounds, types: Vec<String>) -> Self {
        Self {
            bbox: Some(bbox),
            types,
            ..Default::default()
        }
    }

    pub fn search(text: &str) -> Self {
        let text = text.trim();
        Self {
            text: if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            },
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref bbox) = self.bbox {
            params.push(("bbox", bbox.to_bbox_query()));
        }
        if !self.types.is_empty() {
            params.push(("types", self.types.join(",")));
        }
        if let Some(ref text) = self.text {
            params.push(("q", text.clone()));
        }
        if let Some(ref place_type) = self.place_type {
            params.push(("type", place_type.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(json: serde_json::Value) -> FeatureCollection {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parse_skips_bad_features() {
        let fc = collection(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [106.917, 47.918]},
                    "properties": {
                        "id": 7,
                        "name": "Gandan Monastery",
                        "type": "museum",
                        "description": "  ",
                        "gallery": ["a.jpg", {"url": "b.jpg"}, 3]
                    }
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [106.9, 47.9]},
                    "properties": {"name": "no id"}
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[106.9, 47.9], [107.0, 48.0]]},
                    "properties": {"id": 9}
                }
            ]
        }));
        let places = parse_places(&fc);
        assert_eq!(places.len(), 1);
        let place = &places[0];
        assert_eq!(place.id, PlaceID(7));
        assert_eq!(place.name.as_deref(), Some("Gandan Monastery"));
        assert_eq!(place.place_type.as_deref(), Some("museum"));
        assert_eq!(place.description, None);
        assert_eq!(place.gallery, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
        assert_eq!(place.pos, LonLat::new(106.917, 47.918));
    }

    #[test]
    fn query_params() {
        let bbox = GPSBounds::from_corners(106.8, 47.8, 107.0, 48.0).unwrap();
        let q = PlaceQuery::viewport(bbox, vec!["museum".to_string(), "hotel".to_string()]);
        assert_eq!(
            q.to_params(),
            vec![
                ("bbox", "106.8,47.8,107,48".to_string()),
                ("types", "museum,hotel".to_string())
            ]
        );

        assert_eq!(
            PlaceQuery::search(" cafe ").to_params(),
            vec![("q", "cafe".to_string())]
        );
        assert!(PlaceQuery::search("   ").to_params().is_empty());
    }

    #[test]
    fn feature_round_trip_keeps_identity() {
        let place = Place {
            id: PlaceID(3),
            name: Some("Zaisan".to_string()),
            place_type: Some("photo_spot".to_string()),
            description: None,
            image_url: None,
            gallery: Vec::new(),
            phone: None,
            website_url: None,
            facebook_url: None,
            instagram_url: None,
            pos: LonLat::new(106.92, 47.88),
        };
        let parsed = Place::from_feature(&place.to_feature()).unwrap();
        assert_eq!(parsed, place);
    }
}
