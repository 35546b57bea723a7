use std::collections::BTreeSet;

use anyhow::Result;

use api::{GPSBounds, Place, PlaceID, PlaceQuery, BUS_STOP};

use crate::backend::PlaceSource;
use crate::bucket::BucketItem;
use crate::generation::{Generation, Ticket};

/// Categories, the category filter, and the most recently loaded set of places.
pub struct PlaceCatalog {
    categories: Vec<String>,
    selected: BTreeSet<String>,
    places: Vec<Place>,
    generation: Generation,
}

impl Default for PlaceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceCatalog {
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
            selected: BTreeSet::new(),
            places: Vec::new(),
            generation: Generation::new(),
        }
    }

    /// Fetches the categories. Everything starts selected except bus stops.
    pub async fn load_categories(&mut self, source: &dyn PlaceSource) -> Result<&[String]> {
        self.categories = source.categories().await?;
        self.selected = self
            .categories
            .iter()
            .filter(|c| c.as_str() != BUS_STOP)
            .cloned()
            .collect();
        info!(
            "Loaded {} categories, {} selected",
            self.categories.len(),
            self.selected.len()
        );
        Ok(&self.categories)
    }

    /// Restores a previous selection, ignoring categories that no longer exist.
    pub fn restore_selection(&mut self, names: &[String]) {
        self.selected = names
            .iter()
            .filter(|n| self.categories.contains(*n))
            .cloned()
            .collect();
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn is_selected(&self, category: &str) -> bool {
        self.selected.contains(category)
    }

    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Flips one category and returns whether it's now selected.
    pub fn toggle(&mut self, category: &str) -> Result<bool> {
        if !self.categories.iter().any(|c| c == category) {
            bail!("Unknown category {category}");
        }
        if self.selected.remove(category) {
            Ok(false)
        } else {
            self.selected.insert(category.to_string());
            Ok(true)
        }
    }

    /// The places in view, filtered by the selected categories. With nothing selected, the
    /// result is empty and nothing is requested. A failed request also leaves the map empty.
    pub async fn load_viewport(
        &mut self,
        bounds: &GPSBounds,
        source: &dyn PlaceSource,
    ) -> &[Place] {
        let ticket = self.generation.next();
        if self.selected.is_empty() {
            self.places.clear();
            return &self.places;
        }
        let query = PlaceQuery::viewport(bounds.clone(), self.selected());
        let places = match source.places(&query).await {
            Ok(places) => places,
            Err(err) => {
                warn!("Loading places failed: {err:#}");
                Vec::new()
            }
        };
        self.accept(&ticket, places);
        &self.places
    }

    /// Starts a text search over the selected categories. The caller runs the query and hands
    /// the result to `accept` with the ticket.
    pub fn search_query(&self, text: &str) -> Option<(Ticket, PlaceQuery)> {
        if self.selected.is_empty() {
            return None;
        }
        let mut query = PlaceQuery::search(text);
        query.types = self.selected();
        Some((self.generation.next(), query))
    }

    /// Takes a result in as the loaded set, unless a newer request was started since.
    pub fn accept(&mut self, ticket: &Ticket, places: Vec<Place>) -> bool {
        if !ticket.is_current() {
            debug!(
                "Dropping {} places from superseded request {}",
                places.len(),
                ticket.id()
            );
            return false;
        }
        self.places = places;
        true
    }

    /// Empties the loaded set, superseding anything in flight.
    pub fn clear(&mut self) {
        self.generation.next();
        self.places.clear();
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn lookup(&self, id: PlaceID) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn bucket_item_for(&self, id: PlaceID) -> Result<BucketItem> {
        let place = match self.lookup(id) {
            Some(place) => place,
            None => bail!("Place {id} isn't loaded; look around with places or search first"),
        };
        match BucketItem::from_place(place) {
            Some(item) => Ok(item),
            None => bail!("Place {id} has no usable position"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use api::LonLat;

    #[derive(Default)]
    struct FakeSource {
        requests: AtomicUsize,
        fail: bool,
    }

    fn place(id: i64, place_type: &str) -> Place {
        Place {
            id: PlaceID(id),
            name: Some(format!("Place {id}")),
            place_type: Some(place_type.to_string()),
            description: None,
            image_url: None,
            gallery: Vec::new(),
            phone: None,
            website_url: None,
            facebook_url: None,
            instagram_url: None,
            pos: LonLat::new(106.9, 47.9),
        }
    }

    #[async_trait]
    impl PlaceSource for FakeSource {
        async fn categories(&self) -> Result<Vec<String>> {
            Ok(vec![
                "museum".to_string(),
                BUS_STOP.to_string(),
                "park".to_string(),
            ])
        }

        async fn places(&self, query: &PlaceQuery) -> Result<Vec<Place>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("backend down");
            }
            Ok(query
                .types
                .iter()
                .enumerate()
                .map(|(idx, t)| place(idx as i64 + 1, t))
                .collect())
        }
    }

    fn bounds() -> GPSBounds {
        GPSBounds::from_corners(106.8, 47.8, 107.0, 48.0).unwrap()
    }

    #[tokio::test]
    async fn bus_stops_start_unselected() {
        let source = FakeSource::default();
        let mut catalog = PlaceCatalog::new();
        catalog.load_categories(&source).await.unwrap();
        assert_eq!(catalog.selected(), vec!["museum", "park"]);
        assert!(!catalog.is_selected(BUS_STOP));

        let places = catalog.load_viewport(&bounds(), &source).await;
        assert_eq!(places.len(), 2);
        assert!(catalog.lookup(PlaceID(2)).is_some());
        assert_eq!(catalog.bucket_item_for(PlaceID(1)).unwrap().place_type, "museum");
        assert!(catalog.bucket_item_for(PlaceID(9)).is_err());
    }

    #[tokio::test]
    async fn nothing_selected_means_nothing_requested() {
        let source = FakeSource::default();
        let mut catalog = PlaceCatalog::new();
        catalog.load_categories(&source).await.unwrap();
        catalog.load_viewport(&bounds(), &source).await;
        assert_eq!(source.requests.load(Ordering::SeqCst), 1);

        assert!(!catalog.toggle("museum").unwrap());
        assert!(!catalog.toggle("park").unwrap());
        assert!(catalog.load_viewport(&bounds(), &source).await.is_empty());
        assert_eq!(source.requests.load(Ordering::SeqCst), 1);
        assert!(catalog.search_query("lake").is_none());

        assert!(catalog.toggle(BUS_STOP).unwrap());
        assert!(catalog.toggle("airport").is_err());
    }

    #[tokio::test]
    async fn failures_degrade_to_empty() {
        let source = FakeSource {
            fail: true,
            ..Default::default()
        };
        let mut catalog = PlaceCatalog::new();
        catalog.load_categories(&source).await.unwrap();
        assert!(catalog.load_viewport(&bounds(), &source).await.is_empty());
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut catalog = PlaceCatalog::new();
        catalog.categories = vec!["museum".to_string()];
        catalog.restore_selection(&["museum".to_string(), "gone".to_string()]);
        assert_eq!(catalog.selected(), vec!["museum"]);

        let (old, query) = catalog.search_query(" lake ").unwrap();
        assert_eq!(query.text.as_deref(), Some("lake"));
        let (new, _) = catalog.search_query("lake shore").unwrap();

        assert!(catalog.accept(&new, vec![place(2, "museum")]));
        assert!(!catalog.accept(&old, vec![place(1, "museum")]));
        assert_eq!(catalog.places().len(), 1);
        assert_eq!(catalog.places()[0].id, PlaceID(2));
    }
}
