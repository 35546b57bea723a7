use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use api::{LonLat, Place, PlaceID};

use crate::storage::Storage;

/// Where the bucket list lives in durable storage.
pub const BUCKET_KEY: &str = "bucket_list";

/// One place the user wants to visit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketItem {
    pub id: PlaceID,
    pub name: String,
    #[serde(rename = "type", default)]
    pub place_type: String,
    /// `[lon, lat]`. Kept raw, because stored lists from older sessions may hold junk here.
    #[serde(default)]
    pub coords: Vec<f64>,
}

impl BucketItem {
    /// None if the place doesn't have a usable position.
    pub fn from_place(place: &Place) -> Option<Self> {
        let coords = place.pos.to_coords();
        LonLat::from_coords(&coords)?;
        Some(Self {
            id: place.id,
            name: place.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
            place_type: place.place_type.clone().unwrap_or_default(),
            coords,
        })
    }

    pub fn pos(&self) -> Option<LonLat> {
        LonLat::from_coords(&self.coords)
    }
}

/// The ordered list of places to visit, written through to storage after every change.
///
/// Storage failures are logged and otherwise ignored; the in-memory list stays the source of
/// truth for this session.
pub struct BucketStore {
    items: Vec<BucketItem>,
    storage: Box<dyn Storage>,
}

impl BucketStore {
    pub fn load(storage: Box<dyn Storage>) -> Self {
        let items = match storage.load(BUCKET_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<BucketItem>>(&raw) {
                Ok(items) => dedupe(items),
                Err(err) => {
                    warn!("Stored bucket list is corrupt, starting empty: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Couldn't read the stored bucket list, starting empty: {err:#}");
                Vec::new()
            }
        };
        Self { items, storage }
    }

    /// Appends the item, unless one with the same ID is already there.
    pub fn add(&mut self, item: BucketItem) -> bool {
        if self.contains(item.id) {
            return false;
        }
        self.items.push(item);
        self.persist();
        true
    }

    pub fn remove(&mut self, id: PlaceID) -> bool {
        match self.items.iter().position(|x| x.id == id) {
            Some(idx) => {
                self.items.remove(idx);
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Puts the items in the given order. The order must mention every current ID exactly once;
    /// otherwise nothing changes.
    pub fn reorder(&mut self, ids: &[PlaceID]) -> Result<()> {
        if ids.len() != self.items.len() {
            bail!(
                "A new order needs all {} places, but got {}",
                self.items.len(),
                ids.len()
            );
        }
        let mut seen = BTreeSet::new();
        for id in ids {
            if !self.contains(*id) {
                bail!("Place {id} isn't in the bucket list");
            }
            if !seen.insert(*id) {
                bail!("Place {id} appears twice in the new order");
            }
        }

        let mut reordered = Vec::with_capacity(self.items.len());
        for id in ids {
            if let Some(item) = self.items.iter().find(|x| x.id == *id) {
                reordered.push(item.clone());
            }
        }
        self.items = reordered;
        self.persist();
        Ok(())
    }

    /// Drags one item to a new 0-based index, shifting the others.
    pub fn move_item(&mut self, id: PlaceID, index: usize) -> Result<()> {
        let mut ids: Vec<PlaceID> = self.items.iter().map(|x| x.id).collect();
        let from = match ids.iter().position(|x| *x == id) {
            Some(idx) => idx,
            None => bail!("Place {id} isn't in the bucket list"),
        };
        if index >= ids.len() {
            bail!("Position {} is past the end of the list", index + 1);
        }
        let moved = ids.remove(from);
        ids.insert(index, moved);
        self.reorder(&ids)
    }

    pub fn list(&self) -> &[BucketItem] {
        &self.items
    }

    pub fn contains(&self, id: PlaceID) -> bool {
        self.items.iter().any(|x| x.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items with a usable position, in visiting order.
    pub fn valid_items(&self) -> Vec<(&BucketItem, LonLat)> {
        self.items
            .iter()
            .filter_map(|item| item.pos().map(|pos| (item, pos)))
            .collect()
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.items)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.storage.save(BUCKET_KEY, &raw));
        if let Err(err) = result {
            warn!("Couldn't persist the bucket list: {err:#}");
        }
    }
}

fn dedupe(items: Vec<BucketItem>) -> Vec<BucketItem> {
    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    for item in items {
        if seen.insert(item.id) {
            result.push(item);
        } else {
            warn!("Dropping duplicate stored bucket entry for place {}", item.id);
        }
    }
    result
}
