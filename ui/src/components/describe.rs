use api::{Place, BUS_STOP};
use model::{BucketStore, PlaceCatalog, UserLocation, MY_LOCATION};

use super::{render_table, Text};

pub fn place(place: &Place, in_bucket: bool) -> Text {
    let mut txt = Text::from(format!(
        "#{} {}",
        place.id,
        place.name.as_deref().unwrap_or("Unnamed")
    ));
    txt.add_line(format!(
        "Type: {}",
        place.place_type.as_deref().unwrap_or("-")
    ));
    let description = if place.is_bus_stop() {
        "Bus stop"
    } else {
        place.description.as_deref().unwrap_or("No description")
    };
    txt.add_line(format!("Description: {description}"));
    txt.add_line(format!("Location: {}", place.pos));
    if let Some(ref x) = place.image_url {
        txt.add_line(format!("Image: {x}"));
    }
    if !place.gallery.is_empty() {
        txt.add_line(format!("Gallery ({} photos):", place.gallery.len()));
        for url in &place.gallery {
            txt.add_line(format!("  {url}"));
        }
    }
    for (label, value) in [
        ("Phone", &place.phone),
        ("Website", &place.website_url),
        ("Facebook", &place.facebook_url),
        ("Instagram", &place.instagram_url),
    ] {
        if let Some(x) = value {
            txt.add_line(format!("{label}: {x}"));
        }
    }
    txt.add_line(if in_bucket {
        "In your list ✓".to_string()
    } else {
        format!("Add it to your list with: add {}", place.id)
    });
    txt
}

/// One line per place, for search results and the pins in view.
pub fn place_list(places: &[Place]) -> Text {
    if places.is_empty() {
        return Text::from("No places here");
    }
    render_table(
        vec!["ID", "Name", "Type"],
        places
            .iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
                    p.place_type.clone().unwrap_or_default(),
                ]
            })
            .collect(),
    )
}

/// The trip panel: where it starts, then every place in visiting order.
pub fn bucket(bucket: &BucketStore, user: Option<&UserLocation>) -> Text {
    if bucket.is_empty() {
        return Text::from("Your list is empty. Add places with: add <id>");
    }
    let mut txt = Text::from(format!("Your list ({} places)", bucket.len()));
    match user {
        Some(user) => txt.add_line(format!("  0. {MY_LOCATION} ({})", user.pos)),
        None => txt.add_line("  Set your location to plan a trip: locate <lon> <lat>"),
    }
    for (idx, item) in bucket.list().iter().enumerate() {
        let mut line = format!("  {}. {} [{}] (#{})", idx + 1, item.name, item.place_type, item.id);
        if item.pos().is_none() {
            line.push_str(" (no position, skipped on routes)");
        }
        txt.add_line(line);
    }
    txt
}

pub fn categories(catalog: &PlaceCatalog) -> Text {
    if catalog.categories().is_empty() {
        return Text::from("No categories loaded");
    }
    let mut txt = Text::from("Categories:");
    for c in catalog.categories() {
        let mark = if catalog.is_selected(c) { "x" } else { " " };
        let note = if c == BUS_STOP { " (bus stops)" } else { "" };
        txt.add_line(format!("  [{mark}] {c}{note}"));
    }
    txt
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::{LonLat, PlaceID};
    use model::{BucketItem, MemoryStorage};

    fn museum() -> Place {
        Place {
            id: PlaceID(7),
            name: Some("National Museum".to_string()),
            place_type: Some("museum".to_string()),
            description: None,
            image_url: None,
            gallery: vec!["/uploads/a.jpg".to_string()],
            phone: Some("7011 0000".to_string()),
            website_url: None,
            facebook_url: None,
            instagram_url: None,
            pos: LonLat::new(106.917, 47.918),
        }
    }

    #[test]
    fn place_detail() {
        let txt = place(&museum(), false).to_string();
        assert!(txt.contains("#7 National Museum"), "{txt}");
        assert!(txt.contains("Description: No description"), "{txt}");
        assert!(txt.contains("Location: 47.91800, 106.91700"), "{txt}");
        assert!(txt.contains("Phone: 7011 0000"), "{txt}");
        assert!(txt.contains("add 7"), "{txt}");

        let mut stop = museum();
        stop.place_type = Some(BUS_STOP.to_string());
        stop.description = Some("ignored".to_string());
        stop.name = None;
        let txt = place(&stop, true).to_string();
        assert!(txt.contains("#7 Unnamed"), "{txt}");
        assert!(txt.contains("Description: Bus stop"), "{txt}");
        assert!(txt.contains("In your list"), "{txt}");
    }

    #[test]
    fn bucket_panel() {
        let mut store = BucketStore::load(Box::new(MemoryStorage::new()));
        assert!(bucket(&store, None).to_string().contains("empty"));

        store.add(BucketItem::from_place(&museum()).unwrap());
        let user = UserLocation::new(LonLat::new(106.9, 47.9), None);
        let txt = bucket(&store, Some(&user));
        assert_eq!(txt.lines()[1], format!("  0. {MY_LOCATION} (47.90000, 106.90000)"));
        assert_eq!(txt.lines()[2], "  1. National Museum [museum] (#7)");
    }
}
