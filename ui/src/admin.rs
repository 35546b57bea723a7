use std::path::PathBuf;

use anyhow::Result;

use api::{ImageUpload, LonLat, Place, PlaceForm, PlaceID, PlaceQuery, BUS_STOP};

use crate::commands::{AdminCommand, PlaceFields};
use crate::components::{describe, render_table};
use crate::App;

impl App {
    /// Every admin page needs a verified session first.
    pub(crate) async fn admin(&mut self, cmd: AdminCommand) -> Result<()> {
        let secret = self.state.admin.ensure()?;
        match cmd {
            AdminCommand::List { q, place_type } => {
                if self.state.catalog.categories().is_empty() {
                    self.state.catalog.load_categories(&*self.client).await?;
                }
                let query = admin_query(q, place_type, self.state.catalog.categories());
                let places: Vec<Place> = self
                    .client
                    .fetch_places(&query)
                    .await?
                    .into_iter()
                    .filter(|p| !p.is_bus_stop())
                    .collect();
                println!("{} places", places.len());
                println!(
                    "{}",
                    render_table(
                        vec!["ID", "Name", "Type", "Location"],
                        places
                            .iter()
                            .map(|p| vec![
                                p.id.to_string(),
                                p.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
                                p.place_type.clone().unwrap_or_default(),
                                p.pos.to_string(),
                            ])
                            .collect(),
                    )
                );
            }
            AdminCommand::Show { id } => {
                let place = self.client.fetch_place(PlaceID(id)).await?;
                let in_bucket = self.state.bucket.contains(place.id);
                println!("{}", describe::place(&place, in_bucket));
            }
            AdminCommand::Create { fields } => {
                let (form, gallery) = place_form(fields, None)?;
                let id = self.client.create_place(&secret, &form).await?;
                println!("Created place #{id}");
                self.upload_gallery(&secret, id, gallery).await?;
            }
            AdminCommand::Edit { id, fields } => {
                let existing = self.client.fetch_place(PlaceID(id)).await?;
                let (form, gallery) = place_form(fields, Some(&existing))?;
                let id = self.client.update_place(&secret, existing.id, &form).await?;
                println!("Saved place #{id}");
                self.upload_gallery(&secret, id, gallery).await?;
            }
            AdminCommand::Delete { id, yes } => {
                if !yes {
                    println!("This can't be undone. Run `admin delete {id} --yes` to delete it.");
                    return Ok(());
                }
                self.client.delete_place(&secret, PlaceID(id)).await?;
                println!("Deleted place #{id}");
            }
            AdminCommand::Upload { id, images } => {
                self.upload_gallery(&secret, PlaceID(id), images).await?;
            }
        }
        Ok(())
    }

    async fn upload_gallery(&self, secret: &str, id: PlaceID, paths: Vec<PathBuf>) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut uploads = Vec::new();
        for path in &paths {
            uploads.push(ImageUpload::from_path(path)?);
        }
        self.client.upload_images(secret, id, &uploads).await?;
        println!("Uploaded {} photos to place #{id}", uploads.len());
        Ok(())
    }
}

/// Names match `q`. With no single type picked, every category except bus stops is asked for.
fn admin_query(q: Option<String>, place_type: Option<String>, categories: &[String]) -> PlaceQuery {
    let mut query = PlaceQuery::search(q.as_deref().unwrap_or(""));
    match place_type.filter(|t| !t.trim().is_empty()) {
        Some(t) => query.place_type = Some(t),
        None => {
            query.types = categories
                .iter()
                .filter(|c| c.as_str() != BUS_STOP)
                .cloned()
                .collect()
        }
    }
    query
}

/// Fills the form from the command line, falling back to the stored place when editing. Gallery
/// paths come back separately, since they're uploaded after saving.
fn place_form(fields: PlaceFields, existing: Option<&Place>) -> Result<(PlaceForm, Vec<PathBuf>)> {
    let pos = match (fields.lon, fields.lat, existing) {
        (Some(lon), Some(lat), _) => LonLat::new(lon, lat),
        (None, None, Some(place)) => place.pos,
        (lon, lat, Some(place)) => LonLat::new(
            lon.unwrap_or_else(|| place.pos.x()),
            lat.unwrap_or_else(|| place.pos.y()),
        ),
        (_, _, None) => bail!("A new place needs both --lon and --lat"),
    };
    let image = match fields.image {
        Some(ref path) => Some(ImageUpload::from_path(path)?),
        None => None,
    };
    let keep = |new: Option<String>, old: Option<&Option<String>>| -> Option<String> {
        new.or_else(|| old.and_then(|x| x.clone()))
    };

    let form = PlaceForm {
        name: keep(fields.name, existing.map(|p| &p.name)).unwrap_or_default(),
        place_type: keep(fields.place_type, existing.map(|p| &p.place_type)).unwrap_or_default(),
        description: keep(fields.description, existing.map(|p| &p.description))
            .unwrap_or_default(),
        pos,
        image,
        facebook_url: keep(fields.facebook, existing.map(|p| &p.facebook_url)),
        instagram_url: keep(fields.instagram, existing.map(|p| &p.instagram_url)),
        website_url: keep(fields.website, existing.map(|p| &p.website_url)),
        phone: keep(fields.phone, existing.map(|p| &p.phone)),
    };
    form.validate()?;
    Ok((form, fields.gallery))
}
