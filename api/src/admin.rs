use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use crate::client::check_status;
use crate::{Client, LonLat, PlaceID};

/// Every admin request carries the credential in this header.
pub const ADMIN_HEADER: &str = "X-Admin-Secret";

/// The backend rejected the admin credential.
#[derive(Debug)]
pub struct Unauthorized;

impl std::fmt::Display for Unauthorized {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Admin access required; log in again")
    }
}

impl std::error::Error for Unauthorized {}

pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs_err::read(path)?;
        let file_name = match path.file_name() {
            Some(x) => x.to_string_lossy().to_string(),
            None => bail!("{} isn't a file", path.display()),
        };
        Ok(Self { file_name, bytes })
    }

    fn mime(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }

    fn to_part(&self) -> Result<Part> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime())
            .with_context(|| format!("Bad upload {}", self.file_name))
    }
}

/// The fields of the create / edit place form.
pub struct PlaceForm {
    pub name: String,
    pub place_type: String,
    pub description: String,
    pub pos: LonLat,
    pub image: Option<ImageUpload>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub website_url: Option<String>,
    pub phone: Option<String>,
}

impl PlaceForm {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("A place needs a name");
        }
        if self.place_type.trim().is_empty() {
            bail!("A place needs a type");
        }
        if LonLat::from_coords(&self.pos.to_coords()).is_none() {
            bail!("A place needs a valid position");
        }
        Ok(())
    }

    /// Optional links are only sent when filled in.
    fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.trim().to_string()),
            ("place_type", self.place_type.trim().to_string()),
            ("description", self.description.trim().to_string()),
            ("lon", self.pos.x().to_string()),
            ("lat", self.pos.y().to_string()),
        ];
        for (key, value) in [
            ("facebook_url", &self.facebook_url),
            ("instagram_url", &self.instagram_url),
            ("website_url", &self.website_url),
            ("phone", &self.phone),
        ] {
            if let Some(value) = value.as_ref().map(|x| x.trim()).filter(|x| !x.is_empty()) {
                fields.push((key, value.to_string()));
            }
        }
        fields
    }

    fn to_multipart(&self) -> Result<Form> {
        let mut form = Form::new();
        for (key, value) in self.text_fields() {
            form = form.text(key, value);
        }
        if let Some(ref image) = self.image {
            form = form.part("image", image.to_part()?);
        }
        Ok(form)
    }
}

/// The backend answers a save with the place as a Feature, or sometimes a bare object.
pub fn created_place_id(response: &serde_json::Value) -> Option<PlaceID> {
    response
        .get("properties")
        .and_then(|p| p.get("id"))
        .or_else(|| response.get("id"))
        .and_then(|x| x.as_i64())
        .map(PlaceID)
}

impl Client {
    /// True if the backend accepts this credential.
    pub async fn admin_check(&self, secret: &str) -> Result<bool> {
        let resp = self
            .http()
            .post(self.url("/admin_check"))
            .header(ADMIN_HEADER, secret)
            .send()
            .await
            .context("Failed to reach the admin check")?;
        Ok(resp.status().is_success())
    }

    pub async fn create_place(&self, secret: &str, form: &PlaceForm) -> Result<PlaceID> {
        self.save_place(secret, Method::POST, "/places".to_string(), form, None)
            .await
    }

    pub async fn update_place(
        &self,
        secret: &str,
        id: PlaceID,
        form: &PlaceForm,
    ) -> Result<PlaceID> {
        self.save_place(secret, Method::PUT, format!("/places/{id}"), form, Some(id))
            .await
    }

    async fn save_place(
        &self,
        secret: &str,
        method: Method,
        path: String,
        form: &PlaceForm,
        existing: Option<PlaceID>,
    ) -> Result<PlaceID> {
        form.validate()?;
        let resp = self
            .http()
            .request(method, self.url(&path))
            .header(ADMIN_HEADER, secret)
            .multipart(form.to_multipart()?)
            .send()
            .await
            .context("Failed to save place")?;
        let resp = check_status(resp).await?;
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        match created_place_id(&body).or(existing) {
            Some(id) => Ok(id),
            None => bail!("The backend saved the place but didn't say which ID it got"),
        }
    }

    pub async fn delete_place(&self, secret: &str, id: PlaceID) -> Result<()> {
        let resp = self
            .http()
            .delete(self.url(&format!("/places/{id}")))
            .header(ADMIN_HEADER, secret)
            .send()
            .await
            .with_context(|| format!("Failed to delete place {id}"))?;
        check_status(resp).await?;
        Ok(())
    }

    /// Adds photos to a place's gallery.
    pub async fn upload_images(
        &self,
        secret: &str,
        id: PlaceID,
        images: &[ImageUpload],
    ) -> Result<()> {
        if images.is_empty() {
            return Ok(());
        }
        let mut form = Form::new();
        for image in images {
            form = form.part("images", image.to_part()?);
        }
        let resp = self
            .http()
            .post(self.url(&format!("/places/{id}/images")))
            .header(ADMIN_HEADER, secret)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to upload images for place {id}"))?;
        check_status(resp).await?;
        Ok(())
    }
}
