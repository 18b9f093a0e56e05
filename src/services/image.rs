use crate::config::MediaConfig;
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

const RECIPE_DIR: &str = "recipes";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    Malformed,

    #[error("The image must not exceed {0} bytes.")]
    TooLarge(usize),
}

/// A decoded upload, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Stores recipe images under the media root and maps them to public URLs.
pub struct ImageService {
    root: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl ImageService {
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_path),
            url_prefix: format!("/{}", config.url_prefix.trim_matches('/')),
            max_bytes: config.max_image_bytes,
        }
    }

    /// Decode a `data:image/<ext>;base64,<payload>` URI.
    pub fn decode(&self, data_uri: &str) -> Result<DecodedImage, ImageError> {
        let rest = data_uri
            .trim()
            .strip_prefix("data:")
            .ok_or(ImageError::Malformed)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageError::Malformed)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(ImageError::Malformed)?
            .to_ascii_lowercase();
        let subtype = mime.strip_prefix("image/").ok_or(ImageError::Malformed)?;

        // Only subtypes whose extension maps back to the same mime type.
        let extension = match subtype {
            "jpeg" | "jpg" => "jpg".to_string(),
            other if mime_guess::from_ext(other).first_raw() == Some(mime.as_str()) => {
                other.to_string()
            }
            _ => return Err(ImageError::Malformed),
        };

        // Base64 expands by 4/3; reject before decoding.
        if payload.len() / 4 * 3 > self.max_bytes + 3 {
            return Err(ImageError::TooLarge(self.max_bytes));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| ImageError::Malformed)?;

        if bytes.is_empty() {
            return Err(ImageError::Malformed);
        }
        if bytes.len() > self.max_bytes {
            return Err(ImageError::TooLarge(self.max_bytes));
        }

        Ok(DecodedImage { extension, bytes })
    }

    /// Write a decoded image and return its path relative to the media root.
    pub async fn save(&self, image: &DecodedImage) -> Result<String> {
        let dir = self.root.join(RECIPE_DIR);
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
        }

        let relative = format!("{}/{}.{}", RECIPE_DIR, Uuid::new_v4(), image.extension);
        let file_path = self.root.join(&relative);

        fs::write(&file_path, &image.bytes)
            .await
            .with_context(|| format!("Failed to write image to {}", file_path.display()))?;

        info!(path = %file_path.display(), size = image.bytes.len(), "Saved recipe image");
        Ok(relative)
    }

    /// Delete a stored image. Failures are logged, not returned.
    pub async fn remove(&self, relative: &str) {
        if relative.is_empty() || relative.contains("..") {
            return;
        }
        let file_path = self.root.join(relative);
        if let Err(e) = fs::remove_file(&file_path).await {
            warn!(path = %file_path.display(), error = %e, "Failed to remove image");
        }
    }

    #[must_use]
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative)
    }
}
