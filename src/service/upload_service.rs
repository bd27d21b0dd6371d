use chrono::Utc;

use crate::error::ApiError;
use crate::models::place::{Coords, PlaceRecord};
use crate::service::exif;
use crate::service::places_service::PlacesStore;
use crate::service::storage_service::ObjectStore;

pub const SUPPORTED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    // HEIC/HEIF uploads from iOS are stored unconverted.
    "image/heic",
    "image/heif",
];

pub const MEMORIES_PREFIX: &str = "memories";
pub const DEFAULT_PLACE_TITLE: &str = "New place";

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub gps: Option<Coords>,
    pub place_title: Option<String>,
    pub caption: Option<String>,
    /// Client-supplied display date, preferred over EXIF extraction.
    pub capture_date: Option<String>,
}

pub struct UploadService;

impl UploadService {
    /// Stores the image, appends a place record, and returns the public URL.
    pub async fn store_photo<S: ObjectStore + ?Sized>(
        storage: &S,
        places: &mut PlacesStore,
        image: UploadedImage,
        options: UploadOptions,
    ) -> Result<String, ApiError> {
        if image.bytes.is_empty() {
            return Err(ApiError::BadRequest("No file provided".to_string()));
        }
        if !SUPPORTED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Unsupported image type: {}",
                image.content_type
            )));
        }

        let display_date = options
            .capture_date
            .filter(|date| !date.trim().is_empty())
            .or_else(|| exif::capture_date(&image.bytes))
            .unwrap_or_else(exif::today_display_date);

        let now = Utc::now();
        let filename = display_filename(&image.filename, now.timestamp_millis());
        let key = format!("{}/{}", MEMORIES_PREFIX, filename);

        storage
            .put_object(&key, image.bytes, &image.content_type, true)
            .await
            .map_err(|err| ApiError::Upstream(format!("Failed to store image: {}", err)))?;
        let url = storage.object_url(&key);

        let record = PlaceRecord {
            id: now.timestamp_millis().to_string(),
            coords: options.gps,
            thumb_url: url.clone(),
            orig_url: url.clone(),
            place_title: options
                .place_title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PLACE_TITLE.to_string()),
            timestamp: now,
            filename,
            exif_date: Some(display_date),
            caption: options.caption,
            photos: None,
        };
        places.append(record).await;

        Ok(url)
    }
}

fn display_filename(original: &str, millis: i64) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.is_empty() { "photo.jpg".to_string() } else { safe };
    format!("{}_{}", millis, safe)
}
