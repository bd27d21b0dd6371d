use std::convert::Infallible;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::BufMut;
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use warp::multipart::{FormData, Part};
use warp::{Rejection, Reply};

use crate::error::{self, ApiError};
use crate::models::place::Coords;
use crate::service::places_service::PlacesStore;
use crate::service::storage_service::ObjectStore;
use crate::service::upload_service::{UploadOptions, UploadService, UploadedImage};

pub type SharedPlaces = Arc<Mutex<PlacesStore>>;

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    photo: String,
}

#[derive(Serialize)]
struct UploadPhotoResponse {
    success: bool,
    url: String,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    places_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPhotoRequest {
    pub image_base64: Option<String>,
    pub filename: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionUpdateRequest {
    pub coords: Coords,
    pub photo_index: Option<usize>,
    pub caption: String,
}

/// Multipart upload. The image travels as `photo` (or `file` in older
/// front-end revisions); text parts carry the optional metadata.
pub async fn upload(
    form: FormData,
    places: SharedPlaces,
    storage: Arc<dyn ObjectStore>,
) -> Result<impl Reply, Rejection> {
    let parts: Vec<Part> = form.try_collect().await.map_err(|err| {
        error::reject(ApiError::BadRequest(format!("Invalid multipart payload: {}", err)))
    })?;

    let mut image: Option<UploadedImage> = None;
    let mut options = UploadOptions::default();

    for part in parts {
        let name = part.name().to_string();
        match name.as_str() {
            "photo" | "file" => {
                if image.is_some() {
                    continue;
                }
                let content_type = part
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let filename = part.filename().unwrap_or("photo.jpg").to_string();
                let bytes = part_bytes(part).await?;
                image = Some(UploadedImage { bytes, content_type, filename });
            }
            "gps" => {
                let text = part_text(part).await?;
                match serde_json::from_str::<Coords>(&text) {
                    Ok(coords) => options.gps = Some(coords),
                    Err(err) => tracing::warn!("Ignoring unparseable gps field: {}", err),
                }
            }
            "placeTitle" => options.place_title = Some(part_text(part).await?),
            "caption" => options.caption = Some(part_text(part).await?),
            "exifDate" => options.capture_date = Some(part_text(part).await?),
            _ => {}
        }
    }

    let Some(image) = image else {
        return Err(error::reject(ApiError::BadRequest(
            "No photo attached (expected a 'photo' or 'file' part)".to_string(),
        )));
    };

    let mut store = places.lock().await;
    let url = UploadService::store_photo(storage.as_ref(), &mut store, image, options)
        .await
        .map_err(error::reject)?;
    tracing::info!("Stored photo, {} places total", store.count());

    Ok(warp::reply::json(&UploadResponse { success: true, photo: url }))
}

/// JSON upload variant: `{imageBase64, filename}`, tolerating a data-URL
/// prefix. Follows the same pipeline as the multipart route.
pub async fn upload_photo(
    request: UploadPhotoRequest,
    places: SharedPlaces,
    storage: Arc<dyn ObjectStore>,
) -> Result<impl Reply, Rejection> {
    let encoded = request
        .image_base64
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| error::reject(ApiError::MissingFields("imageBase64".to_string())))?;

    let (content_type, payload) = split_data_url(encoded);
    let bytes = BASE64
        .decode(payload)
        .map_err(|err| error::reject(ApiError::BadRequest(format!("Invalid imageBase64: {}", err))))?;

    let image = UploadedImage {
        bytes,
        content_type: content_type.unwrap_or_else(|| "image/jpeg".to_string()),
        filename: request.filename.unwrap_or_else(|| "photo.jpg".to_string()),
    };

    let mut store = places.lock().await;
    let url = UploadService::store_photo(storage.as_ref(), &mut store, image, UploadOptions::default())
        .await
        .map_err(error::reject)?;

    Ok(warp::reply::json(&UploadPhotoResponse { success: true, url }))
}

pub async fn list_places(places: SharedPlaces) -> Result<impl Reply, Infallible> {
    let store = places.lock().await;
    Ok(warp::reply::json(&store.records().to_vec()))
}

pub async fn update_caption(
    request: CaptionUpdateRequest,
    places: SharedPlaces,
) -> Result<impl Reply, Rejection> {
    let mut store = places.lock().await;
    let updated = store
        .update_caption(&request.coords, request.photo_index, &request.caption)
        .await;
    if updated {
        Ok(warp::reply::json(&SuccessResponse { success: true }))
    } else {
        Err(error::reject(ApiError::NotFound(
            "No place matches the provided coordinates".to_string(),
        )))
    }
}

pub async fn health(places: SharedPlaces) -> Result<impl Reply, Infallible> {
    let store = places.lock().await;
    Ok(warp::reply::json(&HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        places_count: store.count(),
    }))
}

async fn part_bytes(part: Part) -> Result<Vec<u8>, Rejection> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, data| {
            acc.put(data);
            async move { Ok(acc) }
        })
        .await
        .map_err(|err| {
            error::reject(ApiError::BadRequest(format!("Failed to read upload: {}", err)))
        })
}

async fn part_text(part: Part) -> Result<String, Rejection> {
    let bytes = part_bytes(part).await?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

fn split_data_url(encoded: &str) -> (Option<String>, &str) {
    let Some(rest) = encoded.strip_prefix("data:") else {
        return (None, encoded);
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return (None, encoded);
    };
    let content_type = header
        .split(';')
        .next()
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    (content_type, payload)
}
