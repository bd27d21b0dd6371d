use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Records are matched by coordinates within ~1e-4 degrees on both axes.
pub const COORDS_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coords {
    pub fn approx_eq(&self, other: &Coords) -> bool {
        (self.latitude - other.latitude).abs() < COORDS_TOLERANCE
            && (self.longitude - other.longitude).abs() < COORDS_TOLERANCE
    }
}

/// Nested per-photo entry. Only legacy records restored from backup carry a
/// photo list; the upload path never produces one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacePhoto {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub id: String,
    pub coords: Option<Coords>,
    pub thumb_url: String,
    pub orig_url: String,
    pub place_title: String,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub exif_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<PlacePhoto>>,
}

impl PlaceRecord {
    pub fn has_url(&self) -> bool {
        !self.orig_url.is_empty() || !self.thumb_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn coords_match_within_tolerance() {
        let a = Coords { latitude: 55.7512, longitude: 37.6184 };
        let b = Coords { latitude: 55.75125, longitude: 37.61845 };
        let c = Coords { latitude: 55.7522, longitude: 37.6184 };

        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = PlaceRecord {
            id: "1748000000000".to_string(),
            coords: Some(Coords { latitude: 55.75, longitude: 37.62 }),
            thumb_url: "https://bucket/memories/a.jpg".to_string(),
            orig_url: "https://bucket/memories/a.jpg".to_string(),
            place_title: "Gorky Park".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap(),
            filename: "1748000000000_a.jpg".to_string(),
            exif_date: Some("01.06.25".to_string()),
            caption: None,
            photos: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"thumbUrl\""));
        assert!(json.contains("\"origUrl\""));
        assert!(json.contains("\"placeTitle\""));
        assert!(json.contains("\"exifDate\""));
        assert!(!json.contains("\"caption\""));
    }

    #[test]
    fn legacy_record_with_photos_round_trips() {
        let json = r#"{
            "id": "1700000000000",
            "coords": {"latitude": 55.75, "longitude": 37.62},
            "thumbUrl": "https://bucket/memories/old.jpg",
            "origUrl": "https://bucket/memories/old.jpg",
            "placeTitle": "Old walk",
            "timestamp": "2023-11-14T22:13:20Z",
            "filename": "old.jpg",
            "exifDate": "14.11.23",
            "photos": [{"url": "https://bucket/memories/old.jpg", "caption": "first snow"}]
        }"#;

        let record: PlaceRecord = serde_json::from_str(json).unwrap();
        let photos = record.photos.as_ref().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].caption.as_deref(), Some("first snow"));
        assert!(record.has_url());
    }

    #[test]
    fn record_without_urls_reports_no_url() {
        let record = PlaceRecord {
            id: "x".to_string(),
            coords: None,
            thumb_url: String::new(),
            orig_url: String::new(),
            place_title: "broken".to_string(),
            timestamp: Utc::now(),
            filename: String::new(),
            exif_date: None,
            caption: None,
            photos: None,
        };
        assert!(!record.has_url());
    }
}
