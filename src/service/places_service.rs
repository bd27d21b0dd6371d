use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::place::{Coords, PlaceRecord};
use crate::service::storage_service::ObjectStore;

pub const BACKUP_KEY: &str = "backups/places.json";

/// The ordered places document. The backup object is authoritative at
/// startup; during the process lifetime this working copy is the single
/// source of truth and is written to the local file and the backup key after
/// every mutation. Callers share it behind `Arc<tokio::sync::Mutex<_>>`.
pub struct PlacesStore {
    file_path: PathBuf,
    storage: Arc<dyn ObjectStore>,
    records: Vec<PlaceRecord>,
}

impl PlacesStore {
    pub fn new(file_path: PathBuf, storage: Arc<dyn ObjectStore>) -> Self {
        Self {
            file_path,
            storage,
            records: Vec::new(),
        }
    }

    /// Overwrites the working copy from the backup object. A missing backup
    /// means no data exists, whatever the local file says; a fetch error
    /// falls back to the local file. Never fails the process.
    pub async fn restore(&mut self) {
        match self.storage.get_object(BACKUP_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<PlaceRecord>>(&bytes) {
                Ok(records) => {
                    info!("Restored {} places from backup", records.len());
                    self.records = records;
                    self.write_local();
                }
                Err(err) => {
                    warn!("Backup document is not parseable, starting empty: {}", err);
                    self.records = Vec::new();
                }
            },
            Ok(None) => {
                info!("No backup found, starting with an empty places document");
                self.records = Vec::new();
                if self.file_path.exists() {
                    if let Err(err) = fs::remove_file(&self.file_path) {
                        warn!("Failed to discard stale local document: {}", err);
                    }
                }
            }
            Err(err) => {
                warn!("Failed to fetch backup, falling back to local file: {}", err);
                self.records = self.read_local();
                info!("Loaded {} places from local file", self.records.len());
            }
        }
    }

    /// Appends a record and persists. Ids are timestamp-derived, so two
    /// uploads in the same millisecond would collide; a suffix keeps them
    /// unique. Persistence failures are logged, never surfaced.
    pub async fn append(&mut self, mut record: PlaceRecord) {
        if self.records.iter().any(|existing| existing.id == record.id) {
            let base = record.id.clone();
            let mut suffix = 1;
            while self
                .records
                .iter()
                .any(|existing| existing.id == format!("{}-{}", base, suffix))
            {
                suffix += 1;
            }
            record.id = format!("{}-{}", base, suffix);
        }
        self.records.push(record);
        self.persist().await;
    }

    /// Sets the caption of the first record whose coordinates match within
    /// tolerance. When the record carries a nested photo list and an index
    /// was supplied, the indexed photo is captioned instead. Returns false
    /// when nothing matches.
    pub async fn update_caption(
        &mut self,
        coords: &Coords,
        photo_index: Option<usize>,
        caption: &str,
    ) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| {
            record
                .coords
                .as_ref()
                .is_some_and(|existing| existing.approx_eq(coords))
        }) else {
            return false;
        };

        match (photo_index, record.photos.as_mut()) {
            (Some(index), Some(photos)) if index < photos.len() => {
                photos[index].caption = Some(caption.to_string());
            }
            _ => record.caption = Some(caption.to_string()),
        }
        self.persist().await;
        true
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[PlaceRecord] {
        &self.records
    }

    /// Out-of-band cleanup: drops records that lost both URLs. Returns the
    /// number of dropped records.
    pub async fn prune_missing_urls(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.has_url());
        let removed = before - self.records.len();
        if removed > 0 {
            info!("Pruned {} places without URLs", removed);
            self.persist().await;
        }
        removed
    }

    async fn persist(&self) {
        self.write_local();
        match serde_json::to_vec_pretty(&self.records) {
            Ok(bytes) => {
                if let Err(err) = self
                    .storage
                    .put_object(BACKUP_KEY, bytes, "application/json", false)
                    .await
                {
                    warn!("Failed to upload places backup: {}", err);
                }
            }
            Err(err) => warn!("Failed to serialize places document: {}", err),
        }
    }

    fn read_local(&self) -> Vec<PlaceRecord> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        if content.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(err) => {
                warn!("Local places document is not parseable, ignoring: {}", err);
                Vec::new()
            }
        }
    }

    fn write_local(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("Failed to create data directory: {}", err);
                return;
            }
        }
        match serde_json::to_string_pretty(&self.records) {
            Ok(json) => {
                if let Err(err) = fs::write(&self.file_path, json) {
                    warn!("Failed to write local places document: {}", err);
                }
            }
            Err(err) => warn!("Failed to serialize places document: {}", err),
        }
    }
}
