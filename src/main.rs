#![allow(non_snake_case)]

use std::env;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use memoriesServer::config::{AppConfig, Settings};
use memoriesServer::runtime;
use memoriesServer::service::mail_service::build_sender;
use memoriesServer::service::places_service::PlacesStore;
use memoriesServer::service::storage_service::{ObjectStore, S3Storage};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };
    let settings = Settings::load(&config).expect("Invalid configuration");

    let storage: Arc<dyn ObjectStore> = Arc::new(S3Storage::new(&settings));
    let mut places = PlacesStore::new(settings.places_file.clone(), storage.clone());
    places.restore().await;
    let places = Arc::new(Mutex::new(places));

    let mailer = build_sender(&settings).expect("Invalid mail configuration");

    runtime::run_api(Arc::new(settings), places, storage, mailer).await;
}
