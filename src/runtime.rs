use std::convert::Infallible;
use std::sync::Arc;

use tracing::info;
use warp::Filter;

use crate::config::Settings;
use crate::error;
use crate::handlers::photos::SharedPlaces;
use crate::handlers::{invite, photos};
use crate::service::mail_service::MailSender;
use crate::service::storage_service::ObjectStore;

const MAX_JSON_BYTES: u64 = 1024 * 1024;
const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

pub async fn run_api(
    settings: Arc<Settings>,
    places: SharedPlaces,
    storage: Arc<dyn ObjectStore>,
    mailer: Arc<dyn MailSender>,
) {
    let port = settings.port;

    let mut cors = warp::cors()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);
    for origin in &settings.cors_origins {
        cors = cors.allow_origin(origin.as_str());
    }

    let routes = api_routes(settings, places, storage, mailer)
        .recover(error::handle_rejection)
        .with(cors.build());

    info!("Server running on port {}", port);
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}

/// Full route tree without the CORS wrapper, shared with the HTTP tests.
pub fn api_routes(
    settings: Arc<Settings>,
    places: SharedPlaces,
    storage: Arc<dyn ObjectStore>,
    mailer: Arc<dyn MailSender>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let root = warp::path::end()
        .and(warp::get())
        .map(|| "ICS mail server is running");

    let send_invite = warp::path("send-invite")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_JSON_BYTES))
        .and(warp::body::json())
        .and(with_mailer(mailer))
        .and(with_settings(settings))
        .and_then(invite::send_invite);

    let upload = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_places(places.clone()))
        .and(with_storage(storage.clone()))
        .and_then(photos::upload);

    let upload_photo = warp::path("upload-photo")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_UPLOAD_BYTES))
        .and(warp::body::json())
        .and(with_places(places.clone()))
        .and(with_storage(storage))
        .and_then(photos::upload_photo);

    let places_json = warp::path("places.json")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_places(places.clone()))
        .and_then(photos::list_places);

    let photos_alias = warp::path("photos")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_places(places.clone()))
        .and_then(photos::list_places);

    let update_caption = warp::path("update-caption")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_JSON_BYTES))
        .and(warp::body::json())
        .and(with_places(places.clone()))
        .and_then(photos::update_caption);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_places(places))
        .and_then(photos::health);

    root.or(send_invite)
        .or(upload)
        .or(upload_photo)
        .or(places_json)
        .or(photos_alias)
        .or(update_caption)
        .or(health)
}

fn with_places(
    places: SharedPlaces,
) -> impl Filter<Extract = (SharedPlaces,), Error = Infallible> + Clone {
    warp::any().map(move || places.clone())
}

fn with_storage(
    storage: Arc<dyn ObjectStore>,
) -> impl Filter<Extract = (Arc<dyn ObjectStore>,), Error = Infallible> + Clone {
    warp::any().map(move || storage.clone())
}

fn with_settings(
    settings: Arc<Settings>,
) -> impl Filter<Extract = (Arc<Settings>,), Error = Infallible> + Clone {
    warp::any().map(move || settings.clone())
}

fn with_mailer(
    mailer: Arc<dyn MailSender>,
) -> impl Filter<Extract = (Arc<dyn MailSender>,), Error = Infallible> + Clone {
    warp::any().map(move || mailer.clone())
}
