use std::sync::Arc;

use serde::Serialize;
use warp::{Rejection, Reply};

use crate::config::Settings;
use crate::error;
use crate::service::invite_service::{InviteRequest, InviteService};
use crate::service::mail_service::MailSender;

#[derive(Serialize)]
struct InviteResponse {
    success: bool,
    message: String,
}

pub async fn send_invite(
    request: InviteRequest,
    mailer: Arc<dyn MailSender>,
    settings: Arc<Settings>,
) -> Result<impl Reply, Rejection> {
    let message = InviteService::send_invite(&request, mailer.as_ref(), &settings)
        .await
        .map_err(error::reject)?;
    tracing::info!("Invite mail accepted by {}", settings.mail_provider);
    Ok(warp::reply::json(&InviteResponse {
        success: true,
        message,
    }))
}
