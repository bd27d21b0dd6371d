use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use icalendar::{Calendar, CalendarDateTime, Component, Event, EventLike, EventStatus, Property};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::ApiError;
use crate::service::mail_service::{EmailMessage, MailAttachment, MailError, MailSender};

pub const ATTACHMENT_NAME: &str = "invite.ics";
pub const ATTACHMENT_TYPE: &str = "text/calendar";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub city: Option<String>,
    pub place: Option<String>,
    pub date: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug)]
struct InviteFields<'a> {
    city: &'a str,
    place: &'a str,
    date: &'a str,
    time_start: &'a str,
    time_end: &'a str,
}

pub struct InviteService;

impl InviteService {
    /// Validates the form, builds the calendar attachment, and submits the
    /// message. Returns a human-readable confirmation on success.
    pub async fn send_invite<M: MailSender + ?Sized>(
        request: &InviteRequest,
        mailer: &M,
        settings: &Settings,
    ) -> Result<String, ApiError> {
        let fields = validate(request)?;

        let date = NaiveDate::parse_from_str(fields.date, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("Invalid date: {}", fields.date)))?;
        let start = date.and_time(parse_time(fields.time_start)?);
        let end = date.and_time(parse_time(fields.time_end)?);

        let uid = format!("{}@memories", Uuid::new_v4());
        let ics = build_event_ics(
            fields.city,
            fields.place,
            start,
            end,
            settings.event_timezone.name(),
            &uid,
        );

        let recipient = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .unwrap_or(&settings.default_recipient)
            .to_string();
        let mut recipients = vec![recipient.clone()];
        if let Some(copy) = &settings.copy_recipient {
            if !copy.is_empty() && *copy != recipient {
                recipients.push(copy.clone());
            }
        }

        let message = EmailMessage {
            recipients,
            subject: format!("Invitation: {}, {}", fields.city, fields.place),
            html: format!(
                "<p>See you soon in <b>{}</b>!<br>📍 {}<br>📅 {}<br>⏰ {}–{}</p>",
                fields.city, fields.place, fields.date, fields.time_start, fields.time_end
            ),
            plaintext: format!(
                "See you soon in {}, {}, {}, {}–{}",
                fields.city, fields.place, fields.date, fields.time_start, fields.time_end
            ),
            attachments: vec![MailAttachment {
                name: ATTACHMENT_NAME.to_string(),
                content_type: ATTACHMENT_TYPE.to_string(),
                content_base64: BASE64.encode(&ics),
            }],
        };

        match mailer.send(&message).await {
            Ok(()) => Ok(format!("Invitation sent to {}", recipient)),
            Err(MailError::Provider(msg)) | Err(MailError::MalformedResponse(msg)) => {
                Err(ApiError::Upstream(msg))
            }
            Err(MailError::Transport(err)) => {
                Err(ApiError::Server(format!("Failed to reach mail provider: {}", err)))
            }
        }
    }
}

fn present<'a>(
    value: &'a Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name);
            None
        }
    }
}

fn validate(request: &InviteRequest) -> Result<InviteFields<'_>, ApiError> {
    let mut missing = Vec::new();

    let city = present(&request.city, "city", &mut missing);
    let place = present(&request.place, "place", &mut missing);
    let date = present(&request.date, "date", &mut missing);
    let time_start = present(&request.time_start, "timeStart", &mut missing);
    let time_end = present(&request.time_end, "timeEnd", &mut missing);

    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing.join(", ")));
    }
    Ok(InviteFields {
        city: city.unwrap(),
        place: place.unwrap(),
        date: date.unwrap(),
        time_start: time_start.unwrap(),
        time_end: time_end.unwrap(),
    })
}

fn parse_time(value: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ApiError::BadRequest(format!("Invalid time: {}", value)))
}

/// One-event REQUEST calendar with timezone-qualified start and end.
pub fn build_event_ics(
    city: &str,
    place: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    tzid: &str,
    uid: &str,
) -> String {
    let event = Event::new()
        .uid(uid)
        .timestamp(Utc::now())
        .starts(CalendarDateTime::WithTimezone {
            date_time: start,
            tzid: tzid.to_string(),
        })
        .ends(CalendarDateTime::WithTimezone {
            date_time: end,
            tzid: tzid.to_string(),
        })
        .summary(&format!("Meeting: {}", place))
        .description(&format!("See you soon! {}, {}.", city, place))
        .location(&format!("{}, {}", place, city))
        .status(EventStatus::Confirmed)
        .append_property(Property::new("SEQUENCE", "0"))
        .append_property(Property::new("TRANSP", "OPAQUE"))
        .done();

    let mut calendar = Calendar::new();
    calendar.append_property(Property::new("METHOD", "REQUEST"));
    calendar.push(event);
    calendar.to_string()
}
