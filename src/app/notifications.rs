use crate::ports::Host;
use crate::push::ArmedReminderSnapshot;
use crate::service::NotificationStatus;
use crate::state::AppState;
use crate::types::settings::{ReminderTime, SettingsUpdate};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn unsupported() -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Notifications are not supported on this host.",
        }),
    )
}

fn ensure_supported<H: Host>(state: &AppState<H>) -> Result<(), ApiError> {
    if state.service.client().is_supported() {
        Ok(())
    } else {
        Err(unsupported())
    }
}

pub(crate) async fn status<H: Host>(State(state): State<AppState<H>>) -> Json<NotificationStatus> {
    Json(state.service.status())
}

#[derive(Serialize)]
pub(crate) struct EnableResponse {
    pub(crate) enabled: bool,
    pub(crate) status: NotificationStatus,
}

pub(crate) async fn enable<H: Host>(
    State(state): State<AppState<H>>,
) -> Result<Json<EnableResponse>, ApiError> {
    ensure_supported(&state)?;
    let enabled = state.service.enable().await;
    Ok(Json(EnableResponse {
        enabled,
        status: state.service.status(),
    }))
}

pub(crate) async fn disable<H: Host>(
    State(state): State<AppState<H>>,
) -> Result<Json<NotificationStatus>, ApiError> {
    ensure_supported(&state)?;
    state.service.disable().await;
    Ok(Json(state.service.status()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SettingsRequest {
    pub(crate) daily_reminder: Option<bool>,
    pub(crate) weekly_reminder: Option<bool>,
    pub(crate) reminder_time: Option<String>,
}

pub(crate) async fn update_settings<H: Host>(
    State(state): State<AppState<H>>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<NotificationStatus>, ApiError> {
    ensure_supported(&state)?;
    let reminder_time = match request.reminder_time.as_deref() {
        Some(raw) => Some(raw.parse::<ReminderTime>().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "reminderTime must be a 24-hour HH:MM time.",
                }),
            )
        })?),
        None => None,
    };

    state.service.update_settings(&SettingsUpdate {
        daily_reminder: request.daily_reminder,
        weekly_reminder: request.weekly_reminder,
        reminder_time,
    });
    Ok(Json(state.service.status()))
}

#[derive(Serialize)]
pub(crate) struct TestNotificationResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn test_notification<H: Host>(
    State(state): State<AppState<H>>,
) -> Result<Json<TestNotificationResponse>, ApiError> {
    ensure_supported(&state)?;
    if !state.service.client().permission().is_granted() {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "Notification permission has not been granted.",
            }),
        ));
    }
    state.service.send_test_notification();
    Ok(Json(TestNotificationResponse { status: "shown" }))
}

pub(crate) async fn refresh_permission<H: Host>(
    State(state): State<AppState<H>>,
) -> Json<NotificationStatus> {
    state.service.refresh_permission();
    Json(state.service.status())
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn public_key<H: Host>(
    State(state): State<AppState<H>>,
) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.config.application_server_key.trim().to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReminderDebugResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) server_time: OffsetDateTime,
    pub(crate) armed: Vec<ArmedReminderSnapshot>,
}

pub(crate) async fn reminders_debug<H: Host>(
    State(state): State<AppState<H>>,
) -> Json<ReminderDebugResponse> {
    Json(ReminderDebugResponse {
        server_time: state.service.now(),
        armed: state.service.armed_reminders(),
    })
}
