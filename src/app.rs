use crate::ports::Host;
use crate::state::AppState;

use axum::Router;
use axum::routing::{get, post, put};

mod notifications;

pub fn app<H: Host>(state: AppState<H>) -> Router {
    Router::new()
        .route("/api/notifications", get(notifications::status::<H>))
        .route(
            "/api/notifications/enable",
            post(notifications::enable::<H>),
        )
        .route(
            "/api/notifications/disable",
            post(notifications::disable::<H>),
        )
        .route(
            "/api/notifications/settings",
            put(notifications::update_settings::<H>),
        )
        .route(
            "/api/notifications/test",
            post(notifications::test_notification::<H>),
        )
        .route(
            "/api/notifications/permission/refresh",
            post(notifications::refresh_permission::<H>),
        )
        .route("/api/push/public-key", get(notifications::public_key::<H>))
        .route(
            "/api/debug/reminders",
            get(notifications::reminders_debug::<H>),
        )
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::push::{DEFAULT_APPLICATION_SERVER_KEY, SchedulePolicy};
    use crate::service::tests::{Fixture, fixture};
    use crate::test_support::{TestHost, TestNotifier, settle};
    use crate::types::notify::PermissionState;

    use axum::body::Body;
    use axum::body::to_bytes;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::Value as JsonValue;
    use serde_json::from_slice as json_from_slice;
    use tower::ServiceExt;

    fn router(fixture: &Fixture) -> Router {
        app(AppState::<TestHost> {
            config: AppConfig::default(),
            service: std::sync::Arc::clone(&fixture.service),
        })
    }

    async fn started(notifier: TestNotifier) -> Fixture {
        let fixture = fixture(notifier, SchedulePolicy::NextOccurrence);
        fixture.service.start().await;
        fixture
    }

    async fn send(
        router: Router,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, JsonValue) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .oneshot(request.body(body).expect("build request"))
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload = if bytes.is_empty() {
            JsonValue::Null
        } else {
            json_from_slice(&bytes).expect("parse json")
        };
        (status, payload)
    }

    #[tokio::test]
    async fn app__should_return_ok_on_health_endpoint() {
        // Given
        let fixture = started(TestNotifier::granting()).await;

        // When
        let response = router(&fixture)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn status__should_report_initial_state() {
        // Given
        let fixture = started(TestNotifier::granting()).await;

        // When
        let (status, payload) =
            send(router(&fixture), Method::GET, "/api/notifications", None).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["supported"], true);
        assert_eq!(payload["permission"], "default");
        assert_eq!(payload["subscribed"], false);
        assert_eq!(payload["settings"]["enabled"], false);
        assert_eq!(payload["settings"]["reminderTime"], "09:00");
    }

    #[tokio::test]
    async fn enable__should_grant_and_subscribe() {
        // Given
        let fixture = started(TestNotifier::granting()).await;

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::POST,
            "/api/notifications/enable",
            None,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["enabled"], true);
        assert_eq!(payload["status"]["permission"], "granted");
        assert_eq!(payload["status"]["subscribed"], true);
        assert_eq!(payload["status"]["settings"]["enabled"], true);
    }

    #[tokio::test]
    async fn enable__should_report_denied_permission() {
        // Given
        let fixture =
            started(TestNotifier::answering(Some(PermissionState::Denied))).await;

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::POST,
            "/api/notifications/enable",
            None,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["enabled"], false);
        assert_eq!(payload["status"]["permission"], "denied");
        assert_eq!(payload["status"]["settings"]["enabled"], false);
    }

    #[tokio::test]
    async fn enable__should_return_unavailable_when_host_unsupported() {
        // Given
        let fixture = started(TestNotifier::unsupported()).await;

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::POST,
            "/api/notifications/enable",
            None,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(
            payload["error"]
                .as_str()
                .expect("error message")
                .contains("not supported")
        );
        assert_eq!(fixture.notifier.requests(), 0);
    }

    #[tokio::test]
    async fn disable__should_unsubscribe_and_turn_off() {
        // Given
        let fixture = started(TestNotifier::granting()).await;
        fixture.service.enable().await;

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::POST,
            "/api/notifications/disable",
            None,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["subscribed"], false);
        assert_eq!(payload["settings"]["enabled"], false);
        assert_eq!(fixture.push.unsubscribe_calls(), 1);
    }

    #[tokio::test]
    async fn update_settings__should_apply_partial_update_and_arm() {
        // Given
        let fixture = started(TestNotifier::granting()).await;
        fixture.service.enable().await;

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::PUT,
            "/api/notifications/settings",
            Some(r#"{"dailyReminder":true,"reminderTime":"7:30"}"#),
        )
        .await;
        settle().await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["settings"]["dailyReminder"], true);
        assert_eq!(payload["settings"]["weeklyReminder"], false);
        assert_eq!(payload["settings"]["reminderTime"], "07:30");
        assert_eq!(fixture.service.armed_reminders().len(), 1);
    }

    #[tokio::test]
    async fn update_settings__should_reject_malformed_time() {
        // Given
        let fixture = started(TestNotifier::granting()).await;

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::PUT,
            "/api/notifications/settings",
            Some(r#"{"reminderTime":"25:00"}"#),
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            payload["error"]
                .as_str()
                .expect("error message")
                .contains("HH:MM")
        );
        assert_eq!(fixture.service.settings().reminder_time.to_string(), "09:00");
    }

    #[tokio::test]
    async fn test_notification__should_conflict_without_permission() {
        // Given
        let fixture = started(TestNotifier::granting()).await;

        // When
        let (status, _) = send(
            router(&fixture),
            Method::POST,
            "/api/notifications/test",
            None,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(fixture.notifier.shown().is_empty());
    }

    #[tokio::test]
    async fn test_notification__should_show_once_granted() {
        // Given
        let fixture = started(TestNotifier::granting()).await;
        fixture.service.enable().await;

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::POST,
            "/api/notifications/test",
            None,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "shown");
        assert!(
            fixture
                .notifier
                .shown_titles()
                .contains(&"Test notification".to_string())
        );
    }

    #[tokio::test]
    async fn refresh_permission__should_pick_up_host_change() {
        // Given
        let fixture = started(TestNotifier::granting()).await;
        fixture.notifier.set_permission(PermissionState::Denied);

        // When
        let (status, payload) = send(
            router(&fixture),
            Method::POST,
            "/api/notifications/permission/refresh",
            None,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["permission"], "denied");
    }

    #[tokio::test]
    async fn public_key__should_return_configured_key() {
        // Given
        let fixture = started(TestNotifier::granting()).await;

        // When
        let (status, payload) =
            send(router(&fixture), Method::GET, "/api/push/public-key", None).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["publicKey"], DEFAULT_APPLICATION_SERVER_KEY);
    }

    #[tokio::test]
    async fn reminders_debug__should_list_armed_reminders() {
        // Given
        let fixture = started(TestNotifier::granting()).await;
        fixture.service.enable().await;
        fixture.service.update_settings(&crate::types::settings::SettingsUpdate {
            weekly_reminder: Some(true),
            ..Default::default()
        });

        // When
        let (status, payload) =
            send(router(&fixture), Method::GET, "/api/debug/reminders", None).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["serverTime"], "2024-01-01T00:00:00Z");
        let armed = payload["armed"].as_array().expect("armed list");
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0]["kind"], "weekly");
        assert_eq!(armed[0]["fireAt"], "2024-01-08T09:00:00Z");
        assert_eq!(armed[0]["scheduledAt"], "2024-01-01T00:00:00Z");
    }
}
