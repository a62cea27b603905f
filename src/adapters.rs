use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::config::PermissionPolicy;
use crate::ports;
use crate::push::KeyError;
use crate::types::notify::{NotificationOptions, PermissionState, Subscription};

mod store;

pub use store::{StoreError, TomlFileStore};

/// Store key the loopback push registration lives under.
pub const SUBSCRIPTION_KEY: &str = "push-subscription";
/// Store key the desktop notification permission lives under.
pub const PERMISSION_KEY: &str = "notification-permission";

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("desktop notification failed: {0}")]
pub struct DesktopNotifyError(String);

/// Shows notifications through the desktop notification service. Desktops
/// don't prompt for permission, so requests resolve per the configured policy.
/// The resolved permission is kept in the store and survives restarts.
#[derive(Debug, Clone)]
pub struct DesktopNotifier<S> {
    app_name: Arc<str>,
    policy: PermissionPolicy,
    store: S,
    permission: Arc<Mutex<PermissionState>>,
}

impl<S: ports::KeyValueStore> DesktopNotifier<S> {
    pub fn new(app_name: &str, policy: PermissionPolicy, store: S) -> Self {
        let permission = match store.get::<PermissionState>(PERMISSION_KEY) {
            Ok(permission) => permission.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "failed to load notification permission");
                PermissionState::Default
            }
        };
        Self {
            app_name: Arc::from(app_name),
            policy,
            store,
            permission: Arc::new(Mutex::new(permission)),
        }
    }
}

impl<S: ports::KeyValueStore> ports::NotificationHost for DesktopNotifier<S> {
    type Error = DesktopNotifyError;
    type PermissionFut<'a>
        = std::future::Ready<Result<PermissionState, Self::Error>>
    where
        Self: 'a;

    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> PermissionState {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_permission<'a>(&'a self) -> Self::PermissionFut<'a> {
        let permission = match self.policy {
            PermissionPolicy::Grant => PermissionState::Granted,
            PermissionPolicy::Deny => PermissionState::Denied,
        };
        let mut current = self.permission.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = self.store.set(PERMISSION_KEY, &permission) {
            warn!(error = %err, %permission, "failed to persist notification permission");
        }
        *current = permission;
        std::future::ready(Ok(permission))
    }

    fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), Self::Error> {
        let mut notification = notify_rust::Notification::new();
        notification.appname(&self.app_name).summary(title);
        if let Some(body) = options.body.as_deref() {
            notification.body(body);
        }
        if let Some(icon) = options.icon.as_deref() {
            notification.icon(icon);
        }
        if options.require_interaction {
            notification.timeout(notify_rust::Timeout::Never);
        }
        debug!(title, tag = ?options.tag, "showing desktop notification");
        notification
            .show()
            .map(|_| ())
            .map_err(|err| DesktopNotifyError(err.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoopbackError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("already subscribed with a different application server key")]
    KeyMismatch,
    #[error("subscription store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoopbackRegistration {
    application_server_key: String,
    subscription: Subscription,
}

/// Push service for hosts without a browser push service. Registrations are
/// issued locally and kept in the store so they survive restarts; nothing is
/// ever delivered to them.
#[derive(Debug, Clone)]
pub struct LoopbackPushService<S> {
    store: S,
}

impl<S: ports::KeyValueStore> LoopbackPushService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn registration(&self) -> Result<Option<LoopbackRegistration>, LoopbackError> {
        self.store
            .get(SUBSCRIPTION_KEY)
            .map_err(|err| LoopbackError::Store(err.to_string()))
    }

    fn register(&self, application_server_key: &[u8]) -> Result<Subscription, LoopbackError> {
        if application_server_key.len() != 65 || application_server_key[0] != 0x04 {
            return Err(KeyError::InvalidPoint(application_server_key.len()).into());
        }
        let encoded_key = encode_config(application_server_key, URL_SAFE_NO_PAD);

        if let Some(existing) = self.registration()? {
            if existing.application_server_key == encoded_key {
                return Ok(existing.subscription);
            }
            return Err(LoopbackError::KeyMismatch);
        }

        let mut token = [0u8; 16];
        let mut auth = [0u8; 16];
        OsRng.fill_bytes(&mut token);
        OsRng.fill_bytes(&mut auth);
        let subscription = Subscription {
            endpoint: format!("loopback://push/{}", encode_config(token, URL_SAFE_NO_PAD)),
            auth: encode_config(auth, URL_SAFE_NO_PAD),
            created_at: OffsetDateTime::now_utc(),
        };
        let registration = LoopbackRegistration {
            application_server_key: encoded_key,
            subscription: subscription.clone(),
        };
        self.store
            .set(SUBSCRIPTION_KEY, &registration)
            .map_err(|err| LoopbackError::Store(err.to_string()))?;
        Ok(subscription)
    }

    fn deregister(&self, subscription: &Subscription) -> Result<bool, LoopbackError> {
        match self.registration()? {
            Some(existing) if existing.subscription.endpoint == subscription.endpoint => {
                self.store
                    .remove(SUBSCRIPTION_KEY)
                    .map_err(|err| LoopbackError::Store(err.to_string()))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl<S: ports::KeyValueStore> ports::PushService for LoopbackPushService<S> {
    type Error = LoopbackError;
    type SubscribeFut<'a>
        = std::future::Ready<Result<Subscription, Self::Error>>
    where
        Self: 'a;
    type UnsubscribeFut<'a>
        = std::future::Ready<Result<bool, Self::Error>>
    where
        Self: 'a;
    type CurrentFut<'a>
        = std::future::Ready<Result<Option<Subscription>, Self::Error>>
    where
        Self: 'a;

    fn is_supported(&self) -> bool {
        true
    }

    fn subscribe<'a>(&'a self, application_server_key: &'a [u8]) -> Self::SubscribeFut<'a> {
        std::future::ready(self.register(application_server_key))
    }

    fn unsubscribe<'a>(&'a self, subscription: &'a Subscription) -> Self::UnsubscribeFut<'a> {
        std::future::ready(self.deregister(subscription))
    }

    fn current_subscription<'a>(&'a self) -> Self::CurrentFut<'a> {
        std::future::ready(
            self.registration()
                .map(|registration| registration.map(|registration| registration.subscription)),
        )
    }
}

/// Production wiring: tokio timers, desktop notifications, loopback push and
/// the TOML settings file.
pub struct DesktopHost;

impl ports::Host for DesktopHost {
    type Time = TokioTimeProvider;
    type Notifier = DesktopNotifier<TomlFileStore>;
    type Push = LoopbackPushService<TomlFileStore>;
    type Store = TomlFileStore;
}
