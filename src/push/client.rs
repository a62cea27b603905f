use crate::ports;
use crate::types::notify::{
    NotificationDefaults, NotificationOptions, PermissionState, Subscription,
};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub(crate) const REMINDER_TAG: &str = "reminder";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("notifications are not supported by this host")]
    HostUnsupported,
    #[error("notification permission is {0}")]
    PermissionDenied(PermissionState),
    #[error("no active push subscription")]
    NotSubscribed,
    #[error("{operation} failed: {message}")]
    HostOperationFailed {
        operation: &'static str,
        message: String,
    },
}

impl ClientError {
    fn host(operation: &'static str, err: impl std::fmt::Display) -> Self {
        ClientError::HostOperationFailed {
            operation,
            message: err.to_string(),
        }
    }

    fn log(&self) {
        match self {
            ClientError::HostOperationFailed { .. } => {
                error!(error = %self, "notification host error")
            }
            _ => debug!(reason = %self, "notification operation skipped"),
        }
    }
}

#[derive(Debug, Default)]
struct ClientState {
    permission: PermissionState,
    subscription: Option<Subscription>,
}

/// Owns the notification permission and the push subscription for one user.
///
/// Clones share state, so a clone handed to a timer task observes permission
/// changes made through the original.
#[derive(Clone)]
pub struct NotificationClient<N, P> {
    notifier: N,
    push: P,
    supported: bool,
    application_server_key: Arc<[u8]>,
    defaults: Arc<NotificationDefaults>,
    state: Arc<Mutex<ClientState>>,
}

impl<N, P> NotificationClient<N, P>
where
    N: ports::NotificationHost,
    P: ports::PushService,
{
    pub fn new(
        notifier: N,
        push: P,
        application_server_key: Vec<u8>,
        defaults: NotificationDefaults,
    ) -> Self {
        let supported = notifier.is_supported() && push.is_supported();
        let permission = if supported {
            notifier.permission()
        } else {
            info!("notifications unsupported by host; notification features disabled");
            PermissionState::Denied
        };

        Self {
            notifier,
            push,
            supported,
            application_server_key: application_server_key.into(),
            defaults: Arc::new(defaults),
            state: Arc::new(Mutex::new(ClientState {
                permission,
                subscription: None,
            })),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn permission(&self) -> PermissionState {
        self.state().permission
    }

    pub fn subscription(&self) -> Option<Subscription> {
        self.state().subscription.clone()
    }

    /// Re-reads the host permission, which may have changed outside this client.
    pub fn refresh_permission(&self) -> PermissionState {
        if !self.supported {
            return PermissionState::Denied;
        }
        let permission = self.notifier.permission();
        self.state().permission = permission;
        permission
    }

    /// Picks up a subscription the host already holds from an earlier run.
    pub async fn sync_subscription(&self) {
        if !self.supported {
            return;
        }
        match self.push.current_subscription().await {
            Ok(subscription) => {
                if let Some(subscription) = subscription.as_ref() {
                    debug!(endpoint = %subscription.endpoint, "found existing push subscription");
                }
                self.state().subscription = subscription;
            }
            Err(err) => ClientError::host("subscription check", err).log(),
        }
    }

    pub async fn request_permission(&self) -> bool {
        match self.try_request_permission().await {
            Ok(permission) => {
                info!(%permission, "notification permission resolved");
                permission.is_granted()
            }
            Err(err) => {
                err.log();
                false
            }
        }
    }

    pub async fn try_request_permission(&self) -> Result<PermissionState, ClientError> {
        self.ensure_supported()?;
        let permission = self
            .notifier
            .request_permission()
            .await
            .map_err(|err| ClientError::host("permission request", err))?;
        self.state().permission = permission;
        Ok(permission)
    }

    pub async fn subscribe(&self) -> Option<Subscription> {
        match self.try_subscribe().await {
            Ok(subscription) => {
                info!(endpoint = %subscription.endpoint, "push subscription created");
                Some(subscription)
            }
            Err(err) => {
                err.log();
                None
            }
        }
    }

    pub async fn try_subscribe(&self) -> Result<Subscription, ClientError> {
        self.ensure_granted()?;
        let subscription = self
            .push
            .subscribe(&self.application_server_key)
            .await
            .map_err(|err| ClientError::host("push subscribe", err))?;
        self.state().subscription = Some(subscription.clone());
        Ok(subscription)
    }

    pub async fn unsubscribe(&self) -> bool {
        match self.try_unsubscribe().await {
            Ok(removed) => {
                if removed {
                    info!("push subscription removed");
                } else {
                    debug!("push service kept the subscription");
                }
                removed
            }
            Err(err) => {
                err.log();
                false
            }
        }
    }

    pub async fn try_unsubscribe(&self) -> Result<bool, ClientError> {
        self.ensure_supported()?;
        let subscription = self.subscription().ok_or(ClientError::NotSubscribed)?;
        let removed = self
            .push
            .unsubscribe(&subscription)
            .await
            .map_err(|err| ClientError::host("push unsubscribe", err))?;
        if removed {
            let mut state = self.state();
            if state.subscription.as_ref() == Some(&subscription) {
                state.subscription = None;
            }
        }
        Ok(removed)
    }

    /// Shows a notification right away. Without granted permission nothing
    /// happens; that is not an error for the caller.
    pub fn show_local_notification(&self, title: &str, options: NotificationOptions) {
        if let Err(err) = self.try_show(title, options) {
            err.log();
        }
    }

    fn try_show(&self, title: &str, options: NotificationOptions) -> Result<(), ClientError> {
        self.ensure_granted()?;
        let options = self.defaults.apply(options);
        self.notifier
            .show(title, &options)
            .map_err(|err| ClientError::host("show notification", err))
    }

    /// Arms a one-shot timer that shows a reminder notification once `delay`
    /// has passed. Aborting the returned handle disarms it.
    pub fn schedule_reminder<T: ports::TimeProvider>(
        &self,
        time: &T,
        title: &str,
        body: &str,
        delay: Duration,
    ) -> JoinHandle<()> {
        let client = self.clone();
        let time = time.clone();
        let title = title.to_string();
        let options = NotificationOptions::with_body(body)
            .tag(REMINDER_TAG)
            .require_interaction();
        tokio::spawn(async move {
            if !delay.is_zero() {
                time.sleep(delay).await;
            }
            debug!(%title, "reminder timer fired");
            client.show_local_notification(&title, options);
        })
    }

    fn ensure_supported(&self) -> Result<(), ClientError> {
        if self.supported {
            Ok(())
        } else {
            Err(ClientError::HostUnsupported)
        }
    }

    fn ensure_granted(&self) -> Result<(), ClientError> {
        self.ensure_supported()?;
        let permission = self.permission();
        if permission.is_granted() {
            Ok(())
        } else {
            Err(ClientError::PermissionDenied(permission))
        }
    }

    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
