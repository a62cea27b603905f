use crate::ports::{self, KeyValueStore};
use crate::push::{ArmedReminderSnapshot, NotificationClient, ReminderKind, ReminderScheduler};
use crate::types::notify::{NotificationOptions, PermissionState};
use crate::types::settings::{ReminderSettings, SETTINGS_KEY, SettingsUpdate};

use serde::Serialize;
use time::OffsetDateTime;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const ENABLED_TAG: &str = "notification-enabled";
const TEST_TAG: &str = "test-notification";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStatus {
    pub supported: bool,
    pub permission: PermissionState,
    pub subscribed: bool,
    pub settings: ReminderSettings,
}

type Client<H> = NotificationClient<<H as ports::Host>::Notifier, <H as ports::Host>::Push>;
type Scheduler<H> = ReminderScheduler<
    <H as ports::Host>::Time,
    <H as ports::Host>::Notifier,
    <H as ports::Host>::Push,
>;

/// The notification settings panel: user actions on one side, the client,
/// the scheduler and persisted settings on the other.
pub struct ReminderService<H: ports::Host> {
    client: Client<H>,
    scheduler: Scheduler<H>,
    store: H::Store,
    settings: Mutex<ReminderSettings>,
    app_name: String,
}

impl<H: ports::Host> ReminderService<H> {
    pub fn new(
        client: Client<H>,
        scheduler: Scheduler<H>,
        store: H::Store,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            scheduler,
            store,
            settings: Mutex::new(ReminderSettings::default()),
            app_name: app_name.into(),
        }
    }

    pub fn client(&self) -> &Client<H> {
        &self.client
    }

    /// Loads persisted settings, adopts an existing subscription and arms
    /// whatever the settings ask for.
    pub async fn start(&self) {
        self.client.refresh_permission();
        self.client.sync_subscription().await;
        let settings = match self.store.get::<ReminderSettings>(SETTINGS_KEY) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                let settings = ReminderSettings::default();
                self.persist(&settings);
                settings
            }
            Err(err) => {
                warn!(error = %err, "failed to load reminder settings; using defaults");
                ReminderSettings::default()
            }
        };
        let armed = {
            let mut guard = self.settings_guard();
            *guard = settings.clone();
            self.scheduler.reconcile(&guard)
        };
        info!(
            enabled = settings.enabled,
            permission = %self.client.permission(),
            armed = armed.len(),
            "reminder service started"
        );
    }

    pub fn settings(&self) -> ReminderSettings {
        self.settings_guard().clone()
    }

    pub fn status(&self) -> NotificationStatus {
        NotificationStatus {
            supported: self.client.is_supported(),
            permission: self.client.permission(),
            subscribed: self.client.subscription().is_some(),
            settings: self.settings(),
        }
    }

    pub fn armed_reminders(&self) -> Vec<ArmedReminderSnapshot> {
        self.scheduler.snapshot()
    }

    pub fn now(&self) -> OffsetDateTime {
        self.scheduler.now()
    }

    /// Asks for permission and, once granted, subscribes and turns reminders
    /// on. Returns whether notifications ended up enabled.
    pub async fn enable(&self) -> bool {
        if !self.client.is_supported() {
            return false;
        }
        if !self.client.request_permission().await {
            info!(permission = %self.client.permission(), "notifications not enabled");
            return false;
        }

        if self.client.subscribe().await.is_none() {
            warn!("continuing without a push subscription");
        }
        self.modify(|settings| settings.enabled = true);
        self.client.show_local_notification(
            "Notifications enabled!",
            NotificationOptions::with_body(format!(
                "You will now get reminders from {}.",
                self.app_name
            ))
            .tag(ENABLED_TAG),
        );
        true
    }

    /// Drops the subscription and turns reminders off. Settings are updated
    /// even when the push service refuses to unsubscribe.
    pub async fn disable(&self) {
        if !self.client.unsubscribe().await && self.client.subscription().is_some() {
            warn!("push subscription could not be removed");
        }
        self.modify(|settings| settings.enabled = false);
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> ReminderSettings {
        self.modify(|settings| settings.apply(update))
    }

    pub fn send_test_notification(&self) {
        self.client.show_local_notification(
            "Test notification",
            NotificationOptions::with_body(format!(
                "This is a test notification from {}!",
                self.app_name
            ))
            .tag(TEST_TAG)
            .require_interaction(),
        );
    }

    /// Picks up a permission change made on the host side.
    pub fn refresh_permission(&self) -> PermissionState {
        let before = self.client.permission();
        let permission = self.client.refresh_permission();
        if permission != before {
            info!(%before, %permission, "notification permission changed on host");
        }
        self.reschedule();
        permission
    }

    pub fn reschedule(&self) -> Vec<ReminderKind> {
        let guard = self.settings_guard();
        self.scheduler.reconcile(&guard)
    }

    /// Re-arms reminders every time one fires so daily and weekly reminders
    /// keep recurring. Ends once the service is dropped.
    pub fn spawn_rearm_loop(
        self: &Arc<Self>,
        mut fired: mpsc::UnboundedReceiver<ReminderKind>,
    ) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(kind) = fired.recv().await {
                let Some(service) = service.upgrade() else {
                    break;
                };
                info!(%kind, "reminder fired");
                service.reschedule();
            }
            debug!("reminder rearm loop stopped");
        })
    }

    /// Settings stay locked until they are persisted and the timers match
    /// them, so concurrent updates land in order.
    fn modify(&self, apply: impl FnOnce(&mut ReminderSettings)) -> ReminderSettings {
        let mut guard = self.settings_guard();
        apply(&mut guard);
        self.persist(&guard);
        self.scheduler.reconcile(&guard);
        guard.clone()
    }

    fn persist(&self, settings: &ReminderSettings) {
        if let Err(err) = self.store.set(SETTINGS_KEY, settings) {
            error!(error = %err, "failed to persist reminder settings");
        }
    }

    fn settings_guard(&self) -> MutexGuard<'_, ReminderSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
