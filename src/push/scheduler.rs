use super::client::NotificationClient;
use super::plan::{ReminderKind, SchedulePolicy, ScheduledReminder, plan};
use crate::ports;
use crate::types::settings::ReminderSettings;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info};

struct ArmedReminder {
    reminder: ScheduledReminder,
    scheduled_at: OffsetDateTime,
    handle: AbortHandle,
}

impl ArmedReminder {
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmedReminderSnapshot {
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fire_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub finished: bool,
}

/// Keeps at most one armed reminder per kind and brings the armed set in
/// line with the reminders the settings ask for.
pub struct ReminderScheduler<T, N, P> {
    time: T,
    client: NotificationClient<N, P>,
    policy: SchedulePolicy,
    armed: Mutex<BTreeMap<ReminderKind, ArmedReminder>>,
    fired: Option<mpsc::UnboundedSender<ReminderKind>>,
}

impl<T, N, P> ReminderScheduler<T, N, P>
where
    T: ports::TimeProvider,
    N: ports::NotificationHost,
    P: ports::PushService,
{
    pub fn new(time: T, client: NotificationClient<N, P>, policy: SchedulePolicy) -> Self {
        Self {
            time,
            client,
            policy,
            armed: Mutex::new(BTreeMap::new()),
            fired: None,
        }
    }

    /// Reports the kind of every reminder whose timer ran to completion.
    pub fn with_fired_channel(mut self, fired: mpsc::UnboundedSender<ReminderKind>) -> Self {
        self.fired = Some(fired);
        self
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// The clock reminders are planned against.
    pub fn now(&self) -> OffsetDateTime {
        self.time.now()
    }

    /// Arms, keeps or cancels reminders so that exactly the planned ones are
    /// pending. Returns the kinds that are armed afterwards.
    pub fn reconcile(&self, settings: &ReminderSettings) -> Vec<ReminderKind> {
        let now = self.time.now();
        let wanted = plan(settings, self.client.permission(), now, self.policy);
        let mut armed = self.armed();

        for kind in ReminderKind::ALL {
            if wanted.iter().any(|reminder| reminder.kind == kind) {
                continue;
            }
            if let Some(existing) = armed.remove(&kind) {
                existing.abort();
                debug!(%kind, "reminder cancelled");
            }
        }

        for reminder in wanted {
            if let Some(existing) = armed.get(&reminder.kind)
                && !existing.is_finished()
                && same_reminder(&existing.reminder, &reminder)
            {
                continue;
            }
            if let Some(existing) = armed.remove(&reminder.kind) {
                existing.abort();
            }
            let kind = reminder.kind;
            let entry = self.arm(reminder, now);
            armed.insert(kind, entry);
        }

        armed.keys().copied().collect()
    }

    pub fn cancel_all(&self) {
        let mut armed = self.armed();
        for (kind, reminder) in std::mem::take(&mut *armed) {
            reminder.abort();
            debug!(%kind, "reminder cancelled");
        }
    }

    pub fn snapshot(&self) -> Vec<ArmedReminderSnapshot> {
        self.armed()
            .values()
            .map(|armed| ArmedReminderSnapshot {
                kind: armed.reminder.kind,
                title: armed.reminder.title.clone(),
                body: armed.reminder.body.clone(),
                fire_at: armed.reminder.fire_at,
                scheduled_at: armed.scheduled_at,
                finished: armed.is_finished(),
            })
            .collect()
    }

    fn arm(&self, reminder: ScheduledReminder, now: OffsetDateTime) -> ArmedReminder {
        info!(
            kind = %reminder.kind,
            fire_at = %reminder.fire_at,
            delay_secs = reminder.delay.as_secs(),
            "reminder armed"
        );
        let task = self.client.schedule_reminder(
            &self.time,
            &reminder.title,
            &reminder.body,
            reminder.delay,
        );
        let handle = task.abort_handle();
        if let Some(fired) = self.fired.clone() {
            let kind = reminder.kind;
            tokio::spawn(async move {
                if task.await.is_ok() {
                    let _ = fired.send(kind);
                }
            });
        }
        ArmedReminder {
            reminder,
            scheduled_at: now,
            handle,
        }
    }

    fn armed(&self) -> MutexGuard<'_, BTreeMap<ReminderKind, ArmedReminder>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, N, P> Drop for ReminderScheduler<T, N, P> {
    fn drop(&mut self) {
        let armed = self.armed.get_mut().unwrap_or_else(PoisonError::into_inner);
        for reminder in armed.values() {
            reminder.abort();
        }
    }
}

fn same_reminder(armed: &ScheduledReminder, wanted: &ScheduledReminder) -> bool {
    armed.fire_at == wanted.fire_at && armed.title == wanted.title && armed.body == wanted.body
}
