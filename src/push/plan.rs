use crate::types::notify::PermissionState;
use crate::types::settings::{ReminderSettings, ReminderTime};

use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Daily,
    Weekly,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 2] = [ReminderKind::Daily, ReminderKind::Weekly];

    fn days(self) -> i64 {
        match self {
            ReminderKind::Daily => 1,
            ReminderKind::Weekly => 7,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReminderKind::Daily => "Daily reminder",
            ReminderKind::Weekly => "Weekly reminder",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            ReminderKind::Daily => "Time to check and organize your links!",
            ReminderKind::Weekly => "Time for the weekly tidy-up of your links and groups!",
        }
    }

    fn wanted(self, settings: &ReminderSettings) -> bool {
        match self {
            ReminderKind::Daily => settings.daily_reminder,
            ReminderKind::Weekly => settings.weekly_reminder,
        }
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderKind::Daily => f.write_str("daily"),
            ReminderKind::Weekly => f.write_str("weekly"),
        }
    }
}

/// How the fire instant of a reminder is derived from the configured time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Next instant after now at the configured time, plus 0 days (daily)
    /// or 7 days (weekly).
    #[default]
    NextOccurrence,
    /// Now plus 1 or 7 calendar days with the clock set to the configured
    /// time, regardless of the current time of day.
    CalendarOffset,
}

impl FromStr for SchedulePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "next-occurrence" => Ok(SchedulePolicy::NextOccurrence),
            "calendar-offset" => Ok(SchedulePolicy::CalendarOffset),
            other => Err(format!(
                "invalid schedule policy '{other}'; expected next-occurrence or calendar-offset"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    pub fire_at: OffsetDateTime,
    pub delay: Duration,
}

/// Reminders that should be armed for the given settings and permission.
pub fn plan(
    settings: &ReminderSettings,
    permission: PermissionState,
    now: OffsetDateTime,
    policy: SchedulePolicy,
) -> Vec<ScheduledReminder> {
    if !settings.enabled || !permission.is_granted() {
        return Vec::new();
    }

    ReminderKind::ALL
        .into_iter()
        .filter(|kind| kind.wanted(settings))
        .map(|kind| {
            let fire_at = fire_at(now, settings.reminder_time, kind, policy);
            ScheduledReminder {
                kind,
                title: kind.title().to_string(),
                body: kind.body().to_string(),
                fire_at,
                delay: delay_until(now, fire_at),
            }
        })
        .collect()
}

fn fire_at(
    now: OffsetDateTime,
    reminder_time: ReminderTime,
    kind: ReminderKind,
    policy: SchedulePolicy,
) -> OffsetDateTime {
    let clock = reminder_time.to_time();
    match policy {
        SchedulePolicy::CalendarOffset => {
            (now + time::Duration::days(kind.days())).replace_time(clock)
        }
        SchedulePolicy::NextOccurrence => {
            let mut next = now.replace_time(clock);
            // strictly after now, so a reminder that just fired is not re-armed for the same instant
            if next <= now {
                next += time::Duration::days(1);
            }
            match kind {
                ReminderKind::Daily => next,
                ReminderKind::Weekly => next + time::Duration::days(7),
            }
        }
    }
}

fn delay_until(now: OffsetDateTime, at: OffsetDateTime) -> Duration {
    let delay = at - now;
    if delay.is_positive() {
        delay.try_into().unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
