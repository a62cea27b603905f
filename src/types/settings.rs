use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Store key the reminder settings live under.
pub const SETTINGS_KEY: &str = "notification-settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettings {
    pub enabled: bool,
    pub daily_reminder: bool,
    pub weekly_reminder: bool,
    pub reminder_time: ReminderTime,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            daily_reminder: false,
            weekly_reminder: false,
            reminder_time: ReminderTime { hour: 9, minute: 0 },
        }
    }
}

/// Partial update coming from the settings panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub daily_reminder: Option<bool>,
    pub weekly_reminder: Option<bool>,
    pub reminder_time: Option<ReminderTime>,
}

impl ReminderSettings {
    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(daily) = update.daily_reminder {
            self.daily_reminder = daily;
        }
        if let Some(weekly) = update.weekly_reminder {
            self.weekly_reminder = weekly;
        }
        if let Some(reminder_time) = update.reminder_time {
            self.reminder_time = reminder_time;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReminderTimeError {
    #[error("invalid reminder time '{0}'; expected HH:MM")]
    Format(String),
    #[error("reminder time '{0}' is out of range")]
    OutOfRange(String),
}

/// Time of day in 24-hour clock, serialized as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn to_time(self) -> time::Time {
        time::Time::from_hms(self.hour, self.minute, 0).unwrap_or(time::Time::MIDNIGHT)
    }
}

impl FromStr for ReminderTime {
    type Err = ReminderTimeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let format_err = || ReminderTimeError::Format(value.to_string());

        let (hour, minute) = value.split_once(':').ok_or_else(format_err)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
            return Err(format_err());
        }

        let hour: u8 = hour.parse().map_err(|_| format_err())?;
        let minute: u8 = minute.parse().map_err(|_| format_err())?;
        ReminderTime::new(hour, minute).ok_or_else(|| ReminderTimeError::OutOfRange(value.to_string()))
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = ReminderTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReminderTime> for String {
    fn from(value: ReminderTime) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
