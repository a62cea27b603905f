mod client;
mod plan;
mod scheduler;
pub mod vapid;

pub use client::{ClientError, NotificationClient};
pub use plan::{ReminderKind, SchedulePolicy, ScheduledReminder, plan};
pub use scheduler::{ArmedReminderSnapshot, ReminderScheduler};
pub use vapid::{
    DEFAULT_APPLICATION_SERVER_KEY, KeyError, decode_application_server_key,
    generate_application_server_key,
};
