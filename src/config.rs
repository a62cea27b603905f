use crate::push::SchedulePolicy;
use crate::types::notify::NotificationDefaults;

use std::path::PathBuf;
use std::str::FromStr;

/// How the desktop host answers a notification permission request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionPolicy {
    #[default]
    Grant,
    Deny,
}

impl FromStr for PermissionPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grant" => Ok(PermissionPolicy::Grant),
            "deny" => Ok(PermissionPolicy::Deny),
            other => Err(format!(
                "invalid permission policy '{other}'; expected grant or deny"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub store_path: PathBuf,
    pub application_server_key: String,
    pub notification_defaults: NotificationDefaults,
    pub schedule_policy: SchedulePolicy,
    pub permission_policy: PermissionPolicy,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Reminderd".to_string(),
            store_path: "/tmp/reminderd-settings.toml".into(),
            application_server_key: crate::push::DEFAULT_APPLICATION_SERVER_KEY.to_string(),
            notification_defaults: NotificationDefaults::default(),
            schedule_policy: SchedulePolicy::default(),
            permission_policy: PermissionPolicy::default(),
        }
    }
}
