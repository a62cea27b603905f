use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Notification permission as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An active push registration. Opaque to everything but the push service
/// that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub auth: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: Option<String>,
    pub tag: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    #[serde(default)]
    pub require_interaction: bool,
}

impl NotificationOptions {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn require_interaction(mut self) -> Self {
        self.require_interaction = true;
        self
    }
}

/// Icon and badge applied to local notifications that don't set their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDefaults {
    pub icon: Option<String>,
    pub badge: Option<String>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            icon: Some("/apple-touch-icon.png".to_string()),
            badge: Some("/favicon.svg".to_string()),
        }
    }
}

impl NotificationDefaults {
    pub(crate) fn apply(&self, mut options: NotificationOptions) -> NotificationOptions {
        if options.icon.is_none() {
            options.icon = self.icon.clone();
        }
        if options.badge.is_none() {
            options.badge = self.badge.clone();
        }
        options
    }
}
