use crate::types::notify::{NotificationOptions, PermissionState};

pub trait NotificationHost: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type PermissionFut<'a>: Future<Output = Result<PermissionState, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn is_supported(&self) -> bool;
    fn permission(&self) -> PermissionState;
    fn request_permission<'a>(&'a self) -> Self::PermissionFut<'a>;
    fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), Self::Error>;
}
