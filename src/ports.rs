pub mod notify;
pub mod push;
pub mod store;
pub mod time;

pub use self::notify::NotificationHost;
pub use self::push::PushService;
pub use self::store::KeyValueStore;
pub use self::time::TimeProvider;

/// Bundles the host capabilities a running service is wired to.
pub trait Host: Send + Sync + 'static {
    type Time: TimeProvider;
    type Notifier: NotificationHost;
    type Push: PushService;
    type Store: KeyValueStore;
}
