use crate::types::notify::Subscription;

pub trait PushService: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type SubscribeFut<'a>: Future<Output = Result<Subscription, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type UnsubscribeFut<'a>: Future<Output = Result<bool, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type CurrentFut<'a>: Future<Output = Result<Option<Subscription>, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn is_supported(&self) -> bool;
    fn subscribe<'a>(&'a self, application_server_key: &'a [u8]) -> Self::SubscribeFut<'a>;
    fn unsubscribe<'a>(&'a self, subscription: &'a Subscription) -> Self::UnsubscribeFut<'a>;
    fn current_subscription<'a>(&'a self) -> Self::CurrentFut<'a>;
}
