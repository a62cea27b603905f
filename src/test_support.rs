use crate::ports;
use crate::types::notify::{NotificationOptions, PermissionState, Subscription};

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::oneshot;

pub(crate) fn at(raw: &str) -> OffsetDateTime {
    OffsetDateTime::parse(raw, &Rfc3339).expect("parse timestamp")
}

/// Lets spawned timer tasks run after their sleeps were released.
pub(crate) async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug)]
pub(crate) struct TestHostError;

impl std::fmt::Display for TestHostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("test host error")
    }
}

#[derive(Clone)]
pub(crate) struct TestTime {
    now: Arc<Mutex<OffsetDateTime>>,
    sleeps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl TestTime {
    pub(crate) fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            durations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn set_now(&self, now: OffsetDateTime) {
        *self.now.lock().expect("now lock") = now;
    }

    pub(crate) fn sleep_durations(&self) -> Vec<Duration> {
        self.durations.lock().expect("durations lock").clone()
    }

    pub(crate) fn trigger_all(&self) {
        let mut sends = self.sleeps.lock().expect("sleeps lock");
        for sender in sends.drain(..) {
            let _ = sender.send(());
        }
    }
}

pub(crate) struct ManualSleep {
    receiver: oneshot::Receiver<()>,
}

impl Future for ManualSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl ports::TimeProvider for TestTime {
    type Sleep<'a>
        = ManualSleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        let (sender, receiver) = oneshot::channel();
        self.durations
            .lock()
            .expect("durations lock")
            .push(duration);
        self.sleeps.lock().expect("sleeps lock").push(sender);
        ManualSleep { receiver }
    }
}

/// Notification host that answers permission requests with a fixed outcome.
/// `None` makes the request fail.
#[derive(Clone)]
pub(crate) struct TestNotifier {
    pub(crate) supported: bool,
    pub(crate) permission: Arc<Mutex<PermissionState>>,
    pub(crate) answer: Arc<Mutex<Option<PermissionState>>>,
    pub(crate) requests: Arc<Mutex<usize>>,
    pub(crate) shown: Arc<Mutex<Vec<(String, NotificationOptions)>>>,
}

impl TestNotifier {
    pub(crate) fn answering(answer: Option<PermissionState>) -> Self {
        Self {
            supported: true,
            permission: Arc::new(Mutex::new(PermissionState::Default)),
            answer: Arc::new(Mutex::new(answer)),
            requests: Arc::new(Mutex::new(0)),
            shown: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn granting() -> Self {
        Self::answering(Some(PermissionState::Granted))
    }

    pub(crate) fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::granting()
        }
    }

    pub(crate) fn set_permission(&self, permission: PermissionState) {
        *self.permission.lock().expect("permission lock") = permission;
    }

    pub(crate) fn requests(&self) -> usize {
        *self.requests.lock().expect("requests lock")
    }

    pub(crate) fn shown(&self) -> Vec<(String, NotificationOptions)> {
        self.shown.lock().expect("shown lock").clone()
    }

    pub(crate) fn shown_titles(&self) -> Vec<String> {
        self.shown().into_iter().map(|(title, _)| title).collect()
    }
}

impl ports::NotificationHost for TestNotifier {
    type Error = TestHostError;
    type PermissionFut<'a>
        = std::future::Ready<Result<PermissionState, Self::Error>>
    where
        Self: 'a;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> PermissionState {
        *self.permission.lock().expect("permission lock")
    }

    fn request_permission<'a>(&'a self) -> Self::PermissionFut<'a> {
        *self.requests.lock().expect("requests lock") += 1;
        let answer = *self.answer.lock().expect("answer lock");
        match answer {
            Some(permission) => {
                self.set_permission(permission);
                std::future::ready(Ok(permission))
            }
            None => std::future::ready(Err(TestHostError)),
        }
    }

    fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), Self::Error> {
        self.shown
            .lock()
            .expect("shown lock")
            .push((title.to_string(), options.clone()));
        Ok(())
    }
}

/// Push service that hands out numbered endpoints and records every call.
#[derive(Clone)]
pub(crate) struct TestPush {
    pub(crate) supported: bool,
    pub(crate) fail: Arc<Mutex<bool>>,
    pub(crate) unsubscribe_result: Arc<Mutex<bool>>,
    pub(crate) current: Arc<Mutex<Option<Subscription>>>,
    pub(crate) subscribe_keys: Arc<Mutex<Vec<Vec<u8>>>>,
    pub(crate) unsubscribe_calls: Arc<Mutex<usize>>,
    issued: Arc<Mutex<u32>>,
}

impl Default for TestPush {
    fn default() -> Self {
        Self {
            supported: true,
            fail: Arc::new(Mutex::new(false)),
            unsubscribe_result: Arc::new(Mutex::new(true)),
            current: Arc::new(Mutex::new(None)),
            subscribe_keys: Arc::new(Mutex::new(Vec::new())),
            unsubscribe_calls: Arc::new(Mutex::new(0)),
            issued: Arc::new(Mutex::new(0)),
        }
    }
}

impl TestPush {
    pub(crate) fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::default()
        }
    }

    pub(crate) fn subscription(endpoint: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            auth: "auth".to_string(),
            created_at: at("2024-01-01T00:00:00Z"),
        }
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        *self.fail.lock().expect("fail lock") = fail;
    }

    pub(crate) fn subscribe_calls(&self) -> usize {
        self.subscribe_keys.lock().expect("subscribe keys lock").len()
    }

    pub(crate) fn unsubscribe_calls(&self) -> usize {
        *self.unsubscribe_calls.lock().expect("unsubscribe calls lock")
    }

    fn failing(&self) -> bool {
        *self.fail.lock().expect("fail lock")
    }
}

impl ports::PushService for TestPush {
    type Error = TestHostError;
    type SubscribeFut<'a>
        = std::future::Ready<Result<Subscription, Self::Error>>
    where
        Self: 'a;
    type UnsubscribeFut<'a>
        = std::future::Ready<Result<bool, Self::Error>>
    where
        Self: 'a;
    type CurrentFut<'a>
        = std::future::Ready<Result<Option<Subscription>, Self::Error>>
    where
        Self: 'a;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn subscribe<'a>(&'a self, application_server_key: &'a [u8]) -> Self::SubscribeFut<'a> {
        self.subscribe_keys
            .lock()
            .expect("subscribe keys lock")
            .push(application_server_key.to_vec());
        if self.failing() {
            return std::future::ready(Err(TestHostError));
        }
        let mut issued = self.issued.lock().expect("issued lock");
        *issued += 1;
        let subscription = Self::subscription(&format!("https://push.test/{}", *issued));
        *self.current.lock().expect("current lock") = Some(subscription.clone());
        std::future::ready(Ok(subscription))
    }

    fn unsubscribe<'a>(&'a self, _subscription: &'a Subscription) -> Self::UnsubscribeFut<'a> {
        *self.unsubscribe_calls.lock().expect("unsubscribe calls lock") += 1;
        if self.failing() {
            return std::future::ready(Err(TestHostError));
        }
        let removed = *self.unsubscribe_result.lock().expect("unsubscribe result lock");
        if removed {
            *self.current.lock().expect("current lock") = None;
        }
        std::future::ready(Ok(removed))
    }

    fn current_subscription<'a>(&'a self) -> Self::CurrentFut<'a> {
        if self.failing() {
            return std::future::ready(Err(TestHostError));
        }
        std::future::ready(Ok(self.current.lock().expect("current lock").clone()))
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    values: Arc<Mutex<HashMap<String, toml::Value>>>,
}

impl MemoryStore {
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.values.lock().expect("values lock").contains_key(key)
    }
}

impl ports::KeyValueStore for MemoryStore {
    type Error = TestHostError;

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Self::Error> {
        let value = self.values.lock().expect("values lock").get(key).cloned();
        value
            .map(|value| value.try_into().map_err(|_| TestHostError))
            .transpose()
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Self::Error> {
        let value = toml::Value::try_from(value).map_err(|_| TestHostError)?;
        self.values
            .lock()
            .expect("values lock")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.values.lock().expect("values lock").remove(key);
        Ok(())
    }
}

pub(crate) struct TestHost;

impl ports::Host for TestHost {
    type Time = TestTime;
    type Notifier = TestNotifier;
    type Push = TestPush;
    type Store = MemoryStore;
}
