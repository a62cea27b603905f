use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait KeyValueStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Self::Error>;
    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Self::Error>;
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}
