use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::ParcelStorageError;

mod cbor;
pub use cbor::*;

mod json;
pub use json::*;

/// An [Encoder] converts records to and from their persisted bytes
#[async_trait]
pub trait Encoder: Clone + Send + Sync {
    /// The error type produced by this [Encoder]
    type Error: Into<ParcelStorageError>;

    /// Encode a serializable record into bytes.
    async fn encode<T>(&self, record: &T) -> Result<Vec<u8>, Self::Error>
    where
        T: Serialize + Sync + std::fmt::Debug;

    /// Decode bytes into some deserializable record.
    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + Send;
}
