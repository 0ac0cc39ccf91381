use crate::ParcelStorageError;

use super::Encoder;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// An [`Encoder`] that writes records as JSON. Slower and larger than
/// [`CborEncoder`](crate::CborEncoder), but the persisted files can be read
/// and edited by hand.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEncoder;

#[async_trait]
impl Encoder for JsonEncoder {
    type Error = ParcelStorageError;

    async fn encode<T>(&self, record: &T) -> Result<Vec<u8>, Self::Error>
    where
        T: Serialize + Sync + std::fmt::Debug,
    {
        serde_json::to_vec(record)
            .map_err(|error| ParcelStorageError::EncodeFailed(format!("{error}")))
    }

    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + Send,
    {
        serde_json::from_slice::<T>(bytes)
            .map_err(|error| ParcelStorageError::DecodeFailed(format!("{error}")))
    }
}
