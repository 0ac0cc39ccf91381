use crate::ParcelStorageError;

use super::Encoder;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// A basic [`Encoder`] implementation that encodes records as IPLD-compatible
/// CBOR
#[derive(Clone, Copy, Debug, Default)]
pub struct CborEncoder;

#[async_trait]
impl Encoder for CborEncoder {
    type Error = ParcelStorageError;

    async fn encode<T>(&self, record: &T) -> Result<Vec<u8>, Self::Error>
    where
        T: Serialize + Sync + std::fmt::Debug,
    {
        serde_ipld_dagcbor::to_vec(record)
            .map_err(|error| ParcelStorageError::EncodeFailed(format!("{error}")))
    }

    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + Send,
    {
        serde_ipld_dagcbor::from_slice::<T>(bytes)
            .map_err(|error| ParcelStorageError::DecodeFailed(format!("{error}")))
    }
}
