use futures_util::stream;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Encoder, ParcelStorageError};

mod backend;
pub use backend::*;

mod measure;
pub use measure::*;

mod sink;
pub use sink::*;

/// A universal envelope for all compatible combinations of [Encoder] and
/// [StorageBackend] implementations. See the crate documentation for
/// a practical example of usage.
#[derive(Clone)]
pub struct Storage<Encoder, Backend>
where
    Encoder: crate::Encoder,
    Backend: StorageBackend,
{
    /// The [Encoder] used by the [Storage]
    pub encoder: Encoder,
    /// The [StorageBackend] used by the [Storage]
    pub backend: Backend,
}

impl<E, Backend> Storage<E, Backend>
where
    E: Encoder,
    Backend: StorageBackend<Value = Vec<u8>>,
{
    /// Retrieve and decode the record stored against `key`, if any
    pub async fn read<T>(&self, key: &Backend::Key) -> Result<Option<T>, ParcelStorageError>
    where
        T: DeserializeOwned + Send,
    {
        let Some(bytes) = self.backend.get(key).await.map_err(|error| error.into())? else {
            return Ok(None);
        };

        Ok(Some(
            self.encoder
                .decode(&bytes)
                .await
                .map_err(|error| error.into())?,
        ))
    }

    /// Encode a record and store it against `key`
    pub async fn write<T>(&mut self, key: Backend::Key, record: &T) -> Result<(), ParcelStorageError>
    where
        T: Serialize + Sync + std::fmt::Debug,
    {
        let bytes = self
            .encoder
            .encode(record)
            .await
            .map_err(|error| error.into())?;
        self.backend
            .set(key, bytes)
            .await
            .map_err(|error| error.into())
    }
}

impl<E, Backend> Storage<E, Backend>
where
    E: Encoder,
    Backend: StorageSink<Value = Vec<u8>>,
{
    /// Encode every record up front and then hand the whole batch to the
    /// backend. Nothing is written if any record fails to encode.
    pub async fn write_batch<T>(
        &mut self,
        records: Vec<(Backend::Key, T)>,
    ) -> Result<usize, ParcelStorageError>
    where
        T: Serialize + Sync + std::fmt::Debug,
    {
        let mut entries = Vec::with_capacity(records.len());
        for (key, record) in records {
            let bytes = self
                .encoder
                .encode(&record)
                .await
                .map_err(|error| error.into())?;
            entries.push(Ok((key, bytes)));
        }

        let count = entries.len();
        self.backend
            .write(stream::iter(entries))
            .await
            .map_err(|error| error.into())?;

        Ok(count)
    }
}
