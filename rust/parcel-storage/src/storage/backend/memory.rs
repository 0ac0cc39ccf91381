use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures_util::{Stream, TryStreamExt};
use tokio::sync::RwLock;

use crate::{ParcelStorageError, StorageSink};

use super::StorageBackend;

/// A trivial implementation of [StorageBackend] - backed by a [HashMap] - where
/// all values are kept in memory and never persisted. Clones share the same
/// entries, which makes it convenient for simulating a process restart in
/// tests.
#[derive(Clone, Default)]
pub struct MemoryStorageBackend<Key, Value>
where
    Key: Eq + std::hash::Hash,
    Value: Clone,
{
    entries: Arc<RwLock<HashMap<Key, Value>>>,
}

impl<Key, Value> MemoryStorageBackend<Key, Value>
where
    Key: Eq + std::hash::Hash,
    Value: Clone,
{
    /// The number of entries currently stored
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been stored yet
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<Key, Value> StorageBackend for MemoryStorageBackend<Key, Value>
where
    Key: Clone + Eq + std::hash::Hash + Send + Sync,
    Value: Clone + Send + Sync,
{
    type Key = Key;
    type Value = Value;
    type Error = ParcelStorageError;

    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error> {
        let mut entries = self.entries.write().await;
        entries.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }
}

#[async_trait]
impl<Key, Value> StorageSink for MemoryStorageBackend<Key, Value>
where
    Key: Clone + Eq + std::hash::Hash + Send + Sync,
    Value: Clone + Send + Sync,
{
    async fn write<EntryStream>(
        &mut self,
        stream: EntryStream,
    ) -> Result<(), <Self as StorageBackend>::Error>
    where
        EntryStream: Stream<
                Item = Result<
                    (
                        <Self as StorageBackend>::Key,
                        <Self as StorageBackend>::Value,
                    ),
                    <Self as StorageBackend>::Error,
                >,
            > + Send,
    {
        // Collect first so a failing stream leaves the map untouched.
        let batch: Vec<_> = stream.try_collect().await?;

        let mut entries = self.entries.write().await;
        entries.extend(batch);

        Ok(())
    }
}
