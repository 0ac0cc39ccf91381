use crate::{ParcelStorageError, StorageSink};
use async_trait::async_trait;
use base58::ToBase58;
use futures_util::{Stream, TryStreamExt, future::try_join_all};
use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};
use tokio::io::AsyncWriteExt;

use super::StorageBackend;

/// A basic file-system-based [StorageBackend] implementation. All values are
/// stored inside a root directory as files named after their (base58-encoded)
/// keys.
///
/// Every write goes to a sibling `.tmp` file that is synced and then renamed
/// over the final path, so a crash mid-write leaves the previous value intact.
#[derive(Clone)]
pub struct FileSystemStorageBackend<Key, Value>
where
    Key: AsRef<[u8]> + Clone,
    Value: AsRef<[u8]> + From<Vec<u8>> + Clone,
{
    root_dir: PathBuf,
    key_type: PhantomData<Key>,
    value_type: PhantomData<Value>,
}

impl<Key, Value> FileSystemStorageBackend<Key, Value>
where
    Key: AsRef<[u8]> + Clone,
    Value: AsRef<[u8]> + From<Vec<u8>> + Clone,
{
    /// Creates a new [`FileSystemStorageBackend`] that stores files in
    /// `root_dir`.
    pub async fn new<Pathlike>(root_dir: Pathlike) -> Result<Self, ParcelStorageError>
    where
        Pathlike: AsRef<Path>,
    {
        let root_dir = root_dir.as_ref().to_owned();
        tokio::fs::create_dir_all(&root_dir)
            .await
            .map_err(|error| ParcelStorageError::StorageBackend(format!("{error}")))?;
        Ok(Self {
            root_dir,
            key_type: PhantomData,
            value_type: PhantomData,
        })
    }

    /// The directory that holds the stored files
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn make_path(&self, key: &Key) -> PathBuf {
        self.root_dir.join(key.as_ref().to_base58())
    }
}

async fn write_atomically(path: PathBuf, value: &[u8]) -> Result<(), ParcelStorageError> {
    let mut tmp_path = path.clone().into_os_string();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .map_err(|error| ParcelStorageError::StorageBackend(format!("{error}")))?;
    file.write_all(value)
        .await
        .map_err(|error| ParcelStorageError::StorageBackend(format!("{error}")))?;
    file.sync_all()
        .await
        .map_err(|error| ParcelStorageError::StorageBackend(format!("{error}")))?;
    drop(file);

    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|error| ParcelStorageError::StorageBackend(format!("{error}")))
}

#[async_trait]
impl<Key, Value> StorageBackend for FileSystemStorageBackend<Key, Value>
where
    Key: AsRef<[u8]> + Clone + Send + Sync,
    Value: AsRef<[u8]> + Clone + From<Vec<u8>> + Send + Sync,
{
    type Key = Key;
    type Value = Value;
    type Error = ParcelStorageError;

    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error> {
        write_atomically(self.make_path(&key), value.as_ref()).await
    }

    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error> {
        let path = self.make_path(key);
        if !path.exists() {
            return Ok(None);
        }

        tokio::fs::read(path)
            .await
            .map(|value| Some(Value::from(value)))
            .map_err(|error| ParcelStorageError::StorageBackend(format!("{error}")))
    }
}

#[async_trait]
impl<Key, Value> StorageSink for FileSystemStorageBackend<Key, Value>
where
    Key: AsRef<[u8]> + Clone + Send + Sync,
    Value: AsRef<[u8]> + Clone + From<Vec<u8>> + Send + Sync,
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
        let entries: Vec<_> = stream.try_collect().await?;

        let writes = entries.into_iter().map(|(key, value)| {
            let path = self.make_path(&key);
            async move { write_atomically(path, value.as_ref()).await }
        });

        try_join_all(writes).await?;
        tracing::debug!(root = %self.root_dir.display(), "Wrote storage batch");

        Ok(())
    }
}
