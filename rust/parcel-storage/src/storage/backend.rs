use async_trait::async_trait;

use crate::ParcelStorageError;

mod memory;
pub use memory::*;

mod fs;
pub use fs::*;

/// A [StorageBackend] is a facade over some generalized storage substrate that
/// is capable of storing and/or retrieving values by some key
#[async_trait]
pub trait StorageBackend: Clone + Send + Sync {
    /// The key type used by this [StorageBackend]
    type Key: Send + Sync;
    /// The value type able to be stored by this [StorageBackend]
    type Value: Send;
    /// The error type produced by this [StorageBackend]
    type Error: Into<ParcelStorageError> + Send;

    /// Store the given value against the given key
    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error>;
    /// Retrieve a value (if any) stored against the given key
    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::{MeasuredStorageBackend, MemoryStorageBackend, StorageBackend, make_target_storage};

    #[tokio::test]
    async fn it_writes_and_reads_a_value() -> Result<()> {
        let (mut storage_backend, _tempdir) = make_target_storage().await?;

        storage_backend.set(vec![1, 2, 3], vec![4, 5, 6]).await?;
        let value = storage_backend.get(&vec![1, 2, 3]).await?;

        assert_eq!(value, Some(vec![4, 5, 6]));
        assert_eq!(storage_backend.get(&vec![9]).await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn it_shares_entries_between_memory_backend_clones() -> Result<()> {
        let mut backend = MemoryStorageBackend::<Vec<u8>, Vec<u8>>::default();
        let reopened = backend.clone();

        backend.set(b"region".to_vec(), b"claimed".to_vec()).await?;

        assert_eq!(
            reopened.get(&b"region".to_vec()).await?,
            Some(b"claimed".to_vec())
        );

        Ok(())
    }

    #[tokio::test]
    async fn it_measures_reads_and_writes() -> Result<()> {
        let (storage_backend, _tempdir) = make_target_storage().await?;
        let mut measured = MeasuredStorageBackend::new(storage_backend);

        measured.set(vec![1, 2, 3], vec![4, 5, 6]).await?;
        measured.set(vec![2, 3, 4], vec![5, 6, 7]).await?;

        for _ in 0..3 {
            assert_eq!(measured.get(&vec![1, 2, 3]).await?, Some(vec![4, 5, 6]));
        }

        assert_eq!(measured.writes(), 2);
        assert_eq!(measured.reads(), 3);

        Ok(())
    }
}
