use async_trait::async_trait;
use futures_util::Stream;

use crate::StorageBackend;

/// A trait that may be implemented by any [`StorageBackend`] that has the
/// ability to efficiently persist contents when provided in bulk (as compared
/// to writing entries individually).
#[async_trait]
pub trait StorageSink: StorageBackend {
    /// Consume a [`Stream`] of entries, persisting them to the
    /// [`StorageBackend`]
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
            > + Send;
}
