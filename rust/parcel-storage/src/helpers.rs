use anyhow::Result;

use crate::FileSystemStorageBackend;

type MakeTargetStorageOutput<K> = (FileSystemStorageBackend<K, Vec<u8>>, tempfile::TempDir);

/// Creates a persisted [`StorageBackend`](crate::StorageBackend) rooted in a
/// fresh temporary directory, for use in tests. Keep the returned
/// [`tempfile::TempDir`] alive for as long as the backend is in use.
pub async fn make_target_storage<K>() -> Result<MakeTargetStorageOutput<K>>
where
    K: AsRef<[u8]> + Clone,
{
    let root = tempfile::tempdir()?;
    let storage = FileSystemStorageBackend::<K, Vec<u8>>::new(root.path()).await?;
    Ok((storage, root))
}
