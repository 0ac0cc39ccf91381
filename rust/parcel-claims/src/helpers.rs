use std::sync::Arc;

use anyhow::Result;
use parcel_storage::{MeasuredStorageBackend, MemoryStorageBackend};

use crate::{ClaimConfig, ClaimRegistry, ClaimedRegion, Owner, RegionCoord};

/// An in-memory backend that counts reads and writes
pub type MeasuredMemoryBackend = MeasuredStorageBackend<MemoryStorageBackend<Vec<u8>, Vec<u8>>>;

/// Opens a [`ClaimRegistry`] over a fresh in-memory backend, for use in
/// tests. The returned backend shares its entries and counters with the one
/// inside the registry.
pub async fn make_registry(
    config: ClaimConfig,
) -> Result<(ClaimRegistry<MeasuredMemoryBackend>, MeasuredMemoryBackend)> {
    let backend = MeasuredStorageBackend::new(MemoryStorageBackend::default());
    let registry = ClaimRegistry::open(backend.clone(), config).await?;
    Ok((registry, backend))
}

/// Claims every region within `radius` regions of `center` for `owner`
pub fn claim_square<Backend>(
    registry: &ClaimRegistry<Backend>,
    center: &RegionCoord,
    radius: i32,
    owner: Owner,
) -> Result<Vec<Arc<ClaimedRegion>>>
where
    Backend: parcel_storage::StorageSink<Key = Vec<u8>, Value = Vec<u8>>,
{
    let mut claimed = Vec::new();
    for dx in -radius..=radius {
        for dz in -radius..=radius {
            claimed.push(registry.claim_region(center.offset(dx, dz), owner, true)?);
        }
    }
    Ok(claimed)
}
