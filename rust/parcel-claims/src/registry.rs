use std::sync::Arc;

use parcel_storage::{CborEncoder, Encoder, Storage, StorageSink};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    ActionKind, ClaimConfig, ClaimError, ClaimIndex, ClaimView, ClaimantGroup, ClaimantPlayer,
    ClaimedRegion, GroupId, Location, Owner, PermissionOverride, PermissionResolver, PlayerId,
    Rank, RecordKey, RegionCoord, RegionRecord, RegionSetting, Relationship, is_owned_around,
    owned_around,
};

mod ledger;
use ledger::*;

/// What a viewer should be told about who owns a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerLabel {
    /// The owner of the location, or `None` for the wilderness
    pub owner: Option<Owner>,
    /// The owner's display name, or the configured wilderness name
    pub name: String,
    /// How the viewer relates to the owner, if there is one
    pub relationship: Option<Relationship>,
}

/// The authoritative store of claimants and claimed regions.
///
/// Lookups and permission checks are synchronous and only read memory, so
/// they can be called from any thread while the host's main loop mutates the
/// registry. Mutations are applied in memory immediately and reach the
/// [`StorageSink`] in batches when [`ClaimRegistry::flush`] is called.
pub struct ClaimRegistry<Backend, Codec = CborEncoder>
where
    Backend: StorageSink<Key = Vec<u8>, Value = Vec<u8>>,
    Codec: Encoder,
{
    config: ClaimConfig,
    ledger: RwLock<Ledger>,
    storage: Mutex<Storage<Codec, Backend>>,
}

impl<Backend> ClaimRegistry<Backend>
where
    Backend: StorageSink<Key = Vec<u8>, Value = Vec<u8>>,
{
    /// Open a registry over `backend`, encoding records as DAG-CBOR. Every
    /// claimant listed in the stored index is loaded up front; regions are
    /// loaded as the host reports them.
    pub async fn open(backend: Backend, config: ClaimConfig) -> Result<Self, ClaimError> {
        Self::open_with_codec(backend, CborEncoder, config).await
    }
}

impl<Backend, Codec> ClaimRegistry<Backend, Codec>
where
    Backend: StorageSink<Key = Vec<u8>, Value = Vec<u8>>,
    Codec: Encoder,
{
    /// Open a registry over `backend`, encoding records with `encoder`
    pub async fn open_with_codec(
        backend: Backend,
        encoder: Codec,
        config: ClaimConfig,
    ) -> Result<Self, ClaimError> {
        config.validate()?;

        let storage = Storage { encoder, backend };
        let mut ledger = Ledger::new(config.clone());

        let index: ClaimIndex = storage
            .read(&RecordKey::Index.to_bytes())
            .await?
            .unwrap_or_default();

        for id in &index.players {
            match storage
                .read::<ClaimantPlayer>(&RecordKey::Player(*id).to_bytes())
                .await?
            {
                Some(player) => ledger.load_player(player),
                None => warn!(player = %id, "Indexed player record is missing"),
            }
        }

        for id in &index.groups {
            match storage
                .read::<ClaimantGroup>(&RecordKey::Group(*id).to_bytes())
                .await?
            {
                Some(group) => ledger.load_group(group).inspect_err(|error| {
                    warn!(group = %id, %error, "Rejected stored group");
                })?,
                None => warn!(group = %id, "Indexed group record is missing"),
            }
        }

        debug!(
            players = index.players.len(),
            groups = index.groups.len(),
            "Opened claim registry"
        );

        Ok(Self {
            config,
            ledger: RwLock::new(ledger),
            storage: Mutex::new(storage),
        })
    }

    /// The configuration the registry was opened with
    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    /// The player record for `id`, created if it does not exist yet
    pub fn get_or_create_player(&self, id: PlayerId) -> ClaimantPlayer {
        self.ledger.write().get_or_create_player(id)
    }

    /// The player record for `id`, if it exists
    pub fn player(&self, id: &PlayerId) -> Option<ClaimantPlayer> {
        self.ledger.read().player(id).cloned()
    }

    /// The group record for `id`, created with `founder` as its owner if it
    /// does not exist yet
    pub fn get_or_create_group(&self, id: GroupId, founder: PlayerId) -> ClaimantGroup {
        self.ledger.write().get_or_create_group(id, founder)
    }

    /// The group record for `id`, if it exists
    pub fn group(&self, id: &GroupId) -> Option<ClaimantGroup> {
        self.ledger.read().group(id).cloned()
    }

    /// The tracked region at `coord`, if any. Never creates or loads one.
    pub fn region(&self, coord: &RegionCoord) -> Option<Arc<ClaimedRegion>> {
        self.ledger.read().region(coord).cloned()
    }

    /// Check whether `owner` could claim the region at `coord` without
    /// claiming it
    pub fn can_claim(
        &self,
        coord: &RegionCoord,
        owner: Owner,
        stop_if_already_claimed: bool,
    ) -> Result<(), ClaimError> {
        self.ledger
            .read()
            .check_claim(coord, &owner, stop_if_already_claimed)
            .map(|_| ())
    }

    /// Give the region at `coord` to `owner`, resetting every slice to the
    /// new owner.
    ///
    /// With `stop_if_already_claimed` set, a region owned by someone else is
    /// left untouched and [`ClaimError::AlreadyClaimed`] is returned.
    pub fn claim_region(
        &self,
        coord: RegionCoord,
        owner: Owner,
        stop_if_already_claimed: bool,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        self.ledger
            .write()
            .claim(coord, owner, stop_if_already_claimed)
    }

    /// Release the region at `coord` on behalf of `actor`
    pub fn unclaim_region(
        &self,
        coord: &RegionCoord,
        actor: PlayerId,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        self.ledger.write().unclaim(coord, actor)
    }

    /// Subdivide a slice of a loaded region on behalf of `actor`. See
    /// [`ClaimedRegion::set_slice_owner`].
    #[allow(clippy::too_many_arguments)]
    pub fn set_slice_owner(
        &self,
        coord: &RegionCoord,
        index: usize,
        from: i32,
        to: i32,
        owner: Option<Owner>,
        fresh: bool,
        actor: PlayerId,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        self.ledger
            .write()
            .set_slice_owner(coord, index, from, to, owner, fresh, actor)
    }

    /// Toggle a setting of a loaded region on behalf of `actor`
    pub fn set_region_setting(
        &self,
        coord: &RegionCoord,
        setting: RegionSetting,
        enabled: bool,
        actor: PlayerId,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        self.ledger
            .write()
            .set_region_setting(coord, setting, enabled, actor)
    }

    fn check_bounds(&self, location: &Location) -> Result<(), ClaimError> {
        if self.config.bounds.contains(location.y) {
            Ok(())
        } else {
            Err(ClaimError::OutOfBounds { y: location.y })
        }
    }

    /// Whether `actor` may perform `action` at `location`
    pub fn can_actor_do(
        &self,
        actor: Option<PlayerId>,
        location: &Location,
        action: ActionKind,
    ) -> Result<bool, ClaimError> {
        self.check_bounds(location)?;
        Ok(PermissionResolver::can_actor_do(
            &*self.ledger.read(),
            actor,
            location,
            action,
        ))
    }

    /// Whether `setting` is in effect at `location`, falling back to the
    /// wilderness settings where nobody owns the land
    pub fn is_setting(&self, location: &Location, setting: RegionSetting) -> bool {
        let ledger = self.ledger.read();
        match ledger.region(&location.region()) {
            Some(region) if region.is_claimed() => region.is_setting(setting),
            _ => ledger.config().wilderness_settings.contains(setting.flag()),
        }
    }

    /// Who owns `location`, as seen by `viewer`
    pub fn owner_name_at(
        &self,
        location: &Location,
        viewer: Option<PlayerId>,
    ) -> Result<OwnerLabel, ClaimError> {
        self.check_bounds(location)?;
        let ledger = self.ledger.read();
        let owner = ledger
            .region(&location.region())
            .and_then(|region| region.owner_at(location.y));

        Ok(match owner {
            None => OwnerLabel {
                owner: None,
                name: self.config.wilderness_name.clone(),
                relationship: None,
            },
            Some(owner) => OwnerLabel {
                owner: Some(owner),
                name: ledger
                    .claimant(&owner)
                    .map(|claimant| claimant.name().to_owned())
                    .unwrap_or_else(|| owner.to_string()),
                relationship: Some(PermissionResolver::relationship(
                    &*ledger, viewer, &owner,
                )),
            },
        })
    }

    /// Every claimed, loaded region within `radius` regions of `center`
    pub fn owned_around(&self, center: &Location, radius: u32) -> Vec<Arc<ClaimedRegion>> {
        owned_around(&*self.ledger.read(), center, radius)
    }

    /// Whether any loaded region within `radius` regions of `center` is
    /// claimed
    pub fn is_owned_around(&self, center: &Location, radius: u32) -> bool {
        is_owned_around(&*self.ledger.read(), center, radius)
    }

    /// Acknowledge `friend` on behalf of `player`
    pub fn add_friend(&self, player: PlayerId, friend: PlayerId) -> bool {
        self.ledger.write().add_friend(player, friend)
    }

    /// Withdraw `player`'s acknowledgment of `friend`
    pub fn remove_friend(&self, player: PlayerId, friend: &PlayerId) -> bool {
        self.ledger.write().remove_friend(player, friend)
    }

    /// Record `player`'s decision for `action` on their land
    pub fn set_player_override(
        &self,
        player: PlayerId,
        action: ActionKind,
        value: PermissionOverride,
    ) {
        self.ledger
            .write()
            .set_player_override(player, action, value)
    }

    /// Record the display name the host knows `player` by
    pub fn set_player_name(&self, player: PlayerId, name: impl Into<String>) {
        self.ledger.write().set_player_name(player, name.into())
    }

    /// Set or clear `player`'s home
    pub fn set_home(&self, player: PlayerId, home: Option<Location>) {
        self.ledger.write().set_home(player, home)
    }

    /// Rename a group on behalf of one of its officers
    pub fn set_group_name(
        &self,
        group: &GroupId,
        actor: PlayerId,
        name: impl Into<String>,
    ) -> Result<(), ClaimError> {
        self.ledger
            .write()
            .set_group_name(group, actor, name.into())
    }

    /// Record a group's decision for `action` on behalf of one of its
    /// officers
    pub fn set_group_override(
        &self,
        group: &GroupId,
        actor: PlayerId,
        action: ActionKind,
        value: PermissionOverride,
    ) -> Result<(), ClaimError> {
        self.ledger
            .write()
            .set_group_override(group, actor, action, value)
    }

    /// Admit `member` to a group. Officers can only admit members below
    /// their own rank.
    pub fn add_member(
        &self,
        group: &GroupId,
        actor: PlayerId,
        member: PlayerId,
        rank: Rank,
    ) -> Result<bool, ClaimError> {
        self.ledger.write().add_member(group, actor, member, rank)
    }

    /// Change the rank of a group member. Officers can only manage members
    /// below their own rank.
    pub fn set_rank(
        &self,
        group: &GroupId,
        actor: PlayerId,
        member: &PlayerId,
        rank: Rank,
    ) -> Result<(), ClaimError> {
        self.ledger.write().set_rank(group, actor, member, rank)
    }

    /// Remove `member` from a group. Any member may remove themselves.
    pub fn remove_member(
        &self,
        group: &GroupId,
        actor: PlayerId,
        member: &PlayerId,
    ) -> Result<Rank, ClaimError> {
        self.ledger.write().remove_member(group, actor, member)
    }

    /// Hand a group to `successor` on behalf of its owner
    pub fn transfer_group(
        &self,
        group: &GroupId,
        actor: PlayerId,
        successor: PlayerId,
    ) -> Result<(), ClaimError> {
        self.ledger
            .write()
            .transfer_group(group, actor, successor)
    }

    /// Unclaim everything a group owns and forget the group, on behalf of its
    /// owner. Regions the group owns are loaded first so that their stored
    /// records are released too.
    pub async fn disband_group(&self, group: &GroupId, actor: PlayerId) -> Result<(), ClaimError> {
        let coords = self.ledger.read().group_regions(group, actor)?;
        for coord in &coords {
            self.fetch_region(coord).await?;
        }
        self.ledger.write().disband_group(group, actor)
    }

    /// The region at `coord`, looking in memory, then among evicted regions
    /// awaiting a flush, then in storage. A region found in storage is
    /// attached again.
    pub async fn fetch_region(
        &self,
        coord: &RegionCoord,
    ) -> Result<Option<Arc<ClaimedRegion>>, ClaimError> {
        let restored = self.ledger.write().restore(coord)?;
        if restored.is_some() {
            return Ok(restored);
        }

        let record: Option<RegionRecord> = {
            let storage = self.storage.lock().await;
            storage
                .read(&RecordKey::Region(coord.clone()).to_bytes())
                .await?
        };
        let Some(record) = record else {
            return Ok(None);
        };

        let region = ClaimedRegion::from_record(coord.clone(), self.config.bounds, &record)
            .inspect_err(|error| warn!(%coord, %error, "Rejected stored region"))?;
        Ok(Some(self.ledger.write().attach(region)))
    }

    /// The host reports that the region at `coord` is now loaded, optionally
    /// with claim data it persisted itself. Without data the region is looked
    /// up as in [`ClaimRegistry::fetch_region`] and tracked as unclaimed if
    /// nothing is found.
    pub async fn region_loaded(
        &self,
        coord: RegionCoord,
        record: Option<RegionRecord>,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        if let Some(region) = self.region(&coord) {
            return Ok(region);
        }

        let region = match record {
            Some(record) => ClaimedRegion::from_record(coord.clone(), self.config.bounds, &record)
                .inspect_err(|error| warn!(%coord, %error, "Rejected loaded region"))?,
            None => match self.fetch_region(&coord).await? {
                Some(region) => return Ok(region),
                None => ClaimedRegion::new(
                    coord,
                    self.config.bounds,
                    self.config.default_region_settings,
                ),
            },
        };

        Ok(self.ledger.write().attach(region))
    }

    /// The host reports that the region at `coord` was unloaded
    pub fn region_unloaded(&self, coord: &RegionCoord) -> bool {
        self.evict_unloaded(coord)
    }

    /// Drop the in-memory record of the region at `coord`. Stored data is
    /// kept, and unflushed changes are still written by the next flush.
    pub fn evict_unloaded(&self, coord: &RegionCoord) -> bool {
        self.ledger.write().evict(coord)
    }

    /// The number of records waiting to be flushed
    pub fn dirty_count(&self) -> usize {
        self.ledger.read().dirty_count()
    }

    /// Write every dirty record to storage as a single batch, returning how
    /// many were written. Records that fail to write stay dirty.
    pub async fn flush(&self) -> Result<usize, ClaimError> {
        let mut storage = self.storage.lock().await;

        let records = self.ledger.write().take_dirty();
        if records.is_empty() {
            return Ok(0);
        }

        let keys: Vec<RecordKey> = records.iter().map(|(key, _)| key.clone()).collect();
        let batch = records
            .into_iter()
            .map(|(key, record)| (key.to_bytes(), record))
            .collect();

        match storage.write_batch(batch).await {
            Ok(count) => {
                self.ledger.write().settle(&keys);
                debug!(count, "Flushed claim records");
                Ok(count)
            }
            Err(error) => {
                warn!(%error, records = keys.len(), "Failed to flush claim records");
                self.ledger.write().remark(keys);
                Err(error.into())
            }
        }
    }

    /// Flush and give back the storage backend
    pub async fn close(self) -> Result<Backend, ClaimError> {
        self.flush().await?;
        Ok(self.storage.into_inner().backend)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::{
        ActionKind, ClaimConfig, ClaimError, Location, Owner, PlayerId, RegionCoord,
        Relationship, claim_square, make_registry,
    };

    #[tokio::test]
    async fn it_answers_queries_without_touching_storage() -> Result<()> {
        let (registry, backend) = make_registry(ClaimConfig::default()).await?;
        let reads = backend.reads();
        let alice = PlayerId::new();
        let home = Location::new("overworld", 3, 70, 3);

        claim_square(&registry, &home.region(), 1, alice.into())?;
        for action in ActionKind::ALL {
            registry.can_actor_do(Some(PlayerId::new()), &home, action)?;
        }
        registry.owner_name_at(&home, None)?;
        assert_eq!(registry.owned_around(&home, 2).len(), 9);

        assert_eq!(backend.reads(), reads);
        assert_eq!(backend.writes(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn it_flushes_dirty_records_in_one_batch() -> Result<()> {
        let (registry, backend) = make_registry(ClaimConfig::default()).await?;
        let alice = PlayerId::new();

        registry.claim_region(RegionCoord::new("overworld", 0, 0), alice.into(), true)?;
        registry.claim_region(RegionCoord::new("overworld", 0, 1), alice.into(), true)?;

        // The index, alice and both regions
        assert_eq!(registry.dirty_count(), 4);
        assert_eq!(registry.flush().await?, 4);
        assert_eq!(backend.writes(), 4);
        assert_eq!(registry.dirty_count(), 0);
        assert_eq!(registry.flush().await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_locations_outside_the_world() -> Result<()> {
        let (registry, _) = make_registry(ClaimConfig::default()).await?;

        assert_eq!(
            registry.can_actor_do(None, &Location::new("overworld", 0, 320, 0), ActionKind::Burn),
            Err(ClaimError::OutOfBounds { y: 320 })
        );
        assert_eq!(
            registry.owner_name_at(&Location::new("overworld", 0, -65, 0), None),
            Err(ClaimError::OutOfBounds { y: -65 })
        );

        Ok(())
    }

    #[tokio::test]
    async fn it_keeps_evicted_changes_until_they_are_flushed() -> Result<()> {
        let (registry, backend) = make_registry(ClaimConfig::default()).await?;
        let alice = PlayerId::new();
        let coord = RegionCoord::new("overworld", 5, 5);

        registry.claim_region(coord.clone(), alice.into(), true)?;
        assert!(registry.evict_unloaded(&coord));
        assert!(registry.region(&coord).is_none());

        // Restored from the staging area without a read
        let reads = backend.reads();
        let region = registry.fetch_region(&coord).await?;
        assert_eq!(region.and_then(|region| region.owner()), Some(Owner::from(alice)));
        assert_eq!(backend.reads(), reads);

        registry.evict_unloaded(&coord);
        registry.flush().await?;

        let region = registry.fetch_region(&coord).await?;
        assert_eq!(region.and_then(|region| region.owner()), Some(Owner::from(alice)));
        assert_eq!(backend.reads(), reads + 1);

        Ok(())
    }

    #[tokio::test]
    async fn it_reports_the_wilderness_by_its_configured_name() -> Result<()> {
        let config = ClaimConfig {
            wilderness_name: "The Wilds".into(),
            ..Default::default()
        };
        let (registry, _) = make_registry(config).await?;
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        let home = Location::new("overworld", -20, 12, 40);

        let label = registry.owner_name_at(&home, Some(alice))?;
        assert_eq!(label.name, "The Wilds");
        assert_eq!(label.owner, None);

        registry.claim_region(home.region(), alice.into(), true)?;
        registry.set_player_name(alice, "Alice");

        let label = registry.owner_name_at(&home, Some(bob))?;
        assert_eq!(label.name, "Alice");
        assert_eq!(label.relationship, Some(Relationship::Stranger));

        let label = registry.owner_name_at(&home, Some(alice))?;
        assert_eq!(label.relationship, Some(Relationship::Owner));

        Ok(())
    }
}
