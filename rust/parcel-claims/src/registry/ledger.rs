use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    ActionKind, ClaimConfig, ClaimError, ClaimIndex, ClaimView, ClaimantGroup, ClaimantPlayer,
    ClaimedRegion, DirtyRecord, GroupId, Location, Owner, PermissionOverride, PlayerId, Rank,
    RecordKey, RegionCoord, RegionRecord, RegionSetting,
};

/// Everything the registry knows, guarded as one unit.
///
/// Regions are shared as `Arc` snapshots: a mutation clones the region,
/// changes the clone and swaps it in, so a reader holding an older snapshot
/// never sees a half-applied change. Every mutation validates before it
/// touches anything and records the keys it dirtied before returning.
pub(crate) struct Ledger {
    config: ClaimConfig,
    regions: HashMap<RegionCoord, Arc<ClaimedRegion>>,
    players: HashMap<PlayerId, ClaimantPlayer>,
    groups: HashMap<GroupId, ClaimantGroup>,
    /// Nominal owners of every claimed region, loaded or not
    claims: HashMap<RegionCoord, Owner>,
    /// Dirty records of regions that were evicted before the next flush
    staged: HashMap<RegionCoord, RegionRecord>,
    dirty: HashSet<RecordKey>,
    /// Keys taken by a flush whose write has not finished yet
    in_flight: HashSet<RecordKey>,
}

impl ClaimView for Ledger {
    fn config(&self) -> &ClaimConfig {
        &self.config
    }

    fn region(&self, coord: &RegionCoord) -> Option<&Arc<ClaimedRegion>> {
        self.regions.get(coord)
    }

    fn player(&self, id: &PlayerId) -> Option<&ClaimantPlayer> {
        self.players.get(id)
    }

    fn group(&self, id: &GroupId) -> Option<&ClaimantGroup> {
        self.groups.get(id)
    }
}

impl Ledger {
    pub fn new(config: ClaimConfig) -> Self {
        Self {
            config,
            regions: HashMap::new(),
            players: HashMap::new(),
            groups: HashMap::new(),
            claims: HashMap::new(),
            staged: HashMap::new(),
            dirty: HashSet::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Adopt a player record read from storage
    pub fn load_player(&mut self, player: ClaimantPlayer) {
        let owner = Owner::Player(*player.id());
        for coord in player.regions() {
            self.claims.insert(coord.clone(), owner);
        }
        self.players.insert(*player.id(), player);
    }

    /// Adopt a group record read from storage
    pub fn load_group(&mut self, group: ClaimantGroup) -> Result<(), ClaimError> {
        group.validate()?;
        let owner = Owner::Group(*group.id());
        for coord in group.regions() {
            self.claims.insert(coord.clone(), owner);
        }
        self.groups.insert(*group.id(), group);
        Ok(())
    }

    fn mark(&mut self, key: RecordKey) {
        self.dirty.insert(key);
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    fn player_entry(&mut self, id: PlayerId) -> &mut ClaimantPlayer {
        if !self.players.contains_key(&id) {
            debug!(player = %id, "Created player record");
            self.dirty.insert(RecordKey::Index);
            self.dirty.insert(RecordKey::Player(id));
        }
        self.players
            .entry(id)
            .or_insert_with(|| ClaimantPlayer::new(id))
    }

    fn group_entry(&mut self, id: &GroupId) -> Result<&mut ClaimantGroup, ClaimError> {
        self.groups
            .get_mut(id)
            .ok_or(ClaimError::UnknownGroup(*id))
    }

    pub fn get_or_create_player(&mut self, id: PlayerId) -> ClaimantPlayer {
        self.player_entry(id).clone()
    }

    pub fn get_or_create_group(&mut self, id: GroupId, founder: PlayerId) -> ClaimantGroup {
        if let Some(group) = self.groups.get(&id) {
            return group.clone();
        }
        self.player_entry(founder);
        let group = ClaimantGroup::new(id, founder);
        self.groups.insert(id, group.clone());
        self.mark(RecordKey::Index);
        self.mark(RecordKey::Group(id));
        info!(group = %id, founder = %founder, "Founded group");
        group
    }

    /// Require `actor` to hold authority over land owned by `owner`: be the
    /// owning player, or hold at least `rank` in the owning group
    fn authorize(&self, actor: PlayerId, owner: &Owner, rank: Rank) -> Result<(), ClaimError> {
        let allowed = match owner {
            Owner::Player(id) => *id == actor,
            Owner::Group(id) => self
                .groups
                .get(id)
                .ok_or(ClaimError::UnknownGroup(*id))?
                .rank(&actor)
                .is_some_and(|held| held >= rank),
        };
        if allowed {
            Ok(())
        } else {
            Err(ClaimError::NotOwner {
                actor,
                owner: *owner,
            })
        }
    }

    /// Officers may manage members ranked below themselves; the owner may
    /// manage anyone
    fn authorize_membership(
        &self,
        group: &GroupId,
        actor: PlayerId,
        ranks: &[Option<Rank>],
    ) -> Result<(), ClaimError> {
        let denied = ClaimError::NotOwner {
            actor,
            owner: Owner::Group(*group),
        };
        let held = self
            .groups
            .get(group)
            .ok_or(ClaimError::UnknownGroup(*group))?
            .rank(&actor)
            .filter(|held| *held >= Rank::Officer)
            .ok_or(denied.clone())?;
        if held == Rank::Owner {
            return Ok(());
        }
        if ranks.iter().flatten().any(|rank| *rank >= held) {
            return Err(denied);
        }
        Ok(())
    }

    /// Validate a claim without applying it. Returns the current nominal
    /// owner of the region.
    pub fn check_claim(
        &self,
        coord: &RegionCoord,
        owner: &Owner,
        stop_if_already_claimed: bool,
    ) -> Result<Option<Owner>, ClaimError> {
        if let Owner::Group(id) = owner
            && !self.groups.contains_key(id)
        {
            return Err(ClaimError::UnknownGroup(*id));
        }

        let previous = self.claims.get(coord).copied();
        if previous.as_ref() == Some(owner) {
            return Ok(previous);
        }
        if stop_if_already_claimed && let Some(previous) = previous {
            return Err(ClaimError::AlreadyClaimed {
                coord: coord.clone(),
                owner: previous,
            });
        }
        if let (Owner::Player(player), Some(limit)) = (owner, self.config.claim_limit) {
            let owned = self
                .players
                .get(player)
                .map(|player| player.region_count())
                .unwrap_or_default();
            if owned >= limit {
                return Err(ClaimError::ClaimLimitReached {
                    player: *player,
                    limit,
                });
            }
        }
        Ok(previous)
    }

    /// A private copy of the region at `coord` from memory or the staging
    /// area, or a fresh unclaimed one
    fn detached_region(&self, coord: &RegionCoord) -> Result<ClaimedRegion, ClaimError> {
        match self.loaded_region(coord) {
            Err(ClaimError::RegionNotLoaded(_)) => Ok(ClaimedRegion::new(
                coord.clone(),
                self.config.bounds,
                self.config.default_region_settings,
            )),
            result => result,
        }
    }

    /// A private copy of the region at `coord` from memory or the staging
    /// area
    fn loaded_region(&self, coord: &RegionCoord) -> Result<ClaimedRegion, ClaimError> {
        if let Some(region) = self.regions.get(coord) {
            return Ok(ClaimedRegion::clone(region));
        }
        if let Some(record) = self.staged.get(coord) {
            return ClaimedRegion::from_record(coord.clone(), self.config.bounds, record);
        }
        Err(ClaimError::RegionNotLoaded(coord.clone()))
    }

    /// Swap in a modified region and mark it dirty
    fn replace(&mut self, region: ClaimedRegion) -> Arc<ClaimedRegion> {
        let coord = region.coord().clone();
        let region = Arc::new(region);
        self.staged.remove(&coord);
        self.regions.insert(coord.clone(), region.clone());
        self.mark(RecordKey::Region(coord));
        region
    }

    fn hold(&mut self, coord: &RegionCoord, owner: &Owner) {
        match owner {
            Owner::Player(id) => self.player_entry(*id).insert_region(coord.clone()),
            Owner::Group(id) => {
                if let Some(group) = self.groups.get_mut(id) {
                    group.insert_region(coord.clone());
                }
            }
        }
        self.claims.insert(coord.clone(), *owner);
        self.mark(owner_key(owner));
    }

    fn release(&mut self, coord: &RegionCoord, owner: &Owner) {
        match owner {
            Owner::Player(id) => {
                if let Some(player) = self.players.get_mut(id) {
                    player.remove_region(coord);
                }
            }
            Owner::Group(id) => {
                if let Some(group) = self.groups.get_mut(id) {
                    group.remove_region(coord);
                }
            }
        }
        self.claims.remove(coord);
        self.mark(owner_key(owner));
    }

    pub fn claim(
        &mut self,
        coord: RegionCoord,
        owner: Owner,
        stop_if_already_claimed: bool,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        let previous = self.check_claim(&coord, &owner, stop_if_already_claimed)?;
        let mut region = self.detached_region(&coord)?;

        region.set_owner(Some(owner));
        if let Some(previous) = previous {
            self.release(&coord, &previous);
        }
        self.hold(&coord, &owner);

        info!(%coord, %owner, "Claimed region");
        Ok(self.replace(region))
    }

    pub fn unclaim(
        &mut self,
        coord: &RegionCoord,
        actor: PlayerId,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        let owner = *self
            .claims
            .get(coord)
            .ok_or_else(|| ClaimError::Unclaimed(coord.clone()))?;
        self.authorize(actor, &owner, Rank::Officer)?;
        let mut region = self.detached_region(coord)?;

        region.set_owner(None);
        self.release(coord, &owner);

        info!(%coord, %owner, "Unclaimed region");
        Ok(self.replace(region))
    }

    /// Apply `change` to a copy of a loaded, claimed region on behalf of
    /// `actor`, who needs authority over its nominal owner
    fn update_region<F>(
        &mut self,
        coord: &RegionCoord,
        actor: PlayerId,
        change: F,
    ) -> Result<Arc<ClaimedRegion>, ClaimError>
    where
        F: FnOnce(&mut ClaimedRegion) -> Result<(), ClaimError>,
    {
        let mut region = self.loaded_region(coord)?;
        let owner = region
            .owner()
            .ok_or_else(|| ClaimError::Unclaimed(coord.clone()))?;
        self.authorize(actor, &owner, Rank::Officer)?;
        change(&mut region)?;
        Ok(self.replace(region))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_slice_owner(
        &mut self,
        coord: &RegionCoord,
        index: usize,
        from: i32,
        to: i32,
        owner: Option<Owner>,
        fresh: bool,
        actor: PlayerId,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        if let Some(Owner::Group(id)) = owner
            && !self.groups.contains_key(&id)
        {
            return Err(ClaimError::UnknownGroup(id));
        }
        let region = self.update_region(coord, actor, |region| {
            region.set_slice_owner(index, from, to, owner, fresh)
        })?;
        if let Some(Owner::Player(id)) = owner {
            self.player_entry(id);
        }
        debug!(%coord, index, from, to, "Reassigned slice");
        Ok(region)
    }

    pub fn set_region_setting(
        &mut self,
        coord: &RegionCoord,
        setting: RegionSetting,
        enabled: bool,
        actor: PlayerId,
    ) -> Result<Arc<ClaimedRegion>, ClaimError> {
        self.update_region(coord, actor, |region| {
            region.set_setting(setting, enabled);
            Ok(())
        })
    }

    pub fn add_friend(&mut self, player: PlayerId, friend: PlayerId) -> bool {
        let added = self.player_entry(player).add_friend(friend);
        if added {
            self.mark(RecordKey::Player(player));
        }
        added
    }

    pub fn remove_friend(&mut self, player: PlayerId, friend: &PlayerId) -> bool {
        let removed = self
            .players
            .get_mut(&player)
            .is_some_and(|record| record.remove_friend(friend));
        if removed {
            self.mark(RecordKey::Player(player));
        }
        removed
    }

    pub fn set_player_override(
        &mut self,
        player: PlayerId,
        action: ActionKind,
        value: PermissionOverride,
    ) {
        self.player_entry(player)
            .set_permission_override(action, value);
        self.mark(RecordKey::Player(player));
    }

    pub fn set_player_name(&mut self, player: PlayerId, name: String) {
        self.player_entry(player).set_name(name);
        self.mark(RecordKey::Player(player));
    }

    pub fn set_home(&mut self, player: PlayerId, home: Option<Location>) {
        self.player_entry(player).set_home(home);
        self.mark(RecordKey::Player(player));
    }

    pub fn set_group_name(
        &mut self,
        group: &GroupId,
        actor: PlayerId,
        name: String,
    ) -> Result<(), ClaimError> {
        self.authorize(actor, &Owner::Group(*group), Rank::Officer)?;
        self.group_entry(group)?.set_name(name);
        self.mark(RecordKey::Group(*group));
        Ok(())
    }

    pub fn set_group_override(
        &mut self,
        group: &GroupId,
        actor: PlayerId,
        action: ActionKind,
        value: PermissionOverride,
    ) -> Result<(), ClaimError> {
        self.authorize(actor, &Owner::Group(*group), Rank::Officer)?;
        self.group_entry(group)?
            .set_permission_override(action, value);
        self.mark(RecordKey::Group(*group));
        Ok(())
    }

    pub fn add_member(
        &mut self,
        group: &GroupId,
        actor: PlayerId,
        member: PlayerId,
        rank: Rank,
    ) -> Result<bool, ClaimError> {
        self.authorize_membership(group, actor, &[Some(rank)])?;
        let added = self.group_entry(group)?.add_member(member, rank)?;
        if added {
            self.player_entry(member);
            self.mark(RecordKey::Group(*group));
        }
        Ok(added)
    }

    pub fn set_rank(
        &mut self,
        group: &GroupId,
        actor: PlayerId,
        member: &PlayerId,
        rank: Rank,
    ) -> Result<(), ClaimError> {
        let current = self.groups.get(group).and_then(|record| record.rank(member));
        self.authorize_membership(group, actor, &[current, Some(rank)])?;
        self.group_entry(group)?.set_rank(member, rank)?;
        self.mark(RecordKey::Group(*group));
        Ok(())
    }

    pub fn remove_member(
        &mut self,
        group: &GroupId,
        actor: PlayerId,
        member: &PlayerId,
    ) -> Result<Rank, ClaimError> {
        if actor != *member {
            let current = self.groups.get(group).and_then(|record| record.rank(member));
            self.authorize_membership(group, actor, &[current])?;
        }
        let rank = self.group_entry(group)?.remove_member(member)?;
        self.mark(RecordKey::Group(*group));
        Ok(rank)
    }

    fn authorize_group_owner(&self, group: &GroupId, actor: PlayerId) -> Result<(), ClaimError> {
        self.authorize(actor, &Owner::Group(*group), Rank::Owner)
    }

    pub fn transfer_group(
        &mut self,
        group: &GroupId,
        actor: PlayerId,
        successor: PlayerId,
    ) -> Result<(), ClaimError> {
        self.authorize_group_owner(group, actor)?;
        self.group_entry(group)?.transfer_ownership(successor)?;
        self.mark(RecordKey::Group(*group));
        info!(%group, from = %actor, to = %successor, "Transferred group");
        Ok(())
    }

    /// The regions a disbanding group owns, after checking that `actor` may
    /// disband it
    pub fn group_regions(
        &self,
        group: &GroupId,
        actor: PlayerId,
    ) -> Result<Vec<RegionCoord>, ClaimError> {
        self.authorize_group_owner(group, actor)?;
        Ok(self
            .groups
            .get(group)
            .map(|record| record.regions().cloned().collect())
            .unwrap_or_default())
    }

    /// Unclaim everything the group owns, hand its slices in loaded regions
    /// back to their nominal owners and forget the group
    pub fn disband_group(&mut self, group: &GroupId, actor: PlayerId) -> Result<(), ClaimError> {
        let coords = self.group_regions(group, actor)?;
        let owner = Owner::Group(*group);

        let mut regions = Vec::with_capacity(coords.len());
        for coord in &coords {
            let mut region = self.detached_region(coord)?;
            region.set_owner(None);
            regions.push(region);
        }
        let subdivided: Vec<ClaimedRegion> = self
            .regions
            .values()
            .filter(|region| !coords.contains(region.coord()))
            .filter_map(|region| {
                let mut region = ClaimedRegion::clone(region);
                region.release_spans(&owner).then_some(region)
            })
            .collect();

        for coord in &coords {
            self.claims.remove(coord);
        }
        for region in regions.into_iter().chain(subdivided) {
            self.replace(region);
        }
        self.groups.remove(group);
        self.dirty.remove(&RecordKey::Group(*group));
        self.mark(RecordKey::Index);

        info!(%group, regions = coords.len(), "Disbanded group");
        Ok(())
    }

    /// Re-attach a region from the staging area, if it is there
    pub fn restore(&mut self, coord: &RegionCoord) -> Result<Option<Arc<ClaimedRegion>>, ClaimError> {
        if let Some(region) = self.regions.get(coord) {
            return Ok(Some(region.clone()));
        }
        let Some(record) = self.staged.remove(coord) else {
            return Ok(None);
        };
        let region = Arc::new(ClaimedRegion::from_record(
            coord.clone(),
            self.config.bounds,
            &record,
        )?);
        self.regions.insert(coord.clone(), region.clone());
        debug!(%coord, "Restored staged region");
        Ok(Some(region))
    }

    /// Track a region that was loaded from outside. A region that is already
    /// tracked wins over the newcomer.
    ///
    /// The claimant records decide who owns a region. A newcomer whose owner
    /// disagrees with them, or that was never written at all, is handed back
    /// to the recorded owner and marked dirty. A newcomer owned by someone no
    /// claimant lists is adopted by that owner.
    pub fn attach(&mut self, mut region: ClaimedRegion) -> Arc<ClaimedRegion> {
        let coord = region.coord().clone();
        if let Some(existing) = self.regions.get(&coord) {
            return existing.clone();
        }
        match (self.claims.get(&coord).copied(), region.owner()) {
            (Some(claimed), found) if found != Some(claimed) => {
                warn!(%coord, owner = %claimed, "Region record disagrees with its claimant");
                region.set_owner(Some(claimed));
                self.mark(RecordKey::Region(coord.clone()));
            }
            (None, Some(owner)) => self.hold(&coord, &owner),
            _ => (),
        }
        let region = Arc::new(region);
        self.regions.insert(coord.clone(), region.clone());
        debug!(%coord, "Attached region");
        region
    }

    /// Stop tracking the region at `coord`. Unflushed changes, including
    /// those a running flush has not finished writing, are staged so a later
    /// flush can still write them.
    pub fn evict(&mut self, coord: &RegionCoord) -> bool {
        let Some(region) = self.regions.remove(coord) else {
            return false;
        };
        let key = RecordKey::Region(coord.clone());
        if self.dirty.contains(&key) || self.in_flight.contains(&key) {
            self.staged.insert(coord.clone(), region.to_record());
        }
        debug!(%coord, "Evicted region");
        true
    }

    pub fn index(&self) -> ClaimIndex {
        ClaimIndex {
            players: self.players.keys().copied().collect(),
            groups: self.groups.keys().copied().collect(),
        }
    }

    /// Snapshot and clear every dirty record. The keys stay in flight until
    /// [`Ledger::settle`] or [`Ledger::remark`] is called with them.
    pub fn take_dirty(&mut self) -> Vec<(RecordKey, DirtyRecord)> {
        let keys: Vec<RecordKey> = self.dirty.drain().collect();
        self.in_flight.extend(keys.iter().cloned());
        keys.into_iter()
            .filter_map(|key| {
                let record = match &key {
                    RecordKey::Index => DirtyRecord::Index(self.index()),
                    RecordKey::Player(id) => DirtyRecord::Player(self.players.get(id)?.clone()),
                    RecordKey::Group(id) => DirtyRecord::Group(self.groups.get(id)?.clone()),
                    RecordKey::Region(coord) => DirtyRecord::Region(
                        self.regions
                            .get(coord)
                            .map(|region| region.to_record())
                            .or_else(|| self.staged.get(coord).cloned())?,
                    ),
                };
                Some((key, record))
            })
            .collect()
    }

    /// Forget staged records that have reached storage and were not touched
    /// again in the meantime
    pub fn settle(&mut self, keys: &[RecordKey]) {
        for key in keys {
            self.in_flight.remove(key);
            if let RecordKey::Region(coord) = key
                && !self.dirty.contains(key)
            {
                self.staged.remove(coord);
            }
        }
    }

    /// Mark records dirty again after a failed flush
    pub fn remark(&mut self, keys: Vec<RecordKey>) {
        for key in &keys {
            self.in_flight.remove(key);
        }
        self.dirty.extend(keys);
    }
}

fn owner_key(owner: &Owner) -> RecordKey {
    match owner {
        Owner::Player(id) => RecordKey::Player(*id),
        Owner::Group(id) => RecordKey::Group(*id),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ClaimConfig, ClaimView, ClaimantPlayer, ClaimedRegion, Owner, PlayerId, RecordKey,
        RegionCoord,
    };

    use super::Ledger;

    #[test]
    fn it_keeps_a_region_evicted_during_a_failed_flush() -> anyhow::Result<()> {
        let mut ledger = Ledger::new(ClaimConfig::default());
        let alice = PlayerId::new();
        let coord = RegionCoord::new("overworld", 7, 7);
        ledger.claim(coord.clone(), alice.into(), true)?;

        let taken = ledger.take_dirty();
        assert!(ledger.evict(&coord));
        ledger.remark(taken.into_iter().map(|(key, _)| key).collect());

        let retried = ledger.take_dirty();
        assert!(
            retried
                .iter()
                .any(|(key, _)| *key == RecordKey::Region(coord.clone()))
        );
        assert_eq!(retried.len(), 3);

        Ok(())
    }

    #[test]
    fn it_forgets_staged_regions_once_they_are_written() -> anyhow::Result<()> {
        let mut ledger = Ledger::new(ClaimConfig::default());
        let coord = RegionCoord::new("overworld", 7, 7);
        ledger.claim(coord.clone(), PlayerId::new().into(), true)?;

        let taken = ledger.take_dirty();
        ledger.evict(&coord);
        ledger.settle(&taken.into_iter().map(|(key, _)| key).collect::<Vec<_>>());

        assert_eq!(ledger.restore(&coord)?, None);
        assert!(ledger.take_dirty().is_empty());

        Ok(())
    }

    #[test]
    fn it_hands_an_unwritten_region_back_to_its_recorded_owner() {
        let mut ledger = Ledger::new(ClaimConfig::default());
        let alice = PlayerId::new();
        let coord = RegionCoord::new("overworld", 2, 9);
        let mut player = ClaimantPlayer::new(alice);
        player.insert_region(coord.clone());
        ledger.load_player(player);

        let config = ledger.config().clone();
        let region = ledger.attach(ClaimedRegion::new(
            coord.clone(),
            config.bounds,
            config.default_region_settings,
        ));

        assert_eq!(region.owner(), Some(Owner::Player(alice)));
        assert_eq!(ledger.dirty_count(), 1);
    }
}
