use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ActionKind, ClaimError, GroupId, PermissionOverride, PlayerId, Rank, RegionCoord};

/// A ranked group of players ("town") that owns land collectively.
///
/// The owner is always a member at [`Rank::Owner`] and is the only member at
/// that rank. Every mutation preserves this; [`ClaimantGroup::validate`]
/// checks it for records read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimantGroup {
    id: GroupId,
    name: String,
    owner: PlayerId,
    #[serde(with = "crate::record::entries")]
    members: BTreeMap<PlayerId, Rank>,
    #[serde(default, with = "crate::record::entries")]
    overrides: BTreeMap<ActionKind, PermissionOverride>,
    #[serde(default)]
    regions: BTreeSet<RegionCoord>,
}

impl ClaimantGroup {
    /// A fresh group whose only member is `founder`, at [`Rank::Owner`]
    pub fn new(id: GroupId, founder: PlayerId) -> Self {
        Self {
            id,
            name: id.to_string(),
            owner: founder,
            members: BTreeMap::from([(founder, Rank::Owner)]),
            overrides: BTreeMap::new(),
            regions: BTreeSet::new(),
        }
    }

    /// The group's id
    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// The group's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the group's display name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The player that owns the group
    pub fn owner(&self) -> &PlayerId {
        &self.owner
    }

    /// The rank of `member`, if they belong to the group
    pub fn rank(&self, member: &PlayerId) -> Option<Rank> {
        self.members.get(member).copied()
    }

    /// Whether `member` belongs to the group
    pub fn is_member(&self, member: &PlayerId) -> bool {
        self.members.contains_key(member)
    }

    /// Every member and their rank
    pub fn members(&self) -> impl Iterator<Item = (&PlayerId, &Rank)> {
        self.members.iter()
    }

    /// Admit `member` at `rank`. Returns `false` if they were already a
    /// member, in which case their rank is left alone.
    pub fn add_member(&mut self, member: PlayerId, rank: Rank) -> Result<bool, ClaimError> {
        if rank == Rank::Owner {
            return Err(ClaimError::OwnerRank { group: self.id });
        }
        if self.members.contains_key(&member) {
            return Ok(false);
        }
        self.members.insert(member, rank);
        Ok(true)
    }

    /// Change the rank of an existing member. The owner rank can neither be
    /// granted nor taken away here; see [`ClaimantGroup::transfer_ownership`].
    pub fn set_rank(&mut self, member: &PlayerId, rank: Rank) -> Result<(), ClaimError> {
        let current = self.rank(member).ok_or(ClaimError::NotAMember {
            group: self.id,
            member: *member,
        })?;
        if current == Rank::Owner || rank == Rank::Owner {
            return Err(ClaimError::OwnerRank { group: self.id });
        }
        self.members.insert(*member, rank);
        Ok(())
    }

    /// Remove a member from the group. The owner cannot be removed this way.
    pub fn remove_member(&mut self, member: &PlayerId) -> Result<Rank, ClaimError> {
        if *member == self.owner {
            return Err(ClaimError::SuccessorRequired { group: self.id });
        }
        self.members.remove(member).ok_or(ClaimError::NotAMember {
            group: self.id,
            member: *member,
        })
    }

    /// Hand the group to `successor`, who must already be a member. The
    /// previous owner stays on as an [`Rank::Officer`].
    pub fn transfer_ownership(&mut self, successor: PlayerId) -> Result<(), ClaimError> {
        if !self.members.contains_key(&successor) {
            return Err(ClaimError::NotAMember {
                group: self.id,
                member: successor,
            });
        }
        if successor == self.owner {
            return Ok(());
        }
        self.members.insert(self.owner, Rank::Officer);
        self.members.insert(successor, Rank::Owner);
        self.owner = successor;
        Ok(())
    }

    /// Remove the current owner, handing the group to `successor` in the same
    /// step
    pub fn remove_owner(&mut self, successor: PlayerId) -> Result<(), ClaimError> {
        if successor == self.owner {
            return Err(ClaimError::SuccessorRequired { group: self.id });
        }
        let previous = self.owner;
        self.transfer_ownership(successor)?;
        self.members.remove(&previous);
        Ok(())
    }

    /// The group's decision for `action` on its land
    pub fn permission_override(&self, action: ActionKind) -> PermissionOverride {
        self.overrides.get(&action).copied().unwrap_or_default()
    }

    /// Record a decision for `action`. Setting [`PermissionOverride::Inherit`]
    /// forgets any earlier decision.
    pub fn set_permission_override(&mut self, action: ActionKind, value: PermissionOverride) {
        match value {
            PermissionOverride::Inherit => {
                self.overrides.remove(&action);
            }
            value => {
                self.overrides.insert(action, value);
            }
        }
    }

    /// The regions the group owns
    pub fn regions(&self) -> impl Iterator<Item = &RegionCoord> {
        self.regions.iter()
    }

    /// Whether the group owns the region at `coord`
    pub fn owns(&self, coord: &RegionCoord) -> bool {
        self.regions.contains(coord)
    }

    pub(crate) fn insert_region(&mut self, coord: RegionCoord) {
        self.regions.insert(coord);
    }

    pub(crate) fn remove_region(&mut self, coord: &RegionCoord) {
        self.regions.remove(coord);
    }

    /// Check the ownership invariant of a group read back from storage
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.rank(&self.owner) != Some(Rank::Owner) {
            return Err(ClaimError::CorruptData(format!(
                "owner {} of group {} does not hold the owner rank",
                self.owner, self.id
            )));
        }
        let owners = self
            .members
            .values()
            .filter(|rank| **rank == Rank::Owner)
            .count();
        if owners != 1 {
            return Err(ClaimError::CorruptData(format!(
                "group {} has {owners} members at the owner rank",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{ClaimError, ClaimantGroup, GroupId, PlayerId, Rank};

    fn make_group() -> (ClaimantGroup, PlayerId, PlayerId) {
        let founder = PlayerId::new();
        let recruit = PlayerId::new();
        let mut group = ClaimantGroup::new(GroupId::new(), founder);
        group.add_member(recruit, Rank::Recruit).unwrap();
        (group, founder, recruit)
    }

    #[test]
    fn it_starts_with_the_founder_as_owner() {
        let (group, founder, _) = make_group();

        assert_eq!(group.owner(), &founder);
        assert_eq!(group.rank(&founder), Some(Rank::Owner));
        assert!(group.validate().is_ok());
    }

    #[test]
    fn it_rejects_rank_changes_for_non_members() {
        let (mut group, _, _) = make_group();
        let stranger = PlayerId::new();

        assert_eq!(
            group.set_rank(&stranger, Rank::Officer),
            Err(ClaimError::NotAMember {
                group: *group.id(),
                member: stranger
            })
        );
    }

    #[test]
    fn it_protects_the_owner_rank() {
        let (mut group, founder, recruit) = make_group();

        assert!(matches!(
            group.set_rank(&recruit, Rank::Owner),
            Err(ClaimError::OwnerRank { .. })
        ));
        assert!(matches!(
            group.set_rank(&founder, Rank::Resident),
            Err(ClaimError::OwnerRank { .. })
        ));
        assert!(matches!(
            group.add_member(PlayerId::new(), Rank::Owner),
            Err(ClaimError::OwnerRank { .. })
        ));
        assert!(matches!(
            group.remove_member(&founder),
            Err(ClaimError::SuccessorRequired { .. })
        ));
        assert!(group.validate().is_ok());
    }

    #[test]
    fn it_transfers_ownership_to_a_member() {
        let (mut group, founder, recruit) = make_group();

        group.transfer_ownership(recruit).unwrap();

        assert_eq!(group.owner(), &recruit);
        assert_eq!(group.rank(&recruit), Some(Rank::Owner));
        assert_eq!(group.rank(&founder), Some(Rank::Officer));
        assert!(group.validate().is_ok());
    }

    #[test]
    fn it_removes_the_owner_only_with_a_successor() {
        let (mut group, founder, recruit) = make_group();

        assert!(group.remove_owner(PlayerId::new()).is_err());
        assert_eq!(group.owner(), &founder);

        group.remove_owner(recruit).unwrap();

        assert_eq!(group.owner(), &recruit);
        assert!(!group.is_member(&founder));
        assert!(group.validate().is_ok());
    }

    #[test]
    fn it_flags_groups_without_an_owner_member_as_corrupt() -> anyhow::Result<()> {
        let (group, founder, _) = make_group();
        let mut json = serde_json::to_value(&group)?;
        json["members"] = serde_json::json!([[founder, "officer"]]);

        let decoded: ClaimantGroup = serde_json::from_value(json)?;

        assert!(matches!(decoded.validate(), Err(ClaimError::CorruptData(_))));

        Ok(())
    }
}
