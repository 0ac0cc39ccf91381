use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ActionKind, Location, PermissionOverride, PlayerId, RegionCoord};

/// A player that may own land, trust friends and override the default
/// permission policy on its own land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimantPlayer {
    id: PlayerId,
    name: String,
    #[serde(default)]
    friends: BTreeSet<PlayerId>,
    #[serde(default, with = "crate::record::entries")]
    overrides: BTreeMap<ActionKind, PermissionOverride>,
    #[serde(default)]
    home: Option<Location>,
    #[serde(default)]
    regions: BTreeSet<RegionCoord>,
}

impl ClaimantPlayer {
    /// A fresh player with no friends, overrides or land. The display name
    /// starts out as the id until the host reports the real one.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            name: id.to_string(),
            friends: BTreeSet::new(),
            overrides: BTreeMap::new(),
            home: None,
            regions: BTreeSet::new(),
        }
    }

    /// The player's id
    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    /// The player's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the player's display name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether this player has acknowledged `other` as a friend
    pub fn is_friend(&self, other: &PlayerId) -> bool {
        self.friends.contains(other)
    }

    /// Whether both players have acknowledged each other
    pub fn is_mutual_friend(&self, other: &ClaimantPlayer) -> bool {
        self.is_friend(other.id()) && other.is_friend(self.id())
    }

    /// Acknowledge `other` as a friend. Returns `false` if `other` is this
    /// player or was already a friend.
    pub fn add_friend(&mut self, other: PlayerId) -> bool {
        if other == self.id {
            return false;
        }
        self.friends.insert(other)
    }

    /// Withdraw the acknowledgment of `other`. Returns `false` if `other` was
    /// not a friend.
    pub fn remove_friend(&mut self, other: &PlayerId) -> bool {
        self.friends.remove(other)
    }

    /// Every player this player has acknowledged
    pub fn friends(&self) -> impl Iterator<Item = &PlayerId> {
        self.friends.iter()
    }

    /// This player's decision for `action` on its own land
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

    /// The player's home, if set
    pub fn home(&self) -> Option<&Location> {
        self.home.as_ref()
    }

    /// Set or clear the player's home
    pub fn set_home(&mut self, home: Option<Location>) {
        self.home = home;
    }

    /// The regions this player owns outright
    pub fn regions(&self) -> impl Iterator<Item = &RegionCoord> {
        self.regions.iter()
    }

    /// How many regions this player owns outright
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Whether this player owns the region at `coord`
    pub fn owns(&self, coord: &RegionCoord) -> bool {
        self.regions.contains(coord)
    }

    pub(crate) fn insert_region(&mut self, coord: RegionCoord) {
        self.regions.insert(coord);
    }

    pub(crate) fn remove_region(&mut self, coord: &RegionCoord) {
        self.regions.remove(coord);
    }
}

#[cfg(test)]
mod tests {
    use crate::{ActionKind, ClaimantPlayer, PermissionOverride, PlayerId};

    #[test]
    fn it_never_befriends_itself() {
        let id = PlayerId::new();
        let mut player = ClaimantPlayer::new(id);

        assert!(!player.add_friend(id));
        assert!(!player.is_friend(&id));
    }

    #[test]
    fn it_treats_friendship_as_one_directional() {
        let mut alice = ClaimantPlayer::new(PlayerId::new());
        let mut bob = ClaimantPlayer::new(PlayerId::new());

        assert!(alice.add_friend(*bob.id()));
        assert!(!alice.add_friend(*bob.id()));

        assert!(alice.is_friend(bob.id()));
        assert!(!bob.is_friend(alice.id()));
        assert!(!alice.is_mutual_friend(&bob));

        bob.add_friend(*alice.id());
        assert!(alice.is_mutual_friend(&bob));

        assert!(alice.remove_friend(bob.id()));
        assert!(!alice.remove_friend(bob.id()));
    }

    #[test]
    fn it_forgets_overrides_set_back_to_inherit() {
        let mut player = ClaimantPlayer::new(PlayerId::new());

        player.set_permission_override(ActionKind::Doors, PermissionOverride::Deny);
        assert_eq!(
            player.permission_override(ActionKind::Doors),
            PermissionOverride::Deny
        );

        player.set_permission_override(ActionKind::Doors, PermissionOverride::Inherit);
        assert_eq!(
            player.permission_override(ActionKind::Doors),
            PermissionOverride::Inherit
        );
        assert_eq!(player, ClaimantPlayer::new(*player.id()));
    }

    #[test]
    fn it_serializes_overrides_as_entries() -> anyhow::Result<()> {
        let mut player = ClaimantPlayer::new(PlayerId::new());
        player.set_permission_override(ActionKind::Storage, PermissionOverride::Allow);

        let json = serde_json::to_value(&player)?;
        assert_eq!(json["overrides"], serde_json::json!([["storage", "allow"]]));

        let decoded: ClaimantPlayer = serde_json::from_value(json)?;
        assert_eq!(decoded, player);

        Ok(())
    }
}
