use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! claimant_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new, random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

claimant_id!(
    /// Identifies a player. Player ids come from the host game and are stable
    /// for the lifetime of the save.
    PlayerId
);

claimant_id!(
    /// Identifies a group ("town") of players
    GroupId
);

/// Distinguishes the two kinds of claimant that may own land
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// A single player
    #[default]
    Player,
    /// A group of players
    Group,
}

impl OwnerKind {
    /// Whether this is [`OwnerKind::Player`]
    pub fn is_player(&self) -> bool {
        matches!(self, OwnerKind::Player)
    }
}

/// The claimant that owns a region or a span of a slice.
///
/// Land without an owner is represented as `Option<Owner>::None` throughout
/// the crate, so every ownership check matches all three cases explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    /// Owned by a single player
    Player(PlayerId),
    /// Owned by a group
    Group(GroupId),
}

impl Owner {
    /// Rebuild an owner from its persisted parts
    pub fn from_parts(kind: OwnerKind, id: Uuid) -> Self {
        match kind {
            OwnerKind::Player => Owner::Player(PlayerId::from(id)),
            OwnerKind::Group => Owner::Group(GroupId::from(id)),
        }
    }

    /// Which kind of claimant this is
    pub fn kind(&self) -> OwnerKind {
        match self {
            Owner::Player(_) => OwnerKind::Player,
            Owner::Group(_) => OwnerKind::Group,
        }
    }

    /// The UUID of the claimant, regardless of kind
    pub fn uuid(&self) -> Uuid {
        match self {
            Owner::Player(id) => *id.as_uuid(),
            Owner::Group(id) => *id.as_uuid(),
        }
    }
}

impl From<PlayerId> for Owner {
    fn from(value: PlayerId) -> Self {
        Owner::Player(value)
    }
}

impl From<GroupId> for Owner {
    fn from(value: GroupId) -> Self {
        Owner::Group(value)
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Owner::Player(id) => write!(f, "player {id}"),
            Owner::Group(id) => write!(f, "group {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::{GroupId, Owner, OwnerKind, PlayerId};

    #[test]
    fn it_rebuilds_owners_from_their_parts() {
        let player = PlayerId::new();
        let group = GroupId::new();

        let rebuilt_player = Owner::from_parts(OwnerKind::Player, *player.as_uuid());
        let rebuilt_group = Owner::from_parts(OwnerKind::Group, *group.as_uuid());

        assert_eq!(rebuilt_player, Owner::Player(player));
        assert_eq!(rebuilt_group, Owner::Group(group));
        assert_eq!(rebuilt_group.kind(), OwnerKind::Group);
    }

    #[test]
    fn it_parses_ids_from_hyphenated_uuids() {
        let uuid = Uuid::new_v4();
        let parsed: PlayerId = uuid.to_string().parse().unwrap();

        assert_eq!(Uuid::from(parsed), uuid);
        assert!("not-a-uuid".parse::<GroupId>().is_err());
    }
}
