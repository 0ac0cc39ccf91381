use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ClaimError, RegionSetting};

/// The kinds of action that the resolver can be asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Placing or breaking blocks
    Blocks,
    /// Opening containers
    Storage,
    /// Harvesting crops and other grown blocks
    Harvest,
    /// Hurting or leading passive creatures
    Creatures,
    /// Picking up dropped items
    Pickup,
    /// Mounting creatures and vehicles
    Riding,
    /// Opening doors, gates and trapdoors
    Doors,
    /// Using crafting stations
    Crafting,
    /// Trading with merchants
    Trading,
    /// Attacking other players
    Combat,
    /// Damaging terrain with explosions
    Explode,
    /// Burning blocks with fire
    Burn,
}

impl ActionKind {
    /// Every action kind
    pub const ALL: [ActionKind; 12] = [
        ActionKind::Blocks,
        ActionKind::Storage,
        ActionKind::Harvest,
        ActionKind::Creatures,
        ActionKind::Pickup,
        ActionKind::Riding,
        ActionKind::Doors,
        ActionKind::Crafting,
        ActionKind::Trading,
        ActionKind::Combat,
        ActionKind::Explode,
        ActionKind::Burn,
    ];

    /// The stable name of this action kind
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Blocks => "blocks",
            ActionKind::Storage => "storage",
            ActionKind::Harvest => "harvest",
            ActionKind::Creatures => "creatures",
            ActionKind::Pickup => "pickup",
            ActionKind::Riding => "riding",
            ActionKind::Doors => "doors",
            ActionKind::Crafting => "crafting",
            ActionKind::Trading => "trading",
            ActionKind::Combat => "combat",
            ActionKind::Explode => "explode",
            ActionKind::Burn => "burn",
        }
    }

    /// Passive actions interact with the world without changing it, and are
    /// allowed for strangers unless the owner overrides them
    pub fn is_passive(&self) -> bool {
        matches!(
            self,
            ActionKind::Doors | ActionKind::Crafting | ActionKind::Trading
        )
    }

    /// The lowest group rank that may perform this action on group land
    pub fn required_rank(&self) -> Rank {
        match self {
            ActionKind::Doors
            | ActionKind::Crafting
            | ActionKind::Trading
            | ActionKind::Pickup => Rank::Recruit,
            ActionKind::Blocks
            | ActionKind::Storage
            | ActionKind::Harvest
            | ActionKind::Creatures
            | ActionKind::Riding => Rank::Resident,
            ActionKind::Combat | ActionKind::Explode | ActionKind::Burn => Rank::Officer,
        }
    }

    /// The region setting that can veto this action, if any
    pub fn gated_by(&self) -> Option<RegionSetting> {
        match self {
            ActionKind::Combat => Some(RegionSetting::PlayerCombat),
            ActionKind::Explode => Some(RegionSetting::Explosions),
            ActionKind::Burn => Some(RegionSetting::FireSpread),
            _ => None,
        }
    }
}

impl FromStr for ActionKind {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| ClaimError::UnknownAction(s.to_owned()))
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An explicit, per-claimant decision for one [`ActionKind`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOverride {
    /// Always allow the action (region settings may still veto it)
    Allow,
    /// Always deny the action to everyone but the owner
    Deny,
    /// Fall through to the default policy
    #[default]
    Inherit,
}

/// Membership rank within a group, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    /// Newly admitted member
    Recruit,
    /// Regular member
    Resident,
    /// Trusted member that may administer the group's land
    Officer,
    /// The single owner of the group
    Owner,
}

/// How an actor relates to the owner of some land. Derived on demand by the
/// resolver and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    /// The actor is the owner (or the owner of the owning group)
    Owner,
    /// The owning player has acknowledged the actor as a friend
    Friend,
    /// The actor is a member of the owning group at the given rank
    Member(Rank),
    /// No relationship
    Stranger,
}

#[cfg(test)]
mod tests {
    use crate::{ActionKind, ClaimError, Rank, RegionSetting};

    #[test]
    fn it_parses_every_action_by_name() {
        for action in ActionKind::ALL {
            assert_eq!(action.name().parse::<ActionKind>().unwrap(), action);
        }
    }

    #[test]
    fn it_rejects_unknown_action_names() {
        assert_eq!(
            "teleport".parse::<ActionKind>(),
            Err(ClaimError::UnknownAction("teleport".into()))
        );
    }

    #[test]
    fn it_orders_ranks_by_privilege() {
        assert!(Rank::Recruit < Rank::Resident);
        assert!(Rank::Resident < Rank::Officer);
        assert!(Rank::Officer < Rank::Owner);
    }

    #[test]
    fn it_only_gates_environmental_actions() {
        assert_eq!(
            ActionKind::Explode.gated_by(),
            Some(RegionSetting::Explosions)
        );
        assert_eq!(ActionKind::Blocks.gated_by(), None);
        assert!(
            ActionKind::ALL
                .iter()
                .filter(|action| action.is_passive())
                .all(|action| action.gated_by().is_none())
        );
    }
}
