use crate::{ActionKind, Owner, PermissionOverride, PlayerId};

mod player;
pub use player::*;

mod group;
pub use group::*;

/// A borrowed view of whichever claimant owns some land
#[derive(Debug, Clone, Copy)]
pub enum Claimant<'a> {
    /// A player claimant
    Player(&'a ClaimantPlayer),
    /// A group claimant
    Group(&'a ClaimantGroup),
}

impl Claimant<'_> {
    /// The claimant as an [`Owner`]
    pub fn owner(&self) -> Owner {
        match self {
            Claimant::Player(player) => Owner::Player(*player.id()),
            Claimant::Group(group) => Owner::Group(*group.id()),
        }
    }

    /// The display name of the claimant
    pub fn name(&self) -> &str {
        match self {
            Claimant::Player(player) => player.name(),
            Claimant::Group(group) => group.name(),
        }
    }

    /// The player with full authority over the claimant's land
    pub fn owning_player(&self) -> PlayerId {
        match self {
            Claimant::Player(player) => *player.id(),
            Claimant::Group(group) => *group.owner(),
        }
    }

    /// The claimant's explicit decision for `action`
    pub fn permission_override(&self, action: ActionKind) -> PermissionOverride {
        match self {
            Claimant::Player(player) => player.permission_override(action),
            Claimant::Group(group) => group.permission_override(action),
        }
    }
}
