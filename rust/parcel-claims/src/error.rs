use parcel_storage::ParcelStorageError;
use thiserror::Error;

use crate::{GroupId, Owner, PlayerId, RegionCoord};

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    /// A strict claim was attempted on a region that another claimant owns
    #[error("Region {coord} is already claimed by {owner}")]
    AlreadyClaimed {
        /// The contested region
        coord: RegionCoord,
        /// The claimant that currently owns it
        owner: Owner,
    },

    /// A vertical span was empty, inverted or outside of the world
    #[error("Invalid vertical range {from}..{to}")]
    InvalidRange {
        /// Inclusive start of the rejected range
        from: i32,
        /// Exclusive end of the rejected range
        to: i32,
    },

    /// Persisted data failed validation on load
    #[error("Corrupt claim data: {0}")]
    CorruptData(String),

    /// A rank operation targeted a player outside of the group
    #[error("Player {member} is not a member of group {group}")]
    NotAMember {
        /// The group that was operated on
        group: GroupId,
        /// The player that is not a member
        member: PlayerId,
    },

    /// A privileged operation was attempted without authority over the target
    #[error("Player {actor} does not have authority over {owner}")]
    NotOwner {
        /// The player that attempted the operation
        actor: PlayerId,
        /// The claimant the operation required authority over
        owner: Owner,
    },

    /// A query used a vertical coordinate outside of the world bounds
    #[error("Vertical coordinate {y} is outside of the world")]
    OutOfBounds {
        /// The rejected coordinate
        y: i32,
    },

    /// An action name did not match any known action kind
    #[error("Unknown action kind \"{0}\"")]
    UnknownAction(String),

    /// A region setting name did not match any known setting
    #[error("Unknown region setting \"{0}\"")]
    UnknownSetting(String),

    /// An operation referenced a group that does not exist
    #[error("Group {0} does not exist")]
    UnknownGroup(GroupId),

    /// An operation required a region that is not attached to the registry
    #[error("Region {0} is not loaded")]
    RegionNotLoaded(RegionCoord),

    /// An operation required a claimed region but nobody owns it
    #[error("Region {0} is not claimed")]
    Unclaimed(RegionCoord),

    /// A player already owns as many regions as the configured limit allows
    #[error("Player {player} has reached the claim limit of {limit}")]
    ClaimLimitReached {
        /// The player attempting to claim
        player: PlayerId,
        /// The configured limit
        limit: usize,
    },

    /// The owner of a group can only leave by handing the group to a successor
    #[error("The owner of group {group} cannot be removed without a successor")]
    SuccessorRequired {
        /// The group whose owner would be removed
        group: GroupId,
    },

    /// The owner rank can only change hands through an ownership transfer
    #[error("The owner rank of group {group} can only change through a transfer")]
    OwnerRank {
        /// The group that was operated on
        group: GroupId,
    },

    /// The engine configuration was rejected
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An error occured in storage-related code
    #[error("Storage operation failed: {0}")]
    Storage(String),
}

impl From<ParcelStorageError> for ClaimError {
    fn from(value: ParcelStorageError) -> Self {
        ClaimError::Storage(format!("{value}"))
    }
}
