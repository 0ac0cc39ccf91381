#![warn(missing_docs)]

//! This package tracks who owns which region of a partitioned multiplayer
//! world and decides whether an actor may perform an action at a location.
//!
//! Regions are 16×16 block columns. Each [`ClaimedRegion`] is owned by a
//! player or a group and is split vertically into a fixed number of
//! [`Slice`]s, each of which may be subdivided and handed to a different
//! owner. A [`ClaimRegistry`] holds every loaded region and every claimant,
//! persists them through a [`parcel_storage::StorageBackend`], and answers
//! permission queries through the [`PermissionResolver`]:
//!
//! ```ignore
//! use parcel_claims::{ActionKind, ClaimConfig, ClaimRegistry, Location, PlayerId};
//! use parcel_storage::MemoryStorageBackend;
//!
//! let registry = ClaimRegistry::open(
//!     MemoryStorageBackend::<Vec<u8>, Vec<u8>>::default(),
//!     ClaimConfig::default(),
//! )
//! .await?;
//!
//! let alice = PlayerId::new();
//! let home = Location::new("overworld", 40, 64, -12);
//!
//! registry.claim_region(home.region(), alice.into(), true)?;
//!
//! assert!(registry.can_actor_do(Some(alice), &home, ActionKind::Blocks)?);
//! assert!(!registry.can_actor_do(Some(PlayerId::new()), &home, ActionKind::Blocks)?);
//!
//! registry.close().await?;
//! ```

mod error;
pub use error::*;

mod id;
pub use id::*;

mod coord;
pub use coord::*;

mod setting;
pub use setting::*;

mod action;
pub use action::*;

mod config;
pub use config::*;

mod claimant;
pub use claimant::*;

mod region;
pub use region::*;

mod record;
pub use record::*;

mod resolver;
pub use resolver::*;

mod search;
pub use search::*;

mod registry;
pub use registry::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
