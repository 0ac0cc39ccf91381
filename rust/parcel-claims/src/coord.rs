use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Regions are `2^REGION_SHIFT` blocks wide along both horizontal axes
pub const REGION_SHIFT: u32 = 4;

/// The width of a region in blocks
pub const REGION_SIZE: i32 = 1 << REGION_SHIFT;

/// Identifies a world (or dimension) of the host game, e.g.
/// `"minecraft:overworld"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(String);

impl WorldId {
    /// The world identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorldId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for WorldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The coordinate of a region: a fixed-size horizontal tile of one world and
/// the unit of claim ownership.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionCoord {
    /// The world the region belongs to
    pub world: WorldId,
    /// Region index along the x axis
    pub x: i32,
    /// Region index along the z axis
    pub z: i32,
}

impl RegionCoord {
    /// Construct a region coordinate
    pub fn new(world: impl Into<WorldId>, x: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            z,
        }
    }

    /// The region `dx` and `dz` regions away from this one, in the same world
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self {
            world: self.world.clone(),
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }

    /// The block position of the north-west corner of this region at height `y`
    pub fn origin(&self, y: i32) -> Location {
        Location {
            world: self.world.clone(),
            x: self.x << REGION_SHIFT,
            y,
            z: self.z << REGION_SHIFT,
        }
    }
}

impl Display for RegionCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{},{}", self.world, self.x, self.z)
    }
}

/// A block position in a world
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// The world the block belongs to
    pub world: WorldId,
    /// Block x coordinate
    pub x: i32,
    /// Block y (vertical) coordinate
    pub y: i32,
    /// Block z coordinate
    pub z: i32,
}

impl Location {
    /// Construct a location
    pub fn new(world: impl Into<WorldId>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// The region containing this location
    pub fn region(&self) -> RegionCoord {
        RegionCoord {
            world: self.world.clone(),
            x: self.x >> REGION_SHIFT,
            z: self.z >> REGION_SHIFT,
        }
    }
}
