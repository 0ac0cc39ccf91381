use std::{fmt::Display, str::FromStr};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ClaimError;

/// A region-level toggle that applies to everyone in the region, regardless
/// of who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSetting {
    /// Players may fight each other
    PlayerCombat,
    /// Explosions may damage terrain
    Explosions,
    /// Fire may spread and burn blocks
    FireSpread,
    /// Hostile creatures may spawn
    HostileSpawns,
}

impl RegionSetting {
    /// Every setting, in bit order
    pub const ALL: [RegionSetting; 4] = [
        RegionSetting::PlayerCombat,
        RegionSetting::Explosions,
        RegionSetting::FireSpread,
        RegionSetting::HostileSpawns,
    ];

    /// The flag of this setting within a [`RegionSettings`] set
    pub fn flag(self) -> RegionSettings {
        match self {
            RegionSetting::PlayerCombat => RegionSettings::PLAYER_COMBAT,
            RegionSetting::Explosions => RegionSettings::EXPLOSIONS,
            RegionSetting::FireSpread => RegionSettings::FIRE_SPREAD,
            RegionSetting::HostileSpawns => RegionSettings::HOSTILE_SPAWNS,
        }
    }

    /// The stable name of this setting
    pub fn name(&self) -> &'static str {
        match self {
            RegionSetting::PlayerCombat => "player_combat",
            RegionSetting::Explosions => "explosions",
            RegionSetting::FireSpread => "fire_spread",
            RegionSetting::HostileSpawns => "hostile_spawns",
        }
    }
}

impl FromStr for RegionSetting {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegionSetting::ALL
            .into_iter()
            .find(|setting| setting.name() == s)
            .ok_or_else(|| ClaimError::UnknownSetting(s.to_owned()))
    }
}

impl Display for RegionSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

bitflags! {
    /// A set of enabled [`RegionSetting`]s, persisted as a bitset
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RegionSettings: u32 {
        /// See [`RegionSetting::PlayerCombat`]
        const PLAYER_COMBAT = 1;
        /// See [`RegionSetting::Explosions`]
        const EXPLOSIONS = 1 << 1;
        /// See [`RegionSetting::FireSpread`]
        const FIRE_SPREAD = 1 << 2;
        /// See [`RegionSetting::HostileSpawns`]
        const HOSTILE_SPAWNS = 1 << 3;
    }
}

impl From<RegionSetting> for RegionSettings {
    fn from(setting: RegionSetting) -> Self {
        setting.flag()
    }
}

impl FromIterator<RegionSetting> for RegionSettings {
    fn from_iter<T: IntoIterator<Item = RegionSetting>>(iter: T) -> Self {
        iter.into_iter()
            .fold(RegionSettings::empty(), |settings, setting| {
                settings | setting.flag()
            })
    }
}
