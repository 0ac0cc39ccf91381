use std::{collections::BTreeSet, fmt::Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ClaimantGroup, ClaimantPlayer, GroupId, Owner, OwnerKind, PlayerId, RegionCoord};

/// One contiguous run of slice ownership in the persisted form of a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceRecord {
    /// Lowest block y (inclusive)
    pub range_start: i32,
    /// Highest block y (exclusive)
    pub range_end: i32,
    /// The owner of the run, absent where it defers to the region owner
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    /// Which kind of claimant `owner_id` refers to; omitted for players
    #[serde(default, skip_serializing_if = "OwnerKind::is_player")]
    pub owner_kind: OwnerKind,
}

impl SliceRecord {
    /// A record for `[range_start, range_end)` owned by `owner`
    pub fn new(range_start: i32, range_end: i32, owner: Option<Owner>) -> Self {
        Self {
            range_start,
            range_end,
            owner_id: owner.map(|owner| owner.uuid()),
            owner_kind: owner.map(|owner| owner.kind()).unwrap_or_default(),
        }
    }

    /// The owner this record refers to
    pub fn owner(&self) -> Option<Owner> {
        self.owner_id
            .map(|id| Owner::from_parts(self.owner_kind, id))
    }
}

/// The persisted form of a [`crate::ClaimedRegion`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRecord {
    /// The nominal owner of the region
    #[serde(default)]
    pub owner: Option<Owner>,
    /// The bits of the region's [`crate::RegionSettings`]
    pub settings: u32,
    /// The slice ownership, ordered and gap-free
    pub slices: Vec<SliceRecord>,
}

/// Lists every claimant so that they can all be loaded when the registry
/// opens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIndex {
    /// Every known player
    pub players: BTreeSet<PlayerId>,
    /// Every known group
    pub groups: BTreeSet<GroupId>,
}

/// The storage key of a persisted record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    /// The [`ClaimIndex`]
    Index,
    /// A [`ClaimantPlayer`]
    Player(PlayerId),
    /// A [`ClaimantGroup`]
    Group(GroupId),
    /// A [`RegionRecord`]
    Region(RegionCoord),
}

impl RecordKey {
    /// The key as stored in a byte-keyed backend
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Index => write!(f, "index"),
            RecordKey::Player(id) => write!(f, "player/{id}"),
            RecordKey::Group(id) => write!(f, "group/{id}"),
            RecordKey::Region(coord) => {
                write!(f, "region/{}/{}/{}", coord.world, coord.x, coord.z)
            }
        }
    }
}

/// A snapshot of one dirty record, ready to be encoded outside of the lock
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum DirtyRecord {
    Index(ClaimIndex),
    Player(ClaimantPlayer),
    Group(ClaimantGroup),
    Region(RegionRecord),
}

/// (De)serializes a map as a sequence of `(key, value)` entries, for maps
/// whose keys are not strings
pub(crate) mod entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Ok(Vec::<(K, V)>::deserialize(deserializer)?
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use parcel_storage::{CborEncoder, Encoder};

    use crate::{
        ClaimantGroup, GroupId, Owner, PlayerId, RecordKey, RegionCoord, RegionRecord,
        SliceRecord,
    };

    #[test]
    fn it_omits_the_owner_kind_of_player_owned_slices() -> anyhow::Result<()> {
        let player = PlayerId::new();
        let group = GroupId::new();

        let json = serde_json::to_value(vec![
            SliceRecord::new(-64, 0, Some(Owner::from(player))),
            SliceRecord::new(0, 320, Some(Owner::from(group))),
        ])?;

        assert_eq!(
            json,
            serde_json::json!([
                { "rangeStart": -64, "rangeEnd": 0, "ownerId": player },
                { "rangeStart": 0, "rangeEnd": 320, "ownerId": group, "ownerKind": "group" },
            ])
        );

        Ok(())
    }

    #[test]
    fn it_reads_slice_records_without_an_owner_kind() -> anyhow::Result<()> {
        let player = PlayerId::new();
        let record: SliceRecord = serde_json::from_value(serde_json::json!({
            "rangeStart": -64,
            "rangeEnd": 320,
            "ownerId": player,
        }))?;

        assert_eq!(record.owner(), Some(Owner::from(player)));

        Ok(())
    }

    #[test]
    fn it_lays_out_keys_by_record_kind() {
        let player = PlayerId::new();

        assert_eq!(RecordKey::Index.to_bytes(), b"index".to_vec());
        assert_eq!(RecordKey::Player(player).to_string(), format!("player/{player}"));
        assert_eq!(
            RecordKey::Region(RegionCoord::new("overworld", -2, 7)).to_string(),
            "region/overworld/-2/7"
        );
    }

    #[tokio::test]
    async fn it_encodes_records_as_dag_cbor() -> anyhow::Result<()> {
        let founder = PlayerId::new();
        let group = ClaimantGroup::new(GroupId::new(), founder);
        let region = RegionRecord {
            owner: Some(Owner::from(*group.id())),
            settings: 0b1000,
            slices: vec![SliceRecord::new(-64, 320, None)],
        };

        let encoder = CborEncoder;

        let bytes = encoder.encode(&group).await?;
        assert_eq!(encoder.decode::<ClaimantGroup>(&bytes).await?, group);

        let bytes = encoder.encode(&region).await?;
        assert_eq!(encoder.decode::<RegionRecord>(&bytes).await?, region);

        Ok(())
    }
}
