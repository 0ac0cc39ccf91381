use serde::{Deserialize, Serialize};

use crate::{ClaimError, RegionSettings};

/// The vertical extent of every world, `[min_y, max_y)`, and the height of
/// the fixed slices that each region is divided into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalBounds {
    /// Lowest block y (inclusive)
    pub min_y: i32,
    /// Highest block y (exclusive)
    pub max_y: i32,
    /// Height of a single slice in blocks
    pub slice_height: i32,
}

impl Default for VerticalBounds {
    fn default() -> Self {
        Self {
            min_y: -64,
            max_y: 320,
            slice_height: 16,
        }
    }
}

impl VerticalBounds {
    /// The number of slices in every region
    pub fn slice_count(&self) -> usize {
        if self.slice_height <= 0 || self.max_y <= self.min_y {
            return 0;
        }
        ((self.max_y - self.min_y) / self.slice_height) as usize
    }

    /// Whether `y` lies inside the world
    pub fn contains(&self, y: i32) -> bool {
        self.min_y <= y && y < self.max_y
    }

    /// The index of the slice covering `y`, if `y` lies inside the world
    pub fn slice_index(&self, y: i32) -> Option<usize> {
        if !self.contains(y) {
            return None;
        }
        Some(((y - self.min_y) / self.slice_height) as usize)
    }

    /// The `[from, to)` range of the slice at `index`
    pub fn slice_range(&self, index: usize) -> Option<(i32, i32)> {
        if index >= self.slice_count() {
            return None;
        }
        let from = self.min_y + index as i32 * self.slice_height;
        Some((from, from + self.slice_height))
    }

    /// Reject extents that cannot be divided into whole slices
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.max_y <= self.min_y {
            return Err(ClaimError::Config(format!(
                "vertical extent {}..{} is empty",
                self.min_y, self.max_y
            )));
        }
        if self.slice_height <= 0 {
            return Err(ClaimError::Config(format!(
                "slice height {} must be positive",
                self.slice_height
            )));
        }
        if (self.max_y - self.min_y) % self.slice_height != 0 {
            return Err(ClaimError::Config(format!(
                "vertical extent {}..{} is not divisible by slice height {}",
                self.min_y, self.max_y, self.slice_height
            )));
        }
        Ok(())
    }
}

/// Engine-wide settings, usually loaded by the host from its own config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimConfig {
    /// The vertical extent shared by every world
    pub bounds: VerticalBounds,
    /// Settings in effect where no region is tracked
    pub wilderness_settings: RegionSettings,
    /// Settings given to a region when it is first created
    pub default_region_settings: RegionSettings,
    /// The most regions a single player may own, if limited
    pub claim_limit: Option<usize>,
    /// Display name reported for unowned land
    pub wilderness_name: String,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            bounds: VerticalBounds::default(),
            wilderness_settings: RegionSettings::all(),
            default_region_settings: RegionSettings::HOSTILE_SPAWNS,
            claim_limit: None,
            wilderness_name: "Wilderness".into(),
        }
    }
}

impl ClaimConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> Result<Self, ClaimError> {
        let config: ClaimConfig =
            serde_json::from_str(json).map_err(|error| ClaimError::Config(format!("{error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot operate with
    pub fn validate(&self) -> Result<(), ClaimError> {
        self.bounds.validate()?;
        if self.claim_limit == Some(0) {
            return Err(ClaimError::Config(
                "a claim limit of zero forbids all claims; omit it instead".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{ClaimConfig, ClaimError, RegionSettings, VerticalBounds};

    #[test]
    fn it_divides_the_default_world_into_24_slices() {
        let bounds = VerticalBounds::default();

        assert_eq!(bounds.slice_count(), 24);
        assert_eq!(bounds.slice_index(-64), Some(0));
        assert_eq!(bounds.slice_index(-49), Some(0));
        assert_eq!(bounds.slice_index(-48), Some(1));
        assert_eq!(bounds.slice_index(319), Some(23));
        assert_eq!(bounds.slice_index(320), None);
        assert_eq!(bounds.slice_range(23), Some((304, 320)));
        assert_eq!(bounds.slice_range(24), None);
    }

    #[test]
    fn it_fills_missing_fields_with_defaults() {
        let config = ClaimConfig::from_json(r#"{ "claimLimit": 8 }"#).unwrap();

        assert_eq!(config.claim_limit, Some(8));
        assert_eq!(config.bounds, VerticalBounds::default());
        assert!(
            config
                .default_region_settings
                .contains(RegionSettings::HOSTILE_SPAWNS)
        );
        assert_eq!(config.wilderness_name, "Wilderness");
    }

    #[test]
    fn it_rejects_bounds_that_do_not_divide_into_slices() {
        let result = ClaimConfig::from_json(
            r#"{ "bounds": { "minY": 0, "maxY": 100, "sliceHeight": 16 } }"#,
        );

        assert!(matches!(result, Err(ClaimError::Config(_))));
    }

    #[test]
    fn it_rejects_malformed_json() {
        assert!(matches!(
            ClaimConfig::from_json("{ claimLimit"),
            Err(ClaimError::Config(_))
        ));
    }
}
