use crate::{
    ClaimError, Owner, RegionCoord, RegionRecord, RegionSetting, RegionSettings, SliceRecord,
    VerticalBounds,
};

mod slice;
pub use slice::*;

/// The claim record of a single region: its nominal owner, its vertical
/// slices and its settings.
///
/// The slices always cover the whole vertical extent in order. Each slice
/// may hand parts of itself to owners other than the nominal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedRegion {
    coord: RegionCoord,
    bounds: VerticalBounds,
    owner: Option<Owner>,
    slices: Vec<Slice>,
    settings: RegionSettings,
}

impl ClaimedRegion {
    /// An unclaimed region with the given settings
    pub fn new(coord: RegionCoord, bounds: VerticalBounds, settings: RegionSettings) -> Self {
        let slices = (0..bounds.slice_count())
            .filter_map(|index| bounds.slice_range(index))
            .map(|(from, to)| Slice::new(from, to, None))
            .collect();
        Self {
            coord,
            bounds,
            owner: None,
            slices,
            settings,
        }
    }

    /// Rebuild a region from its persisted record
    pub fn from_record(
        coord: RegionCoord,
        bounds: VerticalBounds,
        record: &RegionRecord,
    ) -> Result<Self, ClaimError> {
        let mut region = Self::new(
            coord,
            bounds,
            RegionSettings::from_bits_truncate(record.settings),
        );
        region.owner = record.owner;
        region.deserialize_slices(&record.slices)?;
        Ok(region)
    }

    /// The persisted form of this region
    pub fn to_record(&self) -> RegionRecord {
        RegionRecord {
            owner: self.owner,
            settings: self.settings.bits(),
            slices: self.serialize_slices(),
        }
    }

    /// Where this region is
    pub fn coord(&self) -> &RegionCoord {
        &self.coord
    }

    /// The vertical extent this region was built for
    pub fn bounds(&self) -> &VerticalBounds {
        &self.bounds
    }

    /// The nominal owner of the region
    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Whether anyone owns the region
    pub fn is_claimed(&self) -> bool {
        self.owner.is_some()
    }

    /// The slices of this region, lowest first
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// The owner of the block at height `y`: the owner of the span covering
    /// `y`, or the nominal owner where the span defers to it
    pub fn owner_at(&self, y: i32) -> Option<Owner> {
        self.bounds
            .slice_index(y)
            .and_then(|index| self.slices.get(index))
            .and_then(|slice| slice.span_at(y))
            .and_then(|span| span.owner)
            .or(self.owner)
    }

    /// Every distinct owner of any part of this region
    pub fn owners(&self) -> Vec<Owner> {
        let mut owners = Vec::new();
        let spans = self.slices.iter().flat_map(|slice| slice.spans());
        for owner in spans.filter_map(|span| span.owner.or(self.owner)) {
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        owners
    }

    /// Hand the whole region to `owner`, discarding any subdivision
    pub fn set_owner(&mut self, owner: Option<Owner>) {
        self.owner = owner;
        for slice in self.slices.iter_mut() {
            slice.reset(owner);
        }
    }

    /// Hand every span owned by `owner` back to the nominal owner. Returns
    /// whether anything changed.
    pub(crate) fn release_spans(&mut self, owner: &Owner) -> bool {
        self.slices
            .iter_mut()
            .fold(false, |changed, slice| slice.release(owner) || changed)
    }

    fn clip(&self, index: usize, from: i32, to: i32) -> Result<(usize, i32, i32), ClaimError> {
        let invalid = ClaimError::InvalidRange { from, to };
        if from >= to || from < self.bounds.min_y || to > self.bounds.max_y {
            return Err(invalid);
        }
        let slice = self.slices.get(index).ok_or(invalid.clone())?;
        let (from, to) = (from.max(slice.from()), to.min(slice.to()));
        if from >= to {
            return Err(invalid);
        }
        Ok((index, from, to))
    }

    /// Give the part of `[from, to)` that falls inside the slice at `index`
    /// to `owner`.
    ///
    /// With `fresh` set, the clipped range ends up wholly owned by `owner`.
    /// Otherwise finer subdivisions that the range only partly covers are
    /// preserved; an undivided slice is split either way.
    ///
    /// Fails with [`ClaimError::InvalidRange`] if the range is empty, leaves
    /// the world, or misses the slice.
    pub fn set_slice_owner(
        &mut self,
        index: usize,
        from: i32,
        to: i32,
        owner: Option<Owner>,
        fresh: bool,
    ) -> Result<(), ClaimError> {
        let (index, from, to) = self.clip(index, from, to)?;
        if let Some(slice) = self.slices.get_mut(index) {
            slice.assign(from, to, owner, fresh);
        }
        Ok(())
    }

    /// The effective owners of the spans of slice `index` that intersect
    /// `[from, to)`, lowest first
    pub fn slice_owners(
        &self,
        index: usize,
        from: i32,
        to: i32,
    ) -> Result<Vec<Option<Owner>>, ClaimError> {
        let (index, from, to) = self.clip(index, from, to)?;
        Ok(self
            .slices
            .get(index)
            .map(|slice| {
                slice
                    .spans_in(from, to)
                    .map(|span| span.owner.or(self.owner))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// The slice ownership as an ordered, gap-free list of records.
    /// Neighbouring spans with the same owner are written as one record even
    /// across slice boundaries.
    pub fn serialize_slices(&self) -> Vec<SliceRecord> {
        let mut records: Vec<SliceRecord> = Vec::new();
        for span in self.slices.iter().flat_map(|slice| slice.spans()) {
            match records.last_mut() {
                Some(last) if last.owner() == span.owner && last.range_end == span.from => {
                    last.range_end = span.to;
                }
                _ => records.push(SliceRecord::new(span.from, span.to, span.owner)),
            }
        }
        records
    }

    /// Replace the slice ownership with the content of `records`.
    ///
    /// The records must be non-empty, non-empty individually, contiguous and
    /// cover exactly `[min_y, max_y)`. Anything else is rejected with
    /// [`ClaimError::CorruptData`] and the region is left as it was.
    pub fn deserialize_slices(&mut self, records: &[SliceRecord]) -> Result<(), ClaimError> {
        let Some(first) = records.first() else {
            return Err(ClaimError::CorruptData(format!(
                "region {} has no slice records",
                self.coord
            )));
        };
        if first.range_start != self.bounds.min_y {
            return Err(ClaimError::CorruptData(format!(
                "slice records of region {} start at {} instead of {}",
                self.coord, first.range_start, self.bounds.min_y
            )));
        }

        let mut expected = self.bounds.min_y;
        for record in records {
            if record.range_start != expected {
                return Err(ClaimError::CorruptData(format!(
                    "slice records of region {} are not contiguous at {}",
                    self.coord, expected
                )));
            }
            if record.range_start >= record.range_end {
                return Err(ClaimError::CorruptData(format!(
                    "slice record {}..{} of region {} is empty",
                    record.range_start, record.range_end, self.coord
                )));
            }
            expected = record.range_end;
        }
        if expected != self.bounds.max_y {
            return Err(ClaimError::CorruptData(format!(
                "slice records of region {} end at {} instead of {}",
                self.coord, expected, self.bounds.max_y
            )));
        }

        let slices = (0..self.bounds.slice_count())
            .filter_map(|index| self.bounds.slice_range(index))
            .map(|(from, to)| {
                let spans = records
                    .iter()
                    .filter(|record| record.range_start < to && from < record.range_end)
                    .map(|record| Span {
                        from: record.range_start.max(from),
                        to: record.range_end.min(to),
                        owner: record.owner(),
                    })
                    .collect();
                Slice::from_spans(from, to, spans)
            })
            .collect();

        self.slices = slices;
        Ok(())
    }

    /// The settings of this region
    pub fn settings(&self) -> RegionSettings {
        self.settings
    }

    /// Whether `setting` is enabled in this region
    pub fn is_setting(&self, setting: RegionSetting) -> bool {
        self.settings.contains(setting.flag())
    }

    /// Enable or disable `setting` in this region
    pub fn set_setting(&mut self, setting: RegionSetting, enabled: bool) {
        self.settings.set(setting.flag(), enabled);
    }
}
