use std::sync::Arc;

use crate::{ClaimView, ClaimedRegion, Location, RegionCoord};

fn square(center: &Location, radius: u32) -> impl Iterator<Item = RegionCoord> {
    let origin = center.region();
    let radius = radius.min(i32::MAX as u32) as i32;
    (-radius..=radius).flat_map(move |dx| {
        let origin = origin.clone();
        (-radius..=radius).filter_map(move |dz| {
            Some(RegionCoord {
                world: origin.world.clone(),
                x: origin.x.checked_add(dx)?,
                z: origin.z.checked_add(dz)?,
            })
        })
    })
}

/// Every claimed region in the square of side `2 * radius + 1` regions
/// centred on the region containing `center`. Each region appears once; the
/// order is unspecified.
pub fn owned_around<View>(view: &View, center: &Location, radius: u32) -> Vec<Arc<ClaimedRegion>>
where
    View: ClaimView + ?Sized,
{
    square(center, radius)
        .filter_map(|coord| view.region(&coord))
        .filter(|region| region.is_claimed())
        .cloned()
        .collect()
}

/// Whether any region within `radius` regions of `center` is claimed
pub fn is_owned_around<View>(view: &View, center: &Location, radius: u32) -> bool
where
    View: ClaimView + ?Sized,
{
    square(center, radius)
        .filter_map(|coord| view.region(&coord))
        .any(|region| region.is_claimed())
}
