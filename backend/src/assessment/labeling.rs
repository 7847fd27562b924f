use std::collections::HashMap;

use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};

use super::mask::BinaryPresenceMask;

/// A connected region of one class layer, before any cost is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelledRegion {
    pub id: u32,
    pub area_px: u64,
}

/// Labels 8-connected regions. Ids start at 1 and follow the row-major order in
/// which each region is first encountered; background never receives an id.
pub fn label(mask: &BinaryPresenceMask) -> Vec<LabelledRegion> {
    let components = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));

    let mut ids: HashMap<u32, usize> = HashMap::new();
    let mut regions: Vec<LabelledRegion> = Vec::new();
    for Luma([component]) in components.pixels() {
        if *component == 0 {
            continue;
        }
        let index = *ids.entry(*component).or_insert_with(|| {
            regions.push(LabelledRegion {
                id: regions.len() as u32 + 1,
                area_px: 0,
            });
            regions.len() - 1
        });
        regions[index].area_px += 1;
    }
    regions
}
