use super::mask::{BACKGROUND, BinaryPresenceMask, SegmentationMask};
use super::registry::DamageClass;

/// Marks every pixel whose color is exactly the class color. No tolerance.
pub fn isolate(mask: &SegmentationMask, class: &DamageClass) -> BinaryPresenceMask {
    BinaryPresenceMask::from_fn(mask.width(), mask.height(), |x, y| {
        mask.pixel(x, y) == class.color
    })
}

/// Marks every non-background pixel, whatever its color.
pub fn foreground(mask: &SegmentationMask) -> BinaryPresenceMask {
    BinaryPresenceMask::from_fn(mask.width(), mask.height(), |x, y| {
        mask.pixel(x, y) != BACKGROUND
    })
}
