//! Binary opening with the 5x5 elliptical structuring element used to strip
//! thin bridges and specks out of model masks.
//!
//! Neighbours that fall outside the image never constrain the result: erosion
//! treats them as set, dilation treats them as unset.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_open};

use super::mask::BinaryPresenceMask;

const RADIUS: u8 = 2;

/// Ellipse inscribed in a 5x5 box, row-major, centred on (2, 2).
const FOOTPRINT: [[bool; 5]; 5] = {
    const O: bool = false;
    const X: bool = true;
    [
        [O, O, X, O, O],
        [X, X, X, X, X],
        [X, X, X, X, X],
        [X, X, X, X, X],
        [O, O, X, O, O],
    ]
};

lazy_static::lazy_static! {
    static ref ELLIPSE: Mask = Mask::from_image(&footprint_image(), RADIUS, RADIUS);
}

fn footprint_image() -> GrayImage {
    GrayImage::from_fn(5, 5, |x, y| {
        if FOOTPRINT[y as usize][x as usize] {
            Luma([BinaryPresenceMask::ON])
        } else {
            Luma([0])
        }
    })
}

/// One opening pass: erosion then dilation.
pub fn clean(mask: &BinaryPresenceMask) -> BinaryPresenceMask {
    BinaryPresenceMask::from_gray(grayscale_open(mask.as_gray(), &ELLIPSE))
}
