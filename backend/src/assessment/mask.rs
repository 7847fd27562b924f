use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};

/// A mask pixel in the channel order the segmentation models emit (blue, green, red).
pub type Bgr = [u8; 3];

pub const BACKGROUND: Bgr = [0, 0, 0];

#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("a {width}x{height} mask needs {expected} pixels, got {actual}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("failed to encode mask: {0}")]
    Encode(#[from] image::ImageError),
}

/// Color-coded model output. Immutable once built; every post-processing step only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    pixels: Vec<Bgr>,
}

impl SegmentationMask {
    pub fn new(width: u32, height: u32, pixels: Vec<Bgr>) -> Result<Self, MaskError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(MaskError::DimensionMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, color: Bgr) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Builds a mask from a decoded RGB image, swapping channels into model order.
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let pixels = image
            .pixels()
            .map(|Rgb([r, g, b])| [*b, *g, *r])
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let [b, g, r] = self.pixel(x, y);
            Rgb([r, g, b])
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, MaskError> {
        let mut buffer = Cursor::new(Vec::new());
        self.to_rgb_image().write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Bgr {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn pixels(&self) -> &[Bgr] {
        &self.pixels
    }

    /// Copies this mask, keeping only the pixels set in `keep` and blacking out the rest.
    pub fn retain(&self, keep: &BinaryPresenceMask) -> Self {
        let pixels = self
            .pixels
            .iter()
            .zip(keep.as_gray().pixels())
            .map(|(color, Luma([v]))| if *v > 0 { *color } else { BACKGROUND })
            .collect();
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Paints `color` wherever `layer` is set. Layers must share this mask's dimensions.
    pub fn paint(&mut self, layer: &BinaryPresenceMask, color: Bgr) {
        for (pixel, Luma([v])) in self.pixels.iter_mut().zip(layer.as_gray().pixels()) {
            if *v > 0 {
                *pixel = color;
            }
        }
    }
}

/// Per-pixel membership of a single class. Stored as a 0/255 grayscale image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPresenceMask(GrayImage);

impl BinaryPresenceMask {
    pub const ON: u8 = 255;

    pub fn empty(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            Luma([if f(x, y) { Self::ON } else { 0 }])
        }))
    }

    /// Any non-zero intensity counts as set.
    pub fn from_gray(mut image: GrayImage) -> Self {
        for Luma([v]) in image.pixels_mut() {
            if *v > 0 {
                *v = Self::ON;
            }
        }
        Self(image)
    }

    /// Parses rows of `#` (set) and `.` (unset). Handy for fixtures.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        Self::from_fn(width, height, |x, y| {
            rows[y as usize].as_bytes().get(x as usize) == Some(&b'#')
        })
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] > 0
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.0.put_pixel(x, y, Luma([if value { Self::ON } else { 0 }]));
    }

    pub fn count(&self) -> u64 {
        self.0.pixels().filter(|Luma([v])| *v > 0).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}
