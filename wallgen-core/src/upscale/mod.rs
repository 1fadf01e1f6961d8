//! Learned super-resolution.
//!
//! [`Upsampler`] is the seam the pipeline depends on; [`FsrcnnUpsampler`] is
//! the real implementation, running an FSRCNN export through ONNX Runtime.
//! The network works on the luma plane only, so RGB input is split into
//! YCbCr, luma goes through the model and chroma is upscaled bicubically
//! before recombining.

mod model;

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

pub use model::FsrcnnModel;

use crate::error::{Result, WallgenError};

/// Scale factors the FSRCNN family is trained for.
pub const SUPPORTED_SCALES: [u32; 3] = [2, 3, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScaleFactor(u32);

impl ScaleFactor {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ScaleFactor {
    type Error = WallgenError;

    fn try_from(scale: u32) -> Result<Self> {
        if SUPPORTED_SCALES.contains(&scale) {
            Ok(Self(scale))
        } else {
            Err(WallgenError::UnsupportedScale(scale))
        }
    }
}

pub trait Upsampler {
    /// Returns a new image of exactly `(width * scale, height * scale)`.
    fn upscale(&self, image: &RgbImage, scale: u32) -> Result<RgbImage>;
}

/// Model loaded once and reused; picking a scale per call only selects a
/// different output head of the same session.
#[derive(Debug)]
pub struct FsrcnnUpsampler {
    model: FsrcnnModel,
}

impl FsrcnnUpsampler {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            model: FsrcnnModel::load(path)?,
        })
    }

    /// Scales this model carries a trained head for.
    pub fn scales(&self) -> Vec<u32> {
        self.model.scales()
    }
}

impl Upsampler for FsrcnnUpsampler {
    fn upscale(&self, image: &RgbImage, scale: u32) -> Result<RgbImage> {
        let scale = ScaleFactor::try_from(scale)?.get();
        if !self.model.has_scale(scale) {
            return Err(WallgenError::UnsupportedScale(scale));
        }

        let (width, height) = image.dimensions();
        log::debug!(
            "Upscaling {}x{} by {} to {}x{}",
            width,
            height,
            scale,
            width * scale,
            height * scale
        );

        let luma = self
            .model
            .infer(luma_plane(image), width as usize, height as usize, scale)?;
        Ok(recombine(image, &luma, scale))
    }
}

/// Model input: BT.601 luma normalised to `[0, 1]`, row-major.
fn luma_plane(image: &RgbImage) -> Vec<f32> {
    image.pixels().map(|p| rgb_to_ycbcr(p).0 / 255.0).collect()
}

/// Joins a predicted luma plane of the upscaled size with chroma resized
/// bicubically from `source`.
fn recombine(source: &RgbImage, luma: &[f32], scale: u32) -> RgbImage {
    let (out_w, out_h) = (source.width() * scale, source.height() * scale);
    let chroma = imageops::resize(source, out_w, out_h, FilterType::CatmullRom);
    RgbImage::from_fn(out_w, out_h, |x, y| {
        let (_, cb, cr) = rgb_to_ycbcr(chroma.get_pixel(x, y));
        let y_value = luma[(y * out_w + x) as usize].clamp(0.0, 1.0) * 255.0;
        ycbcr_to_rgb(y_value, cb, cr)
    })
}

fn rgb_to_ycbcr(pixel: &Rgb<u8>) -> (f32, f32, f32) {
    let [r, g, b] = pixel.0.map(f32::from);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = (b - y) * 0.564 + 128.0;
    let cr = (r - y) * 0.713 + 128.0;
    (y, cb, cr)
}

fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> Rgb<u8> {
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    let r = y + 1.403 * (cr - 128.0);
    let g = y - 0.714 * (cr - 128.0) - 0.344 * (cb - 128.0);
    let b = y + 1.773 * (cb - 128.0);
    Rgb([channel(r), channel(g), channel(b)])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Luma a perfect model would predict: the source luma, pixel-replicated.
    fn replicated_luma(image: &RgbImage, scale: u32) -> Vec<f32> {
        let plane = luma_plane(image);
        let (w, h) = image.dimensions();
        let mut out = Vec::with_capacity((w * h * scale * scale) as usize);
        for y in 0..h * scale {
            for x in 0..w * scale {
                out.push(plane[((y / scale) * w + x / scale) as usize]);
            }
        }
        out
    }

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x / 5 + y / 5) % 2 == 0 {
                Rgb([200, 40, 90])
            } else {
                Rgb([30, 160, 220])
            }
        })
    }

    #[test]
    fn recombined_output_is_scale_times_input() {
        let source = checker(50, 50);
        let up = recombine(&source, &replicated_luma(&source, 4), 4);
        assert_eq!(up.dimensions(), (200, 200));

        let source = checker(20, 10);
        let up = recombine(&source, &replicated_luma(&source, 3), 3);
        assert_eq!(up.dimensions(), (60, 30));
    }

    #[test]
    fn flat_colour_survives_colour_round_trip() {
        let flat = RgbImage::from_pixel(6, 4, Rgb([90, 140, 200]));
        let up = recombine(&flat, &replicated_luma(&flat, 2), 2);
        for pixel in up.pixels() {
            for (got, want) in pixel.0.iter().zip([90u8, 140, 200]) {
                assert!((*got as i16 - want as i16).abs() <= 3, "{:?}", pixel);
            }
        }
    }

    #[test]
    fn out_of_range_luma_is_clamped() {
        let grey = RgbImage::from_pixel(2, 2, Rgb([128, 128, 128]));
        let up = recombine(&grey, &[2.0; 16], 2);
        assert!(up.pixels().all(|p| p.0.iter().all(|&c| c >= 250)));
    }

    #[test]
    fn luma_plane_is_normalised_row_major() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(1, 0, Rgb([255, 255, 255]));
        let plane = luma_plane(&image);
        assert_eq!(plane.len(), 2);
        assert!(plane[0].abs() < 1e-6);
        assert!((plane[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn scale_factor_accepts_only_trained_scales() {
        assert_eq!(ScaleFactor::try_from(4).unwrap().get(), 4);
        assert!(matches!(ScaleFactor::try_from(5), Err(WallgenError::UnsupportedScale(5))));
        assert!(ScaleFactor::try_from(1).is_err());
    }

    #[test]
    fn missing_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsrcnnUpsampler::load(&dir.path().join("FSRCNN-small_x4.onnx")).err().unwrap();
        assert!(matches!(err, WallgenError::ModelLoad { .. }));
    }
}
