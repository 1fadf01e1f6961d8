//! Widening an image to a 6:4 wallpaper without generative fill.
//!
//! The working image is centred on a canvas one and a half times its width and
//! the two uncovered bands are filled with mirrored copies of the image's own
//! outer quarters, so the seam at each edge is continuous.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Reframes `image` to a 6:4 (3:2) aspect ratio.
///
/// Images already at 3:2 come back as an unchanged copy. Any other non-square
/// image is first resized to `height x height`, which throws away its original
/// aspect ratio; that is the current behaviour and callers rely on it.
pub fn reframe_to_6_4(image: &RgbImage) -> RgbImage {
    let (orig_width, orig_height) = image.dimensions();

    if orig_width == 0 || orig_height == 0 {
        log::warn!("Refusing to reframe empty {}x{} image", orig_width, orig_height);
        return image.clone();
    }

    if orig_width * 2 == orig_height * 3 {
        return image.clone();
    }

    let squared;
    let working = if orig_width == orig_height {
        image
    } else {
        log::debug!(
            "Forcing {}x{} to {}x{} before reframing",
            orig_width,
            orig_height,
            orig_height,
            orig_height
        );
        squared = imageops::resize(image, orig_height, orig_height, FilterType::CatmullRom);
        &squared
    };

    mirror_extend(working)
}

/// Centres `working` on a `(w + w/2) x h` canvas and fills the side bands with
/// the flipped outer quarters.
fn mirror_extend(working: &RgbImage) -> RgbImage {
    let (width, height) = working.dimensions();
    let quarter = width / 4;

    let mut canvas = RgbImage::new(width + width / 2, height);
    imageops::replace(&mut canvas, working, i64::from(quarter), 0);

    if quarter > 0 {
        let left = imageops::crop_imm(working, 0, 0, quarter, height).to_image();
        let right = imageops::crop_imm(working, width - quarter, 0, quarter, height).to_image();
        let left = imageops::flip_horizontal(&left);
        let right = imageops::flip_horizontal(&right);

        imageops::replace(&mut canvas, &left, 0, 0);
        imageops::replace(&mut canvas, &right, i64::from(width + quarter), 0);
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn numbered(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]))
    }

    fn column(image: &RgbImage, x: u32) -> Vec<Rgb<u8>> {
        (0..image.height()).map(|y| *image.get_pixel(x, y)).collect()
    }

    #[test]
    fn square_becomes_three_halves_wide() {
        let reframed = reframe_to_6_4(&numbered(100, 100));
        assert_eq!(reframed.dimensions(), (150, 100));
    }

    #[test]
    fn three_by_two_is_returned_unchanged() {
        let source = numbered(300, 200);
        let reframed = reframe_to_6_4(&source);
        assert_eq!(reframed.dimensions(), (300, 200));
        assert_eq!(reframed, source);
    }

    #[test]
    fn reframing_is_not_idempotent() {
        // 9 + 9/2 = 13 is not 3:2 of 9, so a second pass squashes and widens again
        let once = reframe_to_6_4(&numbered(9, 9));
        let twice = reframe_to_6_4(&once);

        assert_eq!(once.dimensions(), (13, 9));
        assert_eq!(twice.dimensions(), (13, 9));
        assert_ne!(once, twice);
    }

    #[test]
    fn side_bands_mirror_outer_quarters() {
        let source = numbered(100, 100);
        let reframed = reframe_to_6_4(&source);
        let quarter = 25;

        for x in 0..quarter {
            assert_eq!(column(&reframed, x), column(&source, quarter - 1 - x), "left {}", x);
            assert_eq!(
                column(&reframed, 100 + quarter + x),
                column(&source, 100 - 1 - x),
                "right {}",
                x
            );
        }
    }

    #[test]
    fn working_image_is_centred() {
        let source = numbered(100, 100);
        let reframed = reframe_to_6_4(&source);

        for x in 0..100 {
            assert_eq!(column(&reframed, 25 + x), column(&source, x));
        }
    }

    #[test]
    fn non_square_input_is_forced_square_first() {
        // current behaviour: 200x100 is squashed to 100x100, not cropped
        let reframed = reframe_to_6_4(&numbered(200, 100));
        assert_eq!(reframed.dimensions(), (150, 100));

        let tall = reframe_to_6_4(&numbered(60, 80));
        assert_eq!(tall.dimensions(), (120, 80));
    }

    #[test]
    fn width_not_divisible_by_four_leaves_rounding_gap() {
        let source = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let reframed = reframe_to_6_4(&source);

        assert_eq!(reframed.dimensions(), (15, 10));
        // quarter = 2: bands cover 0..2 and 12..14, column 14 stays black
        assert_eq!(*reframed.get_pixel(13, 0), Rgb([255, 255, 255]));
        assert_eq!(*reframed.get_pixel(14, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn tiny_square_without_bands_still_widens() {
        let reframed = reframe_to_6_4(&numbered(2, 2));
        assert_eq!(reframed.dimensions(), (3, 2));
    }

    #[test]
    fn caller_image_is_not_mutated() {
        let source = numbered(64, 64);
        let snapshot = source.clone();
        let _ = reframe_to_6_4(&source);
        assert_eq!(source, snapshot);
    }
}
