//! Fingerprint image preparation ahead of embedding extraction.
//!
//! The ridge mask is computed on a contrast-enhanced copy resized to the
//! segmentation input, then applied at the original resolution, so the
//! recognition model sees untouched ridge intensities with the background
//! zeroed. Scaling into [0, 1] happens only on the tensors handed to the
//! models, never on the image that gets masked.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;

use crate::clahe;
use crate::error::PreprocessError;
use crate::segment::{self, Segmenter};

/// Probability above which a pixel counts as ridge area.
pub const MASK_THRESHOLD: f32 = 0.5;

/// Extensions recognized as fingerprint sample images.
pub const SAMPLE_EXTENSIONS: [&str; 6] = ["bmp", "png", "jpg", "jpeg", "tif", "tiff"];

pub fn is_sample_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SAMPLE_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Load a fingerprint image from disk as 8-bit grayscale.
pub fn load_grayscale(path: &Path) -> Result<GrayImage, PreprocessError> {
    let img = image::open(path).map_err(|source| PreprocessError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_luma8())
}

/// Decode an in-memory fingerprint image as 8-bit grayscale.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, PreprocessError> {
    let img = image::load_from_memory(bytes).map_err(|source| PreprocessError::ImageDecode {
        len: bytes.len(),
        source,
    })?;
    Ok(img.to_luma8())
}

/// Prepare a grayscale fingerprint for the recognition model.
///
/// Segmentation runs on a CLAHE-enhanced copy at the segmentation input
/// size; the resulting mask is brought back to the original resolution and
/// multiplied into the unenhanced image before the final resize to
/// `recognition_shape`.
pub fn prepare(
    image: &GrayImage,
    segmenter: &mut Segmenter,
    recognition_shape: (u32, u32),
) -> Result<Array4<f32>, PreprocessError> {
    let (seg_height, seg_width) = segmenter.input_shape();
    let resized = imageops::resize(image, seg_width, seg_height, FilterType::Triangle);
    let enhanced = clahe::equalize(&resized);

    let prob = segmenter.probability_map(image_to_tensor(&enhanced)?)?;
    let mask = segment::threshold_mask(&prob, MASK_THRESHOLD);

    // Nearest keeps the mask binary when scaling back up.
    let mask_full = imageops::resize(&mask, image.width(), image.height(), FilterType::Nearest);
    let masked = apply_mask(image, &mask_full);

    let ridge_pixels = mask_full.as_raw().iter().filter(|&&m| m != 0).count();
    log::debug!(
        "ridge mask covers {:.1}% of the frame",
        100.0 * ridge_pixels as f64 / (mask_full.as_raw().len() as f64).max(1.0)
    );

    let (rec_height, rec_width) = recognition_shape;
    let final_img = imageops::resize(&masked, rec_width, rec_height, FilterType::Triangle);
    image_to_tensor(&final_img)
}

/// Scale an 8-bit grayscale image into a batch-of-one NHWC tensor in [0, 1].
pub fn image_to_tensor(image: &GrayImage) -> Result<Array4<f32>, PreprocessError> {
    let (width, height) = image.dimensions();
    let data: Vec<f32> = image.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    Ok(Array4::from_shape_vec(
        (1, height as usize, width as usize, 1),
        data,
    )?)
}

/// Zero every pixel the {0, 1} mask marks as background.
pub fn apply_mask(image: &GrayImage, mask: &GrayImage) -> GrayImage {
    debug_assert_eq!(image.dimensions(), mask.dimensions());
    let mut out = image.clone();
    for (pixel, m) in out.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 0 {
            pixel.0[0] = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_sample_extensions() {
        assert!(is_sample_file(Path::new("p/101_1.BMP")));
        assert!(is_sample_file(Path::new("p/scan.tiff")));
        assert!(is_sample_file(Path::new("p/scan.Jpeg")));
        assert!(!is_sample_file(Path::new("p/notes.txt")));
        assert!(!is_sample_file(Path::new("p/bmp")));
    }

    #[test]
    fn test_tensor_layout_is_nhwc() {
        let mut img = GrayImage::new(3, 2);
        img.put_pixel(2, 0, Luma([255]));
        img.put_pixel(0, 1, Luma([51]));

        let tensor = image_to_tensor(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 2, 3, 1]);
        assert_eq!(tensor[[0, 0, 2, 0]], 1.0);
        assert!((tensor[[0, 1, 0, 0]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_mask_zeroes_background_only() {
        let img = GrayImage::from_pixel(2, 2, Luma([200]));
        let mut mask = GrayImage::new(2, 2);
        mask.put_pixel(1, 1, Luma([1]));
        mask.put_pixel(0, 0, Luma([1]));

        let out = apply_mask(&img, &mask);
        assert_eq!(out.get_pixel(0, 0).0[0], 200);
        assert_eq!(out.get_pixel(1, 1).0[0], 200);
        assert_eq!(out.get_pixel(1, 0).0[0], 0);
        assert_eq!(out.get_pixel(0, 1).0[0], 0);
    }

    #[test]
    fn test_nearest_resize_keeps_mask_binary() {
        let mut mask = GrayImage::new(4, 4);
        for y in 0..4 {
            for x in 0..2 {
                mask.put_pixel(x, y, Luma([1]));
            }
        }
        let scaled = imageops::resize(&mask, 9, 7, FilterType::Nearest);
        assert!(scaled.pixels().all(|p| p.0[0] == 0 || p.0[0] == 1));
        assert!(scaled.pixels().any(|p| p.0[0] == 1));
    }
}
