//! Contrast-limited adaptive histogram equalization for grayscale images.
//!
//! The image is split into a grid of tiles. Each tile builds a histogram,
//! clips it at a multiple of the uniform bin height, redistributes the
//! clipped excess and derives a CDF lookup table. Every output pixel blends
//! the tables of the four surrounding tile centers bilinearly, which removes
//! the block seams plain per-tile equalization would leave.

use image::{GrayImage, Luma};

/// Clip limit used for ridge-contrast normalization.
pub const CLIP_LIMIT: f32 = 2.0;
/// Tile grid as (columns, rows).
pub const TILE_GRID: (u32, u32) = (8, 8);

const BINS: usize = 256;

/// Equalize with the crate's standard fingerprint parameters.
pub fn equalize(image: &GrayImage) -> GrayImage {
    equalize_with(image, CLIP_LIMIT, TILE_GRID.0, TILE_GRID.1)
}

pub fn equalize_with(
    image: &GrayImage,
    clip_limit: f32,
    grid_cols: u32,
    grid_rows: u32,
) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    // Never more tiles than pixels along an axis.
    let grid_cols = grid_cols.min(width).max(1);
    let grid_rows = grid_rows.min(height).max(1);

    let luts = tile_luts(image, clip_limit, grid_cols, grid_rows);

    let tile_w = width as f32 / grid_cols as f32;
    let tile_h = height as f32 / grid_rows as f32;
    let cols = grid_cols as usize;

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        // Fractional tile coordinate of this row, measured between tile
        // centers; edge rows clamp to the outermost tiles.
        let fy = (y as f32 + 0.5) / tile_h - 0.5;
        let row_base = fy.floor();
        let wy = fy - row_base;
        let r0 = (row_base as i64).clamp(0, grid_rows as i64 - 1) as usize;
        let r1 = (row_base as i64 + 1).clamp(0, grid_rows as i64 - 1) as usize;

        for x in 0..width {
            let fx = (x as f32 + 0.5) / tile_w - 0.5;
            let col_base = fx.floor();
            let wx = fx - col_base;
            let c0 = (col_base as i64).clamp(0, grid_cols as i64 - 1) as usize;
            let c1 = (col_base as i64 + 1).clamp(0, grid_cols as i64 - 1) as usize;

            let v = image.get_pixel(x, y).0[0] as usize;
            let tl = luts[r0 * cols + c0][v] as f32;
            let tr = luts[r0 * cols + c1][v] as f32;
            let bl = luts[r1 * cols + c0][v] as f32;
            let br = luts[r1 * cols + c1][v] as f32;

            let top = tl + (tr - tl) * wx;
            let bottom = bl + (br - bl) * wx;
            let blended = top + (bottom - top) * wy;
            out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// One equalization lookup table per tile, row-major.
fn tile_luts(
    image: &GrayImage,
    clip_limit: f32,
    grid_cols: u32,
    grid_rows: u32,
) -> Vec<[u8; BINS]> {
    let (width, height) = image.dimensions();
    let mut luts = Vec::with_capacity((grid_cols * grid_rows) as usize);

    for row in 0..grid_rows {
        let y0 = row * height / grid_rows;
        let y1 = (row + 1) * height / grid_rows;
        for col in 0..grid_cols {
            let x0 = col * width / grid_cols;
            let x1 = (col + 1) * width / grid_cols;

            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            luts.push(build_lut(&mut hist, clip_limit, (x1 - x0) * (y1 - y0)));
        }
    }
    luts
}

/// Clip the histogram, then map each gray level through the scaled CDF.
fn build_lut(hist: &mut [u32; BINS], clip_limit: f32, area: u32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    if area == 0 {
        // Degenerate tile, identity mapping.
        for (v, slot) in lut.iter_mut().enumerate() {
            *slot = v as u8;
        }
        return lut;
    }

    let limit = ((clip_limit * area as f32) / BINS as f32).max(1.0) as u32;
    clip_histogram(hist, limit);

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (v, &count) in hist.iter().enumerate() {
        cumulative += count;
        lut[v] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Cap every bin at `limit` and hand the excess back: an even share to all
/// bins, the remainder stepped across the range so no region is favored.
/// The total count is preserved.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }
    if excess == 0 {
        return;
    }

    let share = excess / BINS as u32;
    for count in hist.iter_mut() {
        *count += share;
    }

    let residual = (excess % BINS as u32) as usize;
    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut given = 0;
        let mut i = 0;
        while given < residual && i < BINS {
            hist[i] += 1;
            given += 1;
            i += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn test_preserves_dimensions() {
        let img = filled(100, 60, 77);
        let out = equalize(&img);
        assert_eq!(out.dimensions(), (100, 60));
    }

    #[test]
    fn test_constant_image_stays_uniform() {
        let img = filled(256, 256, 128);
        let out = equalize(&img);

        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
        // Clipping keeps mid grays near where they started.
        assert!((first as i32 - 128).abs() <= 8, "drifted to {first}");
    }

    #[test]
    fn test_low_contrast_spread_widens() {
        // Alternating columns of two near-identical grays in every tile.
        let mut img = GrayImage::new(256, 256);
        for (x, _y, pixel) in img.enumerate_pixels_mut() {
            pixel.0[0] = if x % 2 == 0 { 100 } else { 102 };
        }
        let out = equalize(&img);

        let lo = out.pixels().map(|p| p.0[0]).min().unwrap();
        let hi = out.pixels().map(|p| p.0[0]).max().unwrap();
        let spread = hi as i32 - lo as i32;
        assert!((3..=30).contains(&spread), "spread was {spread}");

        // Ordering between the two populations is preserved.
        let dark = out.get_pixel(0, 100).0[0];
        let light = out.get_pixel(1, 100).0[0];
        assert!(light > dark);
    }

    #[test]
    fn test_clip_preserves_mass() {
        let mut hist = [0u32; BINS];
        hist[10] = 300;
        hist[200] = 50;
        hist[201] = 3;
        let total: u32 = hist.iter().sum();

        clip_histogram(&mut hist, 40);

        assert_eq!(hist.iter().sum::<u32>(), total);
        assert!(hist[10] >= 40);
    }

    #[test]
    fn test_lut_is_monotonic() {
        let mut hist = [0u32; BINS];
        hist[5] = 500;
        hist[100] = 200;
        hist[250] = 324;
        let lut = build_lut(&mut hist, 2.0, 1024);

        for v in 1..BINS {
            assert!(lut[v] >= lut[v - 1]);
        }
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn test_empty_image_passthrough() {
        let img = GrayImage::new(0, 0);
        let out = equalize(&img);
        assert_eq!(out.dimensions(), (0, 0));
    }
}
