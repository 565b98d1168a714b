use image::RgbImage;
use rayon::prelude::*;

use crate::Grid;

/// Luminance weights in thousandths, red, green and blue.
const WEIGHTS: [u32; 3] = [299, 587, 114];

/// Converts an RGB image into a grayscale grid.
///
/// Uses `0.299 R + 0.587 G + 0.114 B` truncated to an integer, computed in
/// fixed point so equal channels map back to the same value.
pub fn luminance(rgb: &RgbImage) -> Grid {
    let (cols, rows) = (rgb.width() as usize, rgb.height() as usize);
    let mut grid = Grid::new(rows, cols);

    if cols == 0 {
        return grid;
    }

    grid.samples_mut()
        .par_chunks_mut(cols)
        .zip(rgb.as_raw().par_chunks(cols * 3))
        .for_each(|(out, pixels)| {
            for (sample, px) in out.iter_mut().zip(pixels.chunks_exact(3)) {
                *sample = luma(px[0], px[1], px[2]);
            }
        });

    grid
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let [wr, wg, wb] = WEIGHTS;
    let sum = wr * u32::from(r) + wg * u32::from(g) + wb * u32::from(b);
    (sum / 1000) as u8
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn weights_channels_by_perceived_brightness() {
        assert_eq!(luma(10, 20, 30), 18);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 149);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn gray_pixels_keep_their_value() {
        for v in [0, 1, 100, 128, 254, 255] {
            assert_eq!(luma(v, v, v), v);
        }
    }

    #[test]
    fn converts_row_major() {
        let mut rgb = RgbImage::new(3, 2);
        rgb.put_pixel(2, 0, Rgb([255, 255, 255]));
        rgb.put_pixel(0, 1, Rgb([10, 20, 30]));

        let grid = luminance(&rgb);

        assert_eq!((grid.rows(), grid.cols()), (2, 3));
        assert_eq!(grid.samples(), [0, 0, 255, 18, 0, 0]);
    }
}
