//! File boundary of the pipeline, backed by the `image` crate.

use std::path::Path;

use image::GrayImage;

use crate::{Grid, ImagingErr, Result, grayscale};

/// Decodes the image at `path` and converts it to grayscale.
///
/// # Errors
/// `ImagingErr::Decode` if the file is missing or can't be decoded.
pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| ImagingErr::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(grayscale::luminance(&img.to_rgb8()))
}

/// Writes `grid` as a single channel image, the format is picked from the extension.
///
/// # Errors
/// `ImagingErr::Oversized` if the grid doesn't fit the image dimensions and
/// `ImagingErr::Encode` if the encoder fails.
pub fn save<P: AsRef<Path>>(grid: &Grid, path: P) -> Result<()> {
    let path = path.as_ref();
    let (rows, cols) = (grid.rows(), grid.cols());
    let oversized = || ImagingErr::Oversized { rows, cols };

    let width = u32::try_from(cols).map_err(|_| oversized())?;
    let height = u32::try_from(rows).map_err(|_| oversized())?;
    let img = GrayImage::from_raw(width, height, grid.samples().to_vec()).ok_or_else(oversized)?;

    img.save(path).map_err(|source| ImagingErr::Encode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossless_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let grid = Grid::from_raw(2, 4, vec![0, 255, 0, 255, 17, 18, 19, 20]).unwrap();

        save(&grid, &path).unwrap();
        assert_eq!(load_grayscale(&path).unwrap(), grid);
    }

    #[test]
    fn jpeg_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.jpg");
        let grid = Grid::filled(9, 13, 255);

        save(&grid, &path).unwrap();
        let loaded = load_grayscale(&path).unwrap();

        assert_eq!((loaded.rows(), loaded.cols()), (9, 13));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_grayscale(dir.path().join("nope.jpg")).unwrap_err();

        assert!(matches!(err, ImagingErr::Decode { .. }));
    }
}
