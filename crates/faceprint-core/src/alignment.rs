//! Face alignment: crop the selected candidate and resize to the canonical
//! size expected by the embedding extractor.
//!
//! This is a plain crop-and-resize. The candidate's landmarks are accepted by
//! the interface but unused; a landmark-based similarity transform could
//! replace this without a signature change.

use crate::types::FaceCandidate;
use image::{imageops::FilterType, DynamicImage, RgbImage};
use thiserror::Error;

/// Canonical aligned crop size (matches the embedding model input).
pub const ALIGNED_SIZE: u32 = 112;

#[derive(Error, Debug)]
pub enum AlignmentError {
    #[error(
        "face region ({x:.1}, {y:.1}) {width:.1}x{height:.1} has no overlap with the {image_width}x{image_height} image"
    )]
    EmptyRegion {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image_width: u32,
        image_height: u32,
    },
}

/// Crop the candidate's bounding box (clamped to the image bounds) and resize
/// to [`ALIGNED_SIZE`]² with bilinear filtering.
pub fn align_face(
    image: &DynamicImage,
    face: &FaceCandidate,
) -> Result<RgbImage, AlignmentError> {
    let (image_width, image_height) = (image.width(), image.height());

    let left = face.x.max(0.0) as u32;
    let top = face.y.max(0.0) as u32;
    let right = ((face.x + face.width).min(image_width as f32)).max(0.0) as u32;
    let bottom = ((face.y + face.height).min(image_height as f32)).max(0.0) as u32;

    let crop_width = right.saturating_sub(left);
    let crop_height = bottom.saturating_sub(top);

    if crop_width == 0 || crop_height == 0 || left >= image_width || top >= image_height {
        return Err(AlignmentError::EmptyRegion {
            x: face.x,
            y: face.y,
            width: face.width,
            height: face.height,
            image_width,
            image_height,
        });
    }

    let aligned = image
        .crop_imm(left, top, crop_width, crop_height)
        .resize_exact(ALIGNED_SIZE, ALIGNED_SIZE, FilterType::Triangle)
        .to_rgb8();

    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: f32, y: f32, width: f32, height: f32) -> FaceCandidate {
        FaceCandidate {
            x,
            y,
            width,
            height,
            score: 0.9,
            landmarks: [(0.0, 0.0); 5],
        }
    }

    #[test]
    fn test_align_produces_canonical_size() {
        let image = DynamicImage::new_rgb8(640, 480);
        let aligned = align_face(&image, &candidate(100.0, 100.0, 200.0, 250.0)).unwrap();
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
    }

    #[test]
    fn test_align_clamps_out_of_bounds_box() {
        // Box extends past the right and bottom edges; clamped crop still works
        let image = DynamicImage::new_rgb8(100, 100);
        let aligned = align_face(&image, &candidate(80.0, 80.0, 60.0, 60.0)).unwrap();
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
    }

    #[test]
    fn test_align_negative_origin_is_clamped() {
        let image = DynamicImage::new_rgb8(100, 100);
        let aligned = align_face(&image, &candidate(-20.0, -20.0, 50.0, 50.0)).unwrap();
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
    }

    #[test]
    fn test_align_rejects_box_outside_image() {
        let image = DynamicImage::new_rgb8(100, 100);
        let err = align_face(&image, &candidate(200.0, 200.0, 50.0, 50.0));
        assert!(matches!(err, Err(AlignmentError::EmptyRegion { .. })));
    }

    #[test]
    fn test_align_rejects_zero_area_box() {
        let image = DynamicImage::new_rgb8(100, 100);
        let err = align_face(&image, &candidate(50.0, 50.0, 0.0, 0.0));
        assert!(matches!(err, Err(AlignmentError::EmptyRegion { .. })));
    }

    #[test]
    fn test_align_preserves_uniform_color() {
        let mut rgb = RgbImage::new(64, 64);
        for pixel in rgb.pixels_mut() {
            *pixel = image::Rgb([200, 10, 30]);
        }
        let image = DynamicImage::ImageRgb8(rgb);

        let aligned = align_face(&image, &candidate(8.0, 8.0, 48.0, 48.0)).unwrap();
        assert!(aligned.pixels().all(|p| p.0 == [200, 10, 30]));
    }
}
