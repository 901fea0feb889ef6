//! Eye Aspect Ratio geometry
//!
//! EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|): vertical eyelid distances
//! over horizontal eye width. Scale-invariant; low values indicate a
//! closed eye.

use crate::landmarks::{EyeIndices, FaceLandmarks};

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// EAR for one eye from its 6 boundary points, ordered: outer corner,
/// upper-outer, upper-inner, inner corner, lower-inner, lower-outer.
///
/// A degenerate horizontal distance yields 0.0 rather than dividing by
/// zero; the sample then registers as closed-eye downstream.
pub fn eye_aspect_ratio(p: &[(f32, f32); 6]) -> f32 {
    let v1 = distance(p[1], p[5]);
    let v2 = distance(p[2], p[4]);
    let h = distance(p[0], p[3]);

    if h == 0.0 {
        return 0.0;
    }
    (v1 + v2) / (2.0 * h)
}

fn eye_points(face: &FaceLandmarks, indices: &[usize; 6]) -> Option<[(f32, f32); 6]> {
    Some([
        face.point(indices[0])?,
        face.point(indices[1])?,
        face.point(indices[2])?,
        face.point(indices[3])?,
        face.point(indices[4])?,
        face.point(indices[5])?,
    ])
}

/// Average EAR over both eyes, or `None` when the face is missing any of
/// the 12 required eye landmarks.
pub fn average_ear(face: &FaceLandmarks, eyes: &EyeIndices) -> Option<f32> {
    let left = eye_aspect_ratio(&eye_points(face, &eyes.left)?);
    let right = eye_aspect_ratio(&eye_points(face, &eyes.right)?);
    Some((left + right) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Eye geometry with horizontal width 1.0 and a target EAR.
    fn eye_with_ear(ear: f32) -> [(f32, f32); 6] {
        let half = ear / 2.0;
        [
            (0.0, 0.5),
            (0.3, 0.5 - half),
            (0.7, 0.5 - half),
            (1.0, 0.5),
            (0.7, 0.5 + half),
            (0.3, 0.5 + half),
        ]
    }

    #[test]
    fn test_known_ear() {
        let eye = eye_with_ear(0.3);
        assert!((eye_aspect_ratio(&eye) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_horizontal_is_zero() {
        // All corners coincide horizontally
        let eye = [(0.5, 0.5); 6];
        assert_eq!(eye_aspect_ratio(&eye), 0.0);
    }

    #[test]
    fn test_missing_landmarks() {
        let face = FaceLandmarks::new(vec![(0.0, 0.0); 10]);
        assert!(average_ear(&face, &EyeIndices::default()).is_none());
    }

    proptest! {
        /// Never NaN, never infinite, never negative, for any point set.
        #[test]
        fn ear_is_finite_and_non_negative(
            coords in prop::array::uniform12(-10.0f32..10.0)
        ) {
            let p = [
                (coords[0], coords[1]),
                (coords[2], coords[3]),
                (coords[4], coords[5]),
                (coords[6], coords[7]),
                (coords[8], coords[9]),
                (coords[10], coords[11]),
            ];
            let ear = eye_aspect_ratio(&p);
            prop_assert!(ear.is_finite());
            prop_assert!(ear >= 0.0);
        }
    }
}
