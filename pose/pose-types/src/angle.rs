//! Joint angle geometry.
//!
//! The angle at a joint is formed by the two limb segments leaving it:
//!
//! ```text
//! cos(θ) = (u · v) / (|u| × |v|),   u = a - vertex,  v = b - vertex
//! ```
//!
//! The result is in degrees within `[0, 180]`: 180° is a fully straight
//! limb, 90° a right-angle bend.

use nalgebra::{Point3, Vector3};

use crate::error::{PoseError, PoseResult};
use crate::keypoint::Keypoint;

/// Segments shorter than this are treated as degenerate.
pub const MIN_SEGMENT_LENGTH: f64 = 1e-6;

/// Computes the angle in degrees at `vertex` between the segments to `a` and `b`.
///
/// Returns `None` if either segment is shorter than [`MIN_SEGMENT_LENGTH`]
/// or a coordinate or segment is non-finite. Far-apart keypoints are measured
/// without overflow.
///
/// # Example
///
/// ```
/// use pose_types::{Point3, angle_at};
///
/// let angle = angle_at(
///     &Point3::new(0.0, 0.0, 0.0),
///     &Point3::new(1.0, 0.0, 0.0),
///     &Point3::new(-1.0, 0.0, 0.0),
/// );
/// assert!((angle.unwrap() - 180.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn angle_at(vertex: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> Option<f64> {
    let u = a - vertex;
    let v = b - vertex;
    if !(is_finite(&u) && is_finite(&v)) {
        return None;
    }
    if segment_length(&u) < MIN_SEGMENT_LENGTH || segment_length(&v) < MIN_SEGMENT_LENGTH {
        return None;
    }

    // Unit max-norm first: the squared components of far-apart keypoints
    // would overflow to infinity.
    let u = u / u.amax();
    let v = v / v.amax();
    let cos_angle = (u.dot(&v) / (u.norm() * v.norm())).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Computes the angle in degrees at keypoint `vertex` between limb endpoints `a` and `b`.
///
/// # Errors
///
/// - [`PoseError::NonFiniteCoordinate`] if any keypoint has a `NaN`/infinite
///   coordinate, or a segment between finite keypoints overflows `f64`.
/// - [`PoseError::DegenerateGeometry`] if either segment is shorter than
///   [`MIN_SEGMENT_LENGTH`]. Callers treat the angle as indeterminate.
pub fn joint_angle(vertex: &Keypoint, a: &Keypoint, b: &Keypoint) -> PoseResult<f64> {
    if let Some(bad) = [vertex, a, b].into_iter().find(|kp| !kp.is_finite()) {
        return Err(PoseError::NonFiniteCoordinate(bad.name.clone()));
    }

    let u = a.position - vertex.position;
    let v = b.position - vertex.position;
    if !(is_finite(&u) && is_finite(&v)) {
        return Err(PoseError::NonFiniteCoordinate(vertex.name.clone()));
    }

    angle_at(&vertex.position, &a.position, &b.position).ok_or_else(|| {
        let shorter = segment_length(&u).min(segment_length(&v));
        PoseError::degenerate(&vertex.name, shorter, MIN_SEGMENT_LENGTH)
    })
}

fn is_finite(segment: &Vector3<f64>) -> bool {
    segment.iter().all(|c| c.is_finite())
}

/// Euclidean length without intermediate overflow or underflow.
fn segment_length(segment: &Vector3<f64>) -> f64 {
    let scale = segment.amax();
    if scale == 0.0 {
        return 0.0;
    }
    scale * (segment / scale).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kp(name: &str, x: f64, y: f64) -> Keypoint {
        Keypoint::planar(name, x, y, 1.0)
    }

    #[test]
    fn straight_limb() {
        let angle = joint_angle(&kp("e", 0.5, 0.0), &kp("s", 0.0, 0.0), &kp("w", 1.0, 0.0));
        assert_relative_eq!(angle.unwrap(), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn right_angle() {
        let angle = joint_angle(&kp("e", 0.5, 0.0), &kp("s", 0.0, 0.0), &kp("w", 0.5, 0.5));
        assert_relative_eq!(angle.unwrap(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn folded_limb() {
        let angle = joint_angle(&kp("e", 0.0, 0.0), &kp("s", 1.0, 0.0), &kp("w", 2.0, 0.0));
        assert_relative_eq!(angle.unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn three_dimensional() {
        let vertex = Keypoint::new("k", 0.0, 0.0, 0.0, 1.0);
        let a = Keypoint::new("h", 0.0, 0.0, 1.0, 1.0);
        let b = Keypoint::new("a", 1.0, 0.0, 1.0, 1.0);
        assert_relative_eq!(joint_angle(&vertex, &a, &b).unwrap(), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn scale_invariant() {
        let small = angle_at(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.01, 0.0, 0.0),
            &Point3::new(0.01, 0.01, 0.0),
        );
        let large = angle_at(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(100.0, 0.0, 0.0),
            &Point3::new(100.0, 100.0, 0.0),
        );
        assert_relative_eq!(small.unwrap(), large.unwrap(), epsilon = 1e-9);
        assert_relative_eq!(small.unwrap(), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let err = joint_angle(&kp("knee", 0.3, 0.3), &kp("hip", 0.3, 0.3), &kp("ankle", 0.3, 0.9))
            .unwrap_err();
        match err {
            PoseError::DegenerateGeometry { vertex, length, .. } => {
                assert_eq!(vertex, "knee");
                assert!(length < MIN_SEGMENT_LENGTH);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_is_rejected() {
        let err = joint_angle(
            &kp("knee", 0.3, 0.3),
            &kp("hip", f64::NAN, 0.0),
            &kp("ankle", 0.3, 0.9),
        )
        .unwrap_err();
        assert_eq!(err, PoseError::NonFiniteCoordinate("hip".to_string()));
    }

    #[test]
    fn far_from_origin_is_still_measured() {
        // Squared distances at this scale exceed f64::MAX.
        let s = 1e200;
        let angle = joint_angle(&kp("e", 0.0, 0.0), &kp("s", s, 0.0), &kp("w", 0.0, s)).unwrap();
        assert_relative_eq!(angle, 90.0, epsilon = 1e-9);

        let angle = joint_angle(&kp("e", s, s), &kp("s", 2.0 * s, s), &kp("w", 0.0, s)).unwrap();
        assert_relative_eq!(angle, 180.0, epsilon = 1e-9);
    }

    #[test]
    fn tiny_segments_stay_degenerate() {
        let angle = angle_at(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1e-7, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert!(angle.is_none());

        let measurable = angle_at(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1e-5, 0.0, 0.0),
            &Point3::new(0.0, 1e-5, 0.0),
        );
        assert_relative_eq!(measurable.unwrap(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn overflowing_segment_is_non_finite() {
        let err = joint_angle(
            &kp("knee", -f64::MAX, 0.0),
            &kp("hip", f64::MAX, 0.0),
            &kp("ankle", 0.0, 1.0),
        )
        .unwrap_err();
        assert_eq!(err, PoseError::NonFiniteCoordinate("knee".to_string()));
    }

    #[test]
    fn angle_at_never_nan() {
        let same = Point3::new(1.0, 1.0, 1.0);
        assert!(angle_at(&same, &same, &Point3::new(2.0, 2.0, 2.0)).is_none());
    }
}
