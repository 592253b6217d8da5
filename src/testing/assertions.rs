//! Float-tolerant assertions for geometry comparisons.

use crate::geometry::{Point3, Vector3};

/// Assert two points are within `epsilon` of each other on every axis.
///
/// # Panics
///
/// Panics with the full coordinates of both points if any axis differs by
/// more than `epsilon`.
pub fn assert_point_close(actual: Point3, expected: Point3, epsilon: f64) {
    let close = (actual.x - expected.x).abs() <= epsilon
        && (actual.y - expected.y).abs() <= epsilon
        && (actual.z - expected.z).abs() <= epsilon;
    assert!(
        close,
        "point mismatch (epsilon {epsilon}):\n  expected: {expected:?}\n  actual:   {actual:?}"
    );
}

/// Assert two vectors are within `epsilon` of each other on every axis.
///
/// # Panics
///
/// Panics with the full components of both vectors if any axis differs by
/// more than `epsilon`.
pub fn assert_vec_close(actual: Vector3, expected: Vector3, epsilon: f64) {
    let close = (actual.x - expected.x).abs() <= epsilon
        && (actual.y - expected.y).abs() <= epsilon
        && (actual.z - expected.z).abs() <= epsilon;
    assert!(
        close,
        "vector mismatch (epsilon {epsilon}):\n  expected: {expected:?}\n  actual:   {actual:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_points_pass() {
        assert_point_close(Point3::new(1.0, 2.0, 3.0), Point3::new(1.0 + 1e-10, 2.0, 3.0), 1e-9);
    }

    #[test]
    #[should_panic(expected = "point mismatch")]
    fn distant_points_fail() {
        assert_point_close(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), 1e-9);
    }
}
