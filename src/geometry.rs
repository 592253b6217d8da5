//! Geometric primitives consumed by the mesh and particle transport engine.
//!
//! Generic euclidean arithmetic (points, vectors, planes, triangle
//! intersection) is treated as an external collaborator elsewhere — a real
//! deployment would link a dedicated geometry crate. `meshtrace` pins down
//! only the operations the core actually calls: point/vector arithmetic and
//! the Möller–Trumbore ray/triangle test used by
//! [`crate::particle::transport`].

use std::ops::{Add, Mul, Sub};

/// A point in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).magnitude()
    }

    #[must_use]
    pub fn as_vector(self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Add<Vector3> for Point3 {
    type Output = Point3;
    fn add(self, rhs: Vector3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Vector3;
    fn sub(self, rhs: Point3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A 3D vector (displacement / velocity / acceleration / jerk).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[must_use]
    pub fn magnitude(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[must_use]
    pub fn normalized(self) -> Self {
        let m = self.magnitude();
        if m == 0.0 { self } else { self * (1.0 / m) }
    }

    /// Reflect this vector across a plane with the given unit normal.
    #[must_use]
    pub fn reflect(self, normal: Self) -> Self {
        self - normal * (2.0 * self.dot(normal))
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;
    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Result of a ray/triangle intersection test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Parametric distance along the ray at which it crosses the triangle.
    pub t: f64,
    /// True if the hit landed exactly on a shared triangle edge (barycentric
    /// coordinate within `edge_epsilon` of zero), used for tie-breaking
    ///.
    pub on_edge: bool,
}

/// Epsilon below which a barycentric coordinate is treated as "on the edge".
pub const EDGE_EPSILON: f64 = 1e-9;

/// Möller–Trumbore ray/triangle intersection.
///
/// Returns `None` if the ray (from `origin` along `dir`, `dir` need not be
/// normalized) does not cross the triangle `(v0, v1, v2)` at a non-negative
/// parametric distance, or if the triangle is degenerate.
#[must_use]
pub fn ray_triangle_intersect(
    origin: Point3,
    dir: Vector3,
    v0: Point3,
    v1: Point3,
    v2: Point3,
) -> Option<RayHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let pvec = dir.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < f64::EPSILON {
        return None; // ray parallel to triangle plane (or degenerate triangle)
    }
    let inv_det = 1.0 / det;
    let tvec = origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(edge1);
    let v = dir.dot(qvec) * inv_det;
    if v < -EDGE_EPSILON || u + v > 1.0 + EDGE_EPSILON {
        return None;
    }
    let t = edge2.dot(qvec) * inv_det;
    if t < 0.0 {
        return None;
    }
    let on_edge = u.abs() < EDGE_EPSILON
        || v.abs() < EDGE_EPSILON
        || (u + v - 1.0).abs() < EDGE_EPSILON;
    Some(RayHit { t, on_edge })
}

/// Fan-triangulate a polygon (3 or 4 vertices) from vertex 0, yielding the
/// triangle `(v0, vj, vj+1)` for `j = 1..n-2`.
#[must_use]
pub fn fan_triangulate(vertices: &[Point3]) -> Vec<(Point3, Point3, Point3)> {
    if vertices.len() < 3 {
        return Vec::new();
    }
    let v0 = vertices[0];
    (1..vertices.len() - 1)
        .map(|j| (v0, vertices[j], vertices[j + 1]))
        .collect()
}
