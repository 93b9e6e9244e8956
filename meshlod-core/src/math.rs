//! Double precision geometry helpers shared by the simplification engine

use crate::point::{Point3d, Vector3d};

/// Below this squared length a vector is treated as zero
const ZERO_LENGTH_SQ: f64 = 1e-30;

/// Normalize `v`, returning the zero vector when `v` has no usable length
pub fn normalize_or_zero(v: &Vector3d) -> Vector3d {
    let len_sq = v.norm_squared();
    if len_sq <= ZERO_LENGTH_SQ || !len_sq.is_finite() {
        Vector3d::zeros()
    } else {
        v / len_sq.sqrt()
    }
}

/// Unit normal of the triangle `(p0, p1, p2)`; zero for zero-area triangles
pub fn triangle_normal(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Vector3d {
    normalize_or_zero(&(p1 - p0).cross(&(p2 - p0)))
}

/// An oriented plane `n·x + d = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3d,
    pub d: f64,
}

impl Plane {
    /// The degenerate plane contributing nothing to a quadric
    pub fn zero() -> Self {
        Self {
            normal: Vector3d::zeros(),
            d: 0.0,
        }
    }

    /// Supporting plane of a triangle. Zero-area triangles give [`Plane::zero`].
    pub fn from_triangle(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Self {
        let normal = triangle_normal(p0, p1, p2);
        if normal == Vector3d::zeros() {
            return Self::zero();
        }
        Self {
            normal,
            d: -normal.dot(&p0.coords),
        }
    }

    /// Signed distance from `p` to the plane
    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        self.normal.dot(&p.coords) + self.d
    }
}

/// Barycentric coordinates of `p` with respect to the triangle `(a, b, c)`.
///
/// `p` is implicitly projected onto the triangle plane. Negative weights are clamped and
/// the result renormalized, so the coordinates always describe a point inside the
/// triangle. Degenerate triangles resolve entirely to `a`.
pub fn barycentric(p: &Point3d, a: &Point3d, b: &Point3d, c: &Point3d) -> Vector3d {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f64::EPSILON * d00.max(d11).max(1.0) {
        return Vector3d::new(1.0, 0.0, 0.0);
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let clamped = Vector3d::new((1.0 - v - w).max(0.0), v.max(0.0), w.max(0.0));
    let sum = clamped.x + clamped.y + clamped.z;
    if sum <= 0.0 || !sum.is_finite() {
        Vector3d::new(1.0, 0.0, 0.0)
    } else {
        clamped / sum
    }
}
