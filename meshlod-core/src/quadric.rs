//! Symmetric 4x4 error quadrics
//!
//! A quadric accumulates the squared distance from a point to a set of planes. It is
//! stored as the 10 independent coefficients of the symmetric matrix
//!
//! ```text
//! | m0 m1 m2 m3 |
//! | m1 m4 m5 m6 |
//! | m2 m5 m7 m8 |
//! | m3 m6 m8 m9 |
//! ```

use crate::math::Plane;
use crate::point::{Point3d, Vector3d};
use nalgebra::Matrix3;
use std::ops::{Add, AddAssign};

/// Determinants at or below this magnitude are treated as singular
pub const SINGULAR_DETERMINANT: f64 = 1e-10;

/// Symmetric error quadric
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SymmetricMatrix {
    m: [f64; 10],
}

impl SymmetricMatrix {
    /// The zero quadric
    pub fn zero() -> Self {
        Self::default()
    }

    /// Quadric of the plane `ax + by + cz + d = 0`
    pub fn from_coefficients(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            m: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    /// Quadric measuring the squared distance to `plane`
    pub fn from_plane(plane: &Plane) -> Self {
        Self::from_coefficients(plane.normal.x, plane.normal.y, plane.normal.z, plane.d)
    }

    /// The raw coefficients, upper triangle in row order
    pub fn coefficients(&self) -> &[f64; 10] {
        &self.m
    }

    /// Evaluate `vᵀ Q v` with `v = (x, y, z, 1)`
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let m = &self.m;
        let (x, y, z) = (p.x, p.y, p.z);
        m[0] * x * x
            + 2.0 * m[1] * x * y
            + 2.0 * m[2] * x * z
            + 2.0 * m[3] * x
            + m[4] * y * y
            + 2.0 * m[5] * y * z
            + 2.0 * m[6] * y
            + m[7] * z * z
            + 2.0 * m[8] * z
            + m[9]
    }

    /// Upper-left 3x3 block
    fn linear_part(&self) -> Matrix3<f64> {
        let m = &self.m;
        Matrix3::new(
            m[0], m[1], m[2],
            m[1], m[4], m[5],
            m[2], m[5], m[7],
        )
    }

    /// Determinant of the upper-left 3x3 block
    pub fn determinant3(&self) -> f64 {
        self.linear_part().determinant()
    }

    /// The point minimizing the quadric, or `None` when the system is ill-conditioned
    pub fn optimal_point(&self) -> Option<Point3d> {
        let a = self.linear_part();
        if a.determinant().abs() <= SINGULAR_DETERMINANT {
            return None;
        }
        let b = Vector3d::new(self.m[3], self.m[6], self.m[8]);
        let p = -(a.try_inverse()? * b);
        if p.iter().all(|c| c.is_finite()) {
            Some(Point3d::from(p))
        } else {
            None
        }
    }
}

impl Add for SymmetricMatrix {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for SymmetricMatrix {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.m.iter_mut().zip(rhs.m.iter()) {
            *a += b;
        }
    }
}
