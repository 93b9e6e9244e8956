//! Quadric error mesh simplification
//!
//! This crate reduces the triangle count of a [`TriangleMesh`] toward a quality target
//! while carrying every vertex attribute through the process:
//! - Quadric error metrics drive cheapest-first edge collapses
//! - Border, UV seam and curvature preservation options
//! - Barycentric interpolation of normals, tangents, colors, UVs, bone weights and
//!   blend shapes
//! - Parallel generation of several levels of detail

mod attributes;
mod candidate;
mod collapse;
mod compact;
mod decimator;
mod topology;

pub mod control;
pub mod levels;
pub mod options;
pub mod quadric_error;

pub use control::*;
pub use levels::*;
pub use options::*;
pub use quadric_error::*;

use meshlod_core::{Result, TriangleMesh};

/// Simplify a mesh toward a fraction of its triangles
pub trait MeshSimplifier {
    /// Simplify mesh with target quality (1.0 = keep every triangle, 0.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, quality: f32) -> Result<TriangleMesh>;
}
