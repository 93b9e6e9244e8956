//! Core data structures for meshlod
//!
//! This crate provides the mesh contract shared by the simplification engine and its
//! hosts: points and attribute types, submeshes with width-adaptive index buffers,
//! blend shapes, input validation and the double precision quadric math kernel.

pub mod point;
pub mod mesh;
pub mod math;
pub mod quadric;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use math::*;
pub use quadric::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};

/// Common result type for meshlod operations
pub type Result<T> = std::result::Result<T, Error>;
