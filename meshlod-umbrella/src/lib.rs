//! # meshlod
//!
//! Quadric error mesh simplification for real-time level-of-detail generation.
//!
//! This is the umbrella crate that provides convenient access to all meshlod functionality.
//! You can use this crate to get everything in one place, or use individual crates for
//! more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Mesh data model (submeshes, UVs, bone weights, blend shapes) and the
//!   quadric math kernel
//! - **Simplification**: Edge-collapse decimation with attribute interpolation, border
//!   and seam preservation and parallel LOD generation
//!
//! ## Quick Start
//!
//! ```rust
//! use meshlod::prelude::*;
//!
//! let mesh = TriangleMesh::from_positions_and_indices(
//!     vec![
//!         Point3f::new(0.0, 0.0, 0.0),
//!         Point3f::new(1.0, 0.0, 0.0),
//!         Point3f::new(1.0, 1.0, 0.0),
//!         Point3f::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![0, 1, 2, 0, 2, 3],
//! );
//!
//! let simplifier = QuadricErrorSimplifier::new();
//! let result = simplifier.simplify_with_stats(&mesh, 0.5).unwrap();
//! assert!(result.mesh.triangle_count() <= mesh.triangle_count());
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables simplification
//! - `simplification`: Quadric error simplification
//! - `all`: Enables all features

// Re-export core functionality
pub use meshlod_core::*;

#[cfg(feature = "simplification")]
pub use meshlod_simplification as simplification;

/// Convenient imports for common use cases
pub mod prelude {
    pub use meshlod_core::*;

    #[cfg(feature = "simplification")]
    pub use meshlod_simplification::*;
}
