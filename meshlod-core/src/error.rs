//! Error types for meshlod

use thiserror::Error;

/// Main error type for meshlod operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Mesh has no vertices or no triangles")]
    EmptyMesh,

    #[error("Submesh {submesh} has {len} indices, which is not a multiple of 3")]
    InvalidSubMesh { submesh: usize, len: usize },

    #[error("Index {index} in submesh {submesh} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        submesh: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Attribute '{attribute}' has {actual} elements, expected {expected}")]
    AttributeLength {
        attribute: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Simplification was cancelled")]
    Cancelled,
}

/// Result type alias for meshlod operations
pub type Result<T> = std::result::Result<T, Error>;
