//! Point, vector and per-vertex attribute types

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A 3D point with single precision coordinates, used at the mesh boundary
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates, used inside the engine
pub type Point3d = Point3<f64>;

/// A 3D vector with single precision components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A tangent: `xyz` direction and bitangent handedness in `w`
pub type Vector4f = Vector4<f32>;

/// Linear RGBA color
pub type Color = [f32; 4];

/// Maximum number of bone influences stored per vertex
pub const MAX_BONE_INFLUENCES: usize = 4;

/// Skinning influences of one vertex.
///
/// Unused slots carry a zero weight. Weights of a well-formed vertex sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct BoneWeight {
    pub bones: [u32; MAX_BONE_INFLUENCES],
    pub weights: [f32; MAX_BONE_INFLUENCES],
}

impl BoneWeight {
    /// A vertex bound rigidly to a single bone
    pub fn single(bone: u32) -> Self {
        Self {
            bones: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Build from up to four `(bone, weight)` pairs
    pub fn from_influences(influences: &[(u32, f32)]) -> Self {
        let mut result = Self::default();
        for (slot, &(bone, weight)) in influences.iter().take(MAX_BONE_INFLUENCES).enumerate() {
            result.bones[slot] = bone;
            result.weights[slot] = weight;
        }
        result
    }

    /// Iterate over influences with a non-zero weight
    pub fn influences(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.bones
            .iter()
            .zip(self.weights.iter())
            .filter(|(_, w)| **w != 0.0)
            .map(|(&b, &w)| (b, w))
    }

    /// Sum of all weights
    pub fn total_weight(&self) -> f32 {
        self.weights.iter().sum()
    }
}
