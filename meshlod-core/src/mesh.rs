//! Mesh data structures exchanged with the simplification engine

use crate::error::{Error, Result};
use crate::point::*;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Number of UV channels a mesh can carry
pub const MAX_UV_CHANNELS: usize = 4;

/// Largest index representable by a 16-bit index buffer
pub const MAX_U16_INDEX: u32 = u16::MAX as u32;

/// Width of the indices stored in an [`IndexBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    /// The narrowest format able to address `max_index`
    pub fn for_max_index(max_index: u32) -> Self {
        if max_index <= MAX_U16_INDEX {
            IndexFormat::U16
        } else {
            IndexFormat::U32
        }
    }
}

/// Triangle-list indices of one submesh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Default for IndexBuffer {
    fn default() -> Self {
        IndexBuffer::U16(Vec::new())
    }
}

impl IndexBuffer {
    /// Store `indices` using the narrowest adequate width
    pub fn from_indices(indices: Vec<u32>) -> Self {
        let max_index = indices.iter().copied().max().unwrap_or(0);
        match IndexFormat::for_max_index(max_index) {
            IndexFormat::U16 => IndexBuffer::U16(indices.into_iter().map(|i| i as u16).collect()),
            IndexFormat::U32 => IndexBuffer::U32(indices),
        }
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            IndexBuffer::U16(_) => IndexFormat::U16,
            IndexBuffer::U32(_) => IndexFormat::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at position `i`, widened to `u32`
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexBuffer::U16(v) => v.get(i).map(|&x| x as u32),
            IndexBuffer::U32(v) => v.get(i).copied(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            IndexBuffer::U16(v) => Box::new(v.iter().map(|&x| x as u32)),
            IndexBuffer::U32(v) => Box::new(v.iter().copied()),
        }
    }

    /// Iterate over complete triangles
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.len() / 3).filter_map(move |t| {
            Some([self.get(t * 3)?, self.get(t * 3 + 1)?, self.get(t * 3 + 2)?])
        })
    }

    pub fn to_u32_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Raw little-endian bytes, ready for upload to a GPU index buffer
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::U16(v) => bytemuck::cast_slice(v),
            IndexBuffer::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

/// A UV channel with its declared component count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UvChannel {
    Uv2(Vec<[f32; 2]>),
    Uv3(Vec<[f32; 3]>),
    Uv4(Vec<[f32; 4]>),
}

impl UvChannel {
    /// Number of components per coordinate (2, 3 or 4)
    pub fn dimension(&self) -> usize {
        match self {
            UvChannel::Uv2(_) => 2,
            UvChannel::Uv3(_) => 3,
            UvChannel::Uv4(_) => 4,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UvChannel::Uv2(v) => v.len(),
            UvChannel::Uv3(v) => v.len(),
            UvChannel::Uv4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinate `i` padded with zeros to four components
    pub fn get4(&self, i: usize) -> [f32; 4] {
        match self {
            UvChannel::Uv2(v) => [v[i][0], v[i][1], 0.0, 0.0],
            UvChannel::Uv3(v) => [v[i][0], v[i][1], v[i][2], 0.0],
            UvChannel::Uv4(v) => v[i],
        }
    }

    /// Rebuild a channel of `dimension` components from padded coordinates
    pub fn from_padded(dimension: usize, values: impl Iterator<Item = [f32; 4]>) -> Self {
        match dimension {
            2 => UvChannel::Uv2(values.map(|v| [v[0], v[1]]).collect()),
            3 => UvChannel::Uv3(values.map(|v| [v[0], v[1], v[2]]).collect()),
            _ => UvChannel::Uv4(values.collect()),
        }
    }
}

/// One keyframe of a blend shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShapeFrame {
    pub weight: f32,
    pub delta_vertices: Vec<Vector3f>,
    pub delta_normals: Option<Vec<Vector3f>>,
    pub delta_tangents: Option<Vec<Vector3f>>,
}

impl BlendShapeFrame {
    pub fn new(weight: f32, delta_vertices: Vec<Vector3f>) -> Self {
        Self {
            weight,
            delta_vertices,
            delta_normals: None,
            delta_tangents: None,
        }
    }
}

/// A named morph target made of one or more frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
}

/// A partition of the triangle list rendered with one material
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubMesh {
    pub material_slot: u32,
    pub indices: IndexBuffer,
}

impl SubMesh {
    pub fn new(material_slot: u32, indices: Vec<u32>) -> Self {
        Self {
            material_slot,
            indices: IndexBuffer::from_indices(indices),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A triangle mesh with submeshes and a full set of vertex attributes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
    pub tangents: Option<Vec<Vector4f>>,
    pub colors: Option<Vec<Color>>,
    pub uvs: [Option<UvChannel>; MAX_UV_CHANNELS],
    pub bone_weights: Option<Vec<BoneWeight>>,
    pub bind_poses: Vec<Matrix4<f32>>,
    pub submeshes: Vec<SubMesh>,
    pub blend_shapes: Vec<BlendShape>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a single-submesh mesh from positions and triangle indices
    pub fn from_positions_and_indices(positions: Vec<Point3f>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            submeshes: vec![SubMesh::new(0, indices)],
            ..Self::default()
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles over all submeshes
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(SubMesh::triangle_count).sum()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.triangle_count() == 0
    }

    /// Add a submesh and return its index
    pub fn add_submesh(&mut self, material_slot: u32, indices: Vec<u32>) -> usize {
        self.submeshes.push(SubMesh::new(material_slot, indices));
        self.submeshes.len() - 1
    }

    /// Set a UV channel; channels beyond [`MAX_UV_CHANNELS`] are ignored
    pub fn set_uv(&mut self, channel: usize, uv: UvChannel) {
        if let Some(slot) = self.uvs.get_mut(channel) {
            *slot = Some(uv);
        }
    }

    /// Widest index format used by any submesh
    pub fn index_format(&self) -> IndexFormat {
        self.submeshes
            .iter()
            .map(|s| s.indices.format())
            .max()
            .unwrap_or(IndexFormat::U16)
    }

    /// Raw bytes of the position stream
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Check buffer lengths, index ranges and blend shape layouts.
    ///
    /// Every check runs before the engine touches the data, so a failing mesh is never
    /// partially simplified.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertex_count();
        if self.is_empty() {
            return Err(Error::EmptyMesh);
        }

        if let Some(i) = self
            .positions
            .iter()
            .position(|p| !p.iter().all(|c| c.is_finite()))
        {
            return Err(Error::InvalidData(format!("Vertex {} has a non-finite position", i)));
        }

        check_len("normals", n, self.normals.as_ref().map(Vec::len))?;
        check_len("tangents", n, self.tangents.as_ref().map(Vec::len))?;
        check_len("colors", n, self.colors.as_ref().map(Vec::len))?;
        check_len("bone_weights", n, self.bone_weights.as_ref().map(Vec::len))?;
        for (channel, uv) in self.uvs.iter().enumerate() {
            check_len(&format!("uv{}", channel), n, uv.as_ref().map(UvChannel::len))?;
        }

        if let (Some(weights), false) = (&self.bone_weights, self.bind_poses.is_empty()) {
            let bones = self.bind_poses.len() as u32;
            for (i, bw) in weights.iter().enumerate() {
                if let Some((bone, _)) = bw.influences().find(|&(b, _)| b >= bones) {
                    return Err(Error::InvalidData(format!(
                        "Vertex {} references bone {} but only {} bind poses exist",
                        i, bone, bones
                    )));
                }
            }
        }

        for (submesh, sm) in self.submeshes.iter().enumerate() {
            if sm.indices.len() % 3 != 0 {
                return Err(Error::InvalidSubMesh {
                    submesh,
                    len: sm.indices.len(),
                });
            }
            if let Some(index) = sm.indices.iter().find(|&i| i as usize >= n) {
                return Err(Error::IndexOutOfRange {
                    submesh,
                    index,
                    vertex_count: n,
                });
            }
        }

        let has_face = self
            .submeshes
            .iter()
            .flat_map(|sm| sm.indices.triangles())
            .any(|[a, b, c]| a != b && b != c && c != a);
        if !has_face {
            return Err(Error::EmptyMesh);
        }

        for shape in &self.blend_shapes {
            if shape.frames.is_empty() {
                return Err(Error::InvalidData(format!(
                    "Blend shape '{}' has no frames",
                    shape.name
                )));
            }
            for (f, frame) in shape.frames.iter().enumerate() {
                let label = |stream: &str| format!("{}[{}].{}", shape.name, f, stream);
                check_len(&label("delta_vertices"), n, Some(frame.delta_vertices.len()))?;
                check_len(&label("delta_normals"), n, frame.delta_normals.as_ref().map(Vec::len))?;
                check_len(&label("delta_tangents"), n, frame.delta_tangents.as_ref().map(Vec::len))?;
            }
        }

        Ok(())
    }
}

fn check_len(attribute: &str, expected: usize, actual: Option<usize>) -> Result<()> {
    match actual {
        Some(actual) if actual != expected => Err(Error::AttributeLength {
            attribute: attribute.to_string(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
