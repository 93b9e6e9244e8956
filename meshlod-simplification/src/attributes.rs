//! Attribute-vertex streams carried through simplification
//!
//! Every stream is addressed by attribute-vertex index, which starts out equal to the
//! input vertex index. Collapses blend values in place; compaction gathers the surviving
//! entries to the front of each buffer.

use itertools::Itertools;
use meshlod_core::{
    BlendShape, BlendShapeFrame, BoneWeight, Color, TriangleMesh, UvChannel, Vector3d, Vector3f,
    Vector4f, MAX_BONE_INFLUENCES, MAX_UV_CHANNELS,
};
use ndarray::{Array2, Axis};

/// A UV channel stored as an `(n, 4)` array plus its declared component count
#[derive(Debug, Clone)]
struct UvBuffer {
    dimension: usize,
    values: Array2<f32>,
}

impl UvBuffer {
    fn from_channel(channel: &UvChannel) -> Self {
        let mut values = Array2::zeros((channel.len(), 4));
        for (i, mut row) in values.axis_iter_mut(Axis(0)).enumerate() {
            for (dst, src) in row.iter_mut().zip(channel.get4(i)) {
                *dst = src;
            }
        }
        Self {
            dimension: channel.dimension(),
            values,
        }
    }

    fn interpolate(&mut self, dst: usize, src: [usize; 3], w: [f32; 3]) {
        let mut blended = [0.0f32; 4];
        for (c, value) in blended.iter_mut().enumerate().take(self.dimension) {
            *value = (0..3).map(|k| self.values[[src[k], c]] * w[k]).sum();
        }
        for (c, value) in blended.iter().enumerate() {
            self.values[[dst, c]] = *value;
        }
    }

    fn into_channel(self) -> UvChannel {
        let rows = self
            .values
            .axis_iter(Axis(0))
            .map(|row| [row[0], row[1], row[2], row[3]])
            .collect::<Vec<_>>();
        UvChannel::from_padded(self.dimension, rows.into_iter())
    }
}

#[derive(Debug, Clone)]
struct FrameBuffer {
    weight: f32,
    deltas: Vec<Vector3f>,
    normals: Option<Vec<Vector3f>>,
    tangents: Option<Vec<Vector3f>>,
}

#[derive(Debug, Clone)]
struct ShapeBuffer {
    name: String,
    frames: Vec<FrameBuffer>,
}

/// Working copies of every per-vertex attribute of a mesh
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeBuffers {
    normals: Option<Vec<Vector3f>>,
    tangents: Option<Vec<Vector4f>>,
    colors: Option<Vec<Color>>,
    uvs: [Option<UvBuffer>; MAX_UV_CHANNELS],
    bone_weights: Option<Vec<BoneWeight>>,
    blend_shapes: Vec<ShapeBuffer>,
}

impl AttributeBuffers {
    pub(crate) fn from_mesh(mesh: &TriangleMesh) -> Self {
        let mut uvs: [Option<UvBuffer>; MAX_UV_CHANNELS] = Default::default();
        for (slot, channel) in uvs.iter_mut().zip(mesh.uvs.iter()) {
            *slot = channel.as_ref().map(UvBuffer::from_channel);
        }

        let blend_shapes = mesh
            .blend_shapes
            .iter()
            .map(|shape| ShapeBuffer {
                name: shape.name.clone(),
                frames: shape
                    .frames
                    .iter()
                    .map(|frame| FrameBuffer {
                        weight: frame.weight,
                        deltas: frame.delta_vertices.clone(),
                        normals: frame.delta_normals.clone(),
                        tangents: frame.delta_tangents.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            normals: mesh.normals.clone(),
            tangents: mesh.tangents.clone(),
            colors: mesh.colors.clone(),
            uvs,
            bone_weights: mesh.bone_weights.clone(),
            blend_shapes,
        }
    }

    /// Overwrite attribute vertex `dst` with the barycentric blend of `src`
    pub(crate) fn interpolate(&mut self, dst: usize, src: [usize; 3], barycentric: &Vector3d) {
        let w = [
            barycentric.x as f32,
            barycentric.y as f32,
            barycentric.z as f32,
        ];
        let dominant = (0..3)
            .max_by(|&a, &b| w[a].total_cmp(&w[b]).then(b.cmp(&a)))
            .unwrap_or(0);

        if let Some(normals) = &mut self.normals {
            let blended = blend(normals, src, w);
            normals[dst] = normalize_or(blended, normals[src[dominant]]);
        }

        if let Some(tangents) = &mut self.tangents {
            let xyz = (0..3).fold(Vector3f::zeros(), |acc, k| acc + tangents[src[k]].xyz() * w[k]);
            let fallback = tangents[src[dominant]];
            let dir = normalize_or(xyz, fallback.xyz());
            tangents[dst] = Vector4f::new(dir.x, dir.y, dir.z, fallback.w);
        }

        if let Some(colors) = &mut self.colors {
            let mut blended = [0.0f32; 4];
            for (c, value) in blended.iter_mut().enumerate() {
                *value = (0..3).map(|k| colors[src[k]][c] * w[k]).sum();
            }
            colors[dst] = blended;
        }

        for uv in self.uvs.iter_mut().flatten() {
            uv.interpolate(dst, src, w);
        }

        if let Some(bone_weights) = &mut self.bone_weights {
            let sources = [bone_weights[src[0]], bone_weights[src[1]], bone_weights[src[2]]];
            bone_weights[dst] = merge_bone_weights(&sources, w, dominant);
        }

        for frame in self.blend_shapes.iter_mut().flat_map(|s| s.frames.iter_mut()) {
            frame.deltas[dst] = blend(&frame.deltas, src, w);
            if let Some(normals) = &mut frame.normals {
                normals[dst] = blend(normals, src, w);
            }
            if let Some(tangents) = &mut frame.tangents {
                tangents[dst] = blend(tangents, src, w);
            }
        }
    }

    /// Keep only the attribute vertices listed in `kept` (ascending), in that order
    pub(crate) fn compact(&mut self, kept: &[usize]) {
        if let Some(normals) = &mut self.normals {
            compact_in_place(normals, kept);
        }
        if let Some(tangents) = &mut self.tangents {
            compact_in_place(tangents, kept);
        }
        if let Some(colors) = &mut self.colors {
            compact_in_place(colors, kept);
        }
        for uv in self.uvs.iter_mut().flatten() {
            uv.values = uv.values.select(Axis(0), kept);
        }
        if let Some(bone_weights) = &mut self.bone_weights {
            compact_in_place(bone_weights, kept);
        }
        for frame in self.blend_shapes.iter_mut().flat_map(|s| s.frames.iter_mut()) {
            compact_in_place(&mut frame.deltas, kept);
            if let Some(normals) = &mut frame.normals {
                compact_in_place(normals, kept);
            }
            if let Some(tangents) = &mut frame.tangents {
                compact_in_place(tangents, kept);
            }
        }
    }

    /// Move the streams into an output mesh
    pub(crate) fn write_into(self, mesh: &mut TriangleMesh) {
        mesh.normals = self.normals;
        mesh.tangents = self.tangents;
        mesh.colors = self.colors;
        for (slot, uv) in mesh.uvs.iter_mut().zip(self.uvs) {
            *slot = uv.map(UvBuffer::into_channel);
        }
        mesh.bone_weights = self.bone_weights;
        mesh.blend_shapes = self
            .blend_shapes
            .into_iter()
            .map(|shape| BlendShape {
                name: shape.name,
                frames: shape
                    .frames
                    .into_iter()
                    .map(|frame| BlendShapeFrame {
                        weight: frame.weight,
                        delta_vertices: frame.deltas,
                        delta_normals: frame.normals,
                        delta_tangents: frame.tangents,
                    })
                    .collect(),
            })
            .collect();
    }
}

fn blend(values: &[Vector3f], src: [usize; 3], w: [f32; 3]) -> Vector3f {
    values[src[0]] * w[0] + values[src[1]] * w[1] + values[src[2]] * w[2]
}

fn normalize_or(v: Vector3f, fallback: Vector3f) -> Vector3f {
    v.try_normalize(f32::EPSILON).unwrap_or(fallback)
}

/// Combine the influences of three vertices, keeping the strongest four
fn merge_bone_weights(sources: &[BoneWeight; 3], w: [f32; 3], dominant: usize) -> BoneWeight {
    let mut merged: Vec<(u32, f32)> = Vec::with_capacity(3 * MAX_BONE_INFLUENCES);
    for (bw, &wk) in sources.iter().zip(w.iter()) {
        if wk <= 0.0 {
            continue;
        }
        for (bone, weight) in bw.influences() {
            match merged.iter_mut().find(|(b, _)| *b == bone) {
                Some(entry) => entry.1 += weight * wk,
                None => merged.push((bone, weight * wk)),
            }
        }
    }

    let strongest = merged
        .into_iter()
        .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
        .take(MAX_BONE_INFLUENCES)
        .collect::<Vec<_>>();
    let total: f32 = strongest.iter().map(|&(_, weight)| weight).sum();
    if total <= 0.0 {
        return sources[dominant];
    }

    let normalized = strongest
        .into_iter()
        .map(|(bone, weight)| (bone, weight / total))
        .collect::<Vec<_>>();
    BoneWeight::from_influences(&normalized)
}

/// Move `buffer[kept[i]]` to `buffer[i]` and drop the tail. `kept` must be ascending.
fn compact_in_place<T: Copy>(buffer: &mut Vec<T>, kept: &[usize]) {
    for (dst, &src) in kept.iter().enumerate() {
        buffer[dst] = buffer[src];
    }
    buffer.truncate(kept.len());
}
