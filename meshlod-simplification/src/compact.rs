//! Output assembly after the selection loop

use crate::decimator::Decimator;
use meshlod_core::{IndexBuffer, Point3f, SubMesh, TriangleMesh};

/// Marks an attribute vertex no live triangle references
const UNUSED: u32 = u32::MAX;

impl Decimator<'_> {
    /// Gather live attribute vertices and triangles into a fresh mesh.
    ///
    /// Output vertices keep the ascending order of their source indices; the second
    /// return value maps each output vertex to the input vertex it descends from.
    pub fn into_mesh(self, input: &TriangleMesh) -> (TriangleMesh, Vec<u32>) {
        let Decimator {
            topology,
            mut attributes,
            ..
        } = self;

        let attribute_count = input.vertex_count();
        let mut position_of = vec![None; attribute_count];
        for t in topology.triangles.iter().filter(|t| !t.deleted) {
            for (&va, &v) in t.va.iter().zip(&t.v) {
                position_of[va].get_or_insert(v);
            }
        }

        let kept: Vec<usize> = (0..attribute_count).filter(|&va| position_of[va].is_some()).collect();
        let mut remap = vec![UNUSED; attribute_count];
        for (new, &old) in kept.iter().enumerate() {
            remap[old] = new as u32;
        }

        let positions = kept
            .iter()
            .filter_map(|&va| position_of[va])
            .map(|v| {
                let p = topology.vertices[v].position;
                Point3f::new(p.x as f32, p.y as f32, p.z as f32)
            })
            .collect();

        let mut indices: Vec<Vec<u32>> = vec![Vec::new(); input.submeshes.len()];
        for t in topology.triangles.iter().filter(|t| !t.deleted) {
            indices[t.submesh].extend(t.va.iter().map(|&va| remap[va]));
        }

        let submeshes = input
            .submeshes
            .iter()
            .zip(indices)
            .map(|(sm, indices)| SubMesh {
                material_slot: sm.material_slot,
                indices: IndexBuffer::from_indices(indices),
            })
            .collect();

        attributes.compact(&kept);
        let mut mesh = TriangleMesh {
            positions,
            submeshes,
            bind_poses: input.bind_poses.clone(),
            ..TriangleMesh::default()
        };
        attributes.write_into(&mut mesh);

        let source_vertices = kept.into_iter().map(|va| va as u32).collect();
        (mesh, source_vertices)
    }
}
