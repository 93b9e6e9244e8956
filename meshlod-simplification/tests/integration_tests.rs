//! Integration tests for meshlod-simplification
//!
//! These tests drive the public simplifier end to end and check the guarantees callers
//! rely on: counts, attribute layouts, index widths, preservation options and
//! determinism.

use meshlod_core::{
    BlendShape, BlendShapeFrame, BoneWeight, IndexFormat, Matrix4, Point3f, TriangleMesh, UvChannel,
    Vector3f, Vector4f,
};
use meshlod_simplification::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Grid indices for `cols x rows` vertices laid out row by row, offset by `base`
fn grid_indices(cols: usize, rows: usize, base: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((cols - 1) * (rows - 1) * 6);
    let stride = cols as u32;
    for y in 0..(rows - 1) as u32 {
        for x in 0..(cols - 1) as u32 {
            let v00 = base + y * stride + x;
            let v10 = v00 + 1;
            let v01 = v00 + stride;
            let v11 = v01 + 1;
            indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
        }
    }
    indices
}

/// Create a flat `n x n` quad grid in the XY plane
fn create_flat_grid(n: usize) -> TriangleMesh {
    let mut positions = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            positions.push(Point3f::new(x as f32, y as f32, 0.0));
        }
    }
    TriangleMesh::from_positions_and_indices(positions, grid_indices(n + 1, n + 1, 0))
}

/// Create a gently curved `n x n` grid
fn create_curved_grid(n: usize) -> TriangleMesh {
    let mut positions = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            let (fx, fy) = (x as f32 / n as f32, y as f32 / n as f32);
            let z = (fx * std::f32::consts::PI).sin() * (fy * std::f32::consts::PI).sin() * 0.4;
            positions.push(Point3f::new(fx, fy, z));
        }
    }
    TriangleMesh::from_positions_and_indices(positions, grid_indices(n + 1, n + 1, 0))
}

/// Create a curved grid carrying every supported vertex attribute
fn create_attributed_grid(n: usize) -> TriangleMesh {
    let mut mesh = create_curved_grid(n);
    let count = mesh.vertex_count();
    let uv: Vec<[f32; 2]> = mesh.positions.iter().map(|p| [p.x, p.y]).collect();

    mesh.normals = Some(vec![Vector3f::z(); count]);
    mesh.tangents = Some(vec![Vector4f::new(1.0, 0.0, 0.0, 1.0); count]);
    mesh.colors = Some(mesh.positions.iter().map(|p| [p.x, p.y, p.z, 1.0]).collect());
    mesh.set_uv(0, UvChannel::Uv2(uv));
    mesh.set_uv(3, UvChannel::Uv4(vec![[0.0, 0.5, 1.0, 1.0]; count]));
    mesh.bone_weights = Some(
        mesh.positions
            .iter()
            .map(|p| BoneWeight::from_influences(&[(0, 1.0 - p.x), (1, p.x)]))
            .collect(),
    );
    mesh.bind_poses = vec![Matrix4::identity(); 2];

    let mut frame = BlendShapeFrame::new(100.0, mesh.positions.iter().map(|p| Vector3f::new(0.0, 0.0, p.x)).collect());
    frame.delta_normals = Some(vec![Vector3f::zeros(); count]);
    mesh.blend_shapes.push(BlendShape {
        name: "bulge".to_string(),
        frames: vec![frame],
    });
    mesh
}

/// Create a noisy curved grid from a fixed seed
fn create_noisy_grid(n: usize, seed: u64) -> TriangleMesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mesh = create_curved_grid(n);
    for p in &mut mesh.positions {
        p.z += rng.gen_range(-0.01..0.01);
    }
    mesh
}

/// Two flat halves whose shared column is split into separate vertices with different UVs
fn create_seamed_grid(n: usize) -> (TriangleMesh, Vec<Point3f>) {
    let half = n / 2;
    let mut positions = Vec::new();
    let mut uv = Vec::new();
    let mut seam = Vec::new();
    for (offset, u) in [(0, 0.0), (half, 1.0)] {
        for y in 0..=n {
            for x in 0..=half {
                let p = Point3f::new((x + offset) as f32, y as f32, 0.0);
                positions.push(p);
                uv.push([u, y as f32]);
                if x + offset == half && offset == 0 {
                    seam.push(p);
                }
            }
        }
    }
    let cols = half + 1;
    let mut indices = grid_indices(cols, n + 1, 0);
    indices.extend(grid_indices(cols, n + 1, (cols * (n + 1)) as u32));
    let mut mesh = TriangleMesh::from_positions_and_indices(positions, indices);
    mesh.set_uv(0, UvChannel::Uv2(uv));
    (mesh, seam)
}

fn is_border(p: &Point3f, n: usize) -> bool {
    p.x == 0.0 || p.y == 0.0 || p.x == n as f32 || p.y == n as f32
}

#[test]
fn test_triangle_count_never_increases() {
    let mesh = create_curved_grid(12);
    let simplifier = QuadricErrorSimplifier::new();

    let mut previous = mesh.triangle_count();
    for quality in [1.0, 0.8, 0.5, 0.2, 0.0] {
        let result = simplifier.simplify_with_stats(&mesh, quality).unwrap();
        assert!(result.mesh.triangle_count() <= previous, "quality {} grew the mesh", quality);
        assert_eq!(result.stats.original_triangles, mesh.triangle_count());
        result.mesh.validate().unwrap();
        previous = result.mesh.triangle_count();
    }
    assert!(previous < mesh.triangle_count());
}

#[test]
fn test_target_is_reached_on_smooth_surface() {
    let mesh = create_curved_grid(12);
    let result = QuadricErrorSimplifier::new().simplify_with_stats(&mesh, 0.5).unwrap();
    let target = (mesh.triangle_count() as f32 * 0.5).round() as usize;
    assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
    assert!(result.mesh.triangle_count() <= target);
}

#[test]
fn test_full_quality_is_identity() {
    let mesh = create_attributed_grid(6);
    let result = QuadricErrorSimplifier::new().simplify_with_stats(&mesh, 1.0).unwrap();
    assert_eq!(result.stats.collapses, 0);
    assert_eq!(result.mesh.triangle_count(), mesh.triangle_count());
    assert_eq!(result.mesh.positions, mesh.positions);
    assert_eq!(result.mesh.submeshes, mesh.submeshes);
    assert_eq!(result.source_vertices, (0..mesh.vertex_count() as u32).collect::<Vec<_>>());
}

#[test]
fn test_single_triangle_is_kept() {
    let mesh = TriangleMesh::from_positions_and_indices(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ],
        vec![0, 1, 2],
    );
    let simplifier = QuadricErrorSimplifier::new();
    for quality in [0.0, 0.3, 1.0] {
        let result = simplifier.simplify_with_stats(&mesh, quality).unwrap();
        assert_eq!(result.mesh, mesh);
        assert_eq!(result.stats.collapses, 0);
    }
}

#[test]
fn test_attribute_streams_match_vertex_count() {
    let mesh = create_attributed_grid(10);
    let result = QuadricErrorSimplifier::new().simplify_with_stats(&mesh, 0.3).unwrap();
    let out = &result.mesh;
    let n = out.vertex_count();
    assert!(n < mesh.vertex_count());

    assert_eq!(out.normals.as_ref().map(Vec::len), Some(n));
    assert_eq!(out.tangents.as_ref().map(Vec::len), Some(n));
    assert_eq!(out.colors.as_ref().map(Vec::len), Some(n));
    assert_eq!(out.uvs[0].as_ref().map(UvChannel::len), Some(n));
    assert_eq!(out.uvs[0].as_ref().map(UvChannel::dimension), Some(2));
    assert!(out.uvs[1].is_none());
    assert_eq!(out.uvs[3].as_ref().map(UvChannel::dimension), Some(4));
    assert_eq!(out.bone_weights.as_ref().map(Vec::len), Some(n));
    assert_eq!(out.bind_poses.len(), 2);

    assert_eq!(out.blend_shapes.len(), 1);
    let frame = &out.blend_shapes[0].frames[0];
    assert_eq!(frame.weight, 100.0);
    assert_eq!(frame.delta_vertices.len(), n);
    assert_eq!(frame.delta_normals.as_ref().map(Vec::len), Some(n));
    assert!(frame.delta_tangents.is_none());

    for weight in out.bone_weights.iter().flatten() {
        approx::assert_relative_eq!(weight.total_weight(), 1.0, epsilon = 1e-4);
    }
    for normal in out.normals.iter().flatten() {
        approx::assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-4);
    }
    out.validate().unwrap();
}

#[test]
fn test_index_width_follows_vertex_count() {
    // A two-row strip keeps every vertex referenced
    fn strip(columns: usize) -> TriangleMesh {
        let positions = (0..2)
            .flat_map(|y| (0..columns).map(move |x| Point3f::new(x as f32, y as f32, 0.0)))
            .collect();
        TriangleMesh::from_positions_and_indices(positions, grid_indices(columns, 2, 0))
    }

    let simplifier = QuadricErrorSimplifier::new();
    let wide = simplifier.simplify(&strip(35_000), 1.0).unwrap();
    assert_eq!(wide.vertex_count(), 70_000);
    assert_eq!(wide.submeshes[0].indices.format(), IndexFormat::U32);

    let narrow = simplifier.simplify(&strip(30_000), 1.0).unwrap();
    assert_eq!(narrow.vertex_count(), 60_000);
    assert_eq!(narrow.submeshes[0].indices.format(), IndexFormat::U16);
}

#[test]
fn test_preserved_border_survives() {
    let n = 10;
    let mesh = create_flat_grid(n);
    let options = SimplificationOptions::default().with_preserve_border_edges(true);
    let result = QuadricErrorSimplifier::with_options(options)
        .simplify_with_stats(&mesh, 0.1)
        .unwrap();

    assert!(result.mesh.triangle_count() < mesh.triangle_count());
    for p in mesh.positions.iter().filter(|p| is_border(p, n)) {
        assert!(result.mesh.positions.contains(p), "border vertex {:?} was removed", p);
    }
}

#[test]
fn test_preserved_seam_survives() {
    let (mesh, seam) = create_seamed_grid(8);
    let options = SimplificationOptions::default().with_preserve_uv_seam_edges(true);
    let result = QuadricErrorSimplifier::with_options(options)
        .simplify_with_stats(&mesh, 0.2)
        .unwrap();

    assert!(result.mesh.triangle_count() < mesh.triangle_count());
    for p in &seam {
        let copies = result.mesh.positions.iter().filter(|q| *q == p).count();
        assert!(copies >= 2, "seam vertex {:?} lost a side", p);
    }
    result.mesh.validate().unwrap();
}

#[test]
fn test_locked_vertex_is_untouched() {
    let mesh = create_curved_grid(10);
    let center = 5 * 11 + 5;
    let options = SimplificationOptions::default().with_locked_vertices(vec![center]);
    let result = QuadricErrorSimplifier::with_options(options)
        .simplify_with_stats(&mesh, 0.5)
        .unwrap();

    let out = result
        .source_vertices
        .iter()
        .position(|&v| v == center)
        .expect("locked vertex removed");
    assert_eq!(result.mesh.positions[out], mesh.positions[center as usize]);
}

#[test]
fn test_tight_normal_deviation_rejects_more() {
    let mesh = create_curved_grid(12);
    let loose = QuadricErrorSimplifier::new().simplify_with_stats(&mesh, 0.2).unwrap();

    let options = SimplificationOptions::default().with_max_normal_deviation(5.0);
    let tight = QuadricErrorSimplifier::with_options(options)
        .simplify_with_stats(&mesh, 0.2)
        .unwrap();

    assert!(
        tight.stats.rejected > loose.stats.rejected
            || tight.stats.final_triangles >= loose.stats.final_triangles,
        "tight: {}, loose: {}",
        tight.stats,
        loose.stats
    );
    tight.mesh.validate().unwrap();
}

#[test]
fn test_iteration_limit() {
    let mesh = create_curved_grid(10);
    let options = SimplificationOptions::default().with_max_iteration_count(5);
    let result = QuadricErrorSimplifier::with_options(options)
        .simplify_with_stats(&mesh, 0.0)
        .unwrap();
    assert_eq!(result.stats.stop_reason, StopReason::IterationLimit);
    assert_eq!(result.stats.iterations, 5);
    assert!(result.stats.collapses <= 5);
}

#[test]
fn test_error_threshold_stops_early() {
    let mesh = create_noisy_grid(12, 7);
    let options = SimplificationOptions::default().with_max_error(Some(1e-9));
    let result = QuadricErrorSimplifier::with_options(options)
        .simplify_with_stats(&mesh, 0.0)
        .unwrap();
    assert_eq!(result.stats.stop_reason, StopReason::ErrorThreshold);
}

#[test]
fn test_control_reports_progress() {
    let control = RunControl::new();
    let simplifier = QuadricErrorSimplifier::new().with_control(control.clone());
    let result = simplifier.simplify_with_stats(&create_curved_grid(8), 0.4).unwrap();
    assert!(!control.is_cancelled());
    assert_eq!(control.iterations(), result.stats.iterations);
    assert_eq!(control.collapses(), result.stats.collapses);
}

#[test]
fn test_noisy_mesh_is_deterministic() {
    let mesh = create_noisy_grid(16, 42);
    let simplifier = QuadricErrorSimplifier::with_options(SimplificationOptions::preserve_all());

    let first = simplifier.simplify_with_stats(&mesh, 0.3).unwrap();
    let second = simplifier.simplify_with_stats(&mesh, 0.3).unwrap();
    assert_eq!(first.mesh.position_bytes(), second.mesh.position_bytes());
    assert_eq!(
        first.mesh.submeshes[0].indices.as_bytes(),
        second.mesh.submeshes[0].indices.as_bytes()
    );
    assert_eq!(first, second);
    first.mesh.validate().unwrap();
}

#[test]
fn test_submeshes_are_simplified_together() {
    let mut mesh = create_curved_grid(10);
    let indices = mesh.submeshes[0].indices.to_u32_vec();
    let (lower, upper) = indices.split_at(indices.len() / 2);
    mesh.submeshes.clear();
    mesh.add_submesh(0, lower.to_vec());
    mesh.add_submesh(3, upper.to_vec());

    let result = QuadricErrorSimplifier::new().simplify_with_stats(&mesh, 0.4).unwrap();
    assert_eq!(result.mesh.submeshes.len(), 2);
    assert_eq!(result.mesh.submeshes[1].material_slot, 3);
    assert!(result.mesh.triangle_count() < mesh.triangle_count());
    result.mesh.validate().unwrap();
}

#[test]
fn test_locked_submesh_keeps_its_triangles() {
    let mut mesh = create_curved_grid(10);
    let indices = mesh.submeshes[0].indices.to_u32_vec();
    let (lower, upper) = indices.split_at(indices.len() / 2);
    mesh.submeshes.clear();
    mesh.add_submesh(0, lower.to_vec());
    mesh.add_submesh(1, upper.to_vec());

    let options = SimplificationOptions::default().with_locked_submeshes(vec![1]);
    let result = QuadricErrorSimplifier::with_options(options)
        .simplify_with_stats(&mesh, 0.3)
        .unwrap();
    assert_eq!(result.mesh.submeshes[1].triangle_count(), mesh.submeshes[1].triangle_count());
    assert!(result.mesh.submeshes[0].triangle_count() < mesh.submeshes[0].triangle_count());
}

#[test]
fn test_invalid_input_is_rejected() {
    let simplifier = QuadricErrorSimplifier::new();

    let mut mesh = create_curved_grid(4);
    mesh.normals = Some(vec![Vector3f::z(); 3]);
    assert!(matches!(
        simplifier.simplify(&mesh, 0.5),
        Err(meshlod_core::Error::AttributeLength { .. })
    ));

    let mesh = TriangleMesh::from_positions_and_indices(vec![Point3f::origin(); 3], vec![0, 1, 5]);
    assert!(matches!(
        simplifier.simplify(&mesh, 0.5),
        Err(meshlod_core::Error::IndexOutOfRange { .. })
    ));

    let options = SimplificationOptions::default().with_locked_submeshes(vec![4]);
    assert!(QuadricErrorSimplifier::with_options(options)
        .simplify(&create_curved_grid(4), 0.5)
        .is_err());
}
