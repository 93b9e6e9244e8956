//! Index-based topology: vertices, triangles and the vertex-to-triangle reference arena

use crate::options::SimplificationOptions;
use itertools::Itertools;
use meshlod_core::{Point3d, SymmetricMatrix, TriangleMesh, Vector3d};
use tracing::debug;

/// A position vertex of the working mesh.
///
/// The vertex index doubles as the back-reference into the input vertex buffer.
#[derive(Debug, Clone)]
pub(crate) struct Vertex {
    pub position: Point3d,
    pub quadric: SymmetricMatrix,
    /// First entry of this vertex's triangle references in [`Topology::refs`]
    pub tstart: usize,
    pub tcount: usize,
    pub border: bool,
    pub seam: bool,
    pub locked: bool,
    pub removed: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Triangle {
    /// Position vertices
    pub v: [usize; 3],
    /// Attribute vertices, diverging from `v` across seams
    pub va: [usize; 3],
    pub submesh: usize,
    /// Collapse error of edges `(v[i], v[i + 1])`, and their minimum in `err[3]`
    pub err: [f64; 4],
    pub normal: Vector3d,
    pub deleted: bool,
    pub dirty: bool,
}

impl Triangle {
    pub fn contains(&self, vertex: usize) -> bool {
        self.v.contains(&vertex)
    }
}

/// Corner `corner` of triangle `tid`
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Ref {
    pub tid: usize,
    pub corner: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Topology {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub refs: Vec<Ref>,
}

impl Topology {
    /// Build linked topology from a validated mesh
    pub fn build(mesh: &TriangleMesh, options: &SimplificationOptions) -> Self {
        let vertices = mesh
            .positions
            .iter()
            .map(|p| Vertex {
                position: Point3d::new(p.x as f64, p.y as f64, p.z as f64),
                quadric: SymmetricMatrix::zero(),
                tstart: 0,
                tcount: 0,
                border: false,
                seam: false,
                locked: false,
                removed: false,
            })
            .collect();

        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        for (submesh, sm) in mesh.submeshes.iter().enumerate() {
            for tri in sm.indices.triangles() {
                let v = tri.map(|i| i as usize);
                triangles.push(Triangle {
                    v,
                    va: v,
                    submesh,
                    err: [f64::INFINITY; 4],
                    normal: Vector3d::zeros(),
                    deleted: v[0] == v[1] || v[1] == v[2] || v[2] == v[0],
                    dirty: false,
                });
            }
        }

        let degenerate = triangles.iter().filter(|t| t.deleted).count();
        if degenerate > 0 {
            debug!(degenerate, "Dropping triangles with repeated indices");
        }

        let mut topology = Topology {
            vertices,
            triangles,
            refs: Vec::new(),
        };
        topology.rebuild_references();
        topology.update_flags();

        if options.enable_smart_link {
            let linked = topology.smart_link(options.vertex_link_distance);
            if linked > 0 {
                debug!(linked, distance = options.vertex_link_distance, "Linked seam vertices");
                topology.rebuild_references();
                topology.update_flags();
            }
        }

        topology.apply_locks(mesh, options);
        topology
    }

    pub fn refs_of(&self, vertex: usize) -> &[Ref] {
        let v = &self.vertices[vertex];
        &self.refs[v.tstart..v.tstart + v.tcount]
    }

    pub fn live_triangle_count(&self) -> usize {
        self.triangles.iter().filter(|t| !t.deleted).count()
    }

    /// Recreate the reference arena from live triangles only
    pub fn rebuild_references(&mut self) {
        for v in &mut self.vertices {
            v.tstart = 0;
            v.tcount = 0;
        }
        for t in self.triangles.iter().filter(|t| !t.deleted) {
            for &v in &t.v {
                self.vertices[v].tcount += 1;
            }
        }

        let mut start = 0;
        for v in &mut self.vertices {
            v.tstart = start;
            start += v.tcount;
            v.tcount = 0;
        }

        self.refs.clear();
        self.refs.resize(start, Ref::default());
        for (tid, t) in self.triangles.iter().enumerate() {
            if t.deleted {
                continue;
            }
            for (corner, &v) in t.v.iter().enumerate() {
                let vertex = &mut self.vertices[v];
                self.refs[vertex.tstart + vertex.tcount] = Ref { tid, corner };
                vertex.tcount += 1;
            }
        }
    }

    /// Recompute border and seam flags from the current references
    pub fn update_flags(&mut self) {
        let mut neighbors: Vec<(usize, usize)> = Vec::new();
        let mut attributes: Vec<usize> = Vec::new();

        for vi in 0..self.vertices.len() {
            neighbors.clear();
            attributes.clear();
            for r in self.refs_of(vi) {
                let t = &self.triangles[r.tid];
                attributes.push(t.va[r.corner]);
                for other in [t.v[(r.corner + 1) % 3], t.v[(r.corner + 2) % 3]] {
                    match neighbors.iter_mut().find(|(id, _)| *id == other) {
                        Some(entry) => entry.1 += 1,
                        None => neighbors.push((other, 1)),
                    }
                }
            }

            let border = neighbors.iter().any(|&(_, count)| count == 1);
            let seam = attributes.iter().unique().count() > 1;
            let vertex = &mut self.vertices[vi];
            vertex.border = border;
            vertex.seam = seam;
        }
    }

    /// Merge border vertices closer than `distance` into one position vertex.
    ///
    /// Triangles of a linked vertex keep their attribute index, so the shared position
    /// becomes a seam. Returns the number of vertices linked away.
    pub fn smart_link(&mut self, distance: f64) -> usize {
        let distance_sq = distance * distance;
        let candidates = (0..self.vertices.len())
            .filter(|&i| self.vertices[i].border && self.vertices[i].tcount > 0)
            .sorted_by(|&a, &b| {
                self.vertices[a]
                    .position
                    .x
                    .total_cmp(&self.vertices[b].position.x)
                    .then(a.cmp(&b))
            })
            .collect::<Vec<_>>();

        let mut linked = vec![false; self.vertices.len()];
        let mut count = 0;
        for (i, &a) in candidates.iter().enumerate() {
            if linked[a] {
                continue;
            }
            let pa = self.vertices[a].position;
            for &b in &candidates[i + 1..] {
                let pb = self.vertices[b].position;
                if pb.x - pa.x > distance {
                    break;
                }
                if linked[b] || (pb - pa).norm_squared() > distance_sq || self.shares_triangle(b, a) {
                    continue;
                }

                let (tstart, tcount) = (self.vertices[b].tstart, self.vertices[b].tcount);
                for k in tstart..tstart + tcount {
                    let r = self.refs[k];
                    self.triangles[r.tid].v[r.corner] = a;
                }
                self.vertices[b].removed = true;
                linked[b] = true;
                count += 1;
            }
        }
        count
    }

    /// Whether any live triangle around `vertex` also uses `other` as a position
    fn shares_triangle(&self, vertex: usize, other: usize) -> bool {
        self.refs_of(vertex).iter().any(|r| {
            let t = &self.triangles[r.tid];
            !t.deleted && t.contains(other)
        })
    }

    /// Lock explicitly excluded vertices and every vertex of excluded submeshes
    fn apply_locks(&mut self, mesh: &TriangleMesh, options: &SimplificationOptions) {
        let mut locked_attribute = vec![false; mesh.vertex_count()];
        for &v in &options.locked_vertices {
            if let Some(flag) = locked_attribute.get_mut(v as usize) {
                *flag = true;
            }
        }

        for t in self.triangles.iter().filter(|t| !t.deleted) {
            let submesh_locked = options.locked_submeshes.contains(&t.submesh);
            for corner in 0..3 {
                if submesh_locked || locked_attribute[t.va[corner]] {
                    self.vertices[t.v[corner]].locked = true;
                }
            }
        }
    }
}
