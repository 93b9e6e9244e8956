//! Quadric error evaluation and collapse-candidate scheduling

use crate::options::SimplificationOptions;
use crate::topology::Topology;
use meshlod_core::{triangle_normal, Plane, Point3d, SymmetricMatrix};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;

/// Where an edge would collapse to and what it would cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub position: Point3d,
    pub error: f64,
}

impl Topology {
    /// Accumulate per-vertex quadrics from the planes of all live triangles
    pub fn init_quadrics(&mut self) {
        for v in &mut self.vertices {
            v.quadric = SymmetricMatrix::zero();
        }
        for t in self.triangles.iter_mut().filter(|t| !t.deleted) {
            let [p0, p1, p2] = t.v.map(|v| self.vertices[v].position);
            t.normal = triangle_normal(&p0, &p1, &p2);
            let q = SymmetricMatrix::from_plane(&Plane::from_triangle(&p0, &p1, &p2));
            for &v in &t.v {
                self.vertices[v].quadric += q;
            }
        }
    }

    /// Whether the edge `(a, b)` may ever be collapsed under `options`
    pub fn edge_eligible(&self, a: usize, b: usize, options: &SimplificationOptions) -> bool {
        let (va, vb) = (&self.vertices[a], &self.vertices[b]);
        if va.locked || vb.locked {
            return false;
        }
        if va.border != vb.border || (va.border && options.preserve_border_edges) {
            return false;
        }
        if va.seam != vb.seam || (va.seam && options.preserve_uv_seam_edges) {
            return false;
        }
        true
    }

    /// Best merge point of the edge `(a, b)` and its error.
    ///
    /// The exact quadric minimizer is used when the summed quadric is well-conditioned
    /// and the edge is not on the border; otherwise the cheapest of both endpoints and
    /// the midpoint, preferring earlier candidates on ties.
    pub fn edge_error(&self, a: usize, b: usize, options: &SimplificationOptions) -> Candidate {
        let (va, vb) = (&self.vertices[a], &self.vertices[b]);
        let q = va.quadric + vb.quadric;
        let on_border = va.border && vb.border;

        let optimal = if on_border { None } else { q.optimal_point() };
        let (position, error) = match optimal {
            Some(p) => (p, q.evaluate(&p)),
            None => {
                let mid = nalgebra::center(&va.position, &vb.position);
                let e0 = q.evaluate(&va.position);
                let e1 = q.evaluate(&vb.position);
                let e2 = q.evaluate(&mid);
                if e0 <= e1 && e0 <= e2 {
                    (va.position, e0)
                } else if e1 <= e2 {
                    (vb.position, e1)
                } else {
                    (mid, e2)
                }
            }
        };

        let mut error = error.max(0.0);
        if options.preserve_surface_curvature {
            error += self.curvature_error(a, b);
        }
        if va.border || vb.border {
            error *= options.border_error_multiplier;
        }
        Candidate { position, error }
    }

    /// Penalty growing with edge length and the flatness of the faces around it.
    ///
    /// Compares the normals of every triangle touching either endpoint against the
    /// triangles sharing the edge and takes the highest alignment.
    pub fn curvature_error(&self, a: usize, b: usize) -> f64 {
        let length = (self.vertices[a].position - self.vertices[b].position).norm();

        let mut touching: Vec<usize> = self
            .refs_of(a)
            .iter()
            .chain(self.refs_of(b))
            .map(|r| r.tid)
            .filter(|&tid| !self.triangles[tid].deleted)
            .collect();
        touching.sort_unstable();
        touching.dedup();

        let shared: Vec<usize> = touching
            .iter()
            .copied()
            .filter(|&tid| self.triangles[tid].contains(a) && self.triangles[tid].contains(b))
            .collect();

        let mut max_dot = 0.0f64;
        for &outer in &touching {
            let n = self.triangles[outer].normal;
            for &inner in &shared {
                max_dot = max_dot.max(n.dot(&self.triangles[inner].normal));
            }
        }
        length * max_dot
    }

    /// Refresh the face normal and edge errors of triangle `tid`
    pub fn update_triangle(&mut self, tid: usize, options: &SimplificationOptions) {
        let t = self.triangles[tid];
        let [p0, p1, p2] = t.v.map(|v| self.vertices[v].position);

        let mut err = [f64::INFINITY; 4];
        for edge in 0..3 {
            let (a, b) = (t.v[edge], t.v[(edge + 1) % 3]);
            if self.edge_eligible(a, b, options) {
                err[edge] = self.edge_error(a, b, options).error;
            }
        }
        err[3] = err[0].min(err[1]).min(err[2]);

        let triangle = &mut self.triangles[tid];
        triangle.normal = triangle_normal(&p0, &p1, &p2);
        triangle.err = err;
    }
}

/// Queue priority: lower error first, then lower triangle index
#[derive(Debug, Clone, Copy)]
pub(crate) struct CandidateKey {
    pub error: f64,
    pub tid: usize,
}

impl PartialEq for CandidateKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CandidateKey {}

impl PartialOrd for CandidateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-queue: the smallest error and index rank highest
        other
            .error
            .total_cmp(&self.error)
            .then_with(|| other.tid.cmp(&self.tid))
    }
}

/// Triangles ordered by their cheapest edge collapse
#[derive(Debug, Default)]
pub(crate) struct CandidateQueue {
    queue: PriorityQueue<usize, CandidateKey>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or reprioritize `tid`; triangles without a collapsible edge are dropped
    pub fn schedule(&mut self, tid: usize, error: f64) {
        if error.is_finite() {
            self.queue.push(tid, CandidateKey { error, tid });
        } else {
            self.queue.remove(&tid);
        }
    }

    pub fn remove(&mut self, tid: usize) {
        self.queue.remove(&tid);
    }

    /// Take the triangle with the cheapest collapse
    pub fn pop(&mut self) -> Option<CandidateKey> {
        self.queue.pop().map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshlod_core::{Point3f, TriangleMesh};

    fn tent() -> TriangleMesh {
        // Four triangles around a raised center vertex
        TriangleMesh::from_positions_and_indices(
            vec![
                Point3f::new(-1.0, -1.0, 0.0),
                Point3f::new(1.0, -1.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(-1.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 0.5),
            ],
            vec![0, 1, 4, 1, 2, 4, 2, 3, 4, 3, 0, 4],
        )
    }

    fn topology(mesh: &TriangleMesh, options: &SimplificationOptions) -> Topology {
        let mut topology = Topology::build(mesh, options);
        topology.init_quadrics();
        topology
    }

    #[test]
    fn test_quadrics_vanish_at_own_vertex() {
        let t = topology(&tent(), &SimplificationOptions::default());
        for v in &t.vertices {
            assert_relative_eq!(v.quadric.evaluate(&v.position), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_border_edge_uses_endpoint_or_midpoint() {
        let options = SimplificationOptions::default();
        let t = topology(&tent(), &options);
        assert!(t.vertices[0].border && t.vertices[1].border);
        let c = t.edge_error(0, 1, &options);
        let endpoints = [t.vertices[0].position, t.vertices[1].position];
        let mid = nalgebra::center(&endpoints[0], &endpoints[1]);
        assert!(c.position == endpoints[0] || c.position == endpoints[1] || c.position == mid);
        assert!(c.error >= 0.0);
    }

    #[test]
    fn test_border_multiplier_scales_error() {
        let base = SimplificationOptions::default().with_border_error_multiplier(1.0);
        let scaled = SimplificationOptions::default().with_border_error_multiplier(3.0);
        let t = topology(&tent(), &base);
        let e1 = t.edge_error(0, 2, &base).error;
        let e3 = t.edge_error(0, 2, &scaled).error;
        assert!(e1 > 0.0);
        assert_relative_eq!(e3, 3.0 * e1, epsilon = 1e-12);
    }

    #[test]
    fn test_eligibility_rules() {
        let options = SimplificationOptions::default();
        let t = topology(&tent(), &options);
        // Center is interior, corners are border
        assert!(!t.vertices[4].border);
        assert!(!t.edge_eligible(0, 4, &options));
        assert!(t.edge_eligible(0, 1, &options));

        let preserving = SimplificationOptions::default().with_preserve_border_edges(true);
        assert!(!t.edge_eligible(0, 1, &preserving));

        let locked = SimplificationOptions::default().with_locked_vertices(vec![1]);
        let t = topology(&tent(), &locked);
        assert!(!t.edge_eligible(0, 1, &locked));
    }

    #[test]
    fn test_update_triangle_marks_ineligible_edges_infinite() {
        let options = SimplificationOptions::default();
        let mut t = topology(&tent(), &options);
        t.update_triangle(0, &options);
        let tri = t.triangles[0];
        // Edge (0, 1) is a border edge, the other two touch the interior center
        assert!(tri.err[0].is_finite());
        assert!(tri.err[1].is_infinite());
        assert!(tri.err[2].is_infinite());
        assert_eq!(tri.err[3], tri.err[0]);
        assert!(tri.normal.z > 0.0);
    }

    #[test]
    fn test_curvature_error_of_border_edge() {
        let t = topology(&tent(), &SimplificationOptions::default());
        // The border edge (0, 1) has one triangle, whose normal aligns with itself
        let length = 2.0;
        assert_relative_eq!(t.curvature_error(0, 1), length, epsilon = 1e-9);
    }

    #[test]
    fn test_queue_orders_by_error_then_index() {
        let mut queue = CandidateQueue::new();
        queue.schedule(5, 1.0);
        queue.schedule(3, 0.5);
        queue.schedule(1, 1.0);
        queue.schedule(9, f64::INFINITY);
        assert_eq!(queue.len(), 3);

        queue.schedule(5, 0.1);
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop()).map(|k| k.tid).collect();
        assert_eq!(order, vec![5, 3, 1]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_queue_unschedules_infinite() {
        let mut queue = CandidateQueue::new();
        queue.schedule(2, 0.5);
        queue.schedule(2, f64::INFINITY);
        assert_eq!(queue.len(), 0);
        queue.schedule(4, 0.5);
        queue.remove(4);
        assert!(queue.pop().is_none());
    }
}
