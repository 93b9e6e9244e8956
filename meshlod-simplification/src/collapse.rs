//! Edge collapse validation and execution

use crate::decimator::Decimator;
use crate::topology::Topology;
use meshlod_core::{barycentric, normalize_or_zero, Point3d, Vector3d};

/// Beyond this alignment the two remaining edges of a triangle are considered collinear
const COLLINEAR_DOT: f64 = 0.999;
/// Edges shorter than this would produce a zero-area triangle
const MIN_EDGE_LENGTH: f64 = 1e-12;

impl Topology {
    /// Whether moving `i0` to `p` would flip or flatten any triangle around it.
    ///
    /// Triangles also containing `i1` disappear with the collapse; they are flagged in
    /// `deleted` (indexed like `refs_of(i0)`) and skipped.
    pub fn flipped(
        &self,
        p: &Point3d,
        i0: usize,
        i1: usize,
        min_normal_dot: f64,
        deleted: &mut Vec<bool>,
    ) -> bool {
        let refs = self.refs_of(i0);
        deleted.clear();
        deleted.resize(refs.len(), false);

        for (k, r) in refs.iter().enumerate() {
            let t = &self.triangles[r.tid];
            if t.deleted {
                continue;
            }
            let id1 = t.v[(r.corner + 1) % 3];
            let id2 = t.v[(r.corner + 2) % 3];
            if id1 == i1 || id2 == i1 {
                deleted[k] = true;
                continue;
            }

            let d1 = self.vertices[id1].position - p;
            let d2 = self.vertices[id2].position - p;
            let (l1, l2) = (d1.norm(), d2.norm());
            if l1 <= MIN_EDGE_LENGTH || l2 <= MIN_EDGE_LENGTH {
                return true;
            }
            let (d1, d2) = (d1 / l1, d2 / l2);
            if d1.dot(&d2).abs() > COLLINEAR_DOT {
                return true;
            }

            let n = normalize_or_zero(&d1.cross(&d2));
            if t.normal != Vector3d::zeros() && n.dot(&t.normal) < min_normal_dot {
                return true;
            }
        }
        false
    }

    /// Live triangles around `vertex` that survive a collapse, given its `deleted` flags
    fn surviving_triangles(&self, vertex: usize, deleted: &[bool]) -> usize {
        self.refs_of(vertex)
            .iter()
            .zip(deleted)
            .filter(|(r, gone)| !**gone && !self.triangles[r.tid].deleted)
            .count()
    }
}

impl Decimator<'_> {
    /// Collapse the cheapest valid edge of triangle `tid`.
    ///
    /// Edges are tried in ascending error order. Returns `false` when every edge is
    /// rejected, leaving the triangle out of the queue until a neighbor changes.
    pub fn try_collapse(&mut self, tid: usize) -> bool {
        let t = self.topology.triangles[tid];
        let mut order = [0, 1, 2];
        order.sort_by(|&x, &y| t.err[x].total_cmp(&t.err[y]).then(x.cmp(&y)));

        for edge in order {
            let error = t.err[edge];
            if !error.is_finite() || self.options.max_error.is_some_and(|max| error > max) {
                break;
            }

            let (a, b) = (t.v[edge], t.v[(edge + 1) % 3]);
            let candidate = self.topology.edge_error(a, b, self.options);
            let (i0, i1) = self.collapse_direction(a, b);

            let mut deleted0 = std::mem::take(&mut self.deleted0);
            let mut deleted1 = std::mem::take(&mut self.deleted1);
            let rejected = self.topology.flipped(&candidate.position, i0, i1, self.min_normal_dot, &mut deleted0)
                || self.topology.flipped(&candidate.position, i1, i0, self.min_normal_dot, &mut deleted1)
                || self.topology.surviving_triangles(i0, &deleted0)
                    + self.topology.surviving_triangles(i1, &deleted1)
                    == 0;

            if !rejected {
                self.apply_collapse(tid, i0, i1, &candidate.position, &deleted0, &deleted1);
            }
            self.deleted0 = deleted0;
            self.deleted1 = deleted1;
            if !rejected {
                return true;
            }
        }
        false
    }

    /// `(survivor, removed)`: the endpoint already closer to the merged surface survives
    fn collapse_direction(&self, a: usize, b: usize) -> (usize, usize) {
        let (va, vb) = (&self.topology.vertices[a], &self.topology.vertices[b]);
        let q = va.quadric + vb.quadric;
        if q.evaluate(&vb.position) < q.evaluate(&va.position) {
            (b, a)
        } else {
            (a, b)
        }
    }

    /// Merge `i1` into `i0` at `p`, collapsing an edge of triangle `tid`
    fn apply_collapse(
        &mut self,
        tid: usize,
        i0: usize,
        i1: usize,
        p: &Point3d,
        deleted0: &[bool],
        deleted1: &[bool],
    ) {
        let t = self.topology.triangles[tid];
        let corner = t.v.iter().position(|&v| v == i0).unwrap_or(0);
        let [p0, p1, p2] = t.v.map(|v| self.topology.vertices[v].position);
        let weights = barycentric(p, &p0, &p1, &p2);
        let ia0 = t.va[corner];
        self.attributes.interpolate(ia0, t.va, &weights);

        // Seam vertices keep per-triangle attribute vertices
        let ia0 = (!self.topology.vertices[i0].seam).then_some(ia0);

        let q1 = self.topology.vertices[i1].quadric;
        let v0 = &mut self.topology.vertices[i0];
        v0.position = *p;
        v0.quadric += q1;

        let tstart = self.topology.refs.len();
        self.update_triangles(i0, ia0, i0, deleted0);
        self.update_triangles(i0, ia0, i1, deleted1);
        let tcount = self.topology.refs.len() - tstart;

        let v0 = &mut self.topology.vertices[i0];
        if tcount <= v0.tcount {
            let dst = v0.tstart;
            self.topology.refs.copy_within(tstart..tstart + tcount, dst);
            self.topology.refs.truncate(tstart);
        } else {
            v0.tstart = tstart;
        }
        v0.tcount = tcount;

        let v1 = &mut self.topology.vertices[i1];
        v1.tcount = 0;
        v1.removed = true;

        self.propagate_dirty(i0);
    }

    /// Point the triangles of `vertex` at `i0`, deleting the ones flagged in `deleted`.
    /// Surviving references are appended to the arena.
    fn update_triangles(&mut self, i0: usize, ia0: Option<usize>, vertex: usize, deleted: &[bool]) {
        let (tstart, tcount) = (self.topology.vertices[vertex].tstart, self.topology.vertices[vertex].tcount);
        for k in 0..tcount {
            let r = self.topology.refs[tstart + k];
            let t = &mut self.topology.triangles[r.tid];
            if t.deleted {
                continue;
            }
            if deleted[k] {
                t.deleted = true;
                self.live_triangles -= 1;
                self.queue.remove(r.tid);
                continue;
            }

            t.v[r.corner] = i0;
            if let Some(ia0) = ia0 {
                t.va[r.corner] = ia0;
            }
            self.topology.refs.push(r);
        }
    }
}
