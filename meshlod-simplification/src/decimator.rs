//! Working state of one simplification run and its selection loop

use crate::attributes::AttributeBuffers;
use crate::candidate::CandidateQueue;
use crate::control::RunControl;
use crate::options::SimplificationOptions;
use crate::quadric_error::StopReason;
use crate::topology::Topology;
use meshlod_core::{Error, Result, TriangleMesh};
use tracing::debug;

/// The reference arena is rebuilt once it holds this many times the live corner count
const REF_REBUILD_FACTOR: usize = 4;

/// Exclusive working buffers of a single run
pub(crate) struct Decimator<'a> {
    pub options: &'a SimplificationOptions,
    pub topology: Topology,
    pub attributes: AttributeBuffers,
    pub queue: CandidateQueue,
    /// Triangles whose errors must be recomputed before the next selection
    pub dirty: Vec<usize>,
    pub live_triangles: usize,
    pub iterations: usize,
    pub collapses: usize,
    pub rejected: usize,
    pub min_normal_dot: f64,
    /// Per-reference scratch flags used while validating a collapse
    pub deleted0: Vec<bool>,
    pub deleted1: Vec<bool>,
}

impl<'a> Decimator<'a> {
    /// Copy `mesh` into working buffers and score every triangle
    pub fn new(mesh: &TriangleMesh, options: &'a SimplificationOptions) -> Self {
        let mut topology = Topology::build(mesh, options);
        topology.init_quadrics();

        let mut queue = CandidateQueue::new();
        for tid in 0..topology.triangles.len() {
            if topology.triangles[tid].deleted {
                continue;
            }
            topology.update_triangle(tid, options);
            queue.schedule(tid, topology.triangles[tid].err[3]);
        }

        let live_triangles = topology.live_triangle_count();
        Self {
            options,
            topology,
            attributes: AttributeBuffers::from_mesh(mesh),
            queue,
            dirty: Vec::new(),
            live_triangles,
            iterations: 0,
            collapses: 0,
            rejected: 0,
            min_normal_dot: options.min_normal_dot(),
            deleted0: Vec::new(),
            deleted1: Vec::new(),
        }
    }

    /// Collapse edges cheapest-first until a stop condition holds
    pub fn run(&mut self, target: usize, control: Option<&RunControl>) -> Result<StopReason> {
        let budget = self.options.iteration_budget(self.live_triangles);

        let reason = loop {
            if self.live_triangles <= target {
                break StopReason::TargetReached;
            }
            if self.iterations >= budget {
                break StopReason::IterationLimit;
            }
            if control.is_some_and(RunControl::is_cancelled) {
                return Err(Error::Cancelled);
            }

            self.flush_dirty();
            let Some(candidate) = self.queue.pop() else {
                break StopReason::NoCandidates;
            };
            self.iterations += 1;

            if self.options.max_error.is_some_and(|max| candidate.error > max) {
                break StopReason::ErrorThreshold;
            }

            if self.try_collapse(candidate.tid) {
                self.collapses += 1;
                self.maybe_rebuild_references();
            } else {
                self.rejected += 1;
            }

            if let Some(control) = control {
                control.publish(self.iterations, self.collapses);
            }
        };
        if let Some(control) = control {
            control.publish(self.iterations, self.collapses);
        }

        debug!(
            ?reason,
            iterations = self.iterations,
            collapses = self.collapses,
            rejected = self.rejected,
            queued = self.queue.len(),
            "Selection loop finished"
        );
        Ok(reason)
    }

    /// Recompute errors of triangles touched since the last selection
    fn flush_dirty(&mut self) {
        for tid in std::mem::take(&mut self.dirty) {
            let t = &mut self.topology.triangles[tid];
            t.dirty = false;
            if t.deleted {
                continue;
            }
            self.topology.update_triangle(tid, self.options);
            self.queue.schedule(tid, self.topology.triangles[tid].err[3]);
        }
    }

    /// Mark every triangle touching the one-ring of `vertex` for re-evaluation
    pub fn propagate_dirty(&mut self, vertex: usize) {
        let mut ring: Vec<usize> = self
            .topology
            .refs_of(vertex)
            .iter()
            .filter(|r| !self.topology.triangles[r.tid].deleted)
            .flat_map(|r| self.topology.triangles[r.tid].v)
            .collect();
        ring.sort_unstable();
        ring.dedup();

        for w in ring {
            let (tstart, tcount) = (self.topology.vertices[w].tstart, self.topology.vertices[w].tcount);
            for k in tstart..tstart + tcount {
                let tid = self.topology.refs[k].tid;
                let t = &mut self.topology.triangles[tid];
                if !t.deleted && !t.dirty {
                    t.dirty = true;
                    self.dirty.push(tid);
                }
            }
        }
    }

    fn maybe_rebuild_references(&mut self) {
        let live_corners = self.live_triangles.max(1) * 3;
        if self.topology.refs.len() > REF_REBUILD_FACTOR * live_corners {
            debug!(
                refs = self.topology.refs.len(),
                live_corners, "Rebuilding triangle references"
            );
            self.topology.rebuild_references();
        }
    }
}
