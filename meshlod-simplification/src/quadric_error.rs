//! Quadric error decimation
//!
//! Every vertex accumulates the squared-distance quadric of its incident triangle planes.
//! Edges are collapsed cheapest-first into the point minimizing the summed quadric, while
//! collapses that would fold a face, flatten it or strand a vertex are rejected.

use crate::control::RunControl;
use crate::decimator::Decimator;
use crate::options::SimplificationOptions;
use crate::MeshSimplifier;
use meshlod_core::{Error, Result, TriangleMesh};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Error bound used by [`QuadricErrorSimplifier::simplify_lossless`]
pub const LOSSLESS_MAX_ERROR: f64 = 1e-3;

/// Why the selection loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// The live triangle count reached the quality target
    TargetReached,
    /// The cheapest remaining collapse exceeded `max_error`
    ErrorThreshold,
    /// No eligible candidate is left
    NoCandidates,
    /// The iteration budget ran out
    IterationLimit,
}

/// Counters describing one simplification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplificationStats {
    /// Triangle count of the input, including triangles with repeated indices
    pub original_triangles: usize,
    pub original_vertices: usize,
    pub final_triangles: usize,
    pub final_vertices: usize,
    pub collapses: usize,
    /// Selected triangles none of whose edges could be collapsed
    pub rejected: usize,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

impl SimplificationStats {
    /// Fraction of input triangles kept
    pub fn triangle_ratio(&self) -> f64 {
        if self.original_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.original_triangles as f64
        }
    }
}

impl fmt::Display for SimplificationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} triangles, {} -> {} vertices ({} collapses, {} rejected, {} iterations, {:?})",
            self.original_triangles,
            self.final_triangles,
            self.original_vertices,
            self.final_vertices,
            self.collapses,
            self.rejected,
            self.iterations,
            self.stop_reason
        )
    }
}

/// A simplified mesh with its run statistics
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedMesh {
    pub mesh: TriangleMesh,
    pub stats: SimplificationStats,
    /// Input vertex each output vertex descends from
    pub source_vertices: Vec<u32>,
}

/// Quadric error decimation simplifier
#[derive(Debug, Clone, Default)]
pub struct QuadricErrorSimplifier {
    pub options: SimplificationOptions,
    control: Option<RunControl>,
}

impl QuadricErrorSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SimplificationOptions) -> Self {
        Self {
            options,
            control: None,
        }
    }

    /// Attach a handle for cancelling the run and observing its progress
    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = Some(control);
        self
    }

    /// Simplify to `round(triangle_count * quality)` triangles, reporting statistics.
    ///
    /// `quality` must lie in `[0, 1]`. The input is validated before any work starts and
    /// is never modified.
    pub fn simplify_with_stats(&self, mesh: &TriangleMesh, quality: f32) -> Result<SimplifiedMesh> {
        if !(0.0..=1.0).contains(&quality) {
            return Err(Error::InvalidData(format!(
                "Quality must be within [0, 1], got {}",
                quality
            )));
        }
        self.run(mesh, quality, &self.options)
    }

    /// Collapse only edges whose error stays below [`LOSSLESS_MAX_ERROR`], with no
    /// triangle target. A tighter `max_error` in the options takes precedence.
    pub fn simplify_lossless(&self, mesh: &TriangleMesh) -> Result<SimplifiedMesh> {
        let max_error = self
            .options
            .max_error
            .map_or(LOSSLESS_MAX_ERROR, |max| max.min(LOSSLESS_MAX_ERROR));
        let options = self.options.clone().with_max_error(Some(max_error));
        self.run(mesh, 0.0, &options)
    }

    fn run(&self, mesh: &TriangleMesh, quality: f32, options: &SimplificationOptions) -> Result<SimplifiedMesh> {
        mesh.validate()?;
        options.validate(mesh)?;

        let mut decimator = Decimator::new(mesh, options);
        let original_triangles = mesh.triangle_count();
        let target = (decimator.live_triangles as f64 * quality as f64).round() as usize;
        info!(
            triangles = original_triangles,
            live = decimator.live_triangles,
            vertices = mesh.vertex_count(),
            target,
            "Starting quadric error simplification"
        );

        let stop_reason = decimator.run(target, self.control.as_ref())?;
        let (collapses, rejected, iterations) = (decimator.collapses, decimator.rejected, decimator.iterations);
        let (simplified, source_vertices) = decimator.into_mesh(mesh);

        let stats = SimplificationStats {
            original_triangles,
            original_vertices: mesh.vertex_count(),
            final_triangles: simplified.triangle_count(),
            final_vertices: simplified.vertex_count(),
            collapses,
            rejected,
            iterations,
            stop_reason,
        };
        info!(
            final_triangles = stats.final_triangles,
            final_vertices = stats.final_vertices,
            collapses,
            ?stop_reason,
            "Simplification finished"
        );

        Ok(SimplifiedMesh {
            mesh: simplified,
            stats,
            source_vertices,
        })
    }
}

impl MeshSimplifier for QuadricErrorSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, quality: f32) -> Result<TriangleMesh> {
        Ok(self.simplify_with_stats(mesh, quality)?.mesh)
    }
}
