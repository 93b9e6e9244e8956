//! Parallel generation of several levels of detail from one mesh

use crate::options::SimplificationOptions;
use crate::quadric_error::{QuadricErrorSimplifier, SimplifiedMesh};
use meshlod_core::{Result, TriangleMesh};
use rayon::prelude::*;
use tracing::debug;

/// Simplify `mesh` once per entry of `qualities`, in parallel.
///
/// Levels are independent runs sharing only the read-only input, so each result equals
/// a sequential [`QuadricErrorSimplifier::simplify_with_stats`] call with the same
/// quality. Results keep the order of `qualities`; the first failing level aborts all.
pub fn simplify_levels(
    mesh: &TriangleMesh,
    qualities: &[f32],
    options: &SimplificationOptions,
) -> Result<Vec<SimplifiedMesh>> {
    mesh.validate()?;
    options.validate(mesh)?;
    debug!(levels = qualities.len(), "Generating levels of detail");

    let simplifier = QuadricErrorSimplifier::with_options(options.clone());
    qualities
        .par_iter()
        .map(|&quality| simplifier.simplify_with_stats(mesh, quality))
        .collect()
}
