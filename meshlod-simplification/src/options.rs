//! Simplification configuration

use meshlod_core::{Error, Result, TriangleMesh};
use serde::{Deserialize, Serialize};

/// Fallback per-triangle iteration allowance when no explicit budget is set
const ITERATIONS_PER_TRIANGLE: usize = 16;
const MIN_ITERATIONS: usize = 1024;

/// Options controlling which collapses the simplifier may perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplificationOptions {
    /// Never collapse edges between two border vertices
    pub preserve_border_edges: bool,
    /// Never collapse edges between two UV seam vertices
    pub preserve_uv_seam_edges: bool,
    /// Add a curvature term to the collapse error so creases survive longer
    pub preserve_surface_curvature: bool,
    /// Merge coincident border vertices before simplifying so seams can be decimated
    pub enable_smart_link: bool,
    /// Maximum distance between two vertices merged by smart link
    pub vertex_link_distance: f64,
    /// Maximum number of candidate selections; `None` derives a budget from the mesh size
    pub max_iteration_count: Option<usize>,
    /// Stop once the cheapest remaining collapse exceeds this error
    pub max_error: Option<f64>,
    /// Error multiplier applied to collapses touching the mesh border
    pub border_error_multiplier: f64,
    /// Largest allowed rotation of a face normal by a collapse, in degrees
    pub max_normal_deviation: f64,
    /// Input vertices that must never move or be removed
    pub locked_vertices: Vec<u32>,
    /// Submeshes whose vertices must never move or be removed
    pub locked_submeshes: Vec<usize>,
}

impl Default for SimplificationOptions {
    fn default() -> Self {
        Self {
            preserve_border_edges: false,
            preserve_uv_seam_edges: false,
            preserve_surface_curvature: false,
            enable_smart_link: true,
            vertex_link_distance: f64::EPSILON,
            max_iteration_count: None,
            max_error: None,
            border_error_multiplier: 10.0,
            max_normal_deviation: 0.2f64.acos().to_degrees(),
            locked_vertices: Vec::new(),
            locked_submeshes: Vec::new(),
        }
    }
}

impl SimplificationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options keeping borders, seams and creases intact
    pub fn preserve_all() -> Self {
        Self {
            preserve_border_edges: true,
            preserve_uv_seam_edges: true,
            preserve_surface_curvature: true,
            ..Self::default()
        }
    }

    pub fn with_preserve_border_edges(mut self, preserve: bool) -> Self {
        self.preserve_border_edges = preserve;
        self
    }

    pub fn with_preserve_uv_seam_edges(mut self, preserve: bool) -> Self {
        self.preserve_uv_seam_edges = preserve;
        self
    }

    pub fn with_preserve_surface_curvature(mut self, preserve: bool) -> Self {
        self.preserve_surface_curvature = preserve;
        self
    }

    pub fn with_smart_link(mut self, enabled: bool) -> Self {
        self.enable_smart_link = enabled;
        self
    }

    pub fn with_vertex_link_distance(mut self, distance: f64) -> Self {
        self.vertex_link_distance = distance;
        self
    }

    pub fn with_max_iteration_count(mut self, count: usize) -> Self {
        self.max_iteration_count = Some(count);
        self
    }

    pub fn with_max_error(mut self, max_error: Option<f64>) -> Self {
        self.max_error = max_error;
        self
    }

    pub fn with_border_error_multiplier(mut self, multiplier: f64) -> Self {
        self.border_error_multiplier = multiplier;
        self
    }

    pub fn with_max_normal_deviation(mut self, degrees: f64) -> Self {
        self.max_normal_deviation = degrees;
        self
    }

    pub fn with_locked_vertices(mut self, vertices: Vec<u32>) -> Self {
        self.locked_vertices = vertices;
        self
    }

    pub fn with_locked_submeshes(mut self, submeshes: Vec<usize>) -> Self {
        self.locked_submeshes = submeshes;
        self
    }

    /// Check the options against the mesh they will be applied to
    pub fn validate(&self, mesh: &TriangleMesh) -> Result<()> {
        if !self.vertex_link_distance.is_finite() || self.vertex_link_distance < 0.0 {
            return Err(Error::InvalidData(format!(
                "Vertex link distance must be finite and non-negative, got {}",
                self.vertex_link_distance
            )));
        }
        if !self.border_error_multiplier.is_finite() || self.border_error_multiplier < 0.0 {
            return Err(Error::InvalidData(format!(
                "Border error multiplier must be finite and non-negative, got {}",
                self.border_error_multiplier
            )));
        }
        if !(self.max_normal_deviation > 0.0 && self.max_normal_deviation <= 180.0) {
            return Err(Error::InvalidData(format!(
                "Max normal deviation must be in (0, 180] degrees, got {}",
                self.max_normal_deviation
            )));
        }
        if let Some(max_error) = self.max_error {
            if max_error.is_nan() || max_error < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Max error must be non-negative, got {}",
                    max_error
                )));
            }
        }
        if let Some(&v) = self
            .locked_vertices
            .iter()
            .find(|&&v| v as usize >= mesh.vertex_count())
        {
            return Err(Error::InvalidData(format!(
                "Locked vertex {} is out of range for {} vertices",
                v,
                mesh.vertex_count()
            )));
        }
        if let Some(&s) = self
            .locked_submeshes
            .iter()
            .find(|&&s| s >= mesh.submeshes.len())
        {
            return Err(Error::InvalidData(format!(
                "Locked submesh {} is out of range for {} submeshes",
                s,
                mesh.submeshes.len()
            )));
        }
        Ok(())
    }

    /// Minimum cosine between a face normal before and after a collapse
    pub(crate) fn min_normal_dot(&self) -> f64 {
        self.max_normal_deviation.to_radians().cos()
    }

    pub(crate) fn iteration_budget(&self, triangles: usize) -> usize {
        self.max_iteration_count
            .unwrap_or_else(|| triangles.saturating_mul(ITERATIONS_PER_TRIANGLE).saturating_add(MIN_ITERATIONS))
    }
}
