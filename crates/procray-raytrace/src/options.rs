//! Scene options.
//!
//! Options hold the conversion fallbacks and capacity limits used when a
//! scene is packed. They are plain data, loadable from TOML:
//!
//! ```toml
//! max_instances_per_kind = 4096
//! patch_pixel_tolerance = 1.5
//! ```

use std::path::Path;

use procray_math::{Point3, Vec3};
use procray_primitives::patch::{MAX_MAX_DEPTH, MIN_MAX_DEPTH, MIN_PIXEL_TOLERANCE};
use procray_primitives::{BezierPatch, HermitePatch, Line, PatchDefaults, Plane};
use serde::{Deserialize, Serialize};

use crate::error::OptionsError;
use crate::intersect::PatchQuery;

/// Options applied on every rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    /// Half extent of planes built without an explicit size.
    pub default_plane_half_size: f64,
    /// Radius of lines built without an explicit thickness.
    pub default_line_radius: f64,
    /// Instances kept per kind; the rest are truncated.
    pub max_instances_per_kind: u32,
    /// Instances kept across all kinds; later kinds are truncated first.
    pub max_total_primitives: u32,
    /// Recursion depth given to patches that do not set their own.
    pub patch_max_depth: u32,
    /// Pixel tolerance given to patches that do not set their own.
    pub patch_pixel_tolerance: f64,
    /// World-space pixel size per unit of distance.
    pub pixel_spread: f64,
    /// Leaf edge floor for patch traversal.
    pub min_leaf_edge: f64,
    /// Node budget of the acceleration structure.
    pub max_bvh_nodes: u32,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            default_plane_half_size: 1.0,
            default_line_radius: 0.01,
            max_instances_per_kind: 65_536,
            max_total_primitives: 1_048_576,
            patch_max_depth: 10,
            patch_pixel_tolerance: 3.0,
            pixel_spread: 1e-3,
            min_leaf_edge: 1e-4,
            max_bvh_nodes: 2_097_152,
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), OptionsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OptionsError::Invalid {
            name,
            reason: format!("must be finite and positive, got {value}"),
        })
    }
}

fn nonzero(name: &'static str, value: u32) -> Result<(), OptionsError> {
    if value > 0 {
        Ok(())
    } else {
        Err(OptionsError::Invalid {
            name,
            reason: "must be at least 1".to_string(),
        })
    }
}

impl SceneOptions {
    /// Parse and validate options from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, OptionsError> {
        let options: Self = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    /// Read, parse, and validate an options file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<(), OptionsError> {
        positive("default_plane_half_size", self.default_plane_half_size)?;
        positive("default_line_radius", self.default_line_radius)?;
        positive("pixel_spread", self.pixel_spread)?;
        positive("min_leaf_edge", self.min_leaf_edge)?;
        positive("patch_pixel_tolerance", self.patch_pixel_tolerance)?;
        if self.patch_pixel_tolerance < MIN_PIXEL_TOLERANCE {
            return Err(OptionsError::Invalid {
                name: "patch_pixel_tolerance",
                reason: format!("must be at least {MIN_PIXEL_TOLERANCE}"),
            });
        }
        if !(MIN_MAX_DEPTH..=MAX_MAX_DEPTH).contains(&self.patch_max_depth) {
            return Err(OptionsError::Invalid {
                name: "patch_max_depth",
                reason: format!("must be in {MIN_MAX_DEPTH}..={MAX_MAX_DEPTH}"),
            });
        }
        nonzero("max_instances_per_kind", self.max_instances_per_kind)?;
        nonzero("max_total_primitives", self.max_total_primitives)?;
        nonzero("max_bvh_nodes", self.max_bvh_nodes)?;
        Ok(())
    }

    /// Defaults handed to the Hermite converter.
    pub fn patch_defaults(&self) -> PatchDefaults {
        PatchDefaults {
            max_depth: self.patch_max_depth,
            pixel_tolerance: self.patch_pixel_tolerance,
        }
    }

    /// Traversal tunables shared by every patch.
    pub fn patch_query(&self) -> PatchQuery {
        PatchQuery {
            pixel_spread: self.pixel_spread,
            min_leaf_edge: self.min_leaf_edge,
        }
    }

    /// Square plane of the default size.
    pub fn plane(&self, center: Point3, xdir: Vec3, ydir: Vec3) -> Plane {
        let h = self.default_plane_half_size;
        Plane::new(center, xdir, ydir, h, h)
    }

    /// Segment of the default thickness.
    pub fn line(&self, p0: Point3, p1: Point3) -> Line {
        Line::new(p0, p1, self.default_line_radius)
    }

    /// Convert a Hermite patch, filling unset tunables from these options.
    pub fn patch(&self, hermite: &HermitePatch) -> BezierPatch {
        hermite.to_bezier(&self.patch_defaults())
    }
}
