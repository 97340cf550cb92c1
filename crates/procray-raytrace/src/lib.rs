#![warn(missing_docs)]

//! Analytic ray casting against procedural primitives.
//!
//! Rays are intersected directly with closed-form surfaces (spheres,
//! cylinders, disks, ellipses, thick lines, cones, tori, rectangles) and
//! with bicubic Bézier patches through adaptive subdivision, without
//! tessellation.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray representation with origin and direction
//! - [`RayInterval`] - Accepted parameter range, narrowed as hits are found
//! - [`intersect`] - One intersection kernel per primitive kind
//! - [`layout`] - Geometry index to (kind, slot) table
//! - [`pack`] - Validation, truncation, and flat `f32` buffers
//! - [`bvh`] - Bounding volume hierarchy and the linear fallback
//! - [`RenderContext`] - Scene state and its immutable [`SceneSnapshot`]
//!
//! # Example
//!
//! ```
//! use procray_math::{Point3, Vec3};
//! use procray_primitives::Sphere;
//! use procray_raytrace::{Ray, RayInterval, RenderContext, SceneOptions};
//!
//! let mut ctx = RenderContext::new(SceneOptions::default());
//! ctx.set_spheres(vec![Sphere::new(Point3::new(0.0, 0.0, -5.0), 1.0)]);
//!
//! let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, -1.0));
//! let hit = ctx.snapshot().trace_closest(&ray, &RayInterval::unbounded()).unwrap();
//! assert!((hit.t - 4.0).abs() < 1e-9);
//! ```

mod ray;
pub mod bvh;
pub mod context;
pub mod error;
pub mod intersect;
pub mod layout;
pub mod options;
pub mod pack;
pub mod queue;

pub use bvh::{AccelerationBuilder, Accelerator, FlatBvh, GpuBvhNode, SahBuilder};
pub use context::{RenderContext, SceneSnapshot};
pub use error::{BvhBuildError, OptionsError};
pub use layout::{GeometryLayout, GpuTypeMeta, TypeSlot};
pub use options::SceneOptions;
pub use pack::{pack_scene, GpuAabb, PackReport, PackedGeometry};
pub use ray::{Ray, RayHit, RayInterval};
