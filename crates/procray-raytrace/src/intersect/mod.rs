//! Ray-primitive intersection kernels.
//!
//! Each primitive kind has a dedicated kernel that reports the closest
//! accepted hit (see [`RayInterval`]) and the unit surface normal there.
//! Closed surfaces report outward normals; flat primitives report the
//! normal facing the incoming ray.

mod cone;
mod cylinder;
mod disk;
mod line;
mod patch;
mod plane;
pub mod roots;
mod sphere;
mod torus;

pub use cone::intersect_cone;
pub use cylinder::intersect_cylinder;
pub use disk::{intersect_circle, intersect_ellipse};
pub use line::intersect_line;
pub use patch::{intersect_patch, PatchQuery, QUEUE_CAPACITY};
pub use plane::intersect_plane;
pub use sphere::{intersect_sphere, sphere_roots};
pub use torus::intersect_torus;

use procray_math::{Dir3, Vec3};
use procray_primitives::{
    BezierPatch, Circle, Cone, Cylinder, Ellipse, Line, Plane, PrimitiveKind, ScenePrimitives,
    Sphere, Torus,
};

use crate::{Ray, RayInterval};

/// Result of a single kernel.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// Parameter along the ray.
    pub t: f64,
    /// Unit surface normal.
    pub normal: Dir3,
}

/// Borrowed view of one primitive of any kind.
#[derive(Debug, Clone, Copy)]
pub enum PrimitiveRef<'a> {
    /// Sphere.
    Sphere(&'a Sphere),
    /// Cylinder.
    Cylinder(&'a Cylinder),
    /// Disk.
    Circle(&'a Circle),
    /// Elliptical disk.
    Ellipse(&'a Ellipse),
    /// Thick segment.
    Line(&'a Line),
    /// Cone.
    Cone(&'a Cone),
    /// Torus.
    Torus(&'a Torus),
    /// Rectangle.
    Plane(&'a Plane),
    /// Bézier patch.
    BezierPatch(&'a BezierPatch),
}

impl PrimitiveRef<'_> {
    /// Kind of the referenced primitive.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveRef::Sphere(_) => PrimitiveKind::Sphere,
            PrimitiveRef::Cylinder(_) => PrimitiveKind::Cylinder,
            PrimitiveRef::Circle(_) => PrimitiveKind::Circle,
            PrimitiveRef::Ellipse(_) => PrimitiveKind::Ellipse,
            PrimitiveRef::Line(_) => PrimitiveKind::Line,
            PrimitiveRef::Cone(_) => PrimitiveKind::Cone,
            PrimitiveRef::Torus(_) => PrimitiveKind::Torus,
            PrimitiveRef::Plane(_) => PrimitiveKind::Plane,
            PrimitiveRef::BezierPatch(_) => PrimitiveKind::BezierPatch,
        }
    }
}

/// Look up one instance of a scene by kind and slot.
pub fn primitive_at(
    scene: &ScenePrimitives,
    kind: PrimitiveKind,
    slot: usize,
) -> Option<PrimitiveRef<'_>> {
    Some(match kind {
        PrimitiveKind::Sphere => PrimitiveRef::Sphere(scene.spheres.get(slot)?),
        PrimitiveKind::Cylinder => PrimitiveRef::Cylinder(scene.cylinders.get(slot)?),
        PrimitiveKind::Circle => PrimitiveRef::Circle(scene.circles.get(slot)?),
        PrimitiveKind::Ellipse => PrimitiveRef::Ellipse(scene.ellipses.get(slot)?),
        PrimitiveKind::Line => PrimitiveRef::Line(scene.lines.get(slot)?),
        PrimitiveKind::Cone => PrimitiveRef::Cone(scene.cones.get(slot)?),
        PrimitiveKind::Torus => PrimitiveRef::Torus(scene.tori.get(slot)?),
        PrimitiveKind::Plane => PrimitiveRef::Plane(scene.planes.get(slot)?),
        PrimitiveKind::BezierPatch => PrimitiveRef::BezierPatch(scene.patches.get(slot)?),
    })
}

/// Intersect a ray with any primitive.
///
/// This dispatches to the kernel of the primitive's kind.
pub fn intersect_primitive(
    ray: &Ray,
    primitive: PrimitiveRef<'_>,
    interval: &RayInterval,
    query: &PatchQuery,
) -> Option<SurfaceHit> {
    match primitive {
        PrimitiveRef::Sphere(s) => intersect_sphere(ray, s, interval),
        PrimitiveRef::Cylinder(c) => intersect_cylinder(ray, c, interval),
        PrimitiveRef::Circle(c) => intersect_circle(ray, c, interval),
        PrimitiveRef::Ellipse(e) => intersect_ellipse(ray, e, interval),
        PrimitiveRef::Line(l) => intersect_line(ray, l, interval),
        PrimitiveRef::Cone(c) => intersect_cone(ray, c, interval),
        PrimitiveRef::Torus(t) => intersect_torus(ray, t, interval),
        PrimitiveRef::Plane(p) => intersect_plane(ray, p, interval),
        PrimitiveRef::BezierPatch(p) => intersect_patch(ray, p, interval, query),
    }
}

/// Keeps the closest accepted candidate of one kernel.
pub(crate) struct Nearest<'a> {
    interval: &'a RayInterval,
    best: Option<SurfaceHit>,
}

impl<'a> Nearest<'a> {
    pub(crate) fn new(interval: &'a RayInterval) -> Self {
        Self { interval, best: None }
    }

    /// Offer a candidate; degenerate normals discard it.
    pub(crate) fn offer(&mut self, t: f64, normal: Vec3) {
        if !self.interval.accepts(t) || self.best.is_some_and(|b| b.t <= t) {
            return;
        }
        if !normal.iter().all(|c| c.is_finite()) {
            return;
        }
        if let Some(normal) = Dir3::try_new(normal, f64::MIN_POSITIVE) {
            self.best = Some(SurfaceHit { t, normal });
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.best.is_none()
    }

    pub(crate) fn finish(self) -> Option<SurfaceHit> {
        self.best
    }
}

/// Normal of a flat surface, flipped to face the incoming ray.
#[inline]
pub(crate) fn facing(normal: Vec3, direction: &Vec3) -> Vec3 {
    if normal.dot(direction) > 0.0 {
        -normal
    } else {
        normal
    }
}
