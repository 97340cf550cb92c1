//! Renderer context: canonical scene state and its packed, accelerated snapshot.
//!
//! Every `set_*` call rebuilds the whole packed representation from the
//! canonical instance lists and swaps it in as a new [`SceneSnapshot`].
//! Snapshots are immutable; a dispatch that holds one keeps it alive until
//! it finishes, independent of later rebuilds.

use std::sync::Arc;

use procray_primitives::{
    BezierPatch, Circle, Cone, Cylinder, Ellipse, Line, Plane, PrimitiveKind, ScenePrimitives,
    Sphere, Torus,
};

use crate::bvh::{AccelerationBuilder, Accelerator, SahBuilder};
use crate::intersect::{intersect_primitive, primitive_at, PatchQuery};
use crate::layout::GeometryLayout;
use crate::options::SceneOptions;
use crate::pack::{pack_scene, PackReport, PackedGeometry};
use crate::{Ray, RayHit, RayInterval};

/// One fully built scene.
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    primitives: ScenePrimitives,
    packed: PackedGeometry,
    accelerator: Accelerator,
    report: PackReport,
    patch_query: PatchQuery,
}

impl SceneSnapshot {
    /// Pack `scene` and build its acceleration structure.
    pub fn build(
        scene: &ScenePrimitives,
        options: &SceneOptions,
        builder: &dyn AccelerationBuilder,
    ) -> Self {
        let (primitives, packed, report) = pack_scene(scene, options);
        let accelerator = Accelerator::build(builder, &packed.aabb_arrays());
        Self {
            primitives,
            packed,
            accelerator,
            report,
            patch_query: options.patch_query(),
        }
    }

    /// Instances that made it into the packed buffers, by kind and slot.
    pub fn primitives(&self) -> &ScenePrimitives {
        &self.primitives
    }

    /// Packed device buffers.
    pub fn packed(&self) -> &PackedGeometry {
        &self.packed
    }

    /// Geometry index table.
    pub fn layout(&self) -> &GeometryLayout {
        &self.packed.layout
    }

    /// Acceleration structure front end.
    pub fn accelerator(&self) -> &Accelerator {
        &self.accelerator
    }

    /// Outcome of the rebuild that produced this snapshot.
    pub fn report(&self) -> &PackReport {
        &self.report
    }

    /// Number of packed primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Whether nothing was packed.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Intersect a ray with the primitive at one geometry index.
    pub fn intersect(
        &self,
        geometry_index: u32,
        ray: &Ray,
        interval: &RayInterval,
    ) -> Option<RayHit> {
        let (kind, slot) = self.packed.layout.resolve(geometry_index)?;
        let primitive = primitive_at(&self.primitives, kind, slot)?;
        let hit = intersect_primitive(ray, primitive, interval, &self.patch_query)?;
        Some(RayHit {
            t: hit.t,
            point: ray.at(hit.t),
            normal: hit.normal,
            geometry_index,
            kind,
            slot,
        })
    }

    /// Closest hit over the whole scene.
    pub fn trace_closest(&self, ray: &Ray, interval: &RayInterval) -> Option<RayHit> {
        self.accelerator
            .closest_hit(ray, interval, |gi, narrowed| self.intersect(gi, ray, narrowed))
    }
}

/// Owns the scene and rebuilds its snapshot on every change.
pub struct RenderContext {
    options: SceneOptions,
    scene: ScenePrimitives,
    snapshot: Arc<SceneSnapshot>,
    builder: Box<dyn AccelerationBuilder>,
    warned_malformed: u16,
    warned_truncated: u16,
}

impl RenderContext {
    /// Empty context using the SAH builder.
    pub fn new(options: SceneOptions) -> Self {
        let builder = SahBuilder::new(options.max_bvh_nodes as usize);
        Self::with_builder(options, Box::new(builder))
    }

    /// Empty context using a custom acceleration structure builder.
    pub fn with_builder(options: SceneOptions, builder: Box<dyn AccelerationBuilder>) -> Self {
        let scene = ScenePrimitives::new();
        let snapshot = Arc::new(SceneSnapshot::build(&scene, &options, builder.as_ref()));
        Self {
            options,
            scene,
            snapshot,
            builder,
            warned_malformed: 0,
            warned_truncated: 0,
        }
    }

    /// Options used by every rebuild.
    pub fn options(&self) -> &SceneOptions {
        &self.options
    }

    /// Scene as last set, before validation.
    pub fn scene(&self) -> &ScenePrimitives {
        &self.scene
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<SceneSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Replace every instance list.
    pub fn set_scene(&mut self, scene: ScenePrimitives) {
        self.scene = scene;
        self.rebuild();
    }

    /// Replace the spheres.
    pub fn set_spheres(&mut self, spheres: Vec<Sphere>) {
        self.scene.spheres = spheres;
        self.rebuild();
    }

    /// Replace the cylinders.
    pub fn set_cylinders(&mut self, cylinders: Vec<Cylinder>) {
        self.scene.cylinders = cylinders;
        self.rebuild();
    }

    /// Replace the disks.
    pub fn set_circles(&mut self, circles: Vec<Circle>) {
        self.scene.circles = circles;
        self.rebuild();
    }

    /// Replace the ellipses.
    pub fn set_ellipses(&mut self, ellipses: Vec<Ellipse>) {
        self.scene.ellipses = ellipses;
        self.rebuild();
    }

    /// Replace the line segments.
    pub fn set_lines(&mut self, lines: Vec<Line>) {
        self.scene.lines = lines;
        self.rebuild();
    }

    /// Replace the cones.
    pub fn set_cones(&mut self, cones: Vec<Cone>) {
        self.scene.cones = cones;
        self.rebuild();
    }

    /// Replace the tori.
    pub fn set_tori(&mut self, tori: Vec<Torus>) {
        self.scene.tori = tori;
        self.rebuild();
    }

    /// Replace the planes.
    pub fn set_planes(&mut self, planes: Vec<Plane>) {
        self.scene.planes = planes;
        self.rebuild();
    }

    /// Replace the patches.
    pub fn set_patches(&mut self, patches: Vec<BezierPatch>) {
        self.scene.patches = patches;
        self.rebuild();
    }

    /// Intersect one geometry index of the current snapshot.
    pub fn intersect(&self, geometry_index: u32, ray: &Ray) -> Option<RayHit> {
        self.snapshot.intersect(geometry_index, ray, &RayInterval::unbounded())
    }

    fn rebuild(&mut self) {
        let snapshot = SceneSnapshot::build(&self.scene, &self.options, self.builder.as_ref());
        self.warn_once(snapshot.report());
        self.snapshot = Arc::new(snapshot);
    }

    fn warn_once(&mut self, report: &PackReport) {
        for kind in PrimitiveKind::ALL {
            let bit = 1u16 << kind.index();
            let k = report.kind(kind);
            if k.malformed > 0 && self.warned_malformed & bit == 0 {
                self.warned_malformed |= bit;
                log::warn!("dropped {} malformed {kind} instance(s)", k.malformed);
            }
            if k.truncated > 0 && self.warned_truncated & bit == 0 {
                self.warned_truncated |= bit;
                log::warn!(
                    "{kind} capacity exceeded: truncated {} instance(s), kept {}",
                    k.truncated,
                    k.accepted
                );
            }
        }
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("options", &self.options)
            .field("primitives", &self.snapshot.len())
            .field("linear", &self.snapshot.accelerator.is_linear())
            .finish_non_exhaustive()
    }
}
