//! Geometry packing.
//!
//! Turns a [`ScenePrimitives`] into the flat buffers a ray caster consumes:
//! one AABB per geometry index, one `f32` parameter array per kind, and the
//! concatenation of those arrays addressed through the [`GeometryLayout`].
//!
//! Malformed instances are dropped, skewed bases are repaired, and kinds
//! over their capacity are truncated. Nothing here fails: every problem is
//! counted in the [`PackReport`].

use bytemuck::{Pod, Zeroable};
use procray_math::{Point3, Vec3};
use procray_primitives::aabb::{f32_round_down, f32_round_up};
use procray_primitives::{
    Aabb3, BezierPatch, Bounded, Circle, Cone, Cylinder, Ellipse, Line, Plane, PrimitiveKind,
    ScenePrimitives, Sphere, Torus, Validate, KIND_COUNT,
};

use crate::layout::{param_stride, GeometryLayout, GpuTypeMeta};
use crate::options::SceneOptions;

/// Device-side primitive bounds.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuAabb {
    /// AABB min.
    pub min: [f32; 3],
    /// AABB max.
    pub max: [f32; 3],
}

impl GpuAabb {
    /// Narrow a box to `f32`, rounding outward.
    pub fn from_aabb(aabb: &Aabb3) -> Self {
        let a = aabb.to_f32_array();
        Self {
            min: [a[0], a[1], a[2]],
            max: [a[3], a[4], a[5]],
        }
    }

    /// `[minX, minY, minZ, maxX, maxY, maxZ]`.
    pub fn to_array(&self) -> [f32; 6] {
        [self.min[0], self.min[1], self.min[2], self.max[0], self.max[1], self.max[2]]
    }

    /// Whether every corner is finite in single precision.
    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|c| c.is_finite())
    }

    /// Widen back to `f64`.
    pub fn to_aabb(&self) -> Aabb3 {
        Aabb3::from_f32_array(&self.to_array())
    }
}

/// Writes an instance's fixed-stride `f32` parameter record.
pub trait PackParams {
    /// Kind whose stride the record follows.
    const KIND: PrimitiveKind;

    /// Append exactly [`param_stride`]`(Self::KIND)` values.
    fn write_params(&self, out: &mut Vec<f32>);
}

fn push_point(out: &mut Vec<f32>, p: &Point3) {
    out.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
}

fn push_vec(out: &mut Vec<f32>, v: &Vec3) {
    out.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
}

fn push_basis(out: &mut Vec<f32>, center: &Point3, xdir: &Vec3, ydir: &Vec3) {
    push_point(out, center);
    push_vec(out, xdir);
    push_vec(out, ydir);
}

impl PackParams for Sphere {
    const KIND: PrimitiveKind = PrimitiveKind::Sphere;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_point(out, &self.center);
        out.push(self.radius as f32);
    }
}

impl PackParams for Cylinder {
    const KIND: PrimitiveKind = PrimitiveKind::Cylinder;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_basis(out, &self.center, &self.xdir, &self.ydir);
        out.extend_from_slice(&[self.radius as f32, self.height as f32, self.angle_deg as f32]);
    }
}

impl PackParams for Circle {
    const KIND: PrimitiveKind = PrimitiveKind::Circle;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_basis(out, &self.center, &self.xdir, &self.ydir);
        out.push(self.radius as f32);
    }
}

impl PackParams for Ellipse {
    const KIND: PrimitiveKind = PrimitiveKind::Ellipse;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_basis(out, &self.center, &self.xdir, &self.ydir);
        out.extend_from_slice(&[self.radius_x as f32, self.radius_y as f32]);
    }
}

impl PackParams for Line {
    const KIND: PrimitiveKind = PrimitiveKind::Line;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_point(out, &self.p0);
        push_point(out, &self.p1);
        out.push(self.radius as f32);
    }
}

impl PackParams for Cone {
    const KIND: PrimitiveKind = PrimitiveKind::Cone;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_basis(out, &self.center, &self.xdir, &self.ydir);
        out.extend_from_slice(&[self.radius as f32, self.height as f32]);
    }
}

impl PackParams for Torus {
    const KIND: PrimitiveKind = PrimitiveKind::Torus;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_basis(out, &self.center, &self.xdir, &self.ydir);
        out.extend_from_slice(&[
            self.major_radius as f32,
            self.minor_radius as f32,
            self.angle_deg as f32,
        ]);
    }
}

impl PackParams for Plane {
    const KIND: PrimitiveKind = PrimitiveKind::Plane;

    fn write_params(&self, out: &mut Vec<f32>) {
        push_basis(out, &self.center, &self.xdir, &self.ydir);
        out.extend_from_slice(&[self.half_width as f32, self.half_height as f32]);
    }
}

impl PackParams for BezierPatch {
    const KIND: PrimitiveKind = PrimitiveKind::BezierPatch;

    fn write_params(&self, out: &mut Vec<f32>) {
        for p in &self.control {
            push_point(out, p);
        }
        let a = &self.aabb;
        out.extend_from_slice(&[
            f32_round_down(a.min.x),
            f32_round_down(a.min.y),
            f32_round_down(a.min.z),
            f32_round_up(a.max.x),
            f32_round_up(a.max.y),
            f32_round_up(a.max.z),
        ]);
        out.extend_from_slice(&[self.max_depth as f32, self.pixel_tolerance as f32]);
    }
}

/// What happened to the instances of one kind during a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindReport {
    /// Instances handed in.
    pub submitted: usize,
    /// Instances packed.
    pub accepted: usize,
    /// Instances rejected by validation.
    pub malformed: usize,
    /// Valid instances removed by capacity limits.
    pub truncated: usize,
}

/// Per-kind outcome of a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    /// Indexed by [`PrimitiveKind::index`].
    pub kinds: [KindReport; KIND_COUNT],
}

impl PackReport {
    /// Report of one kind.
    pub fn kind(&self, kind: PrimitiveKind) -> &KindReport {
        &self.kinds[kind.index()]
    }

    /// Instances packed across all kinds.
    pub fn accepted(&self) -> usize {
        self.kinds.iter().map(|k| k.accepted).sum()
    }

    /// Instances dropped as malformed across all kinds.
    pub fn malformed(&self) -> usize {
        self.kinds.iter().map(|k| k.malformed).sum()
    }

    /// Instances truncated across all kinds.
    pub fn truncated(&self) -> usize {
        self.kinds.iter().map(|k| k.truncated).sum()
    }
}

/// Flat buffers of one build, all addressed by geometry index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedGeometry {
    /// Geometry index table.
    pub layout: GeometryLayout,
    /// One box per geometry index.
    pub aabbs: Vec<GpuAabb>,
    /// Parameter records per kind, indexed by [`PrimitiveKind::index`].
    pub per_type: [Vec<f32>; KIND_COUNT],
    /// All per-kind arrays back to back, in [`PrimitiveKind::ALL`] order.
    pub packed: Vec<f32>,
    /// Dispatch metadata, one record per kind.
    pub type_meta: Vec<GpuTypeMeta>,
}

impl PackedGeometry {
    /// Parameter record of one geometry index.
    pub fn params(&self, geometry_index: u32) -> Option<&[f32]> {
        let range = self.layout.param_range(geometry_index)?;
        self.packed.get(range)
    }

    /// Boxes as `[minX, minY, minZ, maxX, maxY, maxZ]` records.
    pub fn aabb_arrays(&self) -> Vec<[f32; 6]> {
        self.aabbs.iter().map(GpuAabb::to_array).collect()
    }

    /// Byte view of the AABB buffer.
    pub fn aabb_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.aabbs)
    }

    /// Byte view of the packed parameter buffer.
    pub fn packed_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.packed)
    }

    /// Byte view of the dispatch metadata.
    pub fn type_meta_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.type_meta)
    }
}

/// Validate every instance, keeping the usable ones in order.
///
/// An instance whose narrowed `f32` record or box is not finite is dropped
/// as malformed, even when its `f64` values are fine.
fn admit<T: Validate + Bounded + PackParams>(
    kind: PrimitiveKind,
    items: &[T],
    report: &mut KindReport,
) -> Vec<T> {
    report.submitted = items.len();
    let mut record = Vec::with_capacity(param_stride(kind));
    let kept: Vec<T> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match item.validated() {
            Ok(valid) => {
                let aabb = valid.aabb();
                record.clear();
                valid.write_params(&mut record);
                if !aabb.is_valid() || !GpuAabb::from_aabb(&aabb).is_finite() {
                    log::debug!("{kind} {i} dropped: bounds overflow");
                    None
                } else if !record.iter().all(|v| v.is_finite()) {
                    log::debug!("{kind} {i} dropped: parameters overflow f32");
                    None
                } else {
                    Some(valid)
                }
            }
            Err(err) => {
                log::debug!("{kind} {i} dropped: {err}");
                None
            }
        })
        .collect();
    report.malformed = items.len() - kept.len();
    kept
}

fn write_kind<T: PackParams>(items: &[T]) -> Vec<f32> {
    let mut out = Vec::with_capacity(items.len() * param_stride(T::KIND));
    for item in items {
        item.write_params(&mut out);
    }
    out
}

/// Validate, truncate, and pack a scene.
///
/// Returns the sanitized instances (exactly the ones packed, in geometry
/// index order per kind), the packed buffers, and the report.
pub fn pack_scene(
    scene: &ScenePrimitives,
    options: &SceneOptions,
) -> (ScenePrimitives, PackedGeometry, PackReport) {
    let mut report = PackReport::default();
    let mut clean = ScenePrimitives {
        spheres: admit(PrimitiveKind::Sphere, &scene.spheres, &mut report.kinds[0]),
        cylinders: admit(PrimitiveKind::Cylinder, &scene.cylinders, &mut report.kinds[1]),
        circles: admit(PrimitiveKind::Circle, &scene.circles, &mut report.kinds[2]),
        ellipses: admit(PrimitiveKind::Ellipse, &scene.ellipses, &mut report.kinds[3]),
        lines: admit(PrimitiveKind::Line, &scene.lines, &mut report.kinds[4]),
        cones: admit(PrimitiveKind::Cone, &scene.cones, &mut report.kinds[5]),
        tori: admit(PrimitiveKind::Torus, &scene.tori, &mut report.kinds[6]),
        planes: admit(PrimitiveKind::Plane, &scene.planes, &mut report.kinds[7]),
        patches: admit(PrimitiveKind::BezierPatch, &scene.patches, &mut report.kinds[8]),
    };

    truncate_to_limits(&mut clean, options, &mut report);

    let counts = PrimitiveKind::ALL.map(|k| clean.count(k) as u32);
    let layout = GeometryLayout::from_counts(counts);

    let mut aabbs = Vec::with_capacity(layout.total() as usize);
    for kind in PrimitiveKind::ALL {
        for slot in 0..clean.count(kind) {
            if let Some(aabb) = clean.aabb_of(kind, slot) {
                aabbs.push(GpuAabb::from_aabb(&aabb));
            }
        }
    }

    let per_type = PrimitiveKind::ALL.map(|kind| match kind {
        PrimitiveKind::Sphere => write_kind(&clean.spheres),
        PrimitiveKind::Cylinder => write_kind(&clean.cylinders),
        PrimitiveKind::Circle => write_kind(&clean.circles),
        PrimitiveKind::Ellipse => write_kind(&clean.ellipses),
        PrimitiveKind::Line => write_kind(&clean.lines),
        PrimitiveKind::Cone => write_kind(&clean.cones),
        PrimitiveKind::Torus => write_kind(&clean.tori),
        PrimitiveKind::Plane => write_kind(&clean.planes),
        PrimitiveKind::BezierPatch => write_kind(&clean.patches),
    });
    let packed = per_type.concat();
    debug_assert_eq!(packed.len(), layout.packed_len());
    debug_assert_eq!(aabbs.len(), layout.total() as usize);

    for kind in PrimitiveKind::ALL {
        report.kinds[kind.index()].accepted = clean.count(kind);
    }
    log::debug!(
        "packed {} primitives ({} malformed, {} truncated), {} parameter floats",
        report.accepted(),
        report.malformed(),
        report.truncated(),
        packed.len()
    );

    let type_meta = layout.to_gpu();
    let geometry = PackedGeometry {
        layout,
        aabbs,
        per_type,
        packed,
        type_meta,
    };
    (clean, geometry, report)
}

/// Apply the per-kind clamp, then the total clamp from the last kind back.
fn truncate_to_limits(
    scene: &mut ScenePrimitives,
    options: &SceneOptions,
    report: &mut PackReport,
) {
    let per_kind = options.max_instances_per_kind as usize;
    for kind in PrimitiveKind::ALL {
        let count = scene.count(kind);
        if count > per_kind {
            scene.truncate(kind, per_kind);
            report.kinds[kind.index()].truncated += count - per_kind;
        }
    }

    let max_total = options.max_total_primitives as usize;
    let mut total = scene.len();
    for kind in PrimitiveKind::ALL.iter().rev() {
        if total <= max_total {
            break;
        }
        let count = scene.count(*kind);
        let remove = count.min(total - max_total);
        scene.truncate(*kind, count - remove);
        report.kinds[kind.index()].truncated += remove;
        total -= remove;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> ScenePrimitives {
        let mut scene = ScenePrimitives::new();
        scene.spheres.push(Sphere::new(Point3::origin(), 1.0));
        scene.spheres.push(Sphere::new(Point3::new(3.0, 0.0, 0.0), -1.0));
        scene.spheres.push(Sphere::new(Point3::new(6.0, 0.0, 0.0), 0.5));
        scene.lines.push(Line::new(Point3::origin(), Point3::new(0.0, 0.0, 2.0), 0.1));
        scene.tori.push(Torus::new(Point3::origin(), Vec3::x(), Vec3::z(), 1.0, 0.25));
        let skewed = Vec3::new(1.0, 1.0, 0.0);
        scene.planes.push(Plane::new(Point3::origin(), Vec3::x(), skewed, 2.0, 2.0));
        scene
    }

    #[test]
    fn test_every_kind_writes_its_stride() {
        fn check<T: PackParams>(item: &T) {
            let mut out = Vec::new();
            item.write_params(&mut out);
            assert_eq!(out.len(), param_stride(T::KIND), "{}", T::KIND);
        }
        let (x, y) = (Vec3::x(), Vec3::y());
        let o = Point3::origin();
        check(&Sphere::new(o, 1.0));
        check(&Cylinder::new(o, x, y, 1.0, 1.0));
        check(&Circle::new(o, x, y, 1.0));
        check(&Ellipse::new(o, x, y, 1.0, 2.0));
        check(&Line::new(o, Point3::new(1.0, 0.0, 0.0), 0.1));
        check(&Cone::new(o, x, y, 1.0, 1.0));
        check(&Torus::new(o, x, y, 1.0, 0.2));
        check(&Plane::new(o, x, y, 1.0, 1.0));
        let control = std::array::from_fn(|i| Point3::new((i / 4) as f64, (i % 4) as f64, 0.0));
        check(&BezierPatch::new(control, 10, 3.0));
    }

    #[test]
    fn test_malformed_instances_dropped() {
        let (clean, packed, report) = pack_scene(&sample_scene(), &SceneOptions::default());
        assert_eq!(clean.spheres.len(), 2);
        assert_eq!(report.kind(PrimitiveKind::Sphere).submitted, 3);
        assert_eq!(report.kind(PrimitiveKind::Sphere).malformed, 1);
        assert_eq!(report.kind(PrimitiveKind::Sphere).accepted, 2);
        assert_eq!(packed.layout.total(), 5);
        assert_eq!(packed.aabbs.len(), 5);
        // The surviving second sphere moved up to slot 1.
        assert_eq!(packed.params(1).unwrap(), &[6.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_f32_overflow_dropped() {
        let mut scene = ScenePrimitives::new();
        scene.spheres.push(Sphere::new(Point3::new(1e39, 0.0, 0.0), 1.0));
        scene.tori.push(Torus::new(Point3::origin(), Vec3::x(), Vec3::y(), 4e38, 1.0));
        scene.circles.push(Circle::new(Point3::origin(), Vec3::x(), Vec3::y(), 2.0));
        let (clean, packed, report) = pack_scene(&scene, &SceneOptions::default());
        assert!(clean.spheres.is_empty() && clean.tori.is_empty());
        assert_eq!(report.malformed(), 2);
        assert_eq!(report.accepted(), 1);
        assert!(packed.aabbs.iter().all(GpuAabb::is_finite));
        assert!(packed.packed.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_basis_repaired_before_packing() {
        let (clean, packed, _) = pack_scene(&sample_scene(), &SceneOptions::default());
        let plane = &clean.planes[0];
        assert!(plane.frame().is_orthonormal(1e-12));
        let gi = packed.layout.geometry_index(PrimitiveKind::Plane, 0).unwrap();
        let params = packed.params(gi).unwrap();
        assert_eq!(&params[6..9], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_per_kind_clamp() {
        let mut scene = ScenePrimitives::new();
        for i in 0..10 {
            scene.spheres.push(Sphere::new(Point3::new(i as f64, 0.0, 0.0), 0.25));
        }
        let options = SceneOptions {
            max_instances_per_kind: 4,
            ..SceneOptions::default()
        };
        let (clean, packed, report) = pack_scene(&scene, &options);
        assert_eq!(clean.spheres.len(), 4);
        assert_eq!(report.kind(PrimitiveKind::Sphere).truncated, 6);
        // Insertion order survives truncation.
        assert_eq!(packed.params(3).unwrap()[0], 3.0);
    }

    #[test]
    fn test_total_clamp_drops_later_kinds_first() {
        let options = SceneOptions {
            max_total_primitives: 3,
            ..SceneOptions::default()
        };
        let (clean, _, report) = pack_scene(&sample_scene(), &options);
        // Two spheres and one line survive; torus and plane are cut.
        assert_eq!(clean.len(), 3);
        assert_eq!(clean.spheres.len(), 2);
        assert_eq!(clean.lines.len(), 1);
        assert_eq!(report.kind(PrimitiveKind::Plane).truncated, 1);
        assert_eq!(report.kind(PrimitiveKind::Torus).truncated, 1);
        assert_eq!(report.truncated(), 2);
    }

    #[test]
    fn test_packed_is_concatenation_of_per_type() {
        let (_, packed, _) = pack_scene(&sample_scene(), &SceneOptions::default());
        for slot in packed.layout.slots() {
            let start = slot.param_offset as usize;
            let len = (slot.count * slot.stride) as usize;
            let per_type = packed.per_type[slot.kind.index()].as_slice();
            assert_eq!(&packed.packed[start..start + len], per_type);
        }
        assert_eq!(packed.type_meta_bytes().len(), KIND_COUNT * 32);
    }

    #[test]
    fn test_empty_scene() {
        let (clean, packed, report) = pack_scene(&ScenePrimitives::new(), &SceneOptions::default());
        assert!(clean.is_empty());
        assert!(packed.aabbs.is_empty());
        assert!(packed.packed.is_empty());
        assert_eq!(report.accepted(), 0);
    }
}
