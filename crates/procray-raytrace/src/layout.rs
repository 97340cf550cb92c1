//! Geometry index layout.
//!
//! Every primitive of a packed scene has one geometry index. Indices are
//! assigned kind by kind in [`PrimitiveKind::ALL`] order, slot by slot
//! within a kind, so each kind owns one contiguous range. The same table
//! addresses the AABB buffer, the packed parameter buffer, and the
//! acceleration structure leaves.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use procray_primitives::{PrimitiveKind, KIND_COUNT};

/// Number of `f32` parameters one instance of `kind` occupies.
pub const fn param_stride(kind: PrimitiveKind) -> usize {
    match kind {
        PrimitiveKind::Sphere => 4,
        PrimitiveKind::Cylinder => 12,
        PrimitiveKind::Circle => 10,
        PrimitiveKind::Ellipse => 11,
        PrimitiveKind::Line => 7,
        PrimitiveKind::Cone => 11,
        PrimitiveKind::Torus => 12,
        PrimitiveKind::Plane => 11,
        PrimitiveKind::BezierPatch => 56,
    }
}

/// Placement of one kind within the geometry index space and the packed
/// parameter buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSlot {
    /// Kind described by this slot.
    pub kind: PrimitiveKind,
    /// First geometry index of the kind.
    pub base_offset: u32,
    /// Number of instances.
    pub count: u32,
    /// First `f32` of the kind in the packed parameter buffer.
    pub param_offset: u32,
    /// `f32` parameters per instance.
    pub stride: u32,
}

impl TypeSlot {
    /// Geometry indices owned by this kind.
    pub fn indices(&self) -> Range<u32> {
        self.base_offset..self.base_offset + self.count
    }
}

/// Per-kind dispatch metadata as uploaded to a device.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuTypeMeta {
    /// Type id ([`PrimitiveKind::id`]).
    pub type_id: u32,
    /// First geometry index of the type.
    pub base_offset: u32,
    /// Number of instances.
    pub count: u32,
    /// First `f32` of the type in the packed parameter buffer.
    pub param_offset: u32,
    /// `f32` parameters per instance.
    pub stride: u32,
    /// Padding.
    pub _pad: [u32; 3],
}

/// The geometry index table of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryLayout {
    slots: [TypeSlot; KIND_COUNT],
}

impl GeometryLayout {
    /// Lay out kinds with the given per-kind instance counts (indexed by
    /// [`PrimitiveKind::index`]).
    pub fn from_counts(counts: [u32; KIND_COUNT]) -> Self {
        let mut base_offset = 0u32;
        let mut param_offset = 0u32;
        let slots = PrimitiveKind::ALL.map(|kind| {
            let count = counts[kind.index()];
            let stride = param_stride(kind) as u32;
            let slot = TypeSlot {
                kind,
                base_offset,
                count,
                param_offset,
                stride,
            };
            base_offset += count;
            param_offset += count * stride;
            slot
        });
        Self { slots }
    }

    /// Layout with no primitives.
    pub fn empty() -> Self {
        Self::from_counts([0; KIND_COUNT])
    }

    /// Slot of one kind.
    pub fn slot(&self, kind: PrimitiveKind) -> &TypeSlot {
        &self.slots[kind.index()]
    }

    /// All slots in geometry index order.
    pub fn slots(&self) -> &[TypeSlot] {
        &self.slots
    }

    /// Total number of primitives.
    pub fn total(&self) -> u32 {
        self.slots.iter().map(|s| s.count).sum()
    }

    /// Total number of `f32` parameters in the packed buffer.
    pub fn packed_len(&self) -> usize {
        self.slots.iter().map(|s| (s.count * s.stride) as usize).sum()
    }

    /// Kind and slot addressed by a geometry index.
    pub fn resolve(&self, geometry_index: u32) -> Option<(PrimitiveKind, usize)> {
        self.slots
            .iter()
            .find(|s| s.indices().contains(&geometry_index))
            .map(|s| (s.kind, (geometry_index - s.base_offset) as usize))
    }

    /// Geometry index of one instance.
    pub fn geometry_index(&self, kind: PrimitiveKind, slot: usize) -> Option<u32> {
        let s = self.slot(kind);
        let slot = u32::try_from(slot).ok()?;
        (slot < s.count).then(|| s.base_offset + slot)
    }

    /// Range of an instance's parameters in the packed buffer.
    pub fn param_range(&self, geometry_index: u32) -> Option<Range<usize>> {
        let (kind, slot) = self.resolve(geometry_index)?;
        let s = self.slot(kind);
        let start = s.param_offset as usize + slot * s.stride as usize;
        Some(start..start + s.stride as usize)
    }

    /// Dispatch metadata, one record per kind in id order.
    pub fn to_gpu(&self) -> Vec<GpuTypeMeta> {
        self.slots
            .iter()
            .map(|s| GpuTypeMeta {
                type_id: s.kind.id(),
                base_offset: s.base_offset,
                count: s.count,
                param_offset: s.param_offset,
                stride: s.stride,
                _pad: [0; 3],
            })
            .collect()
    }
}

impl Default for GeometryLayout {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(PrimitiveKind, u32)]) -> [u32; KIND_COUNT] {
        let mut c = [0; KIND_COUNT];
        for &(k, n) in pairs {
            c[k.index()] = n;
        }
        c
    }

    #[test]
    fn test_offsets_are_prefix_sums() {
        let layout = GeometryLayout::from_counts(counts(&[
            (PrimitiveKind::Sphere, 3),
            (PrimitiveKind::Circle, 2),
            (PrimitiveKind::BezierPatch, 1),
        ]));
        assert_eq!(layout.total(), 6);
        assert_eq!(layout.slot(PrimitiveKind::Sphere).base_offset, 0);
        assert_eq!(layout.slot(PrimitiveKind::Cylinder).base_offset, 3);
        assert_eq!(layout.slot(PrimitiveKind::Circle).base_offset, 3);
        assert_eq!(layout.slot(PrimitiveKind::BezierPatch).base_offset, 5);
        assert_eq!(layout.slot(PrimitiveKind::Circle).param_offset, 12);
        assert_eq!(layout.slot(PrimitiveKind::BezierPatch).param_offset, 12 + 20);
        assert_eq!(layout.packed_len(), 12 + 20 + 56);
    }

    #[test]
    fn test_resolve_round_trip() {
        let layout = GeometryLayout::from_counts(counts(&[
            (PrimitiveKind::Sphere, 2),
            (PrimitiveKind::Torus, 3),
            (PrimitiveKind::Plane, 1),
        ]));
        for kind in PrimitiveKind::ALL {
            for slot in 0..layout.slot(kind).count as usize {
                let gi = layout.geometry_index(kind, slot).unwrap();
                assert_eq!(layout.resolve(gi), Some((kind, slot)));
            }
        }
        assert_eq!(layout.resolve(2), Some((PrimitiveKind::Torus, 0)));
        assert_eq!(layout.resolve(6), None);
        assert_eq!(layout.geometry_index(PrimitiveKind::Plane, 1), None);
    }

    #[test]
    fn test_param_range() {
        let layout = GeometryLayout::from_counts(counts(&[
            (PrimitiveKind::Sphere, 2),
            (PrimitiveKind::Line, 2),
        ]));
        assert_eq!(layout.param_range(1), Some(4..8));
        assert_eq!(layout.param_range(3), Some(15..22));
        assert_eq!(layout.param_range(4), None);
    }

    #[test]
    fn test_gpu_meta_in_id_order() {
        let meta = GeometryLayout::empty().to_gpu();
        assert_eq!(meta.len(), KIND_COUNT);
        for (i, m) in meta.iter().enumerate() {
            assert_eq!(m.type_id, i as u32);
            assert_eq!(m.count, 0);
        }
        assert_eq!(std::mem::size_of::<GpuTypeMeta>(), 32);
    }
}
