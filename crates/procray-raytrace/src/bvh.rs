//! Bounding volume hierarchy over packed primitive boxes.
//!
//! Uses Surface Area Heuristic (SAH) for construction. The hierarchy is
//! flattened depth-first into fixed-stride [`GpuBvhNode`] records; leaves
//! reference ranges of [`FlatBvh::primitive_order`], which holds geometry
//! indices.

use arrayvec::ArrayVec;
use bytemuck::{Pod, Zeroable};
use procray_math::Point3;
use procray_primitives::Aabb3;

use crate::error::BvhBuildError;
use crate::{Ray, RayHit, RayInterval};

/// Maximum primitives per leaf.
pub const LEAF_SIZE: usize = 4;
/// Depth of the traversal stack.
pub const STACK_DEPTH: usize = 64;

const NUM_BUCKETS: usize = 12;
const TRAVERSAL_COST: f64 = 0.125;

/// Flattened BVH node as uploaded to a device.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    /// AABB min (w unused).
    pub bounds_min: [f32; 4],
    /// AABB max (w unused).
    pub bounds_max: [f32; 4],
    /// For leaves: start in the primitive order. For internal: left child index.
    pub left_or_first: u32,
    /// For leaves: primitive count. For internal: right child index.
    pub right_or_count: u32,
    /// Is this a leaf node? (0 = internal, 1 = leaf)
    pub is_leaf: u32,
    /// Padding.
    pub _pad: u32,
}

impl GpuBvhNode {
    fn new(aabb: &Aabb3, is_leaf: bool, left_or_first: u32, right_or_count: u32) -> Self {
        let a = aabb.to_f32_array();
        Self {
            bounds_min: [a[0], a[1], a[2], 0.0],
            bounds_max: [a[3], a[4], a[5], 0.0],
            left_or_first,
            right_or_count,
            is_leaf: u32::from(is_leaf),
            _pad: 0,
        }
    }

    /// Node bounds in double precision.
    pub fn aabb(&self) -> Aabb3 {
        let (lo, hi) = (self.bounds_min, self.bounds_max);
        Aabb3::from_f32_array(&[lo[0], lo[1], lo[2], hi[0], hi[1], hi[2]])
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.is_leaf != 0
    }
}

/// Output of an [`AccelerationBuilder`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatBvh {
    /// Nodes in depth-first order; the root is node 0.
    pub nodes: Vec<GpuBvhNode>,
    /// Geometry indices in leaf order.
    pub primitive_order: Vec<u32>,
}

impl FlatBvh {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the hierarchy holds no primitives.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Byte view of the node buffer.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }
}

/// Builds a hierarchy from per-primitive boxes.
///
/// Box `i` belongs to geometry index `i`. Implementations must accept an
/// empty slice and return an empty hierarchy for it.
pub trait AccelerationBuilder: Send + Sync {
    /// Build over `[minX, minY, minZ, maxX, maxY, maxZ]` records.
    fn build(&self, aabbs: &[[f32; 6]]) -> Result<FlatBvh, BvhBuildError>;
}

/// Binned SAH builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SahBuilder {
    /// Node budget; larger hierarchies are refused.
    pub max_nodes: usize,
}

impl SahBuilder {
    /// Builder with a node budget.
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }
}

impl Default for SahBuilder {
    fn default() -> Self {
        Self::new(2_097_152)
    }
}

struct Item {
    index: u32,
    aabb: Aabb3,
    centroid: Point3,
}

enum BuildNode {
    Leaf { aabb: Aabb3, primitives: Vec<u32> },
    Internal { aabb: Aabb3, left: Box<BuildNode>, right: Box<BuildNode> },
}

impl AccelerationBuilder for SahBuilder {
    fn build(&self, aabbs: &[[f32; 6]]) -> Result<FlatBvh, BvhBuildError> {
        let mut items = Vec::with_capacity(aabbs.len());
        for (i, a) in aabbs.iter().enumerate() {
            let aabb = Aabb3::from_f32_array(a);
            if !aabb.is_valid() {
                return Err(BvhBuildError::NonFiniteBounds { index: i });
            }
            items.push(Item {
                index: i as u32,
                aabb,
                centroid: aabb.centroid(),
            });
        }
        if items.is_empty() {
            return Ok(FlatBvh::default());
        }

        let root = build_node(&mut items);
        let mut bvh = FlatBvh {
            nodes: Vec::with_capacity(2 * items.len()),
            primitive_order: Vec::with_capacity(items.len()),
        };
        flatten_node(&root, &mut bvh);

        if bvh.nodes.len() > self.max_nodes {
            return Err(BvhBuildError::TooManyNodes {
                count: bvh.nodes.len(),
                max: self.max_nodes,
            });
        }
        log::debug!(
            "built BVH: {} nodes over {} primitives",
            bvh.nodes.len(),
            bvh.primitive_order.len()
        );
        Ok(bvh)
    }
}

/// Recursively flatten a node; returns its index.
fn flatten_node(node: &BuildNode, bvh: &mut FlatBvh) -> usize {
    let idx = bvh.nodes.len();

    match node {
        BuildNode::Leaf { aabb, primitives } => {
            let start = bvh.primitive_order.len() as u32;
            bvh.primitive_order.extend_from_slice(primitives);
            bvh.nodes.push(GpuBvhNode::new(aabb, true, start, primitives.len() as u32));
        }
        BuildNode::Internal { aabb, left, right } => {
            // Reserve space for this node
            bvh.nodes.push(GpuBvhNode::new(aabb, false, 0, 0));

            let left_idx = flatten_node(left, bvh);
            let right_idx = flatten_node(right, bvh);

            bvh.nodes[idx].left_or_first = left_idx as u32;
            bvh.nodes[idx].right_or_count = right_idx as u32;
        }
    }

    idx
}

fn build_node(items: &mut [Item]) -> BuildNode {
    let mut bounds = Aabb3::empty();
    let mut centroids = Aabb3::empty();
    for item in items.iter() {
        bounds.include_aabb(&item.aabb);
        centroids.include_point(&item.centroid);
    }

    if items.len() <= LEAF_SIZE {
        return BuildNode::Leaf {
            aabb: bounds,
            primitives: items.iter().map(|item| item.index).collect(),
        };
    }

    let mid = match find_best_split(items, &bounds, &centroids) {
        Some((axis, pos)) => partition(items, axis, pos),
        None => 0,
    };
    // Fallback if partition fails: split in the middle
    let mid = if mid == 0 || mid == items.len() { items.len() / 2 } else { mid };

    let (left, right) = items.split_at_mut(mid);
    BuildNode::Internal {
        aabb: bounds,
        left: Box::new(build_node(left)),
        right: Box::new(build_node(right)),
    }
}

/// Best split axis and position by SAH over centroid buckets.
fn find_best_split(items: &[Item], bounds: &Aabb3, centroids: &Aabb3) -> Option<(usize, f64)> {
    let extent = centroids.extent();
    let total_area = bounds.surface_area();

    let mut best: Option<(usize, f64)> = None;
    let mut best_cost = f64::INFINITY;

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-10 {
            continue;
        }
        let axis_min = centroids.min[axis];

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];
        for item in items {
            let b = ((item.centroid[axis] - axis_min) / axis_extent * NUM_BUCKETS as f64) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].include_aabb(&item.aabb);
        }

        for split in 1..NUM_BUCKETS {
            let (mut left_count, mut left_bounds) = (0, Aabb3::empty());
            for i in 0..split {
                left_count += bucket_counts[i];
                left_bounds.include_aabb(&bucket_bounds[i]);
            }
            let (mut right_count, mut right_bounds) = (0, Aabb3::empty());
            for i in split..NUM_BUCKETS {
                right_count += bucket_counts[i];
                right_bounds.include_aabb(&bucket_bounds[i]);
            }
            if left_count == 0 || right_count == 0 {
                continue;
            }

            let cost = if total_area > 0.0 {
                TRAVERSAL_COST
                    + left_bounds.surface_area() / total_area * left_count as f64
                    + right_bounds.surface_area() / total_area * right_count as f64
            } else {
                TRAVERSAL_COST + left_count.abs_diff(right_count) as f64
            };
            if cost < best_cost {
                best_cost = cost;
                best = Some((axis, axis_min + (split as f64 / NUM_BUCKETS as f64) * axis_extent));
            }
        }
    }

    best
}

/// Partition items by centroid along an axis; returns the split point.
fn partition(items: &mut [Item], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = items.len();

    while left < right {
        if items[left].centroid[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            items.swap(left, right);
        }
    }

    left
}

/// Ray-query front end over a built hierarchy, or a plain scan when no
/// hierarchy is available.
#[derive(Debug, Clone, PartialEq)]
pub enum Accelerator {
    /// Flattened hierarchy.
    Bvh(FlatBvh),
    /// Every primitive is tested in geometry index order.
    Linear {
        /// Number of primitives.
        count: u32,
    },
}

impl Accelerator {
    /// Build with `builder`, falling back to a linear scan if it fails.
    pub fn build(builder: &dyn AccelerationBuilder, aabbs: &[[f32; 6]]) -> Self {
        match builder.build(aabbs) {
            Ok(bvh) => Accelerator::Bvh(bvh),
            Err(err) => {
                log::warn!(
                    "acceleration structure build failed ({err}); scanning {} primitives linearly",
                    aabbs.len()
                );
                Accelerator::Linear {
                    count: aabbs.len() as u32,
                }
            }
        }
    }

    /// Whether queries scan every primitive.
    pub fn is_linear(&self) -> bool {
        matches!(self, Accelerator::Linear { .. })
    }

    /// Closest accepted hit over all primitives.
    ///
    /// `hit_test` intersects one geometry index against the interval as
    /// narrowed so far.
    pub fn closest_hit<F>(&self, ray: &Ray, interval: &RayInterval, hit_test: F) -> Option<RayHit>
    where
        F: FnMut(u32, &RayInterval) -> Option<RayHit>,
    {
        match self {
            Accelerator::Bvh(bvh) => traverse::<STACK_DEPTH, F>(bvh, ray, interval, hit_test),
            Accelerator::Linear { count } => scan(0..*count, interval, hit_test).1,
        }
    }
}

/// Test primitives in order, narrowing the interval.
fn scan<F>(
    primitives: impl Iterator<Item = u32>,
    interval: &RayInterval,
    mut hit_test: F,
) -> (RayInterval, Option<RayHit>, F)
where
    F: FnMut(u32, &RayInterval) -> Option<RayHit>,
{
    let mut local = *interval;
    let mut best = None;
    for gi in primitives {
        if let Some(hit) = hit_test(gi, &local) {
            local.record(hit.t);
            best = Some(hit);
        }
    }
    (local, best, hit_test)
}

/// Stack traversal, nearest child first. If the stack overflows, the
/// skipped subtrees are covered by a final scan of every primitive.
fn traverse<const S: usize, F>(
    bvh: &FlatBvh,
    ray: &Ray,
    interval: &RayInterval,
    mut hit_test: F,
) -> Option<RayHit>
where
    F: FnMut(u32, &RayInterval) -> Option<RayHit>,
{
    let root = bvh.nodes.first()?;
    let mut local = *interval;
    let mut best: Option<RayHit> = None;
    let mut overflowed = false;

    let mut stack: ArrayVec<(u32, f64), S> = ArrayVec::new();
    if let Some((t_near, _)) = ray.intersect_aabb_within(&root.aabb(), local.t_min, local.upper()) {
        stack.push((0, t_near));
    }

    while let Some((idx, t_near)) = stack.pop() {
        if local.prunes(t_near) {
            continue;
        }
        let Some(node) = bvh.nodes.get(idx as usize) else {
            continue;
        };

        if node.is_leaf() {
            let start = node.left_or_first as usize;
            let end = start + node.right_or_count as usize;
            for &gi in bvh.primitive_order.get(start..end).unwrap_or_default() {
                if let Some(hit) = hit_test(gi, &local) {
                    local.record(hit.t);
                    best = Some(hit);
                }
            }
            continue;
        }

        let entry = |child: u32| {
            let node = bvh.nodes.get(child as usize)?;
            ray.intersect_aabb_within(&node.aabb(), local.t_min, local.upper())
                .map(|(t, _)| (child, t))
        };
        let mut children = [entry(node.left_or_first), entry(node.right_or_count)];
        if let [Some(a), Some(b)] = children {
            if a.1 < b.1 {
                children = [Some(b), Some(a)];
            }
        }
        // Farther child first so the nearer one is popped next.
        for child in children.into_iter().flatten() {
            if stack.try_push(child).is_err() {
                overflowed = true;
            }
        }
    }

    if overflowed {
        log::trace!("BVH traversal stack overflowed; scanning all primitives");
        let (_, rest, _) = scan(bvh.primitive_order.iter().copied(), &local, hit_test);
        if rest.is_some() {
            best = rest;
        }
    }
    best
}
