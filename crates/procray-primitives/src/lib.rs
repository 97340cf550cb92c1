#![warn(missing_docs)]

//! Analytic primitive model for procray.
//!
//! Every primitive kind the ray caster understands is a plain value type
//! described in world space. The crate also owns everything the packing
//! layer needs to know about a single instance:
//!
//! - [`validate`] - rejection of malformed instances and basis repair
//! - [`bounds`] - conservative axis-aligned bounding boxes per kind
//! - [`patch`] - Hermite to Bézier conversion and Bézier patch evaluation
//!
//! Oriented primitives carry an `(xdir, ydir)` pair; the third axis is
//! always `xdir × ydir`. Partial revolutions sweep from `xdir` toward `ydir`.

pub mod aabb;
pub mod bounds;
pub mod patch;
pub mod validate;

pub use aabb::Aabb3;
pub use bounds::Bounded;
pub use patch::{BezierPatch, HermitePatch, PatchDefaults};
pub use validate::{InstanceRejection, Validate};

use procray_math::{Frame, Point3, Vec3};

/// Number of primitive kinds.
pub const KIND_COUNT: usize = 9;

/// Primitive type ids.
///
/// The discriminant is the type id written into device buffers, and the
/// order of [`PrimitiveKind::ALL`] is the order of type slots in the
/// geometry index space. Later kinds are the first to be truncated when a
/// scene exceeds its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum PrimitiveKind {
    /// [`Sphere`]
    Sphere = 0,
    /// [`Cylinder`]
    Cylinder = 1,
    /// [`Circle`]
    Circle = 2,
    /// [`Ellipse`]
    Ellipse = 3,
    /// [`Line`]
    Line = 4,
    /// [`Cone`]
    Cone = 5,
    /// [`Torus`]
    Torus = 6,
    /// [`Plane`]
    Plane = 7,
    /// [`BezierPatch`]
    BezierPatch = 8,
}

impl PrimitiveKind {
    /// All kinds in type-slot order.
    pub const ALL: [PrimitiveKind; KIND_COUNT] = [
        PrimitiveKind::Sphere,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Circle,
        PrimitiveKind::Ellipse,
        PrimitiveKind::Line,
        PrimitiveKind::Cone,
        PrimitiveKind::Torus,
        PrimitiveKind::Plane,
        PrimitiveKind::BezierPatch,
    ];

    /// Numeric type id.
    #[inline]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Position in [`PrimitiveKind::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Kind for a type id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Lowercase display name.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Sphere => "sphere",
            PrimitiveKind::Cylinder => "cylinder",
            PrimitiveKind::Circle => "circle",
            PrimitiveKind::Ellipse => "ellipse",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Cone => "cone",
            PrimitiveKind::Torus => "torus",
            PrimitiveKind::Plane => "plane",
            PrimitiveKind::BezierPatch => "bezier-patch",
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere.
    pub fn new(center: Point3, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// A closed cylinder, optionally a partial revolution.
///
/// `center` is the midpoint of the axis; the body spans `±height / 2`
/// along `xdir × ydir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    /// Midpoint of the axis.
    pub center: Point3,
    /// In-plane direction at azimuth 0.
    pub xdir: Vec3,
    /// In-plane direction at azimuth 90°.
    pub ydir: Vec3,
    /// Radius.
    pub radius: f64,
    /// Full height along the axis.
    pub height: f64,
    /// Sweep angle in degrees, `(0, 360]`.
    pub angle_deg: f64,
}

impl Cylinder {
    /// Create a full cylinder.
    pub fn new(center: Point3, xdir: Vec3, ydir: Vec3, radius: f64, height: f64) -> Self {
        Self {
            center,
            xdir,
            ydir,
            radius,
            height,
            angle_deg: 360.0,
        }
    }

    /// Same cylinder restricted to `[0°, angle_deg]`.
    pub fn with_sweep(mut self, angle_deg: f64) -> Self {
        self.angle_deg = angle_deg;
        self
    }

    /// Local frame (assumes a validated instance).
    pub fn frame(&self) -> Frame {
        Frame::from_orthonormal(self.xdir, self.ydir)
    }
}

/// A flat disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center.
    pub center: Point3,
    /// First in-plane direction.
    pub xdir: Vec3,
    /// Second in-plane direction.
    pub ydir: Vec3,
    /// Radius.
    pub radius: f64,
}

impl Circle {
    /// Create a disk.
    pub fn new(center: Point3, xdir: Vec3, ydir: Vec3, radius: f64) -> Self {
        Self {
            center,
            xdir,
            ydir,
            radius,
        }
    }

    /// Local frame (assumes a validated instance).
    pub fn frame(&self) -> Frame {
        Frame::from_orthonormal(self.xdir, self.ydir)
    }
}

/// A flat filled ellipse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    /// Center.
    pub center: Point3,
    /// Direction of the `radius_x` semi-axis.
    pub xdir: Vec3,
    /// Direction of the `radius_y` semi-axis.
    pub ydir: Vec3,
    /// Semi-axis along `xdir`.
    pub radius_x: f64,
    /// Semi-axis along `ydir`.
    pub radius_y: f64,
}

impl Ellipse {
    /// Create an ellipse.
    pub fn new(center: Point3, xdir: Vec3, ydir: Vec3, radius_x: f64, radius_y: f64) -> Self {
        Self {
            center,
            xdir,
            ydir,
            radius_x,
            radius_y,
        }
    }

    /// Local frame (assumes a validated instance).
    pub fn frame(&self) -> Frame {
        Frame::from_orthonormal(self.xdir, self.ydir)
    }
}

/// An open cone (no cap).
///
/// `center` is the midpoint of the axis. The base circle of `radius` sits at
/// `center - axis * height / 2`, the apex at `center + axis * height / 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    /// Midpoint of the axis.
    pub center: Point3,
    /// First in-plane direction.
    pub xdir: Vec3,
    /// Second in-plane direction.
    pub ydir: Vec3,
    /// Base radius.
    pub radius: f64,
    /// Distance from base to apex.
    pub height: f64,
}

impl Cone {
    /// Create a cone.
    pub fn new(center: Point3, xdir: Vec3, ydir: Vec3, radius: f64, height: f64) -> Self {
        Self {
            center,
            xdir,
            ydir,
            radius,
            height,
        }
    }

    /// Local frame (assumes a validated instance).
    pub fn frame(&self) -> Frame {
        Frame::from_orthonormal(self.xdir, self.ydir)
    }
}

/// A thick line segment, rendered as a thin oriented box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// First endpoint.
    pub p0: Point3,
    /// Second endpoint.
    pub p1: Point3,
    /// Half thickness.
    pub radius: f64,
}

impl Line {
    /// Create a segment.
    pub fn new(p0: Point3, p1: Point3, radius: f64) -> Self {
        Self { p0, p1, radius }
    }

    /// Frame whose `x` axis runs from `p0` to `p1`.
    pub fn frame(&self) -> Frame {
        Frame::from_axis_x(self.p1 - self.p0)
    }

    /// Segment length.
    pub fn length(&self) -> f64 {
        (self.p1 - self.p0).norm()
    }
}

/// A torus, optionally a partial revolution.
///
/// The ring lies in the `(xdir, ydir)` plane around `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torus {
    /// Center of the ring.
    pub center: Point3,
    /// In-plane direction at azimuth 0.
    pub xdir: Vec3,
    /// In-plane direction at azimuth 90°.
    pub ydir: Vec3,
    /// Distance from center to tube center.
    pub major_radius: f64,
    /// Tube radius.
    pub minor_radius: f64,
    /// Sweep angle in degrees, `(0, 360]`.
    pub angle_deg: f64,
}

impl Torus {
    /// Create a full torus.
    pub fn new(
        center: Point3,
        xdir: Vec3,
        ydir: Vec3,
        major_radius: f64,
        minor_radius: f64,
    ) -> Self {
        Self {
            center,
            xdir,
            ydir,
            major_radius,
            minor_radius,
            angle_deg: 360.0,
        }
    }

    /// Same torus restricted to `[0°, angle_deg]`.
    pub fn with_sweep(mut self, angle_deg: f64) -> Self {
        self.angle_deg = angle_deg;
        self
    }

    /// Local frame (assumes a validated instance).
    pub fn frame(&self) -> Frame {
        Frame::from_orthonormal(self.xdir, self.ydir)
    }
}

/// A finite rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Center.
    pub center: Point3,
    /// Direction of the width.
    pub xdir: Vec3,
    /// Direction of the height.
    pub ydir: Vec3,
    /// Half extent along `xdir`.
    pub half_width: f64,
    /// Half extent along `ydir`.
    pub half_height: f64,
}

impl Plane {
    /// Create a rectangle.
    pub fn new(center: Point3, xdir: Vec3, ydir: Vec3, half_width: f64, half_height: f64) -> Self {
        Self {
            center,
            xdir,
            ydir,
            half_width,
            half_height,
        }
    }

    /// Local frame (assumes a validated instance).
    pub fn frame(&self) -> Frame {
        Frame::from_orthonormal(self.xdir, self.ydir)
    }
}

/// Scene primitive set: instances grouped by kind.
///
/// Insertion order within each kind is preserved and determines the slot of
/// every instance; there is no ordering across kinds beyond the fixed type
/// slots of [`PrimitiveKind::ALL`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenePrimitives {
    /// Spheres.
    pub spheres: Vec<Sphere>,
    /// Cylinders.
    pub cylinders: Vec<Cylinder>,
    /// Disks.
    pub circles: Vec<Circle>,
    /// Ellipses.
    pub ellipses: Vec<Ellipse>,
    /// Line segments.
    pub lines: Vec<Line>,
    /// Cones.
    pub cones: Vec<Cone>,
    /// Tori.
    pub tori: Vec<Torus>,
    /// Finite planes.
    pub planes: Vec<Plane>,
    /// Converted free-form patches.
    pub patches: Vec<BezierPatch>,
}

impl ScenePrimitives {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances of one kind.
    pub fn count(&self, kind: PrimitiveKind) -> usize {
        match kind {
            PrimitiveKind::Sphere => self.spheres.len(),
            PrimitiveKind::Cylinder => self.cylinders.len(),
            PrimitiveKind::Circle => self.circles.len(),
            PrimitiveKind::Ellipse => self.ellipses.len(),
            PrimitiveKind::Line => self.lines.len(),
            PrimitiveKind::Cone => self.cones.len(),
            PrimitiveKind::Torus => self.tori.len(),
            PrimitiveKind::Plane => self.planes.len(),
            PrimitiveKind::BezierPatch => self.patches.len(),
        }
    }

    /// Total number of instances.
    pub fn len(&self) -> usize {
        PrimitiveKind::ALL.iter().map(|&k| self.count(k)).sum()
    }

    /// Whether the set holds no instances at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop instances past `len` for one kind.
    pub fn truncate(&mut self, kind: PrimitiveKind, len: usize) {
        match kind {
            PrimitiveKind::Sphere => self.spheres.truncate(len),
            PrimitiveKind::Cylinder => self.cylinders.truncate(len),
            PrimitiveKind::Circle => self.circles.truncate(len),
            PrimitiveKind::Ellipse => self.ellipses.truncate(len),
            PrimitiveKind::Line => self.lines.truncate(len),
            PrimitiveKind::Cone => self.cones.truncate(len),
            PrimitiveKind::Torus => self.tori.truncate(len),
            PrimitiveKind::Plane => self.planes.truncate(len),
            PrimitiveKind::BezierPatch => self.patches.truncate(len),
        }
    }

    /// Bounding box of one instance.
    pub fn aabb_of(&self, kind: PrimitiveKind, slot: usize) -> Option<Aabb3> {
        match kind {
            PrimitiveKind::Sphere => self.spheres.get(slot).map(Bounded::aabb),
            PrimitiveKind::Cylinder => self.cylinders.get(slot).map(Bounded::aabb),
            PrimitiveKind::Circle => self.circles.get(slot).map(Bounded::aabb),
            PrimitiveKind::Ellipse => self.ellipses.get(slot).map(Bounded::aabb),
            PrimitiveKind::Line => self.lines.get(slot).map(Bounded::aabb),
            PrimitiveKind::Cone => self.cones.get(slot).map(Bounded::aabb),
            PrimitiveKind::Torus => self.tori.get(slot).map(Bounded::aabb),
            PrimitiveKind::Plane => self.planes.get(slot).map(Bounded::aabb),
            PrimitiveKind::BezierPatch => self.patches.get(slot).map(Bounded::aabb),
        }
    }
}
