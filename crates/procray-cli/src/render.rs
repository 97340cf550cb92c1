//! CPU renderer: one primary ray per pixel, shaded with a single light.

use anyhow::{anyhow, Result};
use image::RgbImage;
use rayon::prelude::*;

use procray_math::{Point3, Vec3};
use procray_primitives::PrimitiveKind;
use procray_raytrace::{Ray, RayHit, RayInterval, SceneSnapshot};

/// Nearest accepted hit distance; keeps primary rays off the lens.
const T_MIN: f64 = 1e-3;
/// Farthest accepted hit distance.
const T_MAX: f64 = 1e6;

/// Pinhole camera.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Camera position.
    pub position: Point3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    half_height: f64,
    half_width: f64,
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
}

impl Camera {
    /// Camera at `position` looking at `target`, with vertical field of view
    /// `fov` in radians.
    pub fn new(
        position: Point3,
        target: Point3,
        up: Vec3,
        fov: f64,
        width: u32,
        height: u32,
    ) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(&up).normalize();
        let up = right.cross(&forward);
        let half_height = (fov * 0.5).tan();
        let half_width = half_height * width as f64 / height.max(1) as f64;
        Self {
            position,
            forward,
            right,
            up,
            half_height,
            half_width,
            width,
            height,
        }
    }

    /// Ray through the center of pixel `(x, y)`, `y` growing downward.
    pub fn primary_ray(&self, x: u32, y: u32) -> Ray {
        let sx = ((x as f64 + 0.5) / self.width as f64) * 2.0 - 1.0;
        let sy = 1.0 - ((y as f64 + 0.5) / self.height as f64) * 2.0;
        let dir = self.forward
            + self.right * (sx * self.half_width)
            + self.up * (sy * self.half_height);
        Ray::new(self.position, dir)
    }
}

/// Render a snapshot, one pixel per rayon task.
pub fn render(snapshot: &SceneSnapshot, camera: &Camera) -> Result<RgbImage> {
    let (width, height) = (camera.width, camera.height);
    let row_len = width as usize * 3;
    let mut pixels = vec![0u8; row_len * height as usize];

    pixels.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for (x, px) in row.chunks_exact_mut(3).enumerate() {
            let ray = camera.primary_ray(x as u32, y as u32);
            let color = trace(snapshot, &ray);
            px.copy_from_slice(&to_srgb8(color));
        }
    });

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height}"))
}

fn trace(snapshot: &SceneSnapshot, ray: &Ray) -> Vec3 {
    match snapshot.trace_closest(ray, &RayInterval::new(T_MIN, T_MAX)) {
        Some(hit) => shade(&hit, ray),
        None => background(ray),
    }
}

fn background(ray: &Ray) -> Vec3 {
    let t = 0.5 * (ray.direction.z + 1.0);
    Vec3::new(0.92, 0.94, 0.97) * (1.0 - t) + Vec3::new(0.45, 0.6, 0.85) * t
}

fn base_color(kind: PrimitiveKind) -> Vec3 {
    match kind {
        PrimitiveKind::Sphere => Vec3::new(0.85, 0.3, 0.25),
        PrimitiveKind::Cylinder => Vec3::new(0.25, 0.55, 0.85),
        PrimitiveKind::Circle => Vec3::new(0.95, 0.75, 0.2),
        PrimitiveKind::Ellipse => Vec3::new(0.6, 0.35, 0.8),
        PrimitiveKind::Line => Vec3::new(0.15, 0.15, 0.15),
        PrimitiveKind::Cone => Vec3::new(0.3, 0.75, 0.4),
        PrimitiveKind::Torus => Vec3::new(0.9, 0.5, 0.15),
        PrimitiveKind::Plane => Vec3::new(0.78, 0.78, 0.75),
        PrimitiveKind::BezierPatch => Vec3::new(0.2, 0.7, 0.75),
    }
}

/// Lambert diffuse plus a Blinn-Phong highlight from one directional light.
fn shade(hit: &RayHit, ray: &Ray) -> Vec3 {
    let light = Vec3::new(-0.4, -0.6, 0.7).normalize();
    let view = -ray.direction.into_inner();

    // Two-sided: cut-open surfaces show their inner face.
    let mut normal = hit.normal.into_inner();
    if normal.dot(&view) < 0.0 {
        normal = -normal;
    }

    let diffuse = normal.dot(&light).max(0.0);
    let half = (light + view).normalize();
    let specular = if diffuse > 0.0 { normal.dot(&half).max(0.0).powf(48.0) } else { 0.0 };

    let base = base_color(hit.kind);
    base * (0.12 + 0.88 * diffuse) + Vec3::repeat(0.35 * specular)
}

fn to_srgb8(c: Vec3) -> [u8; 3] {
    let encode = |v: f64| (v.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0 + 0.5) as u8;
    [encode(c.x), encode(c.y), encode(c.z)]
}
