//! Built-in demonstration scenes.

use std::f64::consts::PI;

use clap::ValueEnum;
use procray_math::{Point3, Vec3};
use procray_primitives::{
    Circle, Cone, Cylinder, Ellipse, HermitePatch, Line, ScenePrimitives, Sphere, Torus,
};
use procray_raytrace::SceneOptions;

use crate::render::Camera;

/// Scene selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneName {
    /// One of every primitive kind
    Showcase,
    /// A grid of spheres on a floor
    Spheres,
    /// A rippled sheet of Hermite patches
    Patch,
    /// Full and partial tori
    Torus,
}

impl std::fmt::Display for SceneName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SceneName::Showcase => "showcase",
            SceneName::Spheres => "spheres",
            SceneName::Patch => "patch",
            SceneName::Torus => "torus",
        };
        f.write_str(name)
    }
}

/// Build the primitives of a scene.
pub fn build(name: SceneName, options: &SceneOptions) -> ScenePrimitives {
    let mut scene = ScenePrimitives::new();
    floor(&mut scene, options);
    match name {
        SceneName::Showcase => showcase(&mut scene, options),
        SceneName::Spheres => spheres(&mut scene),
        SceneName::Patch => ripples(&mut scene, options),
        SceneName::Torus => tori(&mut scene),
    }
    scene
}

/// Camera framing a scene.
pub fn camera(name: SceneName, width: u32, height: u32) -> Camera {
    let (position, target) = match name {
        SceneName::Showcase => (Point3::new(0.0, -9.0, 5.0), Point3::new(0.0, 0.0, 0.6)),
        SceneName::Spheres => (Point3::new(0.0, -11.0, 6.0), Point3::new(0.0, 0.0, 0.5)),
        SceneName::Patch => (Point3::new(-1.0, -6.0, 4.0), Point3::new(0.0, 0.0, 0.3)),
        SceneName::Torus => (Point3::new(0.0, -7.0, 4.5), Point3::new(0.0, 0.0, 0.8)),
    };
    Camera::new(position, target, Vec3::z(), 45f64.to_radians(), width, height)
}

fn floor(scene: &mut ScenePrimitives, options: &SceneOptions) {
    let mut plane = options.plane(Point3::origin(), Vec3::x(), Vec3::y());
    plane.half_width *= 20.0;
    plane.half_height *= 20.0;
    scene.planes.push(plane);
}

fn showcase(scene: &mut ScenePrimitives, options: &SceneOptions) {
    let (x, y) = (Vec3::x(), Vec3::y());
    scene.spheres.push(Sphere::new(Point3::new(-3.0, 1.0, 0.8), 0.8));
    scene
        .cylinders
        .push(Cylinder::new(Point3::new(-1.0, 1.0, 0.75), x, y, 0.6, 1.5).with_sweep(270.0));
    scene.cones.push(Cone::new(Point3::new(1.0, 1.0, 0.75), x, y, 0.6, 1.5));
    scene
        .tori
        .push(Torus::new(Point3::new(3.0, 1.0, 0.9), x, Vec3::new(0.0, 0.3, 1.0), 0.6, 0.2));
    scene.circles.push(Circle::new(Point3::new(-2.0, -1.5, 0.6), x, Vec3::new(0.0, 0.5, 1.0), 0.5));
    scene
        .ellipses
        .push(Ellipse::new(Point3::new(0.0, -1.5, 0.6), x, Vec3::new(0.0, 0.5, 1.0), 0.8, 0.4));
    for i in 0..5 {
        let a = i as f64 * 0.25;
        scene.lines.push(options.line(
            Point3::new(1.5 + a, -2.0, 0.05),
            Point3::new(1.5 + a, -1.0, 1.2 - a * 0.5),
        ));
    }
    scene.lines.push(Line::new(Point3::new(1.4, -2.2, 0.05), Point3::new(2.7, -2.2, 0.05), 0.04));
    scene.patches.push(options.patch(&HermitePatch::new(
        [
            Point3::new(-0.8, 2.5, 0.2),
            Point3::new(0.8, 2.5, 0.2),
            Point3::new(-0.8, 3.5, 1.2),
            Point3::new(0.8, 3.5, 1.2),
        ],
        [
            Vec3::new(1.6, 0.0, 1.5),
            Vec3::new(1.6, 0.0, -1.5),
            Vec3::new(1.6, 0.0, 1.5),
            Vec3::new(1.6, 0.0, -1.5),
        ],
        [Vec3::new(0.0, 1.0, 1.0); 4],
    )));
}

fn spheres(scene: &mut ScenePrimitives) {
    for i in 0..7 {
        for j in 0..5 {
            let r = 0.25 + 0.05 * ((i + j) % 4) as f64;
            let center = Point3::new(i as f64 * 1.2 - 3.6, j as f64 * 1.2 - 2.4, r);
            scene.spheres.push(Sphere::new(center, r));
        }
    }
}

fn ripples(scene: &mut ScenePrimitives, options: &SceneOptions) {
    const N: usize = 4;
    let cell = 1.0;
    let height = |x: f64, y: f64| 0.35 * (1.0 + (x * PI).sin() * (y * PI).cos());
    let slope_x = |x: f64, y: f64| 0.35 * PI * (x * PI).cos() * (y * PI).cos();
    let slope_y = |x: f64, y: f64| -0.35 * PI * (x * PI).sin() * (y * PI).sin();

    let origin = -(N as f64) * cell * 0.5;
    for i in 0..N {
        for j in 0..N {
            let corners_xy = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
                .map(|(a, b)| (origin + (i as f64 + a) * cell, origin + (j as f64 + b) * cell));
            let corners = corners_xy.map(|(x, y)| Point3::new(x, y, height(x, y)));
            let tangents_u = corners_xy.map(|(x, y)| Vec3::new(cell, 0.0, cell * slope_x(x, y)));
            let tangents_v = corners_xy.map(|(x, y)| Vec3::new(0.0, cell, cell * slope_y(x, y)));
            scene
                .patches
                .push(options.patch(&HermitePatch::new(corners, tangents_u, tangents_v)));
        }
    }
}

fn tori(scene: &mut ScenePrimitives) {
    let (x, y) = (Vec3::x(), Vec3::y());
    scene.tori.push(Torus::new(Point3::new(-2.2, 0.0, 0.4), x, y, 1.0, 0.4));
    scene
        .tori
        .push(Torus::new(Point3::new(0.0, 0.5, 1.3), x, Vec3::z(), 0.9, 0.3).with_sweep(180.0));
    scene
        .tori
        .push(Torus::new(Point3::new(2.2, 0.0, 0.35), y, -x, 0.8, 0.35).with_sweep(270.0));
    scene.spheres.push(Sphere::new(Point3::new(-2.2, 0.0, 0.6), 0.45));
}

#[cfg(test)]
mod tests {
    use super::*;
    use procray_raytrace::RenderContext;

    #[test]
    fn test_builtin_scenes_pack_cleanly() {
        let options = SceneOptions::default();
        for name in SceneName::value_variants() {
            let mut ctx = RenderContext::new(options.clone());
            ctx.set_scene(build(*name, &options));
            let snapshot = ctx.snapshot();
            assert!(!snapshot.is_empty(), "{name}");
            assert_eq!(snapshot.report().malformed(), 0, "{name}");
            assert!(!snapshot.accelerator().is_linear(), "{name}");
        }
    }

    #[test]
    fn test_ripple_patches_meet_at_edges() {
        let mut scene = ScenePrimitives::new();
        ripples(&mut scene, &SceneOptions::default());
        let a = scene.patches[0].sample(1.0, 0.5).point;
        let b = scene.patches[4].sample(0.0, 0.5).point;
        assert!((a - b).norm() < 1e-9);
    }
}
