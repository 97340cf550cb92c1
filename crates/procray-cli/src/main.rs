//! procray CLI - renders built-in analytic scenes to PNG.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

use procray_primitives::PrimitiveKind;
use procray_raytrace::{Accelerator, RenderContext, SceneOptions, SceneSnapshot};

mod render;
mod scenes;

use scenes::SceneName;

#[derive(Parser)]
#[command(name = "procray")]
#[command(about = "Ray cast analytic primitives without tessellation", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a built-in scene to a PNG file
    Render {
        /// Scene to render
        #[arg(short, long, value_enum, default_value_t = SceneName::Showcase)]
        scene: SceneName,
        /// Image width in pixels
        #[arg(long, default_value_t = 800)]
        width: u32,
        /// Image height in pixels
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// Scene options file (TOML)
        #[arg(long)]
        options: Option<PathBuf>,
        /// Output PNG path
        #[arg(short, long, default_value = "out.png")]
        output: PathBuf,
    },
    /// Print the packed layout and pack report of a built-in scene
    Info {
        /// Scene to inspect
        #[arg(short, long, value_enum, default_value_t = SceneName::Showcase)]
        scene: SceneName,
        /// Scene options file (TOML)
        #[arg(long)]
        options: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Render {
            scene,
            width,
            height,
            options,
            output,
        } => render_scene(scene, width, height, options.as_deref(), &output),
        Commands::Info { scene, options } => show_info(scene, options.as_deref()),
    }
}

fn load_options(path: Option<&Path>) -> Result<SceneOptions> {
    match path {
        Some(path) => SceneOptions::from_toml_file(path)
            .with_context(|| format!("loading options from {}", path.display())),
        None => Ok(SceneOptions::default()),
    }
}

fn build_context(name: SceneName, options: SceneOptions) -> RenderContext {
    let scene = scenes::build(name, &options);
    let mut ctx = RenderContext::new(options);
    ctx.set_scene(scene);
    ctx
}

fn render_scene(
    name: SceneName,
    width: u32,
    height: u32,
    options: Option<&Path>,
    output: &Path,
) -> Result<()> {
    anyhow::ensure!(width > 0 && height > 0, "image size must be non-zero, got {width}x{height}");

    let options = load_options(options)?;
    let ctx = build_context(name, options);
    let snapshot = ctx.snapshot();
    log::info!("scene {name}: {} primitives", snapshot.len());

    let camera = scenes::camera(name, width, height);
    let now = Instant::now();
    let image = render::render(&snapshot, &camera)?;
    log::info!("rendered {width}x{height} in {} ms", now.elapsed().as_millis());

    image
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Rendered {} to {}", name, output.display());
    Ok(())
}

fn show_info(name: SceneName, options: Option<&Path>) -> Result<()> {
    let options = load_options(options)?;
    let ctx = build_context(name, options);
    let snapshot = ctx.snapshot();
    print_info(name, &snapshot);
    Ok(())
}

fn print_info(name: SceneName, snapshot: &SceneSnapshot) {
    let report = snapshot.report();
    println!("procray scene: {name}");
    println!("  Primitives: {}", snapshot.len());
    println!("  Malformed (dropped): {}", report.malformed());
    println!("  Truncated: {}", report.truncated());
    match snapshot.accelerator() {
        Accelerator::Bvh(bvh) => println!("  Accelerator: BVH, {} nodes", bvh.node_count()),
        Accelerator::Linear { count } => println!("  Accelerator: linear scan over {count}"),
    }
    println!("  Packed parameters: {} floats", snapshot.packed().packed.len());

    println!("\nLayout:");
    println!(
        "  {:<12} {:>3} {:>6} {:>6} {:>8} {:>6} {:>9} {:>9} {:>9}",
        "kind", "id", "base", "count", "offset", "stride", "submitted", "malformed", "truncated"
    );
    for slot in snapshot.layout().slots() {
        let k = report.kind(slot.kind);
        println!(
            "  {:<12} {:>3} {:>6} {:>6} {:>8} {:>6} {:>9} {:>9} {:>9}",
            slot.kind.name(),
            slot.kind.id(),
            slot.base_offset,
            slot.count,
            slot.param_offset,
            slot.stride,
            k.submitted,
            k.malformed,
            k.truncated
        );
    }

    let patches = snapshot.layout().slot(PrimitiveKind::BezierPatch).count;
    if patches > 0 {
        let p = &snapshot.primitives().patches;
        let deepest = p.iter().map(|patch| patch.max_depth).max().unwrap_or(0);
        println!("\nPatches: {patches}, deepest subdivision limit {deepest}");
    }
}
