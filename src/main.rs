use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use image::{GrayImage, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod raytracing;
use raytracing::math::Vec3;
use raytracing::output::{normalize_distances, to_display, write_color_ppm, write_gray_ppm};
use raytracing::parser::load_scene;
use raytracing::render::{render_color, render_depth, DEFAULT_BOUNCES};
use raytracing::scene::AccelMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Accel {
    /// plain list of shapes, O(n) per ray
    Linear,
    /// linear scan behind one aggregate bounding box
    Massbox,
    /// adaptive octree over the scene bounds
    Octree,
}

impl From<Accel> for AccelMode {
    fn from(value: Accel) -> Self {
        match value {
            Accel::Linear => AccelMode::Linear,
            Accel::Massbox => AccelMode::MassBox,
            Accel::Octree => AccelMode::Octree,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input path to the scene file
    scene: String,
    /// where the rendered image is saved; a .ppm extension selects the
    /// built-in ASCII writer, anything else goes through the image crate
    #[arg(short, long, default_value = "output.png")]
    output: String,
    /// override the scene's per-pixel sample count
    #[arg(short, long)]
    samples: Option<u32>,
    /// maximum recursion depth of the shading engine
    #[arg(short, long, default_value_t = DEFAULT_BOUNCES)]
    bounces: u32,
    /// acceleration structure resolving ray intersections
    #[arg(long, value_enum, default_value = "massbox")]
    accel: Accel,
    /// render a normalized depth map instead of the shaded image
    #[arg(long)]
    depth: bool,
    /// apply gamma correction to the final image
    #[arg(long)]
    gamma: bool,
    /// seed for the material assignment, random when omitted
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Vec3> for Rgb<u8> {
    fn from(value: Vec3) -> Self {
        Rgb([
            to_display(value.x),
            to_display(value.y),
            to_display(value.z),
        ])
    }
}

fn gamma_correction(value: f32) -> f32 {
    if value > 0.0 {
        value.powf(1.0 / 2.2)
    } else {
        0.0
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut scene = load_scene(&args.scene, &mut rng);
    if let Some(samples) = args.samples {
        scene.samples = samples;
    }
    scene.rebuild_container(args.accel.into());

    let start = Instant::now();
    if args.depth {
        let mut distances = render_depth(&scene);
        normalize_distances(&mut distances);
        if args.output.ends_with(".ppm") {
            write_gray_ppm(&args.output, scene.width(), scene.height(), &distances)?;
        } else {
            let data: Vec<u8> = distances.iter().map(|&d| to_display(d)).collect();
            let buffer = GrayImage::from_raw(scene.width(), scene.height(), data)
                .context("depth buffer does not match the scene dimensions")?;
            buffer.save(&args.output)?;
        }
    } else {
        let mut pixels = render_color(&scene, args.bounces);
        if args.gamma {
            for pixel in pixels.iter_mut() {
                pixel.x = gamma_correction(pixel.x);
                pixel.y = gamma_correction(pixel.y);
                pixel.z = gamma_correction(pixel.z);
            }
        }
        if args.output.ends_with(".ppm") {
            write_color_ppm(&args.output, scene.width(), scene.height(), &pixels)?;
        } else {
            let width = scene.width();
            let mut buffer = RgbImage::new(width, scene.height());
            for (x, y, pixel) in buffer.enumerate_pixels_mut() {
                *pixel = pixels[(x + width * y) as usize].into();
            }
            buffer.save(&args.output)?;
        }
    }
    log::info!("rendered {} in {:?}", args.output, start.elapsed());
    Ok(())
}
