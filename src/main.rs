mod cli;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use cgmath::{vec3, Deg, InnerSpace, Matrix4};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rayforge::film::{Color, Depthmap, Frame, Heatmap, ToBmp};
use rayforge::sampling::{cosine_sample_hemisphere, Onb, Rng};
use rayforge::scene;
use rayforge::{trace_rays, Blas, Instance, Ray, RayFlags, Tlas, UVec2, Vec3};

pub enum RenderKind {
    Shaded,
    Depthmap,
    Heatmap,
}

pub struct Config {
    pub input_file: Option<PathBuf>,
    pub output_file: PathBuf,
    pub image_width: u32,
    pub image_height: u32,
    pub iterations: u32,
    pub num_threads: Option<u32>,
    pub render_kind: RenderKind,
}

const T_MIN: f32 = 1e-3;
const TILE_HINT: u32 = 16;

/// Pinhole camera at the origin looking down -z, 45 degree vertical fov.
fn primary_ray(pixel: UVec2, resolution: UVec2) -> Ray {
    let half = (45.0f32.to_radians() * 0.5).tan();
    let aspect = resolution.x as f32 / resolution.y as f32;
    let px = (2.0 * ((pixel.x as f32 + 0.5) / resolution.x as f32) - 1.0) * half * aspect;
    let py = (1.0 - 2.0 * ((pixel.y as f32 + 0.5) / resolution.y as f32)) * half;
    Ray::new(vec3(0.0, 0.0, 0.0), vec3(px, py, -1.0).normalize())
}

fn sky(direction: Vec3) -> Vec3 {
    let t = 0.5 * (direction.y + 1.0);
    (1.0 - t) * vec3(1.0, 1.0, 1.0) + t * vec3(0.5, 0.7, 1.0)
}

/// Fixed sun plus a one-bounce ambient-occlusion term.
fn shade(ray: &Ray, tlas: &Tlas, rng: &mut Rng) -> Vec3 {
    match tlas.intersect(ray, T_MIN, f32::INFINITY, RayFlags::OPAQUE) {
        Some(hit) => {
            let normal = if hit.normal.dot(ray.direction) > 0.0 {
                -hit.normal
            } else {
                hit.normal
            };
            let onb = Onb::from_normal(normal);
            let bounce = onb.to_world(cosine_sample_hemisphere(rng.next_vec2()));
            let shadow = Ray::new(hit.position + normal * 1e-3, bounce);
            let open = tlas
                .intersect(
                    &shadow,
                    T_MIN,
                    f32::INFINITY,
                    RayFlags::TERMINATE_ON_FIRST_HIT | RayFlags::OPAQUE,
                )
                .is_none();
            let sun = vec3(0.4, 1.0, 0.2).normalize().dot(normal).max(0.0);
            let ambient = if open {
                sky(bounce) * 0.4
            } else {
                vec3(0.02, 0.02, 0.02)
            };
            vec3(0.8, 0.8, 0.8) * (sun * 0.6) + ambient
        }
        None => sky(ray.direction),
    }
}

fn render_shaded(tlas: &Tlas, cfg: &Config) -> bmp::Image {
    let resolution = UVec2::new(cfg.image_width, cfg.image_height);
    let mut frame = Frame::new(cfg.image_width, cfg.image_height, Color(0, 0, 0));
    let samples = cfg.iterations;
    trace_rays(
        resolution,
        TILE_HINT,
        0,
        |pixel, resolution, iteration, tlas| {
            let ray = primary_ray(pixel, resolution);
            let mut acc = vec3(0.0, 0.0, 0.0);
            for sample in 0..samples {
                let mut rng = Rng::for_pixel(pixel, resolution, iteration + sample);
                acc += shade(&ray, tlas, &mut rng);
            }
            let c = acc / samples as f32;
            frame.set(pixel.x, pixel.y, Color::from_unit(c.x, c.y, c.z));
        },
        tlas,
    );
    frame.to_bmp()
}

fn render_depthmap(tlas: &Tlas, cfg: &Config) -> bmp::Image {
    let resolution = UVec2::new(cfg.image_width, cfg.image_height);
    let frame = Frame::new(cfg.image_width, cfg.image_height, f32::INFINITY);
    trace_rays(
        resolution,
        TILE_HINT,
        0,
        |pixel, resolution, _, tlas| {
            let ray = primary_ray(pixel, resolution);
            if let Some(hit) = tlas.intersect(&ray, T_MIN, f32::INFINITY, RayFlags::OPAQUE) {
                frame.set(pixel.x, pixel.y, hit.t);
            }
        },
        tlas,
    );
    Depthmap(frame).to_bmp()
}

fn render_heatmap(tlas: &Tlas, cfg: &Config) -> bmp::Image {
    let resolution = UVec2::new(cfg.image_width, cfg.image_height);
    let frame = Frame::new(cfg.image_width, cfg.image_height, 0u32);
    trace_rays(
        resolution,
        TILE_HINT,
        0,
        |pixel, resolution, _, tlas| {
            let ray = primary_ray(pixel, resolution);
            let (_, steps) = tlas.intersect_counted(&ray, T_MIN, f32::INFINITY, RayFlags::OPAQUE);
            frame.set(pixel.x, pixel.y, steps);
        },
        tlas,
    );
    Heatmap(frame).to_bmp()
}

/// A tilted cube floating above a squashed-cube floor, reusing one BLAS.
fn demo_instances() -> Vec<Instance> {
    let mut cube = Instance::default();
    cube.set_transform(
        Matrix4::from_translation(vec3(0.0, 0.0, -6.0))
            * Matrix4::from_angle_y(Deg(30.0))
            * Matrix4::from_angle_x(Deg(-20.0)),
    );
    let mut floor = Instance::default();
    floor.set_transform(
        Matrix4::from_translation(vec3(0.0, -3.0, -6.0))
            * Matrix4::from_nonuniform_scale(12.0, 0.25, 12.0),
    );
    floor.set_custom_index(1);
    vec![cube, floor]
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cfg = cli::parse_matches(&cli::build_app().get_matches());
    if let Some(threads) = cfg.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .build_global()
            .context("configuring the worker pool")?;
    }

    let blases = [match &cfg.input_file {
        Some(path) => scene::load_obj(path)?,
        None => Blas::new(&scene::unit_cube()),
    }];
    let instances = match &cfg.input_file {
        Some(_) => vec![Instance::default()],
        None => demo_instances(),
    };
    let tlas = Tlas::new(&blases, instances);

    let start = Instant::now();
    let img = match cfg.render_kind {
        RenderKind::Shaded => render_shaded(&tlas, &cfg),
        RenderKind::Depthmap => render_depthmap(&tlas, &cfg),
        RenderKind::Heatmap => render_heatmap(&tlas, &cfg),
    };
    info!(
        elapsed = ?start.elapsed(),
        "rendered {}x{} to {}",
        cfg.image_width,
        cfg.image_height,
        cfg.output_file.display()
    );

    img.save(&cfg.output_file)
        .with_context(|| format!("writing {}", cfg.output_file.display()))?;
    Ok(())
}
