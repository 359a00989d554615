//! Demo-scene helpers: OBJ loading and a procedural cube, both feeding
//! straight into BLAS construction. Nothing here is needed for traversal;
//! the renderer binary is the only consumer.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use cgmath::vec3;
use tracing::info;

use crate::aabb::Aabb;
use crate::blas::Blas;
use crate::math::Vec3;

/// Loads an OBJ position stream into a BLAS, recentred so a camera at the
/// origin looking down -z probably sees it.
pub fn load_obj(path: &Path) -> anyhow::Result<Blas> {
    let start = Instant::now();
    let read = BufReader::new(
        File::open(path).with_context(|| format!("opening {}", path.display()))?,
    );
    let model: obj::Obj<obj::Position, u32> =
        obj::load_obj(read).with_context(|| format!("parsing {}", path.display()))?;
    let mut positions: Vec<Vec3> = model
        .vertices
        .iter()
        .map(|v| Vec3::from(v.position))
        .collect();
    normalize(&mut positions);
    let blas = Blas::with_indices(&positions, &model.indices);
    info!(
        tris = model.indices.len() / 3,
        elapsed = ?start.elapsed(),
        "loaded {}",
        path.display()
    );
    Ok(blas)
}

/// Heuristically moves the model so that it is probably within view of a
/// camera at the origin looking down -z.
fn normalize(positions: &mut [Vec3]) {
    let bounds = Aabb::from_points(positions);
    let center = (bounds.min + bounds.max) / 2.0;
    let displace = center + vec3(0.0, 0.0, (bounds.min.z - bounds.max.z).abs());
    for p in positions.iter_mut() {
        *p -= displace;
    }
}

/// A 36-vertex cube with half extent 1 around the origin, wound
/// counter-clockwise so the normals face outward. Non-indexed.
pub fn unit_cube() -> Vec<Vec3> {
    vec![
        // Front face (+z)
        vec3(-1.0, -1.0, 1.0),
        vec3(1.0, -1.0, 1.0),
        vec3(1.0, 1.0, 1.0),
        vec3(-1.0, -1.0, 1.0),
        vec3(1.0, 1.0, 1.0),
        vec3(-1.0, 1.0, 1.0),
        // Back face (-z)
        vec3(1.0, -1.0, -1.0),
        vec3(-1.0, -1.0, -1.0),
        vec3(-1.0, 1.0, -1.0),
        vec3(1.0, -1.0, -1.0),
        vec3(-1.0, 1.0, -1.0),
        vec3(1.0, 1.0, -1.0),
        // Left face
        vec3(-1.0, -1.0, -1.0),
        vec3(-1.0, -1.0, 1.0),
        vec3(-1.0, 1.0, 1.0),
        vec3(-1.0, -1.0, -1.0),
        vec3(-1.0, 1.0, 1.0),
        vec3(-1.0, 1.0, -1.0),
        // Right face
        vec3(1.0, -1.0, 1.0),
        vec3(1.0, -1.0, -1.0),
        vec3(1.0, 1.0, -1.0),
        vec3(1.0, -1.0, 1.0),
        vec3(1.0, 1.0, -1.0),
        vec3(1.0, 1.0, 1.0),
        // Top face
        vec3(-1.0, 1.0, 1.0),
        vec3(1.0, 1.0, 1.0),
        vec3(1.0, 1.0, -1.0),
        vec3(-1.0, 1.0, 1.0),
        vec3(1.0, 1.0, -1.0),
        vec3(-1.0, 1.0, -1.0),
        // Bottom face
        vec3(-1.0, -1.0, -1.0),
        vec3(1.0, -1.0, -1.0),
        vec3(1.0, -1.0, 1.0),
        vec3(-1.0, -1.0, -1.0),
        vec3(1.0, -1.0, 1.0),
        vec3(-1.0, -1.0, 1.0),
    ]
}
