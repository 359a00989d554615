use bitflags::bitflags;
use cgmath::{vec3, InnerSpace};

use crate::math::Vec3;

/// Tolerance for the ray/triangle determinant and the minimum accepted `t`.
pub const EPSILON: f32 = 1e-8;

/// Marker for ids that have not been assigned, e.g. the instance id of a hit
/// reported straight from a BLAS.
pub const INVALID_ID: u32 = u32::MAX;

bitflags! {
    /// Per-ray traversal controls. Unknown bits are ignored.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RayFlags: u32 {
        const CULL_BACK_FACES = 1 << 0;
        const CULL_FRONT_FACES = 1 << 1;
        /// Accept any hit in range instead of searching for the nearest.
        const TERMINATE_ON_FIRST_HIT = 1 << 3;
        /// Declares that no any-hit filtering is wanted. All geometry here is
        /// opaque anyway, so the bit is informational.
        const OPAQUE = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Componentwise reciprocal of `direction`, set by [`Ray::new`]. Zero
    /// components become infinities, which the slab test tolerates.
    pub inv_direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Ray {
        Ray {
            origin,
            direction,
            inv_direction: vec3(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Hit {
    pub t: f32,
    /// Barycentric coordinates; the `v0` weight is `1 - u - v`.
    pub u: f32,
    pub v: f32,
    pub primitive_id: u32,
    /// Index of the instance that was hit; `INVALID_ID` when the hit comes
    /// from a BLAS queried directly.
    pub instance_id: u32,
    /// Flat geometric normal, in whatever space the hit was reported from.
    pub normal: Vec3,
    pub position: Vec3,
}

/// One triangle in intersection-ready form: `edge1`/`edge2` originate at
/// `v0`, `normal` is the flat geometric normal. Precomputed once at build
/// time so traversal never touches the source vertex layout.
#[derive(Clone, Copy, Debug)]
pub struct Tri {
    pub v0: Vec3,
    pub edge1: Vec3,
    pub edge2: Vec3,
    pub normal: Vec3,
}

impl Tri {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Tri {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        Tri {
            v0,
            edge1,
            edge2,
            normal: edge1.cross(edge2).normalize(),
        }
    }
}

/// Möller-Trumbore ray/triangle test. Returns `(t, u, v)` for hits with
/// `t > EPSILON`. The determinant sign drives the face-culling flags: with
/// counter-clockwise winding, a positive determinant is a front face.
pub fn intersect_tri(ray: &Ray, tri: &Tri, flags: RayFlags) -> Option<(f32, f32, f32)> {
    let h = ray.direction.cross(tri.edge2);
    let det = tri.edge1.dot(h);
    if flags.contains(RayFlags::CULL_BACK_FACES) && det < EPSILON {
        return None;
    }
    if flags.contains(RayFlags::CULL_FRONT_FACES) && det > -EPSILON {
        return None;
    }
    if det.abs() < EPSILON {
        // Parallel to the triangle plane.
        return None;
    }
    let f = 1.0 / det;
    let s = ray.origin - tri.v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(tri.edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = f * tri.edge2.dot(q);
    if t > EPSILON {
        Some((t, u, v))
    } else {
        None
    }
}
