//! Two-level bounding-volume-hierarchy ray tracing core.
//!
//! [`Blas`] builds a binned-SAH BVH over one triangle geometry and answers
//! ray queries in local space. [`Tlas`] places BLAS instances in the world
//! with affine transforms and resolves the nearest world-space hit.
//! [`trace_rays`] sweeps a pixel grid over a shader callback, one pixel at a
//! time, on every available hardware thread.
//!
//! Acceleration structures are immutable once built and safe to query from
//! any number of threads concurrently.

pub mod aabb;
pub mod blas;
pub mod bvh;
pub mod film;
pub mod geom;
pub mod math;
pub mod sampling;
pub mod scene;
pub mod tlas;
pub mod trace;

pub use aabb::Aabb;
pub use blas::Blas;
pub use geom::{Hit, Ray, RayFlags, Tri};
pub use math::{Mat3x4, UVec2, Vec2, Vec3, Vec4};
pub use sampling::{Onb, Rng};
pub use tlas::{Instance, Tlas};
pub use trace::trace_rays;
