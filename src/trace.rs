use std::sync::atomic::{AtomicI64, Ordering};

use crate::math::UVec2;
use crate::tlas::Tlas;

/// Sweeps `shader` over every pixel of `resolution` exactly once, on every
/// thread of the current rayon pool.
///
/// Work is handed out one pixel at a time off a single shared counter. Ray
/// cost varies by orders of magnitude between pixels (sky rays vs. deep
/// bounces), so anything coarser leaves threads idle behind an expensive
/// region. `tile_size` is accepted as a batching hint and ignored here.
///
/// Visitation order is unspecified and the callback must not rely on it.
/// The callback runs on arbitrary worker threads; its only permitted effect
/// on shared state is writing its own pixel's output cell. `iteration` is
/// forwarded untouched, typically into per-pixel RNG seeding.
///
/// Returns only after every worker has drained, so callers may read the
/// framebuffer immediately afterwards.
pub fn trace_rays<F>(resolution: UVec2, _tile_size: u32, iteration: u32, shader: F, tlas: &Tlas)
where
    F: Fn(UVec2, UVec2, u32, &Tlas) + Sync,
{
    let width = i64::from(resolution.x);
    let total = width * i64::from(resolution.y);
    let remaining = AtomicI64::new(total);

    rayon::broadcast(|_| loop {
        let left = remaining.fetch_sub(1, Ordering::Relaxed);
        if left <= 0 {
            break;
        }
        let index = left - 1;
        let pixel = UVec2::new((index % width) as u32, (index / width) as u32);
        shader(pixel, resolution, iteration, tlas);
    });
}
