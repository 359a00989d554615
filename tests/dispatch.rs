//! Tile dispatcher laws: exact coverage, determinism across thread counts,
//! and iteration forwarding.

use std::sync::atomic::{AtomicU32, Ordering};

use cgmath::vec3;
use rayforge::film::Frame;
use rayforge::{trace_rays, Blas, Instance, Tlas, UVec2};

fn trivial_blas() -> Blas {
    Blas::new(&[
        vec3(-1.0, 0.0, 3.0),
        vec3(1.0, 0.0, 3.0),
        vec3(0.0, 1.0, 3.0),
    ])
}

#[test]
fn every_pixel_is_visited_exactly_once() {
    let blases = [trivial_blas()];
    let tlas = Tlas::new(&blases, vec![Instance::default()]);
    // Deliberately not a power of two, with a non-trivial tile hint.
    let resolution = UVec2::new(33, 17);
    let counters: Vec<AtomicU32> = (0..33 * 17).map(|_| AtomicU32::new(0)).collect();
    trace_rays(
        resolution,
        8,
        0,
        |pixel, resolution, _, _| {
            counters[(pixel.y * resolution.x + pixel.x) as usize].fetch_add(1, Ordering::Relaxed);
        },
        &tlas,
    );
    for (i, counter) in counters.iter().enumerate() {
        assert_eq!(counter.load(Ordering::Relaxed), 1, "pixel {i} visited wrongly");
    }
}

fn render_row_major_ids(resolution: UVec2, tlas: &Tlas) -> Vec<u32> {
    let mut frame = Frame::new(resolution.x, resolution.y, u32::MAX);
    trace_rays(
        resolution,
        0,
        0,
        |pixel, resolution, _, _| {
            frame.set(pixel.x, pixel.y, pixel.x + pixel.y * resolution.x);
        },
        tlas,
    );
    let mut out = Vec::with_capacity((resolution.x * resolution.y) as usize);
    for y in 0..resolution.y {
        for x in 0..resolution.x {
            out.push(frame.get(x, y));
        }
    }
    out
}

#[test]
fn framebuffer_is_identical_across_thread_counts() {
    let blases = [trivial_blas()];
    let tlas = Tlas::new(&blases, vec![Instance::default()]);
    let resolution = UVec2::new(16, 16);

    let parallel = render_row_major_ids(resolution, &tlas);
    // The expected payload is 0..256 in row-major order.
    let expected: Vec<u32> = (0..256).collect();
    assert_eq!(parallel, expected);

    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| render_row_major_ids(resolution, &tlas));
    assert_eq!(single, parallel);
}

#[test]
fn iteration_is_forwarded_untouched() {
    let blases = [trivial_blas()];
    let tlas = Tlas::new(&blases, vec![Instance::default()]);
    let resolution = UVec2::new(5, 4);
    let mut frame = Frame::new(5, 4, 0u32);
    trace_rays(
        resolution,
        1,
        7,
        |pixel, _, iteration, _| {
            frame.set(pixel.x, pixel.y, iteration);
        },
        &tlas,
    );
    for y in 0..4 {
        for x in 0..5 {
            assert_eq!(frame.get(x, y), 7);
        }
    }
}

#[test]
fn empty_resolution_is_a_no_op() {
    let blases = [trivial_blas()];
    let tlas = Tlas::new(&blases, vec![Instance::default()]);
    let visited = AtomicU32::new(0);
    trace_rays(
        UVec2::new(0, 8),
        4,
        0,
        |_, _, _, _| {
            visited.fetch_add(1, Ordering::Relaxed);
        },
        &tlas,
    );
    assert_eq!(visited.load(Ordering::Relaxed), 0);
}
