//! Structural checks on built BLASes: primitive accounting, bounds nesting,
//! child adjacency and depth.

use cgmath::vec3;
use rayforge::{scene, Blas, Rng, Vec3};

fn random_soup(count: usize, seed: u32) -> Vec<Vec3> {
    let mut rng = Rng::new(seed);
    let mut coord = |scale: f32| (rng.next_f32() - 0.5) * scale;
    let mut positions = Vec::with_capacity(count * 3);
    for _ in 0..count {
        let center = vec3(coord(20.0), coord(20.0), coord(20.0));
        for _ in 0..3 {
            positions.push(center + vec3(coord(2.0), coord(2.0), coord(2.0)));
        }
    }
    positions
}

fn grid_mesh(n: u32) -> Vec<Vec3> {
    let mut positions = Vec::new();
    let at = |i: u32, j: u32| vec3(i as f32, ((i * 7 + j * 3) % 5) as f32 * 0.1, j as f32);
    for i in 0..n {
        for j in 0..n {
            positions.extend([at(i, j), at(i + 1, j), at(i + 1, j + 1)]);
            positions.extend([at(i, j), at(i + 1, j + 1), at(i, j + 1)]);
        }
    }
    positions
}

fn check_structure(blas: &Blas, tri_count: usize) {
    let nodes = blas.nodes();
    let prim_indices = blas.prim_indices();
    assert_eq!(prim_indices.len(), tri_count);
    assert_eq!(blas.tris().len(), tri_count);

    // Every triangle appears exactly once across all leaves.
    let mut seen = vec![false; tri_count];
    for &id in prim_indices {
        assert!(!seen[id as usize], "triangle {id} referenced twice");
        seen[id as usize] = true;
    }
    assert!(seen.iter().all(|&s| s), "a triangle is missing from the leaves");

    let mut leaf_prims = 0usize;
    let mut max_depth = 0usize;
    let mut visited = vec![false; nodes.len()];
    let mut stack = vec![(0usize, 1usize)];
    while let Some((index, depth)) = stack.pop() {
        assert!(!visited[index], "node {index} reachable twice");
        visited[index] = true;
        max_depth = max_depth.max(depth);
        let node = &nodes[index];
        assert!(
            node.bounds_min.x <= node.bounds_max.x
                && node.bounds_min.y <= node.bounds_max.y
                && node.bounds_min.z <= node.bounds_max.z
        );
        if node.is_leaf() {
            assert_eq!(node.leaf_type(), 0, "only triangle leaves exist");
            let first = node.first_child_or_prim as usize;
            let count = node.prim_count() as usize;
            assert!(count >= 1);
            leaf_prims += count;
            for &id in &prim_indices[first..first + count] {
                let tri = blas.tris()[id as usize];
                for corner in [tri.v0, tri.v0 + tri.edge1, tri.v0 + tri.edge2] {
                    for axis in 0..3 {
                        assert!(corner[axis] >= node.bounds_min[axis] - 1e-4);
                        assert!(corner[axis] <= node.bounds_max[axis] + 1e-4);
                    }
                }
            }
        } else {
            // Children are adjacent by construction; both must nest inside
            // the parent bounds.
            let left = node.first_child_or_prim as usize;
            let right = left + 1;
            assert!(right < nodes.len(), "child index out of range");
            for child in [left, right] {
                let c = &nodes[child];
                for axis in 0..3 {
                    assert!(c.bounds_min[axis] >= node.bounds_min[axis] - 1e-4);
                    assert!(c.bounds_max[axis] <= node.bounds_max[axis] + 1e-4);
                }
                stack.push((child, depth + 1));
            }
        }
    }
    assert!(visited.iter().all(|&v| v), "unreachable node in the array");
    assert_eq!(leaf_prims, tri_count, "leaf counts do not sum to the input");

    let log2 = (tri_count.max(2) as f32).log2().ceil() as usize;
    assert!(
        max_depth <= 2 * log2 + 8,
        "depth {max_depth} is excessive for {tri_count} triangles"
    );
}

#[test]
fn single_triangle_is_one_leaf() {
    let blas = Blas::new(&[
        vec3(-1.0, 0.0, 3.0),
        vec3(1.0, 0.0, 3.0),
        vec3(0.0, 1.0, 3.0),
    ]);
    assert_eq!(blas.nodes().len(), 1);
    assert!(blas.nodes()[0].is_leaf());
    assert_eq!(blas.nodes()[0].prim_count(), 1);
    let bounds = blas.bounds();
    assert_eq!(bounds.min, vec3(-1.0, 0.0, 3.0));
    assert_eq!(bounds.max, vec3(1.0, 1.0, 3.0));
    check_structure(&blas, 1);
}

#[test]
fn cube_structure() {
    let cube = scene::unit_cube();
    let blas = Blas::new(&cube);
    check_structure(&blas, 12);
}

#[test]
fn random_soup_structure() {
    for (count, seed) in [(33, 5), (250, 6), (1000, 7)] {
        let mesh = random_soup(count, seed);
        let blas = Blas::new(&mesh);
        check_structure(&blas, count);
    }
}

#[test]
fn grid_structure() {
    let mesh = grid_mesh(16);
    let blas = Blas::new(&mesh);
    check_structure(&blas, 512);
}

#[test]
fn indexed_and_flat_builds_agree() {
    // The same quad, once as a flat stream and once indexed.
    let corners = [
        vec3(0.0, 0.0, 0.0),
        vec3(1.0, 0.0, 0.0),
        vec3(1.0, 1.0, 0.0),
        vec3(0.0, 1.0, 0.0),
    ];
    let indices = [0u32, 1, 2, 0, 2, 3];
    let flat: Vec<Vec3> = indices.iter().map(|&i| corners[i as usize]).collect();

    let a = Blas::new(&flat);
    let b = Blas::with_indices(&corners, &indices);
    assert_eq!(a.bounds(), b.bounds());
    assert_eq!(a.tris().len(), b.tris().len());
    check_structure(&b, 2);
}

#[test]
fn raw_stride_build_skips_extra_floats() {
    // Stride 5: position plus two floats of padding per vertex.
    let mut data = Vec::new();
    for v in [
        vec3(-1.0, 0.0, 3.0),
        vec3(1.0, 0.0, 3.0),
        vec3(0.0, 1.0, 3.0),
    ] {
        data.extend([v.x, v.y, v.z, 42.0, 42.0]);
    }
    let blas = Blas::from_raw(&data, 5, None);
    assert_eq!(blas.bounds().min, vec3(-1.0, 0.0, 3.0));
    assert_eq!(blas.bounds().max, vec3(1.0, 1.0, 3.0));
}

#[test]
#[should_panic(expected = "at least one triangle")]
fn empty_geometry_is_rejected() {
    let _ = Blas::new(&[]);
}

#[test]
#[should_panic(expected = "multiple of 3")]
fn ragged_indices_are_rejected() {
    let corners = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)];
    let _ = Blas::with_indices(&corners, &[0, 1, 2, 0]);
}

#[test]
#[should_panic(expected = "out of range")]
fn out_of_range_index_is_rejected() {
    let corners = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)];
    let _ = Blas::with_indices(&corners, &[0, 1, 3]);
}
