use arrayvec::ArrayVec;
use cast::u32;
use cgmath::vec3;

use crate::aabb::Aabb;
use crate::bvh::{self, Node, PrimRef, LEAF_TYPE_TRIANGLES};
use crate::geom::{intersect_tri, Hit, Ray, RayFlags, Tri, INVALID_ID};
use crate::math::Vec3;

/// Traversal stack capacity. A binned-SAH tree with leaves of up to four
/// triangles stays far below this even for meshes with tens of millions of
/// triangles; overflowing it means the input was pathological and is treated
/// as a precondition violation.
pub const TRAVERSAL_STACK_SIZE: usize = 64;

/// Bottom-level acceleration structure: a BVH over one triangle geometry.
///
/// The source vertex layout is digested at build time into an
/// intersection-ready triangle table, so queries never see strides or index
/// buffers. Immutable after construction; intersection is pure and may be
/// called from any number of threads at once.
pub struct Blas {
    nodes: Box<[Node]>,
    prim_indices: Box<[u32]>,
    tris: Box<[Tri]>,
}

impl Blas {
    /// Builds over consecutive vertex triples: `positions[3i..3i+3]` is
    /// triangle `i`. Panics when fewer than three positions are given.
    pub fn new(positions: &[Vec3]) -> Blas {
        assert!(positions.len() >= 3, "geometry needs at least one triangle");
        Blas::build(positions.len() / 3, |tri, corner| positions[tri * 3 + corner])
    }

    /// Builds over an indexed vertex stream. Indices come in groups of three
    /// and must stay inside `positions`.
    pub fn with_indices(positions: &[Vec3], indices: &[u32]) -> Blas {
        assert!(indices.len() >= 3, "geometry needs at least one triangle");
        assert!(indices.len() % 3 == 0, "index count must be a multiple of 3");
        let vertex_count = u32(positions.len()).expect("vertex count overflow");
        assert!(
            indices.iter().all(|&i| i < vertex_count),
            "vertex index out of range"
        );
        Blas::build(indices.len() / 3, |tri, corner| {
            positions[indices[tri * 3 + corner] as usize]
        })
    }

    /// Builds from a raw float stream with `stride` floats per vertex; only
    /// the first three floats of each vertex are read. Indices, when given,
    /// address vertices (not floats).
    pub fn from_raw(data: &[f32], stride: usize, indices: Option<&[u32]>) -> Blas {
        assert!(stride >= 3, "vertex stride must cover x, y and z");
        let vertex_count = data.len() / stride;
        let fetch = |vertex: usize| {
            let base = vertex * stride;
            vec3(data[base], data[base + 1], data[base + 2])
        };
        match indices {
            Some(indices) => {
                assert!(indices.len() >= 3, "geometry needs at least one triangle");
                assert!(indices.len() % 3 == 0, "index count must be a multiple of 3");
                assert!(
                    indices.iter().all(|&i| (i as usize) < vertex_count),
                    "vertex index out of range"
                );
                Blas::build(indices.len() / 3, |tri, corner| {
                    fetch(indices[tri * 3 + corner] as usize)
                })
            }
            None => {
                assert!(vertex_count >= 3, "geometry needs at least one triangle");
                Blas::build(vertex_count / 3, |tri, corner| fetch(tri * 3 + corner))
            }
        }
    }

    fn build(count: usize, fetch: impl Fn(usize, usize) -> Vec3) -> Blas {
        assert!(count >= 1, "geometry needs at least one triangle");
        let mut tris = Vec::with_capacity(count);
        let mut prims = Vec::with_capacity(count);
        for i in 0..count {
            let (v0, v1, v2) = (fetch(i, 0), fetch(i, 1), fetch(i, 2));
            tris.push(Tri::new(v0, v1, v2));
            prims.push(PrimRef {
                index: u32(i).expect("triangle count overflow"),
                bounds: Aabb::from_points(&[v0, v1, v2]),
            });
        }
        let (nodes, prim_indices) = bvh::build(&mut prims);
        Blas {
            nodes,
            prim_indices,
            tris: tris.into_boxed_slice(),
        }
    }

    /// Local-space bounds, straight off the root node.
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds()
    }

    /// Node array in depth-first layout, exposed for inspection and for
    /// upload into device-side acceleration buffers.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Leaf-order permutation of the original triangle indices.
    pub fn prim_indices(&self) -> &[u32] {
        &self.prim_indices
    }

    /// Per-triangle intersection table, in original triangle order.
    pub fn tris(&self) -> &[Tri] {
        &self.tris
    }

    /// Nearest hit in `[t_min, t_max]`, or `None`. With
    /// `TERMINATE_ON_FIRST_HIT` any in-range hit may be returned instead.
    /// The hit's normal is the flat triangle normal in local space.
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32, flags: RayFlags) -> Option<Hit> {
        self.traverse(ray, t_min, t_max, flags).0
    }

    /// Like [`Blas::intersect`], but also reports how many nodes were
    /// visited. Heat-map renders use the count as a traversal cost proxy.
    pub fn intersect_counted(
        &self,
        ray: &Ray,
        t_min: f32,
        t_max: f32,
        flags: RayFlags,
    ) -> (Option<Hit>, u32) {
        self.traverse(ray, t_min, t_max, flags)
    }

    fn traverse(
        &self,
        ray: &Ray,
        t_min: f32,
        t_max: f32,
        flags: RayFlags,
    ) -> (Option<Hit>, u32) {
        let mut closest_t = t_max;
        let mut closest: Option<Hit> = None;
        let mut steps = 0u32;
        let mut stack: ArrayVec<(u32, f32), TRAVERSAL_STACK_SIZE> = ArrayVec::new();
        stack.push((0, t_min));

        while let Some((index, t_near)) = stack.pop() {
            // A closer hit may have landed since this entry was pushed.
            if t_near > closest_t {
                continue;
            }
            steps += 1;
            let node = &self.nodes[index as usize];
            match node.bounds().intersect(ray, t_min, closest_t) {
                Some((t_enter, _)) if t_enter <= closest_t => {}
                _ => continue,
            }

            if node.is_leaf() {
                assert_eq!(node.leaf_type(), LEAF_TYPE_TRIANGLES, "unsupported leaf type");
                let first = node.first_child_or_prim as usize;
                for &prim_id in &self.prim_indices[first..first + node.prim_count() as usize] {
                    let tri = &self.tris[prim_id as usize];
                    if let Some((t, u, v)) = intersect_tri(ray, tri, flags) {
                        if t >= t_min && t < closest_t {
                            closest_t = t;
                            closest = Some(Hit {
                                t,
                                u,
                                v,
                                primitive_id: prim_id,
                                instance_id: INVALID_ID,
                                normal: tri.normal,
                                position: ray.at(t),
                            });
                            if flags.contains(RayFlags::TERMINATE_ON_FIRST_HIT) {
                                return (closest, steps);
                            }
                        }
                    }
                }
            } else {
                let left = node.first_child_or_prim;
                let hit_left = self.nodes[left as usize].bounds().intersect(ray, t_min, closest_t);
                let hit_right =
                    self.nodes[left as usize + 1].bounds().intersect(ray, t_min, closest_t);
                match (hit_left, hit_right) {
                    (Some((t_left, _)), Some((t_right, _))) => {
                        // Push the farther child first so the nearer one is
                        // processed next; the closest_t pruning depends on
                        // this ordering.
                        let (near, near_t, far, far_t) = if t_right < t_left {
                            (left + 1, t_right, left, t_left)
                        } else {
                            (left, t_left, left + 1, t_right)
                        };
                        if far_t < closest_t {
                            stack.push((far, far_t));
                        }
                        if near_t < closest_t {
                            stack.push((near, near_t));
                        }
                    }
                    (Some((t_enter, _)), None) => {
                        if t_enter < closest_t {
                            stack.push((left, t_enter));
                        }
                    }
                    (None, Some((t_enter, _))) => {
                        if t_enter < closest_t {
                            stack.push((left + 1, t_enter));
                        }
                    }
                    (None, None) => {}
                }
            }
        }
        (closest, steps)
    }
}
