use std::fmt;

use cgmath::{vec3, ElementWise};

use crate::geom::Ray;
use crate::math::{Mat3x4, Vec3};

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn empty() -> Aabb {
        let min = vec3(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        Aabb { min, max: -min }
    }

    pub fn from_points(points: &[Vec3]) -> Aabb {
        let mut res = Aabb::empty();
        for &p in points {
            res.add_point(p);
        }
        res
    }

    pub fn add_point(&mut self, p: Vec3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: vec3(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: vec3(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn surface_area(&self) -> f32 {
        if self == &Aabb::empty() {
            return 0.0;
        }
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Slab test against the caller's `[t_min, t_max]` interval. Returns the
    /// entry and exit distances on a hit. Zero direction components put
    /// infinities into `inv_direction`; the min/max folding absorbs them
    /// whenever a real slab overlap exists, so they are not special-cased.
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
        let t0 = (self.min - ray.origin).mul_element_wise(ray.inv_direction);
        let t1 = (self.max - ray.origin).mul_element_wise(ray.inv_direction);
        let near = vec3(t0.x.min(t1.x), t0.y.min(t1.y), t0.z.min(t1.z));
        let far = vec3(t0.x.max(t1.x), t0.y.max(t1.y), t0.z.max(t1.z));
        let t_enter = near.x.max(near.y).max(near.z).max(t_min);
        let t_exit = far.x.min(far.y).min(far.z).min(t_max);
        if t_exit >= t_enter {
            Some((t_enter, t_exit))
        } else {
            None
        }
    }

    /// Conservative affine transform in center/half-extents form: the new
    /// half extents are `|R| * half`, which bounds every rotation of the box.
    pub fn transform(&self, m: &Mat3x4) -> Aabb {
        let center = (self.min + self.max) * 0.5;
        let half = (self.max - self.min) * 0.5;
        let world_center = m.transform_point(center);
        let world_half = vec3(
            m.rows[0].x.abs() * half.x + m.rows[0].y.abs() * half.y + m.rows[0].z.abs() * half.z,
            m.rows[1].x.abs() * half.x + m.rows[1].y.abs() * half.y + m.rows[1].z.abs() * half.z,
            m.rows[2].x.abs() * half.x + m.rows[2].y.abs() * half.y + m.rows[2].z.abs() * half.z,
        );
        Aabb {
            min: world_center - world_half,
            max: world_center + world_half,
        }
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}]..[{}, {}, {}]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
