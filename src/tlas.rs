use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4};

use crate::aabb::Aabb;
use crate::blas::Blas;
use crate::geom::{Hit, Ray, RayFlags};
use crate::math::Mat3x4;

/// One placement of a BLAS in the world.
///
/// The two packed `u32` fields mirror the hardware instance descriptor
/// layout (24-bit value plus 8-bit mask or flags), so an instance array can
/// be copied into an API-side staging buffer without conversion. Use the
/// accessors to read or write the halves.
#[derive(Clone, Copy, Debug)]
pub struct Instance {
    pub transform: Mat3x4,
    pub custom_index_and_mask: u32,
    pub sbt_offset_and_flags: u32,
    pub blas_index: u32,
}

impl Default for Instance {
    fn default() -> Instance {
        Instance {
            transform: Mat3x4::IDENTITY,
            // Mask 0xff: visible unless the caller narrows it.
            custom_index_and_mask: 0xff << 24,
            sbt_offset_and_flags: 0,
            blas_index: 0,
        }
    }
}

impl Instance {
    pub fn custom_index(&self) -> u32 {
        self.custom_index_and_mask & 0x00ff_ffff
    }

    pub fn mask(&self) -> u32 {
        self.custom_index_and_mask >> 24
    }

    pub fn set_custom_index(&mut self, index: u32) {
        self.custom_index_and_mask =
            (self.custom_index_and_mask & 0xff00_0000) | (index & 0x00ff_ffff);
    }

    pub fn set_mask(&mut self, mask: u32) {
        self.custom_index_and_mask = (self.custom_index_and_mask & 0x00ff_ffff) | ((mask & 0xff) << 24);
    }

    pub fn sbt_offset(&self) -> u32 {
        self.sbt_offset_and_flags & 0x00ff_ffff
    }

    pub fn instance_flags(&self) -> u32 {
        self.sbt_offset_and_flags >> 24
    }

    pub fn set_sbt_offset(&mut self, offset: u32) {
        self.sbt_offset_and_flags = (self.sbt_offset_and_flags & 0xff00_0000) | (offset & 0x00ff_ffff);
    }

    pub fn set_instance_flags(&mut self, flags: u32) {
        self.sbt_offset_and_flags = (self.sbt_offset_and_flags & 0x00ff_ffff) | ((flags & 0xff) << 24);
    }

    /// Sets the transform from a column-major 4x4 by transposing its upper
    /// 3x4 block, the usual route when composing with cgmath matrices.
    pub fn set_transform(&mut self, m: Matrix4<f32>) {
        self.transform = Mat3x4::from_mat4(m);
    }
}

/// Top-level acceleration structure: transformed instances over borrowed
/// BLASes. The BLAS slice must outlive the TLAS; construction precomputes
/// each instance's inverse transform, normal transform and world bounds so
/// traversal only does cheap lookups.
pub struct Tlas<'a> {
    blases: &'a [Blas],
    instances: Vec<Instance>,
    inverse_transforms: Vec<Mat3x4>,
    normal_transforms: Vec<Matrix3<f32>>,
    world_bounds: Vec<Aabb>,
}

impl<'a> Tlas<'a> {
    /// Panics when an instance references a BLAS outside `blases`.
    pub fn new(blases: &'a [Blas], instances: Vec<Instance>) -> Tlas<'a> {
        let mut inverse_transforms = Vec::with_capacity(instances.len());
        let mut normal_transforms = Vec::with_capacity(instances.len());
        let mut world_bounds = Vec::with_capacity(instances.len());
        for instance in &instances {
            assert!(
                (instance.blas_index as usize) < blases.len(),
                "instance references BLAS {} but only {} exist",
                instance.blas_index,
                blases.len()
            );
            let blas = &blases[instance.blas_index as usize];
            let inverse = instance.transform.inverse();
            // Normals transform by the inverse transpose of the linear part,
            // which keeps them perpendicular under non-uniform scale.
            normal_transforms.push(inverse.linear().transpose());
            world_bounds.push(blas.bounds().transform(&instance.transform));
            inverse_transforms.push(inverse);
        }
        Tlas {
            blases,
            instances,
            inverse_transforms,
            normal_transforms,
            world_bounds,
        }
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn blases(&self) -> &'a [Blas] {
        self.blases
    }

    /// Nearest world-space hit in `[t_min, t_max]`, or `None`. The returned
    /// hit carries the instance index, a world-space position and a
    /// world-space normal.
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32, flags: RayFlags) -> Option<Hit> {
        self.intersect_counted(ray, t_min, t_max, flags).0
    }

    /// Like [`Tlas::intersect`], but also sums the BLAS traversal steps
    /// spent across all visited instances.
    pub fn intersect_counted(
        &self,
        ray: &Ray,
        t_min: f32,
        t_max: f32,
        flags: RayFlags,
    ) -> (Option<Hit>, u32) {
        let mut closest_t = t_max;
        let mut closest: Option<Hit> = None;
        let mut steps = 0u32;

        for (index, instance) in self.instances.iter().enumerate() {
            // Cull against the interval a new hit could still win.
            if self.world_bounds[index].intersect(ray, t_min, closest_t).is_none() {
                continue;
            }
            let inverse = &self.inverse_transforms[index];
            // The direction is deliberately not normalized: preserving its
            // magnitude keeps t values in world scale across the transform.
            let local_ray = Ray::new(
                inverse.transform_point(ray.origin),
                inverse.transform_vector(ray.direction),
            );
            let blas = &self.blases[instance.blas_index as usize];
            let (hit, blas_steps) = blas.intersect_counted(&local_ray, t_min, closest_t, flags);
            steps += blas_steps;
            if let Some(mut hit) = hit {
                if hit.t < closest_t {
                    closest_t = hit.t;
                    hit.instance_id = index as u32;
                    // World position comes from the world ray; t is shared
                    // between both spaces.
                    hit.position = ray.at(hit.t);
                    hit.normal = (self.normal_transforms[index] * hit.normal).normalize();
                    closest = Some(hit);
                    if flags.contains(RayFlags::TERMINATE_ON_FIRST_HIT) {
                        break;
                    }
                }
            }
        }
        (closest, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_fields_round_trip() {
        let mut instance = Instance::default();
        assert_eq!(instance.mask(), 0xff);
        assert_eq!(instance.custom_index(), 0);

        instance.set_custom_index(0x123456);
        instance.set_mask(0xab);
        assert_eq!(instance.custom_index(), 0x123456);
        assert_eq!(instance.mask(), 0xab);
        assert_eq!(instance.custom_index_and_mask, 0xab12_3456);

        instance.set_sbt_offset(0x00ff00);
        instance.set_instance_flags(0x05);
        assert_eq!(instance.sbt_offset(), 0x00ff00);
        assert_eq!(instance.instance_flags(), 0x05);
        assert_eq!(instance.sbt_offset_and_flags, 0x0500_ff00);

        // Writing one half must not disturb the other.
        instance.set_custom_index(0xffffff);
        assert_eq!(instance.mask(), 0xab);
    }
}
