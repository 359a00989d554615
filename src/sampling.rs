//! Sampling helpers that sit right next to intersection: a tangent frame
//! for lifting hemisphere samples around a surface normal, and the small
//! per-pixel PRNG that feeds them.

use std::f32::consts::PI;

use cgmath::{vec2, vec3, InnerSpace};

use crate::math::{UVec2, Vec2, Vec3};

/// Right-handed orthonormal frame around a unit normal.
#[derive(Clone, Copy, Debug)]
pub struct Onb {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Onb {
    /// Seeds the tangent from whichever world axis the normal is less
    /// aligned with (`|n.x|` vs `|n.z|`), so the construction never
    /// degenerates.
    pub fn from_normal(n: Vec3) -> Onb {
        let tangent = if n.x.abs() > n.z.abs() {
            vec3(-n.y, n.x, 0.0).normalize()
        } else {
            vec3(0.0, -n.z, n.y).normalize()
        };
        Onb {
            tangent,
            bitangent: n.cross(tangent),
            normal: n,
        }
    }

    pub fn to_world(&self, v: Vec3) -> Vec3 {
        v.x * self.tangent + v.y * self.bitangent + v.z * self.normal
    }
}

/// PRNG with 32 bits of state, stepped through the PCG-RXS-M-XS output
/// permutation. Cheap enough to seed one per pixel per iteration; never
/// share one across threads.
#[derive(Clone, Debug)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Rng {
        Rng { state: seed }
    }

    /// The conventional per-pixel seed: neighbouring pixels advance by one,
    /// iterations by a whole frame.
    pub fn for_pixel(pixel: UVec2, resolution: UVec2, iteration: u32) -> Rng {
        let frame = resolution.x.wrapping_mul(resolution.y);
        Rng::new(
            pixel
                .x
                .wrapping_add(pixel.y.wrapping_mul(resolution.x))
                .wrapping_add(iteration.wrapping_mul(frame)),
        )
    }

    pub fn next_u32(&mut self) -> u32 {
        let state = self.state;
        self.state = state.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
        let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
        (word >> 22) ^ word
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / (1 << 24) as f32)
    }

    pub fn next_vec2(&mut self) -> Vec2 {
        vec2(self.next_f32(), self.next_f32())
    }
}

/// Uniform direction on the +z hemisphere; pair with [`Onb::to_world`].
pub fn uniform_sample_hemisphere(xi: Vec2) -> Vec3 {
    let phi = 2.0 * PI * xi.x;
    let cos_theta = 1.0 - xi.y;
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    vec3(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Cosine-weighted direction on the +z hemisphere.
pub fn cosine_sample_hemisphere(xi: Vec2) -> Vec3 {
    let phi = 2.0 * PI * xi.x;
    let cos_theta = (1.0 - xi.y).sqrt();
    let sin_theta = xi.y.sqrt();
    vec3(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn onb_is_orthonormal_and_right_handed() {
        for n in [
            vec3(0.0, 0.0, 1.0),
            vec3(0.0, 1.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(0.577_350_3, 0.577_350_3, 0.577_350_3),
            vec3(0.0, -1.0, 0.0),
        ] {
            let onb = Onb::from_normal(n);
            assert_relative_eq!(onb.tangent.magnitude(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(onb.bitangent.magnitude(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(onb.tangent.dot(onb.normal), 0.0, epsilon = 1e-5);
            assert_relative_eq!(onb.tangent.dot(onb.bitangent), 0.0, epsilon = 1e-5);
            assert_relative_eq!(onb.bitangent.dot(onb.normal), 0.0, epsilon = 1e-5);
            // T x B must reproduce N for a right-handed frame.
            assert_relative_eq!(onb.tangent.cross(onb.bitangent), n, epsilon = 1e-5);
            // The frame maps +z back onto the normal.
            assert_relative_eq!(onb.to_world(vec3(0.0, 0.0, 1.0)), n, epsilon = 1e-5);
        }
    }

    #[test]
    fn rng_is_deterministic_per_seed() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_ne!(Rng::new(42).next_u32(), Rng::new(43).next_u32());
    }

    #[test]
    fn pixel_seeds_differ_between_pixels_and_iterations() {
        let res = UVec2::new(64, 64);
        let a = Rng::for_pixel(UVec2::new(3, 7), res, 0).next_u32();
        let b = Rng::for_pixel(UVec2::new(4, 7), res, 0).next_u32();
        let c = Rng::for_pixel(UVec2::new(3, 7), res, 1).next_u32();
        assert_ne!(a, b);
        assert_ne!(a, c);
        // Same pixel, same iteration: reproducible.
        assert_eq!(a, Rng::for_pixel(UVec2::new(3, 7), res, 0).next_u32());
    }

    #[test]
    fn next_f32_stays_in_unit_interval() {
        let mut rng = Rng::new(7);
        for _ in 0..1000 {
            let x = rng.next_f32();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn hemisphere_samples_point_up() {
        let mut rng = Rng::new(11);
        for _ in 0..200 {
            let xi = rng.next_vec2();
            for dir in [uniform_sample_hemisphere(xi), cosine_sample_hemisphere(xi)] {
                assert!(dir.z >= 0.0);
                assert_relative_eq!(dir.magnitude(), 1.0, epsilon = 1e-4);
            }
        }
    }
}
