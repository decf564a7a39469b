use rand::Rng;

use super::math::Vec3;

/// How a surface responds to an incoming ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reflection {
    Diffuse,
    Mirror,
    Refractive,
    Fresnel,
    /// Emissive surfaces render as flat-colored emitters and drive the
    /// direct-illumination sampling.
    Light,
}

/// Blinn-Phong material shared by every shape of one scene object.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub ks: Vec3,
    pub kd: Vec3,
    pub ka: Vec3,
    pub alpha: f32,
    pub ior: f32,
    pub reflection: Reflection,
}

impl Material {
    /// The scene format carries no material directives: every object gets its
    /// coefficients and reflection type drawn from the caller's generator.
    pub fn random<R: Rng>(rng: &mut R) -> Material {
        Material {
            ks: random_color(rng),
            kd: random_color(rng),
            ka: random_color(rng),
            alpha: rng.gen::<f32>() * 128.0,
            ior: rng.gen::<f32>() + 0.5,
            reflection: random_reflection(rng),
        }
    }
}

pub fn random_color<R: Rng>(rng: &mut R) -> Vec3 {
    Vec3::new(rng.gen(), rng.gen(), rng.gen())
}

fn random_reflection<R: Rng>(rng: &mut R) -> Reflection {
    match rng.gen_range(0..5) {
        0 => Reflection::Diffuse,
        1 => Reflection::Mirror,
        2 => Reflection::Refractive,
        3 => Reflection::Fresnel,
        _ => Reflection::Light,
    }
}
