use rand::Rng;
use rayon::prelude::*;

use super::camera::Camera;
use super::material::{Material, Reflection};
use super::math::{Ray, Vec3};
use super::scene::Scene;

/// Offset applied along a bounce direction or surface normal so that a
/// secondary ray does not immediately re-hit the surface it left.
const BIAS: f32 = 1e-4;

/// Default recursion budget; two mirrors facing each other terminate here.
pub const DEFAULT_BOUNCES: u32 = 5;

pub fn reflect(incoming: Vec3, normal: Vec3) -> Vec3 {
    normal * (2.0 * incoming.dot(normal)) - incoming
}

/// Snell refraction of `incoming` at a surface with the given index of
/// refraction; the entering/exiting case is decided by the sign of the
/// incidence cosine. Total internal reflection yields the zero vector.
pub fn refract(incoming: Vec3, normal: Vec3, ior: f32) -> Vec3 {
    let mut cosi = incoming.dot(normal).clamp(-1.0, 1.0);
    let mut etai = 1.0;
    let mut etat = ior;
    let mut n = normal;
    if cosi < 0.0 {
        cosi = -cosi;
    } else {
        std::mem::swap(&mut etai, &mut etat);
        n = -normal;
    }
    let eta = etai / etat;
    let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
    if k < 0.0 {
        Vec3::zero()
    } else {
        incoming * eta + n * (eta * cosi - k.sqrt())
    }
}

/// Fraction of light reflected at a dielectric interface: the S- and
/// P-polarization reflectances averaged, 1.0 past the critical angle.
pub fn fresnel(incoming: Vec3, normal: Vec3, ior: f32) -> f32 {
    let cosi = incoming.dot(normal).clamp(-1.0, 1.0);
    let mut etai = 1.0;
    let mut etat = ior;
    if cosi > 0.0 {
        std::mem::swap(&mut etai, &mut etat);
    }
    let sint = etai / etat * (1.0 - cosi * cosi).max(0.0).sqrt();
    if sint >= 1.0 {
        return 1.0;
    }
    let cost = (1.0 - sint * sint).max(0.0).sqrt();
    let cosi = cosi.abs();
    let rs = (etat * cosi - etai * cost) / (etat * cosi + etai * cost);
    let rp = (etai * cosi - etat * cost) / (etai * cosi + etat * cost);
    (rs * rs + rp * rp) / 2.0
}

/// Rendering context: the scene is shared read-only, the generator is owned
/// by the calling task so concurrent pixels never contend on one.
pub struct Tracer<'a> {
    scene: &'a Scene,
}

impl<'a> Tracer<'a> {
    pub fn new(scene: &'a Scene) -> Tracer<'a> {
        Tracer { scene }
    }

    /// Distance to the nearest surface along the ray, -1 on a miss.
    pub fn trace_distance(&self, ray: &Ray) -> f32 {
        self.scene.hit(ray).map(|hit| hit.t).unwrap_or(-1.0)
    }

    /// Recursive radiance estimate. `depth` is the remaining recursion
    /// budget: at zero the background color is returned unconditionally.
    pub fn trace<R: Rng>(&self, origin: Vec3, direction: Vec3, depth: u32, rng: &mut R) -> Vec3 {
        if depth == 0 {
            return self.scene.background;
        }
        let ray = Ray::new(origin, direction);
        let Some(hit) = self.scene.hit(&ray) else {
            return self.scene.background;
        };
        let material = *self.scene.material_of(&hit);

        // emitters are visible as flat-colored surfaces
        if material.reflection == Reflection::Light {
            return material.kd;
        }

        let point = ray.at(hit.t);
        let normal = self.scene.shape(hit.shape).normal_at(point, direction);

        let kd = match material.reflection {
            Reflection::Mirror => {
                let bounce = reflect(direction, normal).normalize();
                self.trace(point + bounce * BIAS, bounce, depth - 1, rng)
            }
            Reflection::Refractive => {
                let bounce = refract(direction, normal, material.ior);
                if bounce.squared_len() == 0.0 {
                    // total internal reflection degenerates to plain diffuse
                    material.kd
                } else {
                    self.trace(point + bounce * BIAS, bounce, depth - 1, rng)
                }
            }
            Reflection::Fresnel => {
                let kr = fresnel(direction, normal, material.ior);
                let outside = direction.dot(normal) < 0.0;
                let bias = normal * BIAS;
                let mut refraction = Vec3::zero();
                if kr < 1.0 {
                    let refraction_dir = refract(direction, normal, material.ior);
                    let refraction_origin = if outside { point - bias } else { point + bias };
                    refraction = self.trace(refraction_origin, refraction_dir, depth - 1, rng);
                }
                let reflection_dir = reflect(direction, normal).normalize();
                let reflection_origin = if outside { point + bias } else { point - bias };
                let reflection = self.trace(reflection_origin, reflection_dir, depth - 1, rng);
                reflection * kr + refraction * (1.0 - kr)
            }
            Reflection::Diffuse | Reflection::Light => material.kd,
        };

        self.shade_direct(point, normal, direction, kd, &material, rng)
    }

    /// Monte Carlo direct illumination: each emissive object is sampled
    /// uniformly within its axis-aligned bounds and contributes its
    /// Blinn-Phong term whenever the shadow ray reaches it. The term itself
    /// is computed once per light per call; only visibility is re-sampled.
    fn shade_direct<R: Rng>(
        &self,
        point: Vec3,
        normal: Vec3,
        direction: Vec3,
        kd: Vec3,
        material: &Material,
        rng: &mut R,
    ) -> Vec3 {
        let view = -direction.normalize();
        let normal = normal.normalize();
        let samples = self.scene.samples;
        let mut cached: Vec<Option<Vec3>> = vec![None; self.scene.objects().len()];
        let mut color = Vec3::zero();
        for _ in 0..samples {
            let mut sample_color = material.ka * self.scene.ambient;
            for (index, object) in self.scene.objects().iter().enumerate() {
                if object.material.reflection != Reflection::Light {
                    continue;
                }
                let bounds = object.bounds;
                let target = Vec3::new(
                    bounds.min.x + (bounds.max.x - bounds.min.x) * rng.gen::<f32>(),
                    bounds.min.y + (bounds.max.y - bounds.min.y) * rng.gen::<f32>(),
                    bounds.min.z + (bounds.max.z - bounds.min.z) * rng.gen::<f32>(),
                );
                let light_dir = (target - point).normalize();
                let shadow = Ray::new(point + light_dir * BIAS, light_dir);
                // the sample only counts when the nearest surface toward it
                // is the light itself
                match self.scene.hit(&shadow) {
                    Some(shadow_hit) if shadow_hit.object == index => {}
                    _ => continue,
                }
                let term = cached[index].get_or_insert_with(|| {
                    let l = light_dir;
                    let r = reflect(l, normal).normalize();
                    kd * l.dot(normal).max(0.0) * object.material.kd
                        + material.ks
                            * r.dot(view).max(0.0).powf(material.alpha)
                            * object.material.kd
                });
                sample_color += *term;
            }
            color += sample_color / samples as f32;
        }
        color
    }
}

fn stripe_size(width: usize, height: usize) -> usize {
    const TOTAL_STRIPES: usize = 32;
    ((height / TOTAL_STRIPES).max(1) * width).max(1)
}

/// Renders the scene into a buffer of linear RGB values, one per pixel in
/// row-major order, averaging the configured number of jittered samples.
pub fn render_color(scene: &Scene, bounces: u32) -> Vec<Vec3> {
    let camera = Camera::new(scene);
    let tracer = Tracer::new(scene);
    let width = scene.width() as usize;
    let height = scene.height() as usize;
    let samples = scene.samples.max(1);
    let mut pixels = vec![Vec3::zero(); width * height];
    let stripe_size = stripe_size(width, height);
    let stripes: Vec<(usize, &mut [Vec3])> = pixels.chunks_mut(stripe_size).enumerate().collect();
    let total_stripes = stripes.len();
    stripes.into_par_iter().for_each(|(stripe_index, stripe)| {
        let mut rng = rand::thread_rng();
        for (i, pixel) in stripe.iter_mut().enumerate() {
            let index = stripe_index * stripe_size + i;
            let x = (index % width) as u32;
            let y = (index / width) as u32;
            for _ in 0..samples {
                let ray = camera.jittered_ray(x, y, &mut rng);
                *pixel +=
                    tracer.trace(ray.origin(), ray.direction(), bounces, &mut rng)
                        / samples as f32;
            }
        }
        log::debug!("rendered stripe {}/{}", stripe_index + 1, total_stripes);
    });
    pixels
}

/// Renders one primary ray per pixel and records the hit distance, -1 where
/// nothing is hit.
pub fn render_depth(scene: &Scene) -> Vec<f32> {
    let camera = Camera::new(scene);
    let tracer = Tracer::new(scene);
    let width = scene.width() as usize;
    let height = scene.height() as usize;
    let mut distances = vec![-1.0; width * height];
    let stripe_size = stripe_size(width, height);
    let stripes: Vec<(usize, &mut [f32])> =
        distances.chunks_mut(stripe_size).enumerate().collect();
    let total_stripes = stripes.len();
    stripes.into_par_iter().for_each(|(stripe_index, stripe)| {
        for (i, pixel) in stripe.iter_mut().enumerate() {
            let index = stripe_index * stripe_size + i;
            let x = (index % width) as u32;
            let y = (index / width) as u32;
            *pixel = tracer.trace_distance(&camera.pixel_ray(x, y));
        }
        log::debug!("rendered stripe {}/{}", stripe_index + 1, total_stripes);
    });
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracing::shape::{Sphere, Triangle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn material(reflection: Reflection) -> Material {
        Material {
            ks: Vec3::zero(),
            kd: Vec3::new(0.8, 0.4, 0.2),
            ka: Vec3::zero(),
            alpha: 32.0,
            ior: 1.5,
            reflection,
        }
    }

    #[test]
    fn fresnel_near_normal_incidence_matches_textbook_value() {
        let incoming = Vec3::new(0.01, 0.0, 1.0).normalize();
        let kr = fresnel(incoming, -Vec3::z_axis(), 1.5);
        assert!((kr - 0.04).abs() < 0.005, "kr = {}", kr);
    }

    #[test]
    fn fresnel_past_the_critical_angle_is_total() {
        // exiting a dense medium at grazing incidence
        let incoming = Vec3::new(1.0, 0.0, 0.1).normalize();
        let kr = fresnel(incoming, Vec3::z_axis(), 1.5);
        assert_eq!(kr, 1.0);
    }

    #[test]
    fn refraction_at_normal_incidence_goes_straight_through() {
        let incoming = Vec3::z_axis();
        let out = refract(incoming, -Vec3::z_axis(), 1.5);
        assert!((out - Vec3::z_axis()).len() < 1e-5);
    }

    #[test]
    fn total_internal_reflection_yields_the_zero_vector() {
        let incoming = Vec3::new(1.0, 0.0, 0.1).normalize();
        let out = refract(incoming, Vec3::z_axis(), 1.5);
        assert_eq!(out, Vec3::zero());
    }

    #[test]
    fn miss_returns_the_background_color() {
        let mut scene = Scene::new();
        scene.background = Vec3::new(0.1, 0.2, 0.3);
        let tracer = Tracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(1);
        let color = tracer.trace(Vec3::zero(), Vec3::z_axis(), DEFAULT_BOUNCES, &mut rng);
        assert_eq!(color, scene.background);
    }

    #[test]
    fn emitters_render_as_their_flat_diffuse_color() {
        let mut scene = Scene::new();
        scene.samples = 1;
        let light = scene.add_object(material(Reflection::Light));
        scene.add_shape(light, Box::new(Sphere::new(Vec3::new(0.0, 0.0, 3.0), 1.0)));
        let tracer = Tracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(1);
        let color = tracer.trace(Vec3::zero(), Vec3::z_axis(), DEFAULT_BOUNCES, &mut rng);
        assert_eq!(color, material(Reflection::Light).kd);
    }

    #[test]
    fn facing_mirrors_terminate_at_any_depth() {
        let mut scene = Scene::new();
        scene.samples = 1;
        // two large parallel triangles with mirror materials
        let span = 100.0;
        let near = scene.add_object(material(Reflection::Mirror));
        scene.add_shape(
            near,
            Box::new(Triangle::new(
                Vec3::new(-span, -span, 0.0),
                Vec3::new(span, -span, 0.0),
                Vec3::new(0.0, span, 0.0),
            )),
        );
        let far = scene.add_object(material(Reflection::Mirror));
        scene.add_shape(
            far,
            Box::new(Triangle::new(
                Vec3::new(-span, -span, 5.0),
                Vec3::new(span, -span, 5.0),
                Vec3::new(0.0, span, 5.0),
            )),
        );
        let tracer = Tracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(1);
        for depth in 0..=8 {
            let color = tracer.trace(Vec3::new(0.0, 0.0, 2.5), Vec3::z_axis(), depth, &mut rng);
            assert!(color.x.is_finite() && color.y.is_finite() && color.z.is_finite());
        }
    }

    #[test]
    fn lit_diffuse_surface_accumulates_light() {
        let mut scene = Scene::new();
        scene.samples = 16;
        scene.ambient = Vec3::zero();
        let floor = scene.add_object(material(Reflection::Diffuse));
        scene.add_shape(
            floor,
            Box::new(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0)),
        );
        let lamp = scene.add_object(Material {
            kd: Vec3::one(),
            ..material(Reflection::Light)
        });
        scene.add_shape(lamp, Box::new(Sphere::new(Vec3::new(0.0, 4.0, 3.0), 0.3)));
        let tracer = Tracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(3);
        let color = tracer.trace(Vec3::zero(), Vec3::z_axis(), DEFAULT_BOUNCES, &mut rng);
        assert!(color.x > 0.0 && color.y > 0.0 && color.z > 0.0);
    }

    #[test]
    fn depth_render_separates_hits_from_misses() {
        let mut scene = Scene::new();
        scene.set_width(9);
        scene.set_height(9);
        let object = scene.add_object(material(Reflection::Diffuse));
        scene.add_shape(object, Box::new(Sphere::new(Vec3::new(0.0, 0.0, 3.0), 1.0)));
        let distances = render_depth(&scene);
        assert_eq!(distances.len(), 81);
        let center = distances[4 * 9 + 4];
        assert!((center - 3.0).abs() < 0.05, "center = {}", center);
        assert_eq!(distances[0], -1.0);
    }
}
