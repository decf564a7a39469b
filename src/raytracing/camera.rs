use rand::Rng;

use super::math::{Mat4, Ray, Vec3};
use super::scene::Scene;

/// Generates primary rays from the scene's projection parameters. The
/// camera-space direction `(x, y, 1)` is carried into world space by the
/// look-at transform built from eye/center/up.
pub struct Camera {
    matrix: Mat4,
    origin: Vec3,
    width: f32,
    height: f32,
    scale: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(scene: &Scene) -> Camera {
        let matrix = Mat4::look_at(scene.eye, scene.center, scene.up);
        let origin = matrix.transform_pt(Vec3::zero());
        Camera {
            matrix,
            origin,
            width: scene.width() as f32,
            height: scene.height() as f32,
            scale: scene.scale(),
            aspect: scene.aspect(),
        }
    }

    fn ray_through(&self, px: f32, py: f32) -> Ray {
        let x = (2.0 * px / self.width - 1.0) * self.scale * self.aspect;
        let y = (1.0 - 2.0 * py / self.height) * self.scale;
        let direction = self.matrix.transform_dir(Vec3::new(x, y, 1.0));
        Ray::new(self.origin, direction.normalize())
    }

    /// Ray through the center of pixel (i, j).
    pub fn pixel_ray(&self, i: u32, j: u32) -> Ray {
        self.ray_through(i as f32 + 0.5, j as f32 + 0.5)
    }

    /// Ray through a uniformly jittered point inside pixel (i, j).
    pub fn jittered_ray<R: Rng>(&self, i: u32, j: u32, rng: &mut R) -> Ray {
        let dx = rng.gen_range(-0.5..0.5);
        let dy = rng.gen_range(-0.5..0.5);
        self.ray_through(i as f32 + 0.5 + dx, j as f32 + 0.5 + dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_scene() -> Scene {
        let mut scene = Scene::new();
        scene.set_width(4);
        scene.set_height(4);
        scene
    }

    #[test]
    fn default_pose_looks_down_positive_z() {
        let scene = small_scene();
        let camera = Camera::new(&scene);
        // the four central-pixel rays bracket the view axis symmetrically;
        // their mean is the viewing direction
        let mut sum = Vec3::zero();
        for (i, j) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            let ray = camera.pixel_ray(i, j);
            assert_eq!(ray.origin(), Vec3::new(0.0, 0.0, -1.0));
            sum += ray.direction();
        }
        let mean = (sum / 4.0).normalize();
        assert!((mean - Vec3::z_axis()).len() < 1e-5);
    }

    #[test]
    fn pixel_grid_spans_the_field_of_view() {
        let scene = small_scene();
        let camera = Camera::new(&scene);
        let top_left = camera.pixel_ray(0, 0).direction();
        let bottom_right = camera.pixel_ray(3, 3).direction();
        assert!(top_left.x < 0.0 && top_left.y > 0.0);
        assert!(bottom_right.x > 0.0 && bottom_right.y < 0.0);
    }

    #[test]
    fn jitter_stays_inside_the_pixel() {
        let scene = small_scene();
        let camera = Camera::new(&scene);
        let mut rng = StdRng::seed_from_u64(11);
        let center = camera.pixel_ray(1, 1).direction();
        let above = camera.pixel_ray(1, 0).direction();
        let pixel_angle = center.dot(above);
        for _ in 0..64 {
            let sample = camera.jittered_ray(1, 1, &mut rng).direction();
            // a jittered ray never strays farther than a neighboring pixel center
            assert!(sample.dot(center) >= pixel_angle);
        }
    }
}
