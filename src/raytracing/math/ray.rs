use super::Vec3;

/// A ray with precomputed reciprocal direction and per-axis sign, so that
/// repeated slab tests against bounding boxes stay branch-cheap. The cached
/// fields are derived from the direction at construction time and the ray is
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
    sign: [usize; 3],
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Ray {
        let inv_direction = Vec3::one() / direction;
        let sign = [
            (direction.x < 0.0) as usize,
            (direction.y < 0.0) as usize,
            (direction.z < 0.0) as usize,
        ];
        Ray {
            origin,
            direction,
            inv_direction,
            sign,
        }
    }

    #[inline(always)]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline(always)]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline(always)]
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    #[inline(always)]
    pub fn sign(&self) -> [usize; 3] {
        self.sign
    }

    #[inline(always)]
    pub fn at(self: &Self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_along_ray() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::z_axis());
        assert_eq!(ray.at(2.0), Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn sign_tracks_negative_axes() {
        let ray = Ray::new(Vec3::zero(), Vec3::new(1.0, -1.0, 1.0).normalize());
        assert_eq!(ray.sign(), [0, 1, 0]);
        assert!(ray.inv_direction().y < 0.0);
    }
}
