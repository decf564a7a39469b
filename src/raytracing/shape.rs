use super::math::{Box3, Ray, Vec3};

/// Intersection protocol shared by every primitive. `intersect` only reports
/// hits strictly in front of the origin and no farther than `best`, so nested
/// containers can thread one best-distance accumulator through every test.
pub trait Shape: Send + Sync {
    /// Distance to the hit, when it is closer than `best`.
    fn intersect(&self, ray: &Ray, best: f32) -> Option<f32>;

    /// Axis-aligned extents of the shape.
    fn extents(&self) -> Box3;

    /// Surface normal at `point`, oriented against the incoming direction
    /// where the primitive is two-sided.
    fn normal_at(&self, point: Vec3, incoming: Vec3) -> Vec3;
}

pub struct Sphere {
    center: Vec3,
    radius: f32,
    radius2: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Sphere {
        Sphere {
            center,
            radius,
            radius2: radius * radius,
        }
    }
}

impl Shape for Sphere {
    fn intersect(&self, ray: &Ray, best: f32) -> Option<f32> {
        // geometric method: project the center onto the ray
        let l = self.center - ray.origin();
        let tca = l.dot(ray.direction());
        if tca < 0.0 {
            // the sphere is entirely behind the origin
            return None;
        }
        let d2 = l.dot(l) - tca * tca;
        if d2 > self.radius2 {
            return None;
        }
        let thc = (self.radius2 - d2).sqrt();
        let mut t0 = tca - thc;
        let mut t1 = tca + thc;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 < 0.0 {
            // we are inside the sphere
            t0 = t1;
        }
        if t0 < 0.0 || t0 > best {
            return None;
        }
        Some(t0)
    }

    fn extents(&self) -> Box3 {
        Box3::from_min_max(
            self.center - Vec3::one() * self.radius,
            self.center + Vec3::one() * self.radius,
        )
    }

    fn normal_at(&self, point: Vec3, _incoming: Vec3) -> Vec3 {
        (point - self.center).normalize()
    }
}

pub struct Triangle {
    a: Vec3,
    b: Vec3,
    c: Vec3,
    normal: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Triangle {
        let normal = (b - a).cross(c - a).normalize();
        Triangle { a, b, c, normal }
    }
}

impl Shape for Triangle {
    fn intersect(&self, ray: &Ray, best: f32) -> Option<f32> {
        // https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm
        let ab = self.b - self.a;
        let ac = self.c - self.a;
        let pvec = ray.direction().cross(ac);
        let det = ab.dot(pvec);
        // ray and triangle are parallel if det is close to 0
        if det.abs() < f32::EPSILON {
            return None;
        }
        let idet = 1.0 / det;
        let tvec = ray.origin() - self.a;
        let u = tvec.dot(pvec) * idet;
        if u < 0.0 || u > 1.0 {
            return None;
        }
        let qvec = tvec.cross(ab);
        let v = ray.direction().dot(qvec) * idet;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = ac.dot(qvec) * idet;
        if t < 0.0 || t > best {
            return None;
        }
        Some(t)
    }

    fn extents(&self) -> Box3 {
        let min = Vec3::min_components(Vec3::min_components(self.a, self.b), self.c);
        let max = Vec3::max_components(Vec3::max_components(self.a, self.b), self.c);
        Box3::from_min_max(min, max)
    }

    fn normal_at(&self, _point: Vec3, incoming: Vec3) -> Vec3 {
        if incoming.dot(self.normal) < 0.0 {
            self.normal
        } else {
            -self.normal
        }
    }
}

/// Decorator that caches the wrapped shape's extents at wrap time and gates
/// its intersection test with a slab test. The wrapped shape must not change
/// its geometry afterwards.
pub struct BoundingBox {
    bounds: Box3,
    inner: Box<dyn Shape>,
}

impl BoundingBox {
    pub fn new(inner: Box<dyn Shape>) -> BoundingBox {
        BoundingBox {
            bounds: inner.extents(),
            inner,
        }
    }
}

impl Shape for BoundingBox {
    fn intersect(&self, ray: &Ray, best: f32) -> Option<f32> {
        if !self.bounds.intersect_ray(ray, best) {
            return None;
        }
        // the same accumulator, so the inner shape still prunes by distance
        self.inner.intersect(ray, best)
    }

    fn extents(&self) -> Box3 {
        self.bounds
    }

    fn normal_at(&self, point: Vec3, incoming: Vec3) -> Vec3 {
        self.inner.normal_at(point, incoming)
    }
}
