use super::{Ray, Vec3};

/// Axis-aligned box stored as componentwise minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Box3 {
    pub fn from_min_max(min: Vec3, max: Vec3) -> Box3 {
        Box3 { min, max }
    }

    /// The empty box: the identity for `include`, containing nothing.
    pub fn empty() -> Box3 {
        Box3 {
            min: Vec3::one() * f32::INFINITY,
            max: Vec3::one() * f32::NEG_INFINITY,
        }
    }

    /// Grows this box to the union with `other`.
    pub fn include(&mut self, other: &Box3) {
        self.min = Vec3::min_components(self.min, other.min);
        self.max = Vec3::max_components(self.max, other.max);
    }

    #[inline(always)]
    pub fn contains_box(&self, other: &Box3) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    /// True when all three axis intervals intersect. Touching counts.
    #[inline(always)]
    pub fn overlaps(&self, other: &Box3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline(always)]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// One of the eight sub-boxes obtained by bisecting along all three axes
    /// at the center. Bit 0 of `index` selects the x half, bit 1 the y half,
    /// bit 2 the z half.
    pub fn octant(&self, index: usize) -> Box3 {
        let center = self.center();
        let x = if index & 1 == 0 {
            (self.min.x, center.x)
        } else {
            (center.x, self.max.x)
        };
        let y = if index & 2 == 0 {
            (self.min.y, center.y)
        } else {
            (center.y, self.max.y)
        };
        let z = if index & 4 == 0 {
            (self.min.z, center.z)
        } else {
            (center.z, self.max.z)
        };
        Box3 {
            min: Vec3::new(x.0, y.0, z.0),
            max: Vec3::new(x.1, y.1, z.1),
        }
    }

    /// Slab test: intersects the running [tmin,tmax] interval with the
    /// per-axis entry/exit interval, selecting near and far faces from the
    /// ray's cached sign. Returns true when the box is hit no farther than
    /// `best`.
    pub fn intersect_ray(&self, ray: &Ray, best: f32) -> bool {
        let bounds = [self.min, self.max];
        let origin = ray.origin();
        let inv = ray.inv_direction();
        let sign = ray.sign();

        let mut tmin = (bounds[sign[0]].x - origin.x) * inv.x;
        let mut tmax = (bounds[1 - sign[0]].x - origin.x) * inv.x;
        let tymin = (bounds[sign[1]].y - origin.y) * inv.y;
        let tymax = (bounds[1 - sign[1]].y - origin.y) * inv.y;

        if tmin > tymax || tymin > tmax {
            return false;
        }
        if tymin > tmin {
            tmin = tymin;
        }
        if tymax < tmax {
            tmax = tymax;
        }

        let tzmin = (bounds[sign[2]].z - origin.z) * inv.z;
        let tzmax = (bounds[1 - sign[2]].z - origin.z) * inv.z;

        if tmin > tzmax || tzmin > tmax {
            return false;
        }
        if tzmin > tmin {
            tmin = tzmin;
        }
        if tzmax < tmax {
            tmax = tzmax;
        }

        let mut t0 = tmin;
        if t0 < 0.0 {
            // the entry point is behind the origin, try the exit point
            t0 = tmax;
            if t0 < 0.0 {
                return false;
            }
        }
        t0 <= best
    }
}
