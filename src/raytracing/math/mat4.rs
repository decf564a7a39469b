use super::Vec3;

/// Row-major 4x4 transform, applied to column vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat4 {
    value: [f32; 16],
}

impl Mat4 {
    pub fn identity() -> Mat4 {
        Mat4 {
            value: [
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn translate(offset: Vec3) -> Mat4 {
        Mat4 {
            value: [
                1.0, 0.0, 0.0, offset.x, 0.0, 1.0, 0.0, offset.y, 0.0, 0.0, 1.0, offset.z, 0.0,
                0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn scale(factor: Vec3) -> Mat4 {
        Mat4 {
            value: [
                factor.x, 0.0, 0.0, 0.0, 0.0, factor.y, 0.0, 0.0, 0.0, 0.0, factor.z, 0.0, 0.0,
                0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn rotate(axis: Vec3, angle: f32) -> Mat4 {
        let u = axis.normalize();
        let cos_t = angle.cos();
        let sin_t = angle.sin();
        let k = 1.0 - cos_t;
        Mat4 {
            value: [
                cos_t + k * u.x * u.x,
                k * u.x * u.y - sin_t * u.z,
                k * u.x * u.z + sin_t * u.y,
                0.0,
                k * u.y * u.x + sin_t * u.z,
                cos_t + k * u.y * u.y,
                k * u.y * u.z - sin_t * u.x,
                0.0,
                k * u.z * u.x - sin_t * u.y,
                k * u.z * u.y + sin_t * u.x,
                cos_t + k * u.z * u.z,
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
            ],
        }
    }

    /// Euler rotation composed as the matrix product x * y * z, with the
    /// angles given in radians.
    pub fn rotate_xyz(angles: Vec3) -> Mat4 {
        let x = Mat4::rotate(Vec3::x_axis(), angles.x);
        let y = Mat4::rotate(Vec3::y_axis(), angles.y);
        let z = Mat4::rotate(Vec3::z_axis(), angles.z);
        z.then(&y).then(&x)
    }

    /// Camera-to-world transform for a camera sitting at `eye`, looking toward
    /// `center`, with `up` as the general up direction. The camera-space z
    /// axis maps onto the viewing direction.
    pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
        let forward = (eye - center).normalize();
        let side = forward.cross(up).normalize();
        let true_up = side.cross(forward).normalize();
        Mat4 {
            value: [
                side.x, true_up.x, -forward.x, eye.x, side.y, true_up.y, -forward.y, eye.y, side.z,
                true_up.z, -forward.z, eye.z, 0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Composes transforms so that `self` is applied first: `a.then(&b)` is `b * a`.
    pub fn then(&self, other: &Mat4) -> Mat4 {
        let mut value = [0.0; 16];
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += other.value[i * 4 + k] * self.value[k * 4 + j];
                }
                value[i * 4 + j] = sum;
            }
        }
        Mat4 { value }
    }

    /// Transforms a point, with an implicit homogeneous coordinate of 1.
    /// The perspective divide is only performed when the resulting w is nonzero.
    pub fn transform_pt(&self, v: Vec3) -> Vec3 {
        let m = &self.value;
        let x = m[0] * v.x + m[1] * v.y + m[2] * v.z + m[3];
        let y = m[4] * v.x + m[5] * v.y + m[6] * v.z + m[7];
        let z = m[8] * v.x + m[9] * v.y + m[10] * v.z + m[11];
        let w = m[12] * v.x + m[13] * v.y + m[14] * v.z + m[15];
        if w != 0.0 {
            Vec3::new(x / w, y / w, z / w)
        } else {
            Vec3::new(x, y, z)
        }
    }

    /// Transforms a direction, with an implicit homogeneous coordinate of 0:
    /// no translation and no perspective divide.
    pub fn transform_dir(&self, v: Vec3) -> Vec3 {
        let m = &self.value;
        Vec3::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z,
            m[4] * v.x + m[5] * v.y + m[6] * v.z,
            m[8] * v.x + m[9] * v.y + m[10] * v.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).len() < 1e-5
    }

    #[test]
    fn composition_applies_right_to_left() {
        // translate * scale scales first
        let m = Mat4::scale(Vec3::one() * 2.0).then(&Mat4::translate(Vec3::x_axis()));
        let p = m.transform_pt(Vec3::new(1.0, 1.0, 1.0));
        assert!(close(p, Vec3::new(3.0, 2.0, 2.0)));
    }

    #[test]
    fn directions_ignore_translation() {
        let m = Mat4::translate(Vec3::new(5.0, -2.0, 7.0));
        let d = m.transform_dir(Vec3::z_axis());
        assert!(close(d, Vec3::z_axis()));
    }

    #[test]
    fn rotation_about_z_turns_x_into_y() {
        let m = Mat4::rotate(Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        let d = m.transform_dir(Vec3::x_axis());
        assert!(close(d, Vec3::y_axis()));
    }

    #[test]
    fn look_at_maps_camera_z_onto_view_direction() {
        let eye = Vec3::new(0.0, 0.0, -1.0);
        let m = Mat4::look_at(eye, Vec3::zero(), Vec3::y_axis());
        assert!(close(m.transform_pt(Vec3::zero()), eye));
        assert!(close(m.transform_dir(Vec3::z_axis()), Vec3::z_axis()));
    }

    #[test]
    fn perspective_divide_only_when_w_is_nonzero() {
        let mut projective = Mat4::identity();
        // forward the z coordinate into w
        projective.value[14] = 1.0;
        projective.value[15] = 0.0;
        let p = projective.transform_pt(Vec3::new(2.0, 4.0, 2.0));
        assert!(close(p, Vec3::new(1.0, 2.0, 1.0)));
        let on_plane = projective.transform_pt(Vec3::new(2.0, 4.0, 0.0));
        assert!(close(on_plane, Vec3::new(2.0, 4.0, 0.0)));
    }
}
