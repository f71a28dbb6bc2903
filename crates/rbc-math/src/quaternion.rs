//! Orientation quaternions of free joints.
//!
//! Free-joint coordinates store the orientation as `[w, x, y, z]` with the
//! scalar first. `Quat` keeps that layout so reading and writing joint
//! positions is a plain slice copy.

use crate::{Mat3, Vec3};

/// Rotation quaternion, scalar part `w` and vector part `v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub v: Vec3,
}

impl Quat {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, v: Vec3::new(x, y, z) }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Read `[w, x, y, z]` from the head of `s`.
    ///
    /// Panics if `s` has fewer than four entries.
    pub fn from_slice(s: &[f64]) -> Self {
        Self::new(s[0], s[1], s[2], s[3])
    }

    /// Layout used in joint position vectors.
    pub fn to_array(&self) -> [f64; 4] {
        [self.w, self.v.x, self.v.y, self.v.z]
    }

    /// Rotation of `angle` radians about the unit vector `axis`.
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Self {
        let (s, c) = (0.5 * angle).sin_cos();
        Self { w: c, v: axis * s }
    }

    /// Unit-length copy. A (near) zero quaternion maps to the identity.
    pub fn normalize(&self) -> Self {
        let n = (self.w * self.w + self.v.norm_squared()).sqrt();
        if n < 1e-12 {
            Self::identity()
        } else {
            Self { w: self.w / n, v: self.v / n }
        }
    }

    /// Sign choice with `w >= 0`; `q` and `-q` encode the same rotation.
    pub fn canonical(&self) -> Self {
        if self.w < 0.0 { Self { w: -self.w, v: -self.v } } else { *self }
    }

    /// Hamilton product `self * rhs`.
    pub fn mul(&self, rhs: &Quat) -> Quat {
        Quat {
            w: self.w * rhs.w - self.v.dot(&rhs.v),
            v: rhs.v * self.w + self.v * rhs.w + self.v.cross(&rhs.v),
        }
    }

    pub fn conjugate(&self) -> Quat {
        Quat { w: self.w, v: -self.v }
    }

    /// Rotation matrix of a unit quaternion, `R = I + 2w[v]× + 2[v]×²`.
    pub fn to_matrix(&self) -> Mat3 {
        let vx = crate::skew(&self.v);
        Mat3::identity() + vx * (2.0 * self.w) + vx * vx * 2.0
    }

    /// Rotation vector `θu` with `exp(θu) = self`.
    ///
    /// Exactly zero when the vector part vanishes. For a canonical unit
    /// quaternion the angle lies in `[0, π]`.
    pub fn log(&self) -> Vec3 {
        let s = self.v.norm();
        if s < 1e-10 {
            return Vec3::zeros();
        }
        self.v * (2.0 * s.atan2(self.w) / s)
    }
}
