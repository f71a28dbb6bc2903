//! Spatial (6D) vectors, Plücker transforms and rigid-body inertia.
//!
//! Motion vectors are `[ω; v]`, force vectors `[n; f]`. Both use the same
//! [`SpatialVec`] type; which cross product or transform applies is chosen
//! by the method called.

use crate::{Mat3, Mat6, Vec3, Vec6, skew};
use std::ops::{Add, AddAssign, Mul, Sub};

/// Assemble a 6x6 matrix from its four 3x3 blocks.
fn blocks(tl: &Mat3, tr: &Mat3, bl: &Mat3, br: &Mat3) -> Mat6 {
    let mut m = Mat6::zeros();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(tl);
    m.fixed_view_mut::<3, 3>(0, 3).copy_from(tr);
    m.fixed_view_mut::<3, 3>(3, 0).copy_from(bl);
    m.fixed_view_mut::<3, 3>(3, 3).copy_from(br);
    m
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialVec {
    pub data: Vec6,
}

impl SpatialVec {
    #[inline]
    pub fn new(angular: Vec3, linear: Vec3) -> Self {
        let mut data = Vec6::zeros();
        data.fixed_rows_mut::<3>(0).copy_from(&angular);
        data.fixed_rows_mut::<3>(3).copy_from(&linear);
        Self { data }
    }

    #[inline]
    pub fn zero() -> Self {
        Self { data: Vec6::zeros() }
    }

    #[inline]
    pub fn angular(&self) -> Vec3 {
        self.data.fixed_rows::<3>(0).into_owned()
    }

    #[inline]
    pub fn linear(&self) -> Vec3 {
        self.data.fixed_rows::<3>(3).into_owned()
    }

    /// `self ×ₘ m`: derivative of the motion vector `m` moving with velocity `self`.
    pub fn cross_motion(&self, m: &SpatialVec) -> SpatialVec {
        let (w, v) = (self.angular(), self.linear());
        SpatialVec::new(w.cross(&m.angular()), w.cross(&m.linear()) + v.cross(&m.angular()))
    }

    /// `self ×f f`: derivative of the force `f` moving with velocity `self`.
    pub fn cross_force(&self, f: &SpatialVec) -> SpatialVec {
        let (w, v) = (self.angular(), self.linear());
        SpatialVec::new(w.cross(&f.angular()) + v.cross(&f.linear()), w.cross(&f.linear()))
    }

    /// Matrix of `self ×ₘ`.
    pub fn crm(&self) -> Mat6 {
        let wx = skew(&self.angular());
        blocks(&wx, &Mat3::zeros(), &skew(&self.linear()), &wx)
    }

    /// Matrix of `self ×f`, equal to `-crm()ᵀ`.
    pub fn crf(&self) -> Mat6 {
        let wx = skew(&self.angular());
        blocks(&wx, &skew(&self.linear()), &Mat3::zeros(), &wx)
    }

    /// Pairing of a motion and a force vector (power).
    #[inline]
    pub fn dot(&self, other: &SpatialVec) -> f64 {
        self.data.dot(&other.data)
    }
}

impl Add for SpatialVec {
    type Output = SpatialVec;
    fn add(self, rhs: SpatialVec) -> SpatialVec {
        SpatialVec { data: self.data + rhs.data }
    }
}

impl AddAssign for SpatialVec {
    fn add_assign(&mut self, rhs: SpatialVec) {
        self.data += rhs.data;
    }
}

impl Sub for SpatialVec {
    type Output = SpatialVec;
    fn sub(self, rhs: SpatialVec) -> SpatialVec {
        SpatialVec { data: self.data - rhs.data }
    }
}

impl Mul<f64> for SpatialVec {
    type Output = SpatialVec;
    fn mul(self, k: f64) -> SpatialVec {
        SpatialVec { data: self.data * k }
    }
}

/// Spatial inertia in matrix form, or any other motion-to-force map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMat {
    pub data: Mat6,
}

impl SpatialMat {
    #[inline]
    pub fn from_mat6(data: Mat6) -> Self {
        Self { data }
    }

    #[inline]
    pub fn zero() -> Self {
        Self { data: Mat6::zeros() }
    }

    #[inline]
    pub fn mul_vec(&self, v: &SpatialVec) -> SpatialVec {
        SpatialVec { data: self.data * v.data }
    }

    /// `Xᵀ · self · X`, with `X` a motion transform from frame A to frame B
    /// and `self` expressed in B. The result is the same inertia in A.
    #[inline]
    pub fn congruence(&self, x: &Mat6) -> SpatialMat {
        SpatialMat { data: x.transpose() * self.data * x }
    }
}

impl AddAssign for SpatialMat {
    fn add_assign(&mut self, rhs: SpatialMat) {
        self.data += rhs.data;
    }
}

/// Plücker coordinate transform from frame A to frame B.
///
/// `rot` maps A coordinates into B and `pos` is the origin of B expressed
/// in A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialTransform {
    pub rot: Mat3,
    pub pos: Vec3,
}

impl SpatialTransform {
    pub fn new(rot: Mat3, pos: Vec3) -> Self {
        Self { rot, pos }
    }

    pub fn identity() -> Self {
        Self::translation(Vec3::zeros())
    }

    pub fn translation(pos: Vec3) -> Self {
        Self { rot: Mat3::identity(), pos }
    }

    /// Frame rotated by `angle` about A's X axis.
    pub fn rot_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(Mat3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c), Vec3::zeros())
    }

    /// Frame rotated by `angle` about A's Y axis.
    pub fn rot_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(Mat3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c), Vec3::zeros())
    }

    /// Frame rotated by `angle` about A's Z axis.
    pub fn rot_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(Mat3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0), Vec3::zeros())
    }

    /// `[E 0; -E[r]× E]`, the matrix acting on motion vectors.
    pub fn to_motion_matrix(&self) -> Mat6 {
        let e = self.rot;
        blocks(&e, &Mat3::zeros(), &(-e * skew(&self.pos)), &e)
    }

    pub fn apply_motion(&self, m: &SpatialVec) -> SpatialVec {
        let w = m.angular();
        SpatialVec::new(self.rot * w, self.rot * (m.linear() - self.pos.cross(&w)))
    }

    pub fn apply_force(&self, f: &SpatialVec) -> SpatialVec {
        let lin = f.linear();
        SpatialVec::new(self.rot * (f.angular() - self.pos.cross(&lin)), self.rot * lin)
    }

    /// Motion vector in B mapped back to A.
    pub fn inv_apply_motion(&self, m: &SpatialVec) -> SpatialVec {
        let w = self.rot.tr_mul(&m.angular());
        SpatialVec::new(w, self.rot.tr_mul(&m.linear()) + self.pos.cross(&w))
    }

    /// Force vector in B mapped back to A.
    pub fn inv_apply_force(&self, f: &SpatialVec) -> SpatialVec {
        let lin = self.rot.tr_mul(&f.linear());
        SpatialVec::new(self.rot.tr_mul(&f.angular()) + self.pos.cross(&lin), lin)
    }

    /// `self · first`: apply `first` (A to B), then `self` (B to C).
    pub fn compose(&self, first: &SpatialTransform) -> SpatialTransform {
        SpatialTransform {
            rot: self.rot * first.rot,
            pos: first.pos + first.rot.tr_mul(&self.pos),
        }
    }
}

/// Mass properties of a body, expressed in the body frame.
///
/// `inertia` is the rotational inertia about the center of mass `com`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialInertia {
    pub mass: f64,
    pub com: Vec3,
    pub inertia: Mat3,
}

impl SpatialInertia {
    pub fn new(mass: f64, com: Vec3, inertia: Mat3) -> Self {
        Self { mass, com, inertia }
    }

    pub fn point_mass(mass: f64, pos: Vec3) -> Self {
        Self::new(mass, pos, Mat3::zeros())
    }

    /// Thin uniform rod along Y, centered on the origin.
    pub fn rod(mass: f64, length: f64) -> Self {
        let i = mass * length * length / 12.0;
        Self::new(mass, Vec3::zeros(), Mat3::from_diagonal(&Vec3::new(i, 0.0, i)))
    }

    pub fn sphere(mass: f64, radius: f64) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self::new(mass, Vec3::zeros(), Mat3::from_diagonal_element(i))
    }

    /// Solid box with edge lengths `size`.
    pub fn cuboid(mass: f64, size: Vec3) -> Self {
        let sq = size.component_mul(&size);
        let diag = Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 12.0);
        Self::new(mass, Vec3::zeros(), Mat3::from_diagonal(&diag))
    }

    pub fn with_com(mut self, com: Vec3) -> Self {
        self.com = com;
        self
    }

    /// 6x6 inertia about the body frame origin:
    /// `[I_c + m[c]×[c]×ᵀ  m[c]×; m[c]×ᵀ  m·1]`.
    pub fn to_matrix(&self) -> SpatialMat {
        let mc = skew(&self.com) * self.mass;
        let rot = self.inertia + mc * skew(&self.com).transpose();
        SpatialMat::from_mat6(blocks(
            &rot,
            &mc,
            &mc.transpose(),
            &Mat3::from_diagonal_element(self.mass),
        ))
    }
}
