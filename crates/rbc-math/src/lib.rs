//! Math layer shared by the rbc crates.
//!
//! Spatial vectors are stored `[angular; linear]`. Transforms follow the
//! Plücker convention `X = (E, r)`: `E` rotates parent coordinates into the
//! child frame and `r` is the child origin expressed in the parent.

pub mod quaternion;
pub mod spatial;

pub use quaternion::Quat;
pub use spatial::{SpatialInertia, SpatialMat, SpatialTransform, SpatialVec};

use nalgebra as na;

pub type Vec3 = na::Vector3<f64>;
pub type Mat3 = na::Matrix3<f64>;
pub type Vec6 = na::Vector6<f64>;
pub type Mat6 = na::Matrix6<f64>;
pub type DVec = na::DVector<f64>;
pub type DMat = na::DMatrix<f64>;
/// One spatial vector per column; Jacobians and their derivatives.
pub type Mat6xX = na::Matrix6xX<f64>;

/// `[v]×`, so that `skew(v) * w == v.cross(w)`.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    v.cross_matrix()
}

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.81;
