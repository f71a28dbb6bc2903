//! Configuration snapshot: per-cycle generalized state plus kinematic cache.

use rbc_math::{DVec, SpatialTransform, SpatialVec, Vec3};

/// Mutable configuration of a mechanism at one instant.
#[derive(Debug, Clone)]
pub struct State {
    /// Generalized positions (length `nq`).
    pub q: DVec,
    /// Generalized velocities (length `nv`).
    pub alpha: DVec,
    /// Generalized accelerations (length `nv`), written by forward dynamics.
    pub alpha_d: DVec,
    /// Applied joint torques (length `nv`).
    pub joint_torque: DVec,
    /// External spatial force on each body, world coordinates, moments about the world origin.
    pub force: Vec<SpatialVec>,
    /// Gravity vector in world frame.
    pub gravity: Vec3,

    // Cached quantities (filled by forward kinematics / velocity)
    /// Parent-to-body transform of each body.
    pub parent_to_son: Vec<SpatialTransform>,
    /// World-to-body transform of each body.
    pub body_pos_w: Vec<SpatialTransform>,
    /// Spatial velocity of each body in its own frame.
    pub body_vel_b: Vec<SpatialVec>,
}

impl State {
    /// Create a zero-initialized state for `nq` position parameters and `nv` DOFs.
    ///
    /// Quaternion slots are zero too; use `Model::default_state` for a valid configuration.
    pub fn new(nq: usize, nv: usize, nbodies: usize) -> Self {
        Self {
            q: DVec::zeros(nq),
            alpha: DVec::zeros(nv),
            alpha_d: DVec::zeros(nv),
            joint_torque: DVec::zeros(nv),
            force: vec![SpatialVec::zero(); nbodies],
            gravity: Vec3::zeros(),
            parent_to_son: vec![SpatialTransform::identity(); nbodies],
            body_pos_w: vec![SpatialTransform::identity(); nbodies],
            body_vel_b: vec![SpatialVec::zero(); nbodies],
        }
    }
}
