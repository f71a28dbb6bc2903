//! Rigid-body dynamics over a kinematic tree.
//!
//! - Forward kinematics and velocity propagation filling the `State` cache
//! - `ForwardDynamics`: mass matrix (CRBA), bias vector (RNEA with zero acceleration)
//!   and joint accelerations through a dense LDLᵀ solve
//! - World-frame body Jacobians and their time derivatives
//! - `Coriolis`: the Coriolis matrix with `Ḣ - 2C` skew-symmetric
//! - `inverse_dynamics` (full RNEA)

pub mod coriolis;
pub mod error;
pub mod fd;
pub mod jacobian;
pub mod kinematics;
pub mod ldlt;
pub mod rnea;

pub use coriolis::Coriolis;
pub use error::{DynamicsError, Result};
pub use fd::ForwardDynamics;
pub use jacobian::{jacobian, jacobian_dot};
pub use kinematics::{
    forward_kinematics, forward_velocity, tree_transform, update_kinematics, world_velocity,
};
pub use ldlt::Ldlt;
pub use rnea::inverse_dynamics;
