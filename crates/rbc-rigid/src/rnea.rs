//! Inverse dynamics by the recursive Newton-Euler algorithm.
//!
//! Given (q, α, α̈), compute the joint torques τ. Reads the kinematic cache of
//! the `State`; external forces and gravity are taken into account.

use crate::Result;
use rbc_math::{DVec, SpatialVec, Vec3};
use rbc_model::{Model, State, check_state, check_vector};

/// Compute the torques producing `alpha_d` in the configuration of `state`.
pub fn inverse_dynamics(model: &Model, state: &State, alpha_d: &DVec) -> Result<DVec> {
    check_state(model, state)?;
    check_vector("alpha_d", alpha_d, model.nv)?;

    let nb = model.nbodies();
    let mut tau = DVec::zeros(model.nv);
    let mut acc = vec![SpatialVec::zero(); nb];
    let mut forces = vec![SpatialVec::zero(); nb];

    let a0 = SpatialVec::new(Vec3::zeros(), -state.gravity);

    // ── Forward pass: accelerations and body forces ──
    for i in 0..nb {
        let body = &model.bodies[i];
        let joint = &model.joints[body.joint_idx];
        let v_idx = model.v_offsets[body.joint_idx];
        let ndof = joint.ndof();

        let v_joint = joint.joint_velocity(&state.alpha.as_slice()[v_idx..v_idx + ndof]);
        let a_joint = joint.joint_velocity(&alpha_d.as_slice()[v_idx..v_idx + ndof]);
        let vel = state.body_vel_b[i];

        let a_parent = match body.parent_index() {
            None => a0,
            Some(pi) => acc[pi],
        };
        acc[i] = state.parent_to_son[i].apply_motion(&a_parent)
            + vel.cross_motion(&v_joint)
            + a_joint;

        let ia = body.inertia.to_matrix();
        let f_ext = state.body_pos_w[i].apply_force(&state.force[i]);
        forces[i] = ia.mul_vec(&acc[i]) + vel.cross_force(&ia.mul_vec(&vel)) - f_ext;
    }

    // ── Backward pass: joint torques ──
    for i in (0..nb).rev() {
        let body = &model.bodies[i];
        let joint = &model.joints[body.joint_idx];
        let v_idx = model.v_offsets[body.joint_idx];

        for k in 0..joint.ndof() {
            tau[v_idx + k] = joint.motion_subspace_column(k).dot(&forces[i]);
        }

        if let Some(pi) = body.parent_index() {
            let f_parent = state.parent_to_son[i].inv_apply_force(&forces[i]);
            forces[pi] += f_parent;
        }
    }

    Ok(tau)
}
