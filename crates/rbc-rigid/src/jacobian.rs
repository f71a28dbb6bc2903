//! World-frame spatial Jacobians of bodies and their time derivatives.
//!
//! Columns are spatial motion vectors expressed in world coordinates at the
//! world origin. Only the DOFs of the body and its ancestors are non-zero.

use crate::kinematics::world_velocity;
use rbc_math::Mat6xX;
use rbc_model::{Model, State};

fn supporting_bodies(model: &Model, body: usize) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(body).chain(model.ancestors(body))
}

/// Write the 6 × nv Jacobian `J` of `body` into `out`, so that `V_body = J α`.
pub fn jacobian(model: &Model, state: &State, body: usize, out: &mut Mat6xX) {
    out.fill(0.0);
    for b in supporting_bodies(model, body) {
        let joint = &model.joints[model.bodies[b].joint_idx];
        let v_idx = model.v_offsets[model.bodies[b].joint_idx];
        for k in 0..joint.ndof() {
            let s_w = state.body_pos_w[b].inv_apply_motion(&joint.motion_subspace_column(k));
            out.column_mut(v_idx + k).copy_from(&s_w.data);
        }
    }
}

/// Write the time derivative `J̇` of the Jacobian of `body` into `out`.
///
/// The column of DOF `k`, carried by body `b`, is `V_b ×ₘ S_k` in world coordinates.
pub fn jacobian_dot(model: &Model, state: &State, body: usize, out: &mut Mat6xX) {
    out.fill(0.0);
    for b in supporting_bodies(model, body) {
        let joint = &model.joints[model.bodies[b].joint_idx];
        let v_idx = model.v_offsets[model.bodies[b].joint_idx];
        let v_w = world_velocity(state, b);
        for k in 0..joint.ndof() {
            let s_w = state.body_pos_w[b].inv_apply_motion(&joint.motion_subspace_column(k));
            out.column_mut(v_idx + k).copy_from(&v_w.cross_motion(&s_w).data);
        }
    }
}
