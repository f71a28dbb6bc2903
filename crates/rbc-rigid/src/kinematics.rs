//! Forward kinematics: fills the body transform and velocity cache of a `State`.

use crate::Result;
use rbc_math::{DVec, SpatialTransform, SpatialVec};
use rbc_model::{Model, State, check_state};

/// Parent-to-body transform of body `i` for positions `q`.
pub fn tree_transform(model: &Model, q: &DVec, i: usize) -> SpatialTransform {
    let body = &model.bodies[i];
    let joint = &model.joints[body.joint_idx];
    let q_idx = model.q_offsets[body.joint_idx];
    let x_joint = joint.joint_transform(&q.as_slice()[q_idx..q_idx + joint.nq()]);
    x_joint.compose(&joint.parent_to_joint)
}

/// Compute `parent_to_son` and `body_pos_w` (world → body) for every body.
pub fn forward_kinematics(model: &Model, state: &mut State) -> Result<()> {
    check_state(model, state)?;

    for i in 0..model.nbodies() {
        let x_tree = tree_transform(model, &state.q, i);
        state.parent_to_son[i] = x_tree;
        state.body_pos_w[i] = match model.bodies[i].parent_index() {
            None => x_tree,
            Some(pi) => x_tree.compose(&state.body_pos_w[pi]),
        };
    }

    Ok(())
}

/// Compute `body_vel_b` from `alpha`.
///
/// Uses the `parent_to_son` cache, so `forward_kinematics` must have run for the current `q`.
pub fn forward_velocity(model: &Model, state: &mut State) -> Result<()> {
    check_state(model, state)?;

    for i in 0..model.nbodies() {
        let body = &model.bodies[i];
        let joint = &model.joints[body.joint_idx];
        let v_idx = model.v_offsets[body.joint_idx];
        let v_joint = joint.joint_velocity(&state.alpha.as_slice()[v_idx..v_idx + joint.ndof()]);

        // v_i = X_tree * v_parent + S_i * α_i
        state.body_vel_b[i] = match body.parent_index() {
            None => v_joint,
            Some(pi) => state.parent_to_son[i].apply_motion(&state.body_vel_b[pi]) + v_joint,
        };
    }

    Ok(())
}

/// Run `forward_kinematics` then `forward_velocity`.
pub fn update_kinematics(model: &Model, state: &mut State) -> Result<()> {
    forward_kinematics(model, state)?;
    forward_velocity(model, state)
}

/// World-frame spatial velocity (at the world origin) of body `i`.
pub fn world_velocity(state: &State, i: usize) -> SpatialVec {
    state.body_pos_w[i].inv_apply_motion(&state.body_vel_b[i])
}
