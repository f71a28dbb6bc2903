//! Dimension checks between a model and the vectors sized from it.

use crate::{Model, ModelError, Result, State};
use rbc_math::DVec;

fn expect_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch {
            what,
            expected,
            got,
        })
    }
}

/// Check that a vector has `expected` entries.
pub fn check_vector(what: &'static str, v: &DVec, expected: usize) -> Result<()> {
    expect_len(what, expected, v.len())
}

/// Check every vector and cache of `state` against the dimensions of `model`.
pub fn check_state(model: &Model, state: &State) -> Result<()> {
    let nb = model.nbodies();
    check_vector("q", &state.q, model.nq)?;
    check_vector("alpha", &state.alpha, model.nv)?;
    check_vector("alpha_d", &state.alpha_d, model.nv)?;
    check_vector("joint_torque", &state.joint_torque, model.nv)?;
    expect_len("force", nb, state.force.len())?;
    expect_len("parent_to_son", nb, state.parent_to_son.len())?;
    expect_len("body_pos_w", nb, state.body_pos_w.len())?;
    expect_len("body_vel_b", nb, state.body_vel_b.len())
}
