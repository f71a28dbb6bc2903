//! Coriolis matrix of a kinematic tree.
//!
//! C(q, α) = Σᵢ Jᵢᵀ (Iᵢ J̇ᵢ + (Vᵢ ×*) Iᵢ Jᵢ)
//!
//! with `Jᵢ`, `J̇ᵢ`, `Vᵢ` and the spatial inertia `Iᵢ` all expressed in world
//! coordinates at the world origin. With this factorization `C α` is the
//! velocity-product part of the bias vector and `Ḣ - 2C` is skew-symmetric.

use crate::jacobian::{jacobian, jacobian_dot};
use crate::kinematics::world_velocity;
use crate::Result;
use rbc_math::{DMat, Mat6xX};
use rbc_model::{Model, State, check_state};

/// Coriolis matrix computer with per-model scratch buffers.
#[derive(Debug, Clone)]
pub struct Coriolis {
    jac: Mat6xX,
    jac_dot: Mat6xX,
}

impl Coriolis {
    /// Size the scratch buffers for `model`.
    pub fn new(model: &Model) -> Self {
        Self {
            jac: Mat6xX::zeros(model.nv),
            jac_dot: Mat6xX::zeros(model.nv),
        }
    }

    /// Compute the n × n Coriolis matrix for the kinematic cache of `state`.
    pub fn coriolis(&mut self, model: &Model, state: &State) -> Result<DMat> {
        check_state(model, state)?;
        if self.jac.ncols() != model.nv {
            *self = Self::new(model);
        }

        let mut c = DMat::zeros(model.nv, model.nv);
        for i in 0..model.nbodies() {
            jacobian(model, state, i, &mut self.jac);
            jacobian_dot(model, state, i, &mut self.jac_dot);

            let x = state.body_pos_w[i].to_motion_matrix();
            let inertia_w = model.bodies[i].inertia.to_matrix().congruence(&x).data;
            let v_w = world_velocity(state, i);

            let momentum_rate = inertia_w * &self.jac_dot + v_w.crf() * inertia_w * &self.jac;
            c += self.jac.transpose() * momentum_rate;
        }

        Ok(c)
    }
}
