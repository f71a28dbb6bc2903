//! Velocity-error feedback saturated to the actuator envelope.
//!
//! `P = K s` is brought inside `[perc τ_L, perc τ_U]` without letting `P·s`
//! drop, then the Coriolis feedforward `C s` is added. The six DOFs of the
//! first free joint are bounded by `diag(H_jj) ⊙ [a_ang; a_lin]` instead of
//! torque limits.

use crate::config::{AntiWindupConfig, IntegralTermType, SaturationStrategy};
use crate::error::{ControlError, Result};
use crate::integral::IntegralTerm;
use crate::saturation::{Envelope, check_passivity, saturate_iterative, saturate_scalar};
use crate::term::{FeedbackState, TorqueFeedbackTerm, check_inputs};
use rbc_math::{DMat, DVec};
use rbc_model::{JointType, Model, State};
use rbc_rigid::ForwardDynamics;

#[derive(Debug)]
pub struct IntegralTermAntiWindup {
    integral: IntegralTerm,
    config: AntiWindupConfig,
    /// DOF offset of the first free joint.
    free_dof: Option<usize>,
    envelope: Envelope,
    saturated_gain: DMat,
    iterations: usize,
}

impl IntegralTermAntiWindup {
    /// Build for `model`; `config` is expected to have passed [`AntiWindupConfig::validate`].
    pub fn new(model: &Model, config: AntiWindupConfig) -> Self {
        let free_dof = model
            .joints
            .iter()
            .position(|j| j.joint_type == JointType::Free)
            .map(|j| model.joint_pos_in_dof(j));
        let nv = model.nv;
        Self {
            integral: IntegralTerm::new(model, config.integral.clone()),
            config,
            free_dof,
            envelope: Envelope::zeros(nv),
            saturated_gain: DMat::zeros(nv, nv),
            iterations: 0,
        }
    }

    pub fn config(&self) -> &AntiWindupConfig {
        &self.config
    }

    /// Gain `K` before saturation.
    pub fn gain(&self) -> &DMat {
        self.integral.gain()
    }

    /// Gain after iterative rescaling; equal to [`gain`](Self::gain) when nothing was saturated.
    pub fn saturated_gain(&self) -> &DMat {
        &self.saturated_gain
    }

    /// Envelope used in the last cycle.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Rescaling iterations of the last cycle.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn update_envelope(&mut self, h: &DMat) {
        let perc = self.config.perc;
        for i in 0..self.envelope.len() {
            self.envelope.lower[i] = perc * self.config.torque_lower[i];
            self.envelope.upper[i] = perc * self.config.torque_upper[i];
        }
        if let Some(j) = self.free_dof {
            let acc = self
                .config
                .max_angular_acc
                .iter()
                .chain(self.config.max_linear_acc.iter());
            for (k, &a) in acc.enumerate() {
                let bound = h[(j + k, j + k)] * a;
                self.envelope.upper[j + k] = bound;
                self.envelope.lower[j + k] = -bound;
            }
        }
    }
}

impl TorqueFeedbackTerm for IntegralTermAntiWindup {
    fn compute_term(
        &mut self,
        model: &Model,
        fd: &ForwardDynamics,
        real: &State,
        calc: &State,
    ) -> Result<()> {
        let term_type = self.config.integral.term_type;
        if term_type == IntegralTermType::None {
            return Ok(());
        }
        check_inputs(model, fd, real, calc)?;
        for (what, limits) in [
            ("torque lower limits", &self.config.torque_lower),
            ("torque upper limits", &self.config.torque_upper),
        ] {
            if limits.len() != model.nv {
                return Err(ControlError::DimensionMismatch {
                    what,
                    expected: model.nv,
                    got: limits.len(),
                });
            }
        }
        self.integral.compute_gain(model, fd, real)?;

        let s = &calc.alpha - &real.alpha;
        self.update_envelope(fd.h());
        self.saturated_gain.copy_from(self.integral.gain());

        let mut p = DVec::zeros(model.nv);
        let sat = match self.config.strategy {
            SaturationStrategy::Iterative => saturate_iterative(
                &mut self.saturated_gain,
                &s,
                &self.envelope,
                self.config.max_iterations,
                self.config.inflation,
                &mut p,
            )?,
            SaturationStrategy::ScalarExcess => {
                p = &self.saturated_gain * &s;
                saturate_scalar(&mut p, &s, &self.envelope)
            }
        };
        if sat.iterations > 0 {
            tracing::debug!(iterations = sat.iterations, "saturated feedback gain");
        }
        check_passivity(&p, &s, sat.floor)?;

        if term_type == IntegralTermType::PassivityBased {
            p += &self.integral.c * &s;
        }
        self.integral.base.commit(p, fd.h())?;
        self.iterations = sat.iterations;
        Ok(())
    }

    fn state(&self) -> &FeedbackState {
        self.integral.state()
    }

    fn state_mut(&mut self) -> &mut FeedbackState {
        self.integral.state_mut()
    }

    fn reset(&mut self) {
        self.integral.reset();
        self.saturated_gain.fill(0.0);
        self.envelope = Envelope::zeros(self.envelope.len());
        self.iterations = 0;
    }
}
