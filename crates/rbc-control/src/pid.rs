//! Passivity-based PID on velocity, position and integrated position error.
//!
//! With `M = H` and the Coriolis matrix `C` of the measured state:
//!
//! ```text
//! Ka = β M        L  = σ M
//! Kv = λ M + C + Ka
//! Kp = μ M + λ (C + Ka) + L
//! Ki = μ (C + Ka) + c λ L
//! P  = Kv s + Kp e + Ki E,   E ← E + e dt
//! ```

use crate::config::PassivityPidConfig;
use crate::error::Result;
use crate::term::{
    FeedbackState, PHASE_CORIOLIS, PHASE_GAIN, TorqueFeedbackTerm, check_inputs,
};
use rbc_math::{DMat, DVec, Quat};
use rbc_model::{JointType, Model, State};
use rbc_rigid::{Coriolis, ForwardDynamics};
use std::collections::HashSet;

#[derive(Debug)]
pub struct PassivityPidTerm {
    config: PassivityPidConfig,
    base: FeedbackState,
    coriolis: Coriolis,
    c: DMat,
    kv: DMat,
    kp: DMat,
    ki: DMat,
    e: DVec,
    /// Integrated position error `E`.
    integral_error: DVec,
    /// Joints already reported as unsupported by the error map.
    warned: HashSet<usize>,
}

impl PassivityPidTerm {
    pub fn new(model: &Model, config: PassivityPidConfig) -> Self {
        let nv = model.nv;
        Self {
            config,
            base: FeedbackState::new(nv, &[PHASE_CORIOLIS]),
            coriolis: Coriolis::new(model),
            c: DMat::zeros(nv, nv),
            kv: DMat::zeros(nv, nv),
            kp: DMat::zeros(nv, nv),
            ki: DMat::zeros(nv, nv),
            e: DVec::zeros(nv),
            integral_error: DVec::zeros(nv),
            warned: HashSet::new(),
        }
    }

    pub fn config(&self) -> &PassivityPidConfig {
        &self.config
    }

    pub fn coriolis_matrix(&self) -> &DMat {
        &self.c
    }

    pub fn velocity_gain(&self) -> &DMat {
        &self.kv
    }

    pub fn position_gain(&self) -> &DMat {
        &self.kp
    }

    pub fn integral_gain(&self) -> &DMat {
        &self.ki
    }

    /// Position error of the last cycle.
    pub fn position_error(&self) -> &DVec {
        &self.e
    }

    pub fn integral_error(&self) -> &DVec {
        &self.integral_error
    }

    fn compute_gains(&mut self, m: &DMat) {
        let PassivityPidConfig {
            beta,
            lambda,
            mu,
            sigma,
            cis,
            ..
        } = self.config;
        let c_ka = &self.c + m * beta;
        let l = m * sigma;
        self.kv = m * lambda + &c_ka;
        self.kp = m * mu + &c_ka * lambda + &l;
        self.ki = c_ka * mu + l * (cis * lambda);
    }

    /// Position error of `calc` relative to `real`.
    ///
    /// Revolute and prismatic joints use the plain difference, free joints the
    /// rotation vector of `q_ref q_realᶜ` followed by the translation difference.
    /// Other joint types are reported once and leave their DOFs at zero.
    fn measure_position_error(&mut self, model: &Model, real: &State, calc: &State) -> DVec {
        let mut e = DVec::zeros(model.nv);
        for (idx, joint) in model.joints.iter().enumerate() {
            let qi = model.q_offsets[idx];
            let vi = model.v_offsets[idx];
            match joint.joint_type {
                JointType::Revolute | JointType::Prismatic => {
                    e[vi] = calc.q[qi] - real.q[qi];
                }
                JointType::Free => {
                    let q_ref = Quat::from_slice(&calc.q.as_slice()[qi..qi + 4]).normalize();
                    let q_hat = Quat::from_slice(&real.q.as_slice()[qi..qi + 4]).normalize();
                    let rot = q_ref.mul(&q_hat.conjugate()).canonical().log();
                    for k in 0..3 {
                        e[vi + k] = rot[k];
                        e[vi + 3 + k] = calc.q[qi + 4 + k] - real.q[qi + 4 + k];
                    }
                }
                other => {
                    if self.warned.insert(idx) {
                        tracing::warn!(
                            joint = %joint.name,
                            joint_type = ?other,
                            "position error not defined for joint type, ignoring its DOFs"
                        );
                    }
                }
            }
        }
        e
    }
}

impl TorqueFeedbackTerm for PassivityPidTerm {
    fn compute_term(
        &mut self,
        model: &Model,
        fd: &ForwardDynamics,
        real: &State,
        calc: &State,
    ) -> Result<()> {
        check_inputs(model, fd, real, calc)?;

        let started = self.base.timer.start();
        self.c = self.coriolis.coriolis(model, real)?;
        self.base.timer.stop(PHASE_CORIOLIS, started);

        let started = self.base.timer.start();
        self.compute_gains(fd.h());
        self.base.timer.stop(PHASE_GAIN, started);

        let s = &calc.alpha - &real.alpha;
        let e = self.measure_position_error(model, real, calc);
        let integral_error = &self.integral_error + &e * self.config.time_step;

        let p = &self.kv * s + &self.kp * &e + &self.ki * &integral_error;
        self.base.commit(p, fd.h())?;
        self.e = e;
        self.integral_error = integral_error;
        Ok(())
    }

    fn state(&self) -> &FeedbackState {
        &self.base
    }

    fn state_mut(&mut self) -> &mut FeedbackState {
        &mut self.base
    }

    fn reset(&mut self) {
        self.base.reset();
        self.c.fill(0.0);
        self.kv.fill(0.0);
        self.kp.fill(0.0);
        self.ki.fill(0.0);
        self.e.fill(0.0);
        self.integral_error.fill(0.0);
    }
}
