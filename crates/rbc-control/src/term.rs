//! Common contract and state of the feedback terms.

use crate::error::{ControlError, Result};
use crate::timing::{Clock, ElapsedTimes, PhaseTimer};
use crate::{IntegralTerm, IntegralTermAntiWindup, PassivityPidTerm};
use nalgebra::Cholesky;
use rbc_math::{DMat, DVec};
use rbc_model::{Model, State};
use rbc_rigid::ForwardDynamics;

/// Base velocity gain `K`.
pub const PHASE_GAIN: &str = "computeFbTerm-Gain";
/// Coriolis contribution added to the gain.
pub const PHASE_GAIN_CORIOLIS: &str = "computeFbTerm-Gain-Coriolis";
/// Solve of `H γ̈ = P`.
pub const PHASE_GAMMA_D: &str = "computeFbTerm-GammaD";
/// Coriolis matrix of the PID term.
pub const PHASE_CORIOLIS: &str = "computeFbTerm-Coriolis";

/// Output and instrumentation shared by every term.
#[derive(Debug)]
pub struct FeedbackState {
    /// Corrective joint torque.
    pub p: DVec,
    /// Acceleration correction `H⁻¹ P`.
    pub gamma_d: DVec,
    pub timer: PhaseTimer,
}

impl FeedbackState {
    /// Zeroed output for `nv` DOFs, with the base phases and `extra_phases` registered.
    pub fn new(nv: usize, extra_phases: &[&'static str]) -> Self {
        let mut phases = vec![PHASE_GAIN, PHASE_GAIN_CORIOLIS, PHASE_GAMMA_D];
        phases.extend_from_slice(extra_phases);
        Self {
            p: DVec::zeros(nv),
            gamma_d: DVec::zeros(nv),
            timer: PhaseTimer::new(&phases),
        }
    }

    /// Solve `H γ̈ = p` by Cholesky factorization of `h`, then publish `p` and `γ̈`.
    ///
    /// When `h` is not positive definite the previous output is kept.
    pub fn commit(&mut self, p: DVec, h: &DMat) -> Result<()> {
        let started = self.timer.start();
        let chol = Cholesky::new(h.clone()).ok_or(ControlError::NotPositiveDefinite)?;
        self.gamma_d = chol.solve(&p);
        self.p = p;
        self.timer.stop(PHASE_GAMMA_D, started);
        Ok(())
    }

    /// Zero `P`, `γ̈` and the recorded phase durations.
    pub fn reset(&mut self) {
        self.p.fill(0.0);
        self.gamma_d.fill(0.0);
        self.timer.clear();
    }
}

fn expect_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(ControlError::DimensionMismatch { what, expected, got })
    }
}

/// Check that the engine and both states match `model` before any buffer is touched.
pub(crate) fn check_inputs(
    model: &Model,
    fd: &ForwardDynamics,
    real: &State,
    calc: &State,
) -> Result<()> {
    expect_len("H rows", model.nv, fd.h().nrows())?;
    expect_len("H columns", model.nv, fd.h().ncols())?;
    expect_len("real alpha", model.nv, real.alpha.len())?;
    expect_len("reference alpha", model.nv, calc.alpha.len())?;
    expect_len("real q", model.nq, real.q.len())?;
    expect_len("reference q", model.nq, calc.q.len())?;
    expect_len("real bodies", model.nbodies(), real.body_pos_w.len())?;
    expect_len("real body velocities", model.nbodies(), real.body_vel_b.len())
}

/// A torque feedback term driving the measured state `real` toward the reference `calc`.
///
/// The caller refreshes `fd` (mass matrix and bias) and the kinematic cache of
/// `real` for the current cycle before calling [`compute_term`](Self::compute_term).
pub trait TorqueFeedbackTerm {
    /// Update `P` and `γ̈` for this cycle.
    fn compute_term(
        &mut self,
        model: &Model,
        fd: &ForwardDynamics,
        real: &State,
        calc: &State,
    ) -> Result<()>;

    fn state(&self) -> &FeedbackState;

    fn state_mut(&mut self) -> &mut FeedbackState;

    /// Zero the output and all accumulated filter or integral state.
    fn reset(&mut self);

    fn p(&self) -> &DVec {
        &self.state().p
    }

    fn gamma_d(&self) -> &DVec {
        &self.state().gamma_d
    }

    /// Duration of each phase in the last call.
    fn elapsed_times(&self) -> &ElapsedTimes {
        self.state().timer.elapsed()
    }

    /// Replace the clock used for phase timing.
    fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.state_mut().timer.set_clock(clock);
    }
}

/// Any of the feedback terms.
#[derive(Debug)]
pub enum FeedbackTerm {
    Integral(IntegralTerm),
    IntegralAntiWindup(IntegralTermAntiWindup),
    PassivityPid(PassivityPidTerm),
}

impl FeedbackTerm {
    fn inner(&self) -> &dyn TorqueFeedbackTerm {
        match self {
            FeedbackTerm::Integral(t) => t,
            FeedbackTerm::IntegralAntiWindup(t) => t,
            FeedbackTerm::PassivityPid(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn TorqueFeedbackTerm {
        match self {
            FeedbackTerm::Integral(t) => t,
            FeedbackTerm::IntegralAntiWindup(t) => t,
            FeedbackTerm::PassivityPid(t) => t,
        }
    }
}

impl TorqueFeedbackTerm for FeedbackTerm {
    fn compute_term(
        &mut self,
        model: &Model,
        fd: &ForwardDynamics,
        real: &State,
        calc: &State,
    ) -> Result<()> {
        self.inner_mut().compute_term(model, fd, real, calc)
    }

    fn state(&self) -> &FeedbackState {
        self.inner().state()
    }

    fn state_mut(&mut self) -> &mut FeedbackState {
        self.inner_mut().state_mut()
    }

    fn reset(&mut self) {
        self.inner_mut().reset();
    }
}
