//! Rigid-body dynamics and model-based torque feedback for articulated robots.
//!
//! This is the umbrella crate that provides the `ControlSession` and
//! re-exports core types from sub-crates.

pub use rbc_control::{
    self, AntiWindupConfig, ControlError, FeedbackConfig, FeedbackTerm, IntegralTerm,
    IntegralTermAntiWindup, IntegralTermConfig, IntegralTermType, PassivityPidConfig,
    PassivityPidTerm, SaturationStrategy, TorqueFeedbackTerm, VelocityGainType,
};
pub use rbc_math::{self, DMat, DVec, Quat, SpatialInertia, SpatialTransform, SpatialVec, Vec3};
pub use rbc_model::{self, Joint, JointType, Model, ModelBuilder, State};
pub use rbc_rigid::{
    self, Coriolis, DynamicsError, ForwardDynamics, inverse_dynamics, update_kinematics,
};

/// One control loop: the model, the dynamics engine it owns, and a feedback term.
///
/// Each [`cycle`](Self::cycle) refreshes the kinematic cache of the measured
/// state, recomputes `H` and `C` for it, then runs the feedback term against
/// the reference. The term only ever sees the engine by shared reference.
#[derive(Debug)]
pub struct ControlSession {
    model: Model,
    fd: ForwardDynamics,
    term: FeedbackTerm,
}

impl ControlSession {
    pub fn new(model: Model, term: FeedbackTerm) -> Self {
        let fd = ForwardDynamics::new(&model);
        tracing::debug!(nv = model.nv, nbodies = model.nbodies(), "control session ready");
        Self { model, fd, term }
    }

    /// Validate `config` against `model` and build the session around the configured term.
    pub fn from_config(model: Model, config: &FeedbackConfig) -> rbc_control::Result<Self> {
        let term = config.build(&model)?;
        Ok(Self::new(model, term))
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Engine holding `H` and `C` of the last cycle.
    pub fn dynamics(&self) -> &ForwardDynamics {
        &self.fd
    }

    pub fn term(&self) -> &FeedbackTerm {
        &self.term
    }

    pub fn term_mut(&mut self) -> &mut FeedbackTerm {
        &mut self.term
    }

    /// Run one control cycle and return the corrective torque `P`.
    ///
    /// On error the previous `P` and `γ̈` stay in the term. A
    /// [`ControlError::PassivityViolation`] must stop actuation.
    pub fn cycle(&mut self, real: &mut State, calc: &State) -> rbc_control::Result<&DVec> {
        update_kinematics(&self.model, real)?;
        self.fd.s_compute_h(&self.model, real)?;
        self.fd.s_compute_c(&self.model, real)?;
        self.term.compute_term(&self.model, &self.fd, real, calc)?;
        Ok(self.term.p())
    }

    /// Solve the joint accelerations of `state` under its `joint_torque` with the session engine.
    ///
    /// This overwrites `H` and `C` with the values for `state`.
    pub fn forward_dynamics(&mut self, state: &mut State) -> rbc_rigid::Result<()> {
        update_kinematics(&self.model, state)?;
        self.fd.s_forward_dynamics(&self.model, state)
    }

    /// Zero the feedback term's output and accumulated state.
    pub fn reset(&mut self) {
        self.term.reset();
    }
}
