//! Torque feedback terms driving a measured state toward a reference.
//!
//! Every term consumes the mass matrix and bias vector of a
//! [`ForwardDynamics`](rbc_rigid::ForwardDynamics) refreshed by the caller for
//! the current cycle, and produces a corrective torque `P` together with the
//! acceleration correction `γ̈ = H⁻¹ P`.
//!
//! - [`IntegralTerm`]: filtered velocity-error integral with mass-matrix based gains
//! - [`IntegralTermAntiWindup`]: gain times velocity error, saturated without losing passivity
//! - [`PassivityPidTerm`]: passivity-based PID on velocity, position and integrated position error

pub mod anti_windup;
pub mod config;
pub mod error;
pub mod integral;
pub mod pid;
pub mod saturation;
pub mod term;
pub mod timing;

#[cfg(test)]
mod test_util;

pub use anti_windup::IntegralTermAntiWindup;
pub use config::{
    AntiWindupConfig, FeedbackConfig, IntegralTermConfig, IntegralTermType, PassivityPidConfig,
    SaturationStrategy, VelocityGainType,
};
pub use error::{ConfigError, ControlError, Result};
pub use integral::IntegralTerm;
pub use pid::PassivityPidTerm;
pub use saturation::Envelope;
pub use term::{FeedbackState, FeedbackTerm, TorqueFeedbackTerm};
pub use timing::{Clock, ElapsedTimes, MonotonicClock, PhaseTimer};
