//! Serializable feedback-term configuration.
//!
//! ```json
//! { "type": "integral", "term_type": "passivity_based", "velocity_gain": "mass_matrix",
//!   "lambda": 2.0, "phi_slow": 0.5, "phi_fast": 20.0, "fast_filter_weight": 0.3,
//!   "time_step": 0.005 }
//! ```

use crate::error::ConfigError;
use crate::{FeedbackTerm, IntegralTerm, IntegralTermAntiWindup, PassivityPidTerm};
use rbc_model::Model;
use serde::{Deserialize, Serialize};
use std::path::Path;

type Result<T> = std::result::Result<T, ConfigError>;

/// Which integral term, if any, is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegralTermType {
    /// No feedback; `P` and `γ̈` keep their previous values.
    None,
    /// `P = K s_f`.
    #[default]
    Simple,
    /// `P = (K + C) s_f` with the Coriolis matrix `C`.
    PassivityBased,
}

/// Shape of the velocity gain `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityGainType {
    /// `K = λ H`.
    #[default]
    MassMatrix,
    /// `K = λ diag(H)`.
    MassDiagonal,
    /// `K = λ I`.
    Identity,
}

/// How the anti-windup term brings `K s` inside the torque envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationStrategy {
    /// Rescale the row and column of `K` of the worst DOF until nothing exceeds its bound.
    #[default]
    Iterative,
    /// Divide `P` by the worst bound ratio, then clamp.
    ScalarExcess,
}

/// Parameters of [`IntegralTerm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegralTermConfig {
    pub term_type: IntegralTermType,
    pub velocity_gain: VelocityGainType,
    /// Gain scale λ.
    pub lambda: f64,
    /// Decay rate of the slow filter (1/s).
    pub phi_slow: f64,
    /// Decay rate of the fast filter (1/s).
    pub phi_fast: f64,
    /// Blend weight of the fast filter, in `[0, 1]`.
    pub fast_filter_weight: f64,
    /// Control period (s).
    pub time_step: f64,
}

impl Default for IntegralTermConfig {
    fn default() -> Self {
        Self {
            term_type: IntegralTermType::Simple,
            velocity_gain: VelocityGainType::MassMatrix,
            lambda: 1.0,
            phi_slow: 0.0,
            phi_fast: 0.0,
            fast_filter_weight: 1.0,
            time_step: 0.005,
        }
    }
}

/// Parameters of [`IntegralTermAntiWindup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiWindupConfig {
    /// Gain shape and scale; the filter parameters are not used.
    pub integral: IntegralTermConfig,
    /// Fraction of the torque limits available to the feedback term.
    pub perc: f64,
    /// Maximum linear acceleration of a floating base.
    pub max_linear_acc: [f64; 3],
    /// Maximum angular acceleration of a floating base.
    pub max_angular_acc: [f64; 3],
    /// Lower torque limit per DOF (non-positive).
    pub torque_lower: Vec<f64>,
    /// Upper torque limit per DOF (non-negative).
    pub torque_upper: Vec<f64>,
    pub strategy: SaturationStrategy,
    /// Iteration cap of [`SaturationStrategy::Iterative`].
    pub max_iterations: usize,
    /// Relative margin added to each excess factor of [`SaturationStrategy::Iterative`].
    pub inflation: f64,
}

impl Default for AntiWindupConfig {
    fn default() -> Self {
        Self {
            integral: IntegralTermConfig::default(),
            perc: 1.0,
            max_linear_acc: [0.0; 3],
            max_angular_acc: [0.0; 3],
            torque_lower: Vec::new(),
            torque_upper: Vec::new(),
            strategy: SaturationStrategy::Iterative,
            max_iterations: 100,
            inflation: 0.01,
        }
    }
}

/// Parameters of [`PassivityPidTerm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassivityPidConfig {
    /// Integration step of the position error (s).
    pub time_step: f64,
    pub beta: f64,
    pub lambda: f64,
    pub mu: f64,
    pub sigma: f64,
    /// Weight `c` of the damping matrix in the integral gain.
    pub cis: f64,
}

impl Default for PassivityPidConfig {
    fn default() -> Self {
        Self {
            time_step: 0.005,
            beta: 0.0,
            lambda: 1.0,
            mu: 1.0,
            sigma: 0.0,
            cis: 1.0,
        }
    }
}

/// Configuration of any feedback term, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackConfig {
    Integral(IntegralTermConfig),
    IntegralAntiWindup(AntiWindupConfig),
    PassivityPid(PassivityPidConfig),
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.into(),
    }
}

fn require(ok: bool, field: &'static str, message: &str) -> Result<()> {
    if ok { Ok(()) } else { Err(invalid(field, message)) }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    require(value.is_finite() && value >= 0.0, field, "must be finite and non-negative")
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    require(value.is_finite() && value > 0.0, field, "must be finite and positive")
}

impl IntegralTermConfig {
    pub fn validate(&self) -> Result<()> {
        non_negative("lambda", self.lambda)?;
        non_negative("phi_slow", self.phi_slow)?;
        non_negative("phi_fast", self.phi_fast)?;
        require(
            (0.0..=1.0).contains(&self.fast_filter_weight),
            "fast_filter_weight",
            "must lie in [0, 1]",
        )?;
        positive("time_step", self.time_step)
    }
}

impl AntiWindupConfig {
    /// Check the parameters against a model with `nv` DOFs.
    pub fn validate(&self, nv: usize) -> Result<()> {
        self.integral.validate()?;
        positive("perc", self.perc)?;
        for &a in self.max_linear_acc.iter() {
            non_negative("max_linear_acc", a)?;
        }
        for &a in self.max_angular_acc.iter() {
            non_negative("max_angular_acc", a)?;
        }
        if self.torque_lower.len() != nv {
            return Err(invalid(
                "torque_lower",
                format!("expected {nv} entries, got {}", self.torque_lower.len()),
            ));
        }
        if self.torque_upper.len() != nv {
            return Err(invalid(
                "torque_upper",
                format!("expected {nv} entries, got {}", self.torque_upper.len()),
            ));
        }
        require(
            self.torque_lower.iter().all(|&l| l.is_finite() && l <= 0.0),
            "torque_lower",
            "entries must be finite and non-positive",
        )?;
        require(
            self.torque_upper.iter().all(|&u| u.is_finite() && u >= 0.0),
            "torque_upper",
            "entries must be finite and non-negative",
        )?;
        require(self.max_iterations > 0, "max_iterations", "must be at least 1")?;
        non_negative("inflation", self.inflation)
    }
}

impl PassivityPidConfig {
    pub fn validate(&self) -> Result<()> {
        positive("time_step", self.time_step)?;
        for (field, v) in [
            ("beta", self.beta),
            ("lambda", self.lambda),
            ("mu", self.mu),
            ("sigma", self.sigma),
            ("cis", self.cis),
        ] {
            non_negative(field, v)?;
        }
        Ok(())
    }
}

impl FeedbackConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the parameters against a model with `nv` DOFs.
    pub fn validate(&self, nv: usize) -> Result<()> {
        match self {
            FeedbackConfig::Integral(c) => c.validate(),
            FeedbackConfig::IntegralAntiWindup(c) => c.validate(nv),
            FeedbackConfig::PassivityPid(c) => c.validate(),
        }
    }

    /// Validate and build the configured term for `model`.
    pub fn build(&self, model: &Model) -> Result<FeedbackTerm> {
        self.validate(model.nv)?;
        Ok(match self {
            FeedbackConfig::Integral(c) => {
                FeedbackTerm::Integral(IntegralTerm::new(model, c.clone()))
            }
            FeedbackConfig::IntegralAntiWindup(c) => {
                FeedbackTerm::IntegralAntiWindup(IntegralTermAntiWindup::new(model, c.clone()))
            }
            FeedbackConfig::PassivityPid(c) => {
                FeedbackTerm::PassivityPid(PassivityPidTerm::new(model, c.clone()))
            }
        })
    }
}
