//! Integral feedback on the velocity tracking error.
//!
//! `s = α_ref − α_real` is integrated through two leaky filters
//!
//! ```text
//! slow ← e^(−dt φ_slow) slow + s − s_prev
//! fast ← e^(−dt φ_fast) fast + s − s_prev
//! s_f   = w fast + (1 − w) slow
//! ```
//!
//! and turned into a torque `P = K s_f`, or `P = (K + C) s_f` in the
//! passivity-based mode, with `K` built from the mass matrix.

use crate::config::{IntegralTermConfig, IntegralTermType, VelocityGainType};
use crate::error::{ControlError, Result};
use crate::term::{
    FeedbackState, PHASE_GAIN, PHASE_GAIN_CORIOLIS, TorqueFeedbackTerm, check_inputs,
};
use rbc_math::{DMat, DVec};
use rbc_model::{Model, State};
use rbc_rigid::{Coriolis, ForwardDynamics};

#[derive(Debug)]
pub struct IntegralTerm {
    config: IntegralTermConfig,
    pub(crate) base: FeedbackState,
    /// Velocity gain `K` of the last cycle.
    pub(crate) k: DMat,
    /// Coriolis matrix of the last cycle; zero unless passivity-based.
    pub(crate) c: DMat,
    coriolis: Coriolis,
    prev_s: DVec,
    slow: DVec,
    fast: DVec,
}

impl IntegralTerm {
    pub fn new(model: &Model, config: IntegralTermConfig) -> Self {
        let nv = model.nv;
        Self {
            config,
            base: FeedbackState::new(nv, &[]),
            k: DMat::zeros(nv, nv),
            c: DMat::zeros(nv, nv),
            coriolis: Coriolis::new(model),
            prev_s: DVec::zeros(nv),
            slow: DVec::zeros(nv),
            fast: DVec::zeros(nv),
        }
    }

    pub fn config(&self) -> &IntegralTermConfig {
        &self.config
    }

    pub fn gain(&self) -> &DMat {
        &self.k
    }

    pub fn coriolis_matrix(&self) -> &DMat {
        &self.c
    }

    pub fn slow_filter(&self) -> &DVec {
        &self.slow
    }

    pub fn fast_filter(&self) -> &DVec {
        &self.fast
    }

    /// Blended error `w fast + (1 − w) slow`.
    pub fn filtered_error(&self) -> DVec {
        self.blend(&self.slow, &self.fast)
    }

    fn blend(&self, slow: &DVec, fast: &DVec) -> DVec {
        let w = self.config.fast_filter_weight;
        fast * w + slow * (1.0 - w)
    }

    /// Build `K` from `H`, and `C` for the passivity-based mode.
    pub(crate) fn compute_gain(
        &mut self,
        model: &Model,
        fd: &ForwardDynamics,
        real: &State,
    ) -> Result<()> {
        let started = self.base.timer.start();
        let lambda = self.config.lambda;
        match self.config.velocity_gain {
            VelocityGainType::MassMatrix => {
                self.k.copy_from(fd.h());
                self.k *= lambda;
            }
            VelocityGainType::MassDiagonal => {
                self.k.fill(0.0);
                self.k.set_diagonal(&(fd.h().diagonal() * lambda));
            }
            VelocityGainType::Identity => {
                self.k.fill_with_identity();
                self.k *= lambda;
            }
        }
        self.base.timer.stop(PHASE_GAIN, started);

        if self.config.term_type == IntegralTermType::PassivityBased {
            let started = self.base.timer.start();
            self.c = self.coriolis.coriolis(model, real)?;
            self.base.timer.stop(PHASE_GAIN_CORIOLIS, started);
        }
        Ok(())
    }

    /// Slow and fast filter values after feeding `s`; the stored filters are untouched.
    fn advanced_filters(&self, s: &DVec) -> (DVec, DVec) {
        let dt = self.config.time_step;
        let change = s - &self.prev_s;
        let slow = &self.slow * (-dt * self.config.phi_slow).exp() + &change;
        let fast = &self.fast * (-dt * self.config.phi_fast).exp() + change;
        (slow, fast)
    }

    /// Publish `p` and, once that succeeded, keep the filter values it came from.
    fn commit(&mut self, p: DVec, h: &DMat, s: DVec, slow: DVec, fast: DVec) -> Result<()> {
        self.base.commit(p, h)?;
        self.prev_s = s;
        self.slow = slow;
        self.fast = fast;
        Ok(())
    }

    /// Cycle that seeds the filters from `diff_torques` instead of integrating
    /// the error, so that `P` equals `diff_torques`.
    ///
    /// Used when switching from another controller whose last command differs
    /// from this term's by `diff_torques`. With `L = K + C`, the whole of
    /// `L⁻¹ Δτ` goes to the slow filter when `w < 1` and to the fast one otherwise.
    pub fn compute_term_with_transition(
        &mut self,
        model: &Model,
        fd: &ForwardDynamics,
        real: &State,
        calc: &State,
        diff_torques: &DVec,
    ) -> Result<()> {
        if self.config.term_type == IntegralTermType::None {
            return Ok(());
        }
        if diff_torques.len() != model.nv {
            return Err(ControlError::DimensionMismatch {
                what: "diff torques",
                expected: model.nv,
                got: diff_torques.len(),
            });
        }
        check_inputs(model, fd, real, calc)?;
        self.compute_gain(model, fd, real)?;

        let s = &calc.alpha - &real.alpha;
        let l = &self.k + &self.c;
        let x = l.clone().lu().solve(diff_torques).ok_or(ControlError::SingularGain)?;
        let w = self.config.fast_filter_weight;
        let zero = DVec::zeros(model.nv);
        let (slow, fast) = if w < 1.0 { (x / (1.0 - w), zero) } else { (zero, x / w) };

        let p = l * self.blend(&slow, &fast);
        self.commit(p, fd.h(), s, slow, fast)?;
        tracing::debug!(weight = w, "re-seeded integral filters from torque difference");
        Ok(())
    }
}

impl TorqueFeedbackTerm for IntegralTerm {
    fn compute_term(
        &mut self,
        model: &Model,
        fd: &ForwardDynamics,
        real: &State,
        calc: &State,
    ) -> Result<()> {
        if self.config.term_type == IntegralTermType::None {
            return Ok(());
        }
        check_inputs(model, fd, real, calc)?;
        self.compute_gain(model, fd, real)?;

        let s = &calc.alpha - &real.alpha;
        let (slow, fast) = self.advanced_filters(&s);
        let p = (&self.k + &self.c) * self.blend(&slow, &fast);
        self.commit(p, fd.h(), s, slow, fast)
    }

    fn state(&self) -> &FeedbackState {
        &self.base
    }

    fn state_mut(&mut self) -> &mut FeedbackState {
        &mut self.base
    }

    fn reset(&mut self) {
        self.base.reset();
        self.k.fill(0.0);
        self.c.fill(0.0);
        self.prev_s.fill(0.0);
        self.slow.fill(0.0);
        self.fast.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::PHASE_GAMMA_D;
    use crate::test_util::{floating_arm, negative_mass_pendulum, pendulum, refresh, two_link};
    use crate::timing::test_clock::StepClock;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn simple(lambda: f64) -> IntegralTermConfig {
        IntegralTermConfig {
            lambda,
            ..Default::default()
        }
    }

    #[test]
    fn unit_pendulum_gain_is_mass_matrix() {
        let model = pendulum();
        let mut real = model.default_state();
        let mut calc = model.default_state();
        calc.alpha[0] = 1.0;
        let fd = refresh(&model, &mut real);
        assert_relative_eq!(fd.h()[(0, 0)], 1.0, epsilon = 1e-12);

        let mut term = IntegralTerm::new(&model, simple(1.0));
        term.compute_term(&model, &fd, &real, &calc).unwrap();

        assert_relative_eq!(term.gain().clone(), fd.h().clone(), epsilon = 1e-12);
        assert_relative_eq!(term.p()[0], fd.h()[(0, 0)], epsilon = 1e-12);
        assert_relative_eq!(term.gamma_d()[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_error_gives_zero_torque() {
        let model = two_link();
        let mut real = model.default_state();
        real.q.copy_from_slice(&[0.3, -0.7]);
        real.alpha.copy_from_slice(&[0.4, 1.2]);
        let calc = real.clone();
        let fd = refresh(&model, &mut real);

        for term_type in [IntegralTermType::Simple, IntegralTermType::PassivityBased] {
            let mut term = IntegralTerm::new(
                &model,
                IntegralTermConfig {
                    term_type,
                    ..Default::default()
                },
            );
            term.compute_term(&model, &fd, &real, &calc).unwrap();
            assert!(term.p().iter().all(|&p| p == 0.0));
            assert!(term.gamma_d().iter().all(|&g| g == 0.0));
        }
    }

    #[test]
    fn gain_types() {
        let model = two_link();
        let mut real = model.default_state();
        real.q[1] = 0.9;
        let calc = model.default_state();
        let fd = refresh(&model, &mut real);

        let mut diag = IntegralTerm::new(
            &model,
            IntegralTermConfig {
                velocity_gain: VelocityGainType::MassDiagonal,
                lambda: 2.0,
                ..Default::default()
            },
        );
        diag.compute_term(&model, &fd, &real, &calc).unwrap();
        assert_relative_eq!(diag.gain()[(0, 0)], 2.0 * fd.h()[(0, 0)], epsilon = 1e-12);
        assert_eq!(diag.gain()[(0, 1)], 0.0);

        let mut ident = IntegralTerm::new(
            &model,
            IntegralTermConfig {
                velocity_gain: VelocityGainType::Identity,
                lambda: 3.0,
                ..Default::default()
            },
        );
        ident.compute_term(&model, &fd, &real, &calc).unwrap();
        assert_eq!(ident.gain().clone(), DMat::identity(2, 2) * 3.0);
    }

    #[test]
    fn filters_integrate_change_of_error() {
        let model = pendulum();
        let mut real = model.default_state();
        let mut calc = model.default_state();
        let fd = refresh(&model, &mut real);
        let config = IntegralTermConfig {
            phi_slow: 10.0,
            phi_fast: 100.0,
            fast_filter_weight: 0.25,
            time_step: 0.01,
            ..Default::default()
        };
        let mut term = IntegralTerm::new(&model, config);

        calc.alpha[0] = 1.0;
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        assert_relative_eq!(term.slow_filter()[0], 1.0);
        assert_relative_eq!(term.fast_filter()[0], 1.0);

        // Constant error: only the decay acts.
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        let slow = (-0.1_f64).exp();
        let fast = (-1.0_f64).exp();
        assert_relative_eq!(term.slow_filter()[0], slow, epsilon = 1e-12);
        assert_relative_eq!(term.fast_filter()[0], fast, epsilon = 1e-12);
        assert_relative_eq!(term.p()[0], 0.25 * fast + 0.75 * slow, epsilon = 1e-12);
    }

    #[test]
    fn passivity_based_adds_coriolis_and_times_it() {
        let model = floating_arm();
        let mut real = model.default_state();
        real.q[7] = 0.5;
        real.alpha.copy_from_slice(&[0.2, -0.1, 0.4, 0.3, 0.0, -0.2, 1.5]);
        let mut calc = real.clone();
        calc.alpha[6] += 0.5;
        let fd = refresh(&model, &mut real);

        let mut term = IntegralTerm::new(
            &model,
            IntegralTermConfig {
                term_type: IntegralTermType::PassivityBased,
                ..Default::default()
            },
        );
        term.set_clock(Box::new(StepClock::new(Duration::from_micros(3))));
        term.compute_term(&model, &fd, &real, &calc).unwrap();

        assert!(term.coriolis_matrix().iter().any(|&c| c != 0.0));
        let s = &calc.alpha - &real.alpha;
        let expected = (fd.h() + term.coriolis_matrix()) * &s;
        assert_relative_eq!(term.p().clone(), expected, epsilon = 1e-12);

        let elapsed = term.elapsed_times();
        for phase in [PHASE_GAIN, PHASE_GAIN_CORIOLIS, PHASE_GAMMA_D] {
            assert_eq!(elapsed[phase], Duration::from_micros(3), "phase {phase}");
        }
    }

    #[test]
    fn simple_mode_leaves_coriolis_phase_at_zero() {
        let model = pendulum();
        let mut real = model.default_state();
        let mut calc = model.default_state();
        calc.alpha[0] = 0.5;
        let fd = refresh(&model, &mut real);
        let mut term = IntegralTerm::new(&model, simple(1.0));
        term.set_clock(Box::new(StepClock::new(Duration::from_micros(1))));
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        assert_eq!(term.elapsed_times()[PHASE_GAIN_CORIOLIS], Duration::ZERO);
        assert!(term.coriolis_matrix().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn none_type_leaves_output_untouched() {
        let model = pendulum();
        let mut real = model.default_state();
        let mut calc = model.default_state();
        calc.alpha[0] = 2.0;
        let fd = refresh(&model, &mut real);
        let mut term = IntegralTerm::new(
            &model,
            IntegralTermConfig {
                term_type: IntegralTermType::None,
                ..Default::default()
            },
        );
        term.state_mut().p[0] = 7.0;
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        assert_eq!(term.p()[0], 7.0);
        assert_eq!(term.slow_filter()[0], 0.0);
    }

    #[test]
    fn transition_reproduces_torque_difference() {
        let model = two_link();
        let mut real = model.default_state();
        real.q.copy_from_slice(&[0.2, 1.1]);
        real.alpha.copy_from_slice(&[0.3, -0.4]);
        let mut calc = real.clone();
        calc.alpha[0] += 0.2;
        let fd = refresh(&model, &mut real);
        let diff = DVec::from_vec(vec![1.5, -0.5]);

        for weight in [0.3, 1.0] {
            let mut term = IntegralTerm::new(
                &model,
                IntegralTermConfig {
                    term_type: IntegralTermType::PassivityBased,
                    fast_filter_weight: weight,
                    ..Default::default()
                },
            );
            term.compute_term_with_transition(&model, &fd, &real, &calc, &diff)
                .unwrap();
            assert_relative_eq!(term.p().clone(), diff.clone(), epsilon = 1e-10);
            assert_relative_eq!(fd.h() * term.gamma_d(), diff.clone(), epsilon = 1e-10);
            if weight < 1.0 {
                assert!(term.fast_filter().iter().all(|&f| f == 0.0));
            } else {
                assert!(term.slow_filter().iter().all(|&f| f == 0.0));
            }
        }
    }

    #[test]
    fn transition_with_zero_gain_is_singular() {
        let model = pendulum();
        let mut real = model.default_state();
        let calc = model.default_state();
        let fd = refresh(&model, &mut real);
        let mut term = IntegralTerm::new(&model, simple(0.0));
        let err = term
            .compute_term_with_transition(&model, &fd, &real, &calc, &DVec::from_element(1, 1.0))
            .unwrap_err();
        assert!(matches!(err, ControlError::SingularGain));
        assert_eq!(term.slow_filter()[0], 0.0);
        assert_eq!(term.fast_filter()[0], 0.0);
        assert_eq!(term.p()[0], 0.0);
    }

    #[test]
    fn failed_solve_keeps_previous_output_and_filters() {
        let model = pendulum();
        let mut real = model.default_state();
        let mut calc = model.default_state();
        calc.alpha[0] = 1.0;
        let fd = refresh(&model, &mut real);
        let mut term = IntegralTerm::new(&model, simple(1.0));
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        let (p, gamma_d) = (term.p().clone(), term.gamma_d().clone());
        let (slow, fast) = (term.slow_filter().clone(), term.fast_filter().clone());

        let bad_fd = refresh(&negative_mass_pendulum(), &mut model.default_state());
        calc.alpha[0] = 4.0;
        let err = term.compute_term(&model, &bad_fd, &real, &calc).unwrap_err();
        assert!(matches!(err, ControlError::NotPositiveDefinite));
        assert_eq!(term.p(), &p);
        assert_eq!(term.gamma_d(), &gamma_d);
        assert_eq!(term.slow_filter(), &slow);
        assert_eq!(term.fast_filter(), &fast);

        // The rejected error was never integrated: the next good cycle sees the full change.
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        let decay = (-term.config().time_step * term.config().phi_slow).exp();
        assert_relative_eq!(term.slow_filter()[0], decay + 3.0, epsilon = 1e-12);
    }

    #[test]
    fn reset_clears_filters() {
        let model = pendulum();
        let mut real = model.default_state();
        let mut calc = model.default_state();
        calc.alpha[0] = 1.0;
        let fd = refresh(&model, &mut real);
        let mut term = IntegralTerm::new(&model, simple(1.0));
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        term.reset();
        assert_eq!(term.p()[0], 0.0);
        assert_eq!(term.slow_filter()[0], 0.0);

        // After reset the full error counts again as a change.
        term.compute_term(&model, &fd, &real, &calc).unwrap();
        assert_relative_eq!(term.p()[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let model = two_link();
        let mut real = model.default_state();
        let fd = refresh(&model, &mut real);
        let calc = pendulum().default_state();
        let mut term = IntegralTerm::new(&model, simple(1.0));
        let err = term.compute_term(&model, &fd, &real, &calc).unwrap_err();
        assert!(matches!(
            err,
            ControlError::DimensionMismatch { expected: 2, got: 1, .. }
        ));
    }
}
