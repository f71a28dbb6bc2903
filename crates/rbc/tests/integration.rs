//! Integration tests for the rbc dynamics and feedback stack.

use approx::assert_relative_eq;
use rbc::{
    AntiWindupConfig, ControlError, ControlSession, DVec, DynamicsError, FeedbackConfig,
    FeedbackTerm, IntegralTerm, IntegralTermConfig, Model, ModelBuilder, PassivityPidConfig,
    PassivityPidTerm, SpatialInertia, SpatialTransform, TorqueFeedbackTerm, Vec3,
    inverse_dynamics,
};

/// Revolute joint about Z carrying a unit point mass one meter out, no gravity.
fn make_unit_pendulum() -> Model {
    ModelBuilder::new()
        .gravity(Vec3::zeros())
        .add_revolute_body(
            "pendulum",
            -1,
            SpatialTransform::identity(),
            SpatialInertia::point_mass(1.0, Vec3::new(1.0, 0.0, 0.0)),
        )
        .build()
        .unwrap()
}

/// Floating torso with a two-link arm, under gravity.
fn make_floating_arm() -> Model {
    ModelBuilder::new()
        .add_free_body(
            "torso",
            -1,
            SpatialTransform::identity(),
            SpatialInertia::cuboid(8.0, Vec3::new(0.3, 0.4, 0.6)),
        )
        .add_revolute_body(
            "shoulder",
            0,
            SpatialTransform::translation(Vec3::new(0.0, 0.25, 0.2)),
            SpatialInertia::rod(1.5, 0.4).with_com(Vec3::new(0.0, 0.2, 0.0)),
        )
        .add_revolute_body(
            "elbow",
            1,
            SpatialTransform::translation(Vec3::new(0.0, 0.4, 0.0)),
            SpatialInertia::rod(1.0, 0.35).with_com(Vec3::new(0.0, 0.175, 0.0)),
        )
        .build()
        .unwrap()
}

#[test]
fn unit_pendulum_integral_cycle() {
    let model = make_unit_pendulum();
    let term = FeedbackTerm::Integral(IntegralTerm::new(&model, IntegralTermConfig::default()));
    let mut session = ControlSession::new(model, term);

    let mut real = session.model().default_state();
    let mut calc = session.model().default_state();
    calc.alpha[0] = 1.0;

    let p = session.cycle(&mut real, &calc).unwrap().clone();
    let h = session.dynamics().h()[(0, 0)];
    assert_relative_eq!(h, 1.0, epsilon = 1e-12);
    assert_relative_eq!(p[0], h * 1.0, epsilon = 1e-12);
    assert_relative_eq!(session.term().gamma_d()[0], 1.0, epsilon = 1e-12);
}

#[test]
fn forward_then_inverse_dynamics_round_trip() {
    let model = make_floating_arm();
    let pid = PassivityPidTerm::new(&model, PassivityPidConfig::default());
    let term = FeedbackTerm::PassivityPid(pid);
    let mut session = ControlSession::new(model, term);

    let mut state = session.model().default_state();
    let q = [0.9, 0.2, -0.1, 0.3, 0.1, -0.2, 0.4, 0.7, -1.1];
    state.q.copy_from_slice(&q);
    for (k, a) in state.alpha.iter_mut().enumerate() {
        *a = 0.2 * k as f64 - 0.5;
    }
    state.joint_torque = DVec::from_vec(vec![1.0, -2.0, 0.5, 3.0, 0.0, -1.0, 2.0, -0.5]);

    session.forward_dynamics(&mut state).unwrap();
    let tau = inverse_dynamics(session.model(), &state, &state.alpha_d.clone()).unwrap();
    assert_relative_eq!(tau, state.joint_torque.clone(), epsilon = 1e-8);
}

#[test]
fn zero_tracking_error_gives_zero_command_for_every_term() {
    let model = make_floating_arm();
    let configs = [
        FeedbackConfig::Integral(IntegralTermConfig::default()),
        FeedbackConfig::IntegralAntiWindup(AntiWindupConfig {
            torque_lower: vec![-10.0; 8],
            torque_upper: vec![10.0; 8],
            max_angular_acc: [1.0; 3],
            max_linear_acc: [1.0; 3],
            ..Default::default()
        }),
        FeedbackConfig::PassivityPid(PassivityPidConfig {
            beta: 0.3,
            sigma: 0.5,
            ..Default::default()
        }),
    ];

    for config in &configs {
        let mut session = ControlSession::from_config(model.clone(), config).unwrap();
        let mut real = session.model().default_state();
        real.q[7] = 0.4;
        real.alpha[6] = 0.8;
        let calc = real.clone();
        let p = session.cycle(&mut real, &calc).unwrap();
        assert!(p.iter().all(|&x| x == 0.0), "{config:?} gave {p}");
    }
}

#[test]
fn anti_windup_from_json_respects_envelope() {
    let json = r#"{
        "type": "integral_anti_windup",
        "integral": { "term_type": "passivity_based", "lambda": 5.0 },
        "perc": 0.8,
        "max_angular_acc": [0.5, 0.5, 0.5],
        "max_linear_acc": [1.0, 1.0, 1.0],
        "torque_lower": [0, 0, 0, 0, 0, 0, -2.0, -1.0],
        "torque_upper": [0, 0, 0, 0, 0, 0, 2.0, 1.0]
    }"#;
    let config = FeedbackConfig::from_json_str(json).unwrap();
    let mut session = ControlSession::from_config(make_floating_arm(), &config).unwrap();

    let mut real = session.model().default_state();
    real.q[7] = -0.3;
    let mut calc = real.clone();
    for (k, a) in calc.alpha.iter_mut().enumerate() {
        *a = if k % 2 == 0 { 3.0 } else { -2.0 };
    }
    session.cycle(&mut real, &calc).unwrap();

    // Zero velocity: C = 0, so the command is the saturated part alone.
    let FeedbackTerm::IntegralAntiWindup(term) = session.term() else {
        panic!("expected an anti-windup term");
    };
    let p = term.p();
    assert!(term.envelope().contains(p));
    assert_relative_eq!(term.envelope().upper[6], 1.6, epsilon = 1e-12);
    assert_relative_eq!(term.envelope().lower[7], -0.8, epsilon = 1e-12);
    assert!(p.dot(&calc.alpha) >= -1e-12);
}

#[test]
fn pid_drives_pendulum_to_reference() {
    let model = make_unit_pendulum();
    let config = FeedbackConfig::PassivityPid(PassivityPidConfig {
        time_step: 0.001,
        lambda: 4.0,
        mu: 4.0,
        ..Default::default()
    });
    let mut session = ControlSession::from_config(model, &config).unwrap();

    let mut real = session.model().default_state();
    let mut calc = session.model().default_state();
    calc.q[0] = 0.5;

    let dt = 0.001;
    for _ in 0..6000 {
        let p = session.cycle(&mut real, &calc).unwrap().clone();
        real.joint_torque.copy_from(&p);
        session.forward_dynamics(&mut real).unwrap();
        let acc = real.alpha_d.clone();
        real.alpha += &acc * dt;
        let vel = real.alpha.clone();
        real.q += &vel * dt;
    }

    assert!((real.q[0] - 0.5).abs() < 1e-2, "q = {}", real.q[0]);
    assert!(real.alpha[0].abs() < 1e-2, "alpha = {}", real.alpha[0]);
}

#[test]
fn mismatched_state_is_rejected_before_computing() {
    let model = make_floating_arm();
    let mut session =
        ControlSession::from_config(model, &FeedbackConfig::Integral(IntegralTermConfig::default()))
            .unwrap();
    let mut wrong = make_unit_pendulum().default_state();
    let calc = session.model().default_state();

    let err = session.cycle(&mut wrong, &calc).unwrap_err();
    assert!(matches!(err, ControlError::Dynamics(DynamicsError::Model(_))));
    assert!(!err.is_safety_fault());
    assert!(session.term().p().iter().all(|&x| x == 0.0));
}

#[test]
fn invalid_config_does_not_build() {
    let config = FeedbackConfig::IntegralAntiWindup(AntiWindupConfig {
        torque_lower: vec![-1.0],
        torque_upper: vec![1.0],
        ..Default::default()
    });
    let err = ControlSession::from_config(make_floating_arm(), &config).unwrap_err();
    assert!(matches!(err, ControlError::Config(_)));
}

#[test]
fn reset_clears_integral_state() {
    let model = make_unit_pendulum();
    let config = FeedbackConfig::PassivityPid(PassivityPidConfig::default());
    let mut session = ControlSession::from_config(model, &config).unwrap();
    let mut real = session.model().default_state();
    let mut calc = session.model().default_state();
    calc.q[0] = 1.0;

    session.cycle(&mut real, &calc).unwrap();
    session.reset();
    assert_eq!(session.term().p()[0], 0.0);

    let FeedbackTerm::PassivityPid(term) = session.term() else {
        panic!("expected a PID term");
    };
    assert_eq!(term.integral_error()[0], 0.0);
}

#[test]
fn config_file_round_trip() {
    let config = FeedbackConfig::PassivityPid(PassivityPidConfig {
        beta: 0.1,
        ..Default::default()
    });
    let path = std::env::temp_dir().join(format!("rbc-feedback-{}.json", std::process::id()));
    std::fs::write(&path, config.to_json_string().unwrap()).unwrap();
    let loaded = FeedbackConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);

    let value: serde_json::Value = serde_json::from_str(&config.to_json_string().unwrap()).unwrap();
    assert_eq!(value["type"], "passivity_pid");
}
