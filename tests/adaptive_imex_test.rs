//! End-to-end tests of the adaptive IMEX stepper on the linear split model.

use imex_ts::tableau::catalogue;
use imex_ts::{
    AdaptiveImexConfig, AdaptiveImexStepper, Ars343, IntegrationMode, LinearSplitModel,
    ModelState, StateLayout, TimestepError, TimestepScheme, run_simulation,
};

fn initial_state(layout: &StateLayout) -> ModelState {
    let mut state = ModelState::zeros(layout);
    for (k, array) in state.arrays_mut().enumerate() {
        for (i, v) in array.iter_mut().enumerate() {
            *v = 1.0 + 0.25 * k as f64 + 0.1 * i as f64;
        }
    }
    state
}

/// Run to `t_end` and return the max error against the exact solution.
fn max_error(config: AdaptiveImexConfig, a: f64, b: f64, t_end: f64, dt: f64) -> f64 {
    let layout = StateLayout::new(vec![4, 4], vec![3]);
    let initial = initial_state(&layout);
    let mut model = LinearSplitModel::new(layout, a, b);
    let mut stepper = AdaptiveImexStepper::new(config).expect("valid config");
    let mut storage = stepper.allocate_storage(initial.clone());

    run_simulation(&mut stepper, &mut model, &mut storage, 0.0, t_end, dt).expect("run succeeds");

    let mut error = model.exact(&initial, t_end);
    error.axpy(-1.0, storage.state());
    error.max_abs()
}

#[test]
fn test_imex_accuracy() {
    let config = AdaptiveImexConfig::default().with_tolerances(1e-6, 1e-9);
    let err = max_error(config, 1.0, 2.0, 1.0, 0.1);
    assert!(err < 1e-4, "error {:e}", err);
}

#[test]
fn test_fully_implicit_accuracy() {
    let config = AdaptiveImexConfig::default()
        .with_tolerances(1e-6, 1e-9)
        .fully_implicit();
    assert_eq!(
        config.resolve().expect("valid").mode,
        IntegrationMode::FullyImplicit
    );
    let err = max_error(config, 1.0, 2.0, 1.0, 0.1);
    assert!(err < 1e-4, "error {:e}", err);
}

#[test]
fn test_fully_explicit_fourth_order_default() {
    let config = AdaptiveImexConfig::default()
        .with_tolerances(1e-6, 1e-9)
        .fully_explicit()
        .with_order(4);
    let err = max_error(config, 1.0, 2.0, 1.0, 0.1);
    assert!(err < 1e-4, "error {:e}", err);
}

#[test]
fn test_anderson_fixed_point_accuracy() {
    let config = AdaptiveImexConfig::default()
        .with_tolerances(1e-6, 1e-9)
        .with_anderson(2);
    let err = max_error(config, 1.0, 2.0, 1.0, 0.1);
    assert!(err < 1e-4, "error {:e}", err);
}

#[test]
fn test_stiff_implicit_part_takes_large_steps() {
    let mut stepper = AdaptiveImexStepper::new(AdaptiveImexConfig::default()).expect("valid");
    let mut model = LinearSplitModel::scalar(1.0, 1000.0);
    let mut storage = stepper.allocate_storage(ModelState::from_arrays(vec![vec![1.0]], vec![]));

    run_simulation(&mut stepper, &mut model, &mut storage, 0.0, 1.0, 0.5).expect("run succeeds");

    assert!(storage.state().components[0][0].abs() < 1e-4);
    let stats = stepper.stats().expect("solver initialized");
    assert!(stats.steps < 500, "{} internal steps", stats.steps);
    assert!(stats.nonlinear_iters > 0);
}

#[test]
fn test_user_ars343_matches_fixed_stepper() {
    let layout = StateLayout::uniform(2, 1, 3);
    let initial = initial_state(&layout);

    let mut adaptive = AdaptiveImexStepper::new(
        AdaptiveImexConfig::default().with_user_table(catalogue::USER_ARS343),
    )
    .expect("valid");
    let mut model = LinearSplitModel::new(layout.clone(), 1.0, 2.0);
    let mut storage = adaptive.allocate_storage(initial.clone());
    run_simulation(&mut adaptive, &mut model, &mut storage, 0.0, 0.5, 0.05).expect("adaptive run");
    let from_engine = storage.into_state();
    let stats = adaptive.stats().expect("solver initialized");
    assert_eq!(stats.steps, 10);
    assert_eq!(stats.error_test_failures, 0);

    let mut fixed = Ars343::new();
    let mut model = LinearSplitModel::new(layout, 1.0, 2.0);
    let mut storage = fixed.allocate_storage(initial);
    run_simulation(&mut fixed, &mut model, &mut storage, 0.0, 0.5, 0.05).expect("fixed run");

    let mut diff = from_engine;
    diff.axpy(-1.0, storage.state());
    assert!(diff.max_abs() < 1e-9, "difference {:e}", diff.max_abs());
}

#[test]
fn test_step_history_carries_across_outer_steps() {
    let mut stepper = AdaptiveImexStepper::new(AdaptiveImexConfig::default()).expect("valid");
    let mut model = LinearSplitModel::scalar(0.5, 0.5);
    let mut storage = stepper.allocate_storage(ModelState::from_arrays(vec![vec![1.0]], vec![]));

    run_simulation(&mut stepper, &mut model, &mut storage, 0.0, 1.0, 0.25).expect("run succeeds");
    let stats = *stepper.stats().expect("solver initialized");
    // The initial step estimate (two full evaluations) runs only once
    assert_eq!(stats.full_evals, 2);
    assert!(stats.last_step > 0.0);

    // A new run restarts the solver
    run_simulation(&mut stepper, &mut model, &mut storage, 1.0, 2.0, 0.25).expect("run succeeds");
    assert_eq!(stepper.stats().expect("solver initialized").full_evals, 2);
    assert!((storage.state().components[0][0] - (-2.0f64).exp()).abs() < 1e-3);
}

#[test]
fn test_iteration_cap_is_fatal_convergence_failure() {
    // One Newton iteration cannot pass the update-norm test on a stiff stage
    let config = AdaptiveImexConfig::default()
        .with_user_table(catalogue::USER_ARS343)
        .with_iterations(1, 0);
    let mut stepper = AdaptiveImexStepper::new(config).expect("valid");
    let mut model = LinearSplitModel::scalar(0.0, 1000.0);
    let mut storage = stepper.allocate_storage(ModelState::from_arrays(vec![vec![1.0]], vec![]));

    let err = stepper
        .step(&mut model, &mut storage, true, true, 0.0, 0.1)
        .expect_err("stage solve hits the iteration cap");
    assert!(err.is_convergence_failure(), "{}", err);
    match &err {
        TimestepError::Solver { code, reason } => {
            assert_eq!(*code, -4);
            assert!(reason.contains("failed to converge"), "{}", reason);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(storage.state().components[0][0], 1.0);
}
