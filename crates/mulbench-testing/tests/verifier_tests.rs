//! Verifier behaviour against the behavioral multiplier and faulty variants

use mulbench_sim::multiplier::{CLK, RESET, RESULT, SIGNED, V_O, YUMI};
use mulbench_sim::{
    Fault, FaultInjector, FaultType, IterativeMultiplier, SimulationConfig, SimulationError,
    SimulationRuntime,
};
use mulbench_testing::{
    DirectedStimulus, MultiplierVerifier, Product, RunState, StimulusSource, StimulusVector,
    Testbench, VerifierConfig, VerifyError,
};
use std::time::Duration;

async fn testbench(runtime: Box<dyn SimulationRuntime>, capture_trace: bool) -> Testbench {
    let config = SimulationConfig {
        capture_trace,
        ..Default::default()
    };
    Testbench::with_config(runtime, config).await.unwrap()
}

fn model(stride: u32) -> Box<dyn SimulationRuntime> {
    Box::new(IterativeMultiplier::with_stride(stride).unwrap())
}

fn directed(vectors: &[StimulusVector]) -> DirectedStimulus {
    DirectedStimulus::new(vectors.iter().copied())
}

#[tokio::test]
async fn test_reset_holds_for_one_rising_edge() {
    let tb = testbench(model(1), true).await;
    let source = DirectedStimulus::default();
    let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());
    verifier.reset().await.unwrap();

    let sim = verifier.testbench().simulator();
    assert_eq!(sim.cycles(), 1);

    let history = sim.history();
    assert_eq!(history.len(), 4);
    let level = |step: usize, name: &str| history[step].signals[name][0];
    assert_eq!(
        (level(0, RESET), level(0, CLK), level(0, YUMI)),
        (0, 0, 1)
    );
    assert_eq!((level(1, RESET), level(1, CLK)), (1, 0));
    assert_eq!((level(2, RESET), level(2, CLK)), (1, 1));
    assert_eq!((level(3, RESET), level(3, CLK)), (0, 0));
}

#[tokio::test]
async fn test_six_times_seven() {
    let tb = testbench(model(1), false).await;
    let source = directed(&[StimulusVector::unsigned(6, 7)]);
    let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());

    let report = verifier.run().await.unwrap();
    assert_eq!(report.iterations, 1);
    assert_eq!(report.min_wait_cycles, 64);
    assert_eq!(verifier.state(), RunState::Passed);

    // the product stays on result_o after it is retired
    let tb = verifier.testbench();
    assert_eq!(tb.get_as::<u128>(RESULT).await.unwrap(), 42);
    assert!(!tb.get_as::<bool>(V_O).await.unwrap());
}

#[tokio::test]
async fn test_minus_one_times_two_signed() {
    let tb = testbench(model(4), false).await;
    let source = directed(&[StimulusVector::signed(u64::MAX, 2)]);
    let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());

    verifier.run().await.unwrap();
    let raw = verifier.testbench().get_as::<u128>(RESULT).await.unwrap();
    assert_eq!(raw as i128, -2);
}

#[tokio::test]
async fn test_corrupted_dut_halts_on_first_iteration() {
    let dut = FaultInjector::new(IterativeMultiplier::with_stride(16).unwrap())
        .with_fault(Fault::new(RESULT, FaultType::AddOffset(1)));
    let tb = testbench(Box::new(dut), false).await;
    let source = directed(&[
        StimulusVector::unsigned(3, 4),
        StimulusVector::unsigned(5, 6),
    ]);
    let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());

    let report = match verifier.run().await {
        Err(VerifyError::ResultMismatch(report)) => report,
        other => panic!("expected a mismatch, got {other:?}"),
    };
    assert_eq!(report.iteration, 1);
    assert_eq!(report.expected, Product::Unsigned(12));
    assert_eq!(report.observed, Product::Unsigned(13));
    assert_eq!(report.raw_result, 13);

    assert_eq!(verifier.state(), RunState::HaltedOnMismatch);
    // the second vector was never drawn
    assert_eq!(verifier.source().len(), 1);
}

#[tokio::test]
async fn test_boundary_cases_pass() {
    let tb = testbench(model(2), false).await;
    let source = DirectedStimulus::boundary_cases();
    let expected = source.len();
    let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());

    let report = verifier.run().await.unwrap();
    assert_eq!(report.iterations, expected);
    assert_eq!(report.seed, None);
}

#[tokio::test]
async fn test_thousand_random_iterations_pass() {
    let tb = testbench(model(8), false).await;
    let config = VerifierConfig::default().with_seed(0x5EED);
    let mut verifier = MultiplierVerifier::random(tb, config);

    let report = verifier.run().await.unwrap();
    assert_eq!(report.iterations, 1000);
    assert_eq!(report.seed, Some(0x5EED));
    assert_eq!(report.min_wait_cycles, 8);
    assert_eq!(report.max_wait_cycles, 8);
    assert_eq!(report.total_wait_cycles, 8_000);
}

#[tokio::test]
async fn test_clock_and_time_accounting() {
    let tb = testbench(model(64), false).await;
    let config = VerifierConfig::default().with_iterations(3).with_seed(1);
    let mut verifier = MultiplierVerifier::random(tb, config);

    let report = verifier.run().await.unwrap();
    // reset edge, then request + one wait + retire per iteration
    assert_eq!(report.clock_cycles, 1 + 3 * 3);
    // reset 4 units, 8 units per iteration, trailing settle
    assert_eq!(report.sim_time_ps, (4 + 3 * 8 + 1) * 1_000);
}

#[tokio::test]
async fn test_trailing_signed_write_is_observable() {
    let tb = testbench(model(64), true).await;
    let source = directed(&[StimulusVector::unsigned(2, 3)]);
    let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());
    verifier.run().await.unwrap();

    let history = verifier.testbench().simulator().history();
    assert_eq!(history.last().unwrap().signals[SIGNED], vec![1]);
    assert_eq!(history[history.len() - 2].signals[SIGNED], vec![0]);
}

#[tokio::test]
async fn test_iteration_outcome_independent_of_history() {
    let shared = StimulusVector::signed(1u64 << 63, 12345);
    let firsts = [
        StimulusVector::unsigned(u64::MAX, u64::MAX),
        StimulusVector::signed(0, 0),
    ];

    let mut reports = Vec::new();
    for first in firsts {
        let tb = testbench(model(5), false).await;
        let source = directed(&[first, shared]);
        let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());
        reports.push(verifier.run().await.unwrap());
    }
    assert_eq!(reports[0].clock_cycles, reports[1].clock_cycles);
    assert_eq!(reports[0].total_wait_cycles, reports[1].total_wait_cycles);
}

#[tokio::test]
async fn test_watchdog_bounds_the_wait() {
    let dut = FaultInjector::new(IterativeMultiplier::new())
        .with_fault(Fault::new(V_O, FaultType::StuckAt0));
    let tb = testbench(Box::new(dut), false).await;
    let config = VerifierConfig::default().with_max_wait_cycles(Some(100));
    let source = directed(&[StimulusVector::unsigned(1, 1)]);
    let mut verifier = MultiplierVerifier::new(tb, source, config);

    let err = verifier.run().await.unwrap_err();
    assert!(matches!(
        err,
        VerifyError::WatchdogExpired {
            iteration: 1,
            cycles: 100
        }
    ));
    assert_eq!(verifier.state(), RunState::Aborted);
}

#[tokio::test]
async fn test_wall_clock_timeout_interrupts_hang() {
    let dut = FaultInjector::new(IterativeMultiplier::new())
        .with_fault(Fault::new(V_O, FaultType::StuckAt0));
    let tb = testbench(Box::new(dut), false).await;
    let source = directed(&[StimulusVector::unsigned(1, 1)]);
    let mut verifier = MultiplierVerifier::new(tb, source, VerifierConfig::default());

    let err = verifier
        .run_with_timeout(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Simulation(SimulationError::Timeout)));
    assert_eq!(verifier.state(), RunState::Aborted);
    assert!(verifier.testbench().cycles() > 0);
}

#[tokio::test]
async fn test_source_exhaustion_ends_run_early() {
    let tb = testbench(model(64), false).await;
    let mut source = DirectedStimulus::boundary_cases();
    assert!(source.next_vector().is_some());
    let remaining = source.len();

    let config = VerifierConfig::default().with_iterations(remaining + 10);
    let mut verifier = MultiplierVerifier::new(tb, source, config);
    let report = verifier.run().await.unwrap();
    assert_eq!(report.iterations, remaining);
}

#[tokio::test]
async fn test_explicit_source_ignores_config_seed() {
    let tb = testbench(model(64), false).await;
    let config = VerifierConfig::default().with_seed(77);
    let source = directed(&[StimulusVector::unsigned(2, 3)]);
    let mut verifier = MultiplierVerifier::new(tb, source, config);

    let report = verifier.run().await.unwrap();
    assert_eq!(report.seed, None);
    assert_eq!(verifier.config().seed, Some(77));
}
