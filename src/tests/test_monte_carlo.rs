use crate::core::climate::historical::HistoricalSeries;
use crate::corpus::Corpus;
use crate::errors::{CoolsimError, EmptyBatchError, GenerationError, RunError};
use crate::input::{ClimateMode, Input, PolicyKind};
use crate::monte_carlo::*;
use crate::statistics::percentile;
use pretty_assertions::assert_eq;
use rstest::*;
use std::sync::Arc;
use std::time::Duration;

fn short_input(days: u32, n_runs: i64) -> Input {
    let mut input = Input::default();
    input.simulation.days = days;
    input.request.n_runs = n_runs;
    input
}

fn corpus(input: &Input) -> Corpus {
    Corpus::from_inputs(input, None, None).unwrap()
}

fn flat_series(label: &str, temperature: f64, hours: usize) -> HistoricalSeries {
    HistoricalSeries {
        label: label.to_string(),
        temperatures: vec![temperature; hours],
    }
}

#[rstest]
fn test_reference_month_falls_in_expected_band() {
    let corpus = corpus(&Input::default());
    let batch = run_batch(&corpus, &BatchOptions::for_corpus(&corpus)).unwrap();

    assert_eq!(batch.results.len(), 200);
    assert!(batch.failures.is_empty());
    assert!(!batch.cancelled);

    let stats = batch.summarize(50).unwrap();
    assert!(
        (4_500. ..=5_600.).contains(&stats.mean),
        "mean cost {} outside the expected band",
        stats.mean
    );
    assert!(stats.p90 >= stats.mean);
    assert!(stats.min <= stats.median && stats.median <= stats.p90 && stats.p90 <= stats.max);
    assert_eq!(stats.histogram.counts.iter().sum::<usize>(), 200);

    for result in &batch.results {
        assert!(result.energy_balance_residual <= 1e-9);
        assert_eq!(result.hourly_room_temps.len(), 744);
        assert_eq!(result.daily_max_room_temps.len(), 31);
        assert!(is_close!(
            result.total_cost,
            result.cooling_cost + result.it_cost,
            rel_tol = 1e-12
        ));
    }
}

#[rstest]
fn test_batch_is_reproducible_across_worker_counts() {
    let corpus = corpus(&short_input(3, 12));
    let sequential = run_batch(
        &corpus,
        &BatchOptions {
            threads: Some(1),
            ..BatchOptions::for_corpus(&corpus)
        },
    )
    .unwrap();
    let parallel = run_batch(
        &corpus,
        &BatchOptions {
            threads: Some(4),
            ..BatchOptions::for_corpus(&corpus)
        },
    )
    .unwrap();

    assert_eq!(sequential.cost_samples(), parallel.cost_samples());
    assert_eq!(sequential.results, parallel.results);
    assert_eq!(
        sequential
            .results
            .iter()
            .map(|result| result.run_index)
            .collect::<Vec<_>>(),
        (0..12).collect::<Vec<_>>()
    );
}

#[rstest]
fn test_different_seeds_give_different_samples() {
    let mut input = short_input(3, 6);
    let first = corpus(&input);
    input.request.seed = 7;
    let second = corpus(&input);

    let first = run_batch(&first, &BatchOptions::for_corpus(&first)).unwrap();
    let second = run_batch(&second, &BatchOptions::for_corpus(&second)).unwrap();
    assert_ne!(first.cost_samples(), second.cost_samples());
}

#[rstest]
fn test_more_cooling_capacity_does_not_raise_mean_cost() {
    let mut input = short_input(7, 16);
    let standard = corpus(&input);
    input.physical.max_cooling_power = 90_000.;
    let oversized = corpus(&input);

    let standard = run_batch(&standard, &BatchOptions::for_corpus(&standard))
        .unwrap()
        .summarize(50)
        .unwrap();
    let oversized = run_batch(&oversized, &BatchOptions::for_corpus(&oversized))
        .unwrap()
        .summarize(50)
        .unwrap();

    // on/off overshoot can move the mean by a hair either way
    assert!(oversized.mean <= standard.mean * 1.005);
}

#[rstest]
fn test_optimized_control_is_no_more_expensive_than_baseline() {
    let mut input = short_input(7, 16);
    let baseline = corpus(&input);
    input.request.control_policy = PolicyKind::Optimized;
    let optimized = corpus(&input);

    let baseline = run_batch(&baseline, &BatchOptions::for_corpus(&baseline)).unwrap();
    let optimized = run_batch(&optimized, &BatchOptions::for_corpus(&optimized)).unwrap();

    assert!(optimized.summarize(50).unwrap().mean <= baseline.summarize(50).unwrap().mean);
    // identical climates run by run, so IT cost is unaffected by the policy
    for (baseline, optimized) in baseline.results.iter().zip(&optimized.results) {
        assert_eq!(baseline.hourly_ambient_temps, optimized.hourly_ambient_temps);
        assert!(is_close!(baseline.it_cost, optimized.it_cost, rel_tol = 1e-12));
    }
}

#[rstest]
fn test_percentile_ordering_of_batch() {
    let corpus = corpus(&short_input(2, 20));
    let batch = run_batch(&corpus, &BatchOptions::for_corpus(&corpus)).unwrap();
    let samples = batch.cost_samples();
    let stats = batch.summarize(10).unwrap();

    assert_eq!(stats.n, 20);
    assert_eq!(stats.p90, percentile(&samples, 90.));
    assert!(stats.min <= stats.p90 && stats.p90 <= stats.max);
    assert_eq!(stats.histogram.counts.len(), 10);
    assert_eq!(stats.histogram.edges.first(), Some(&stats.min));
    assert_eq!(stats.histogram.edges.last(), Some(&stats.max));
}

#[rstest]
fn test_single_historical_month_collapses_histogram() {
    let mut input = short_input(2, 9);
    input.request.climate_mode = ClimateMode::Historical;
    let corpus =
        Corpus::from_inputs(&input, Some(vec![flat_series("2019", 24., 48)]), None).unwrap();

    let batch = run_batch(&corpus, &BatchOptions::for_corpus(&corpus)).unwrap();
    let stats = batch.summarize(50).unwrap();

    assert_eq!(stats.histogram.counts, vec![9]);
    assert_eq!(stats.mean, stats.p90);
    assert_eq!(stats.min, stats.max);
    assert_eq!(stats.mean, stats.min);
    assert_eq!(stats.std_dev, 0.);
}

#[rstest]
fn test_failed_runs_are_excluded_but_do_not_abort_batch() {
    let mut input = short_input(1, 16);
    input.request.climate_mode = ClimateMode::Historical;
    input.simulation.valid_temp_range = (-80., 40.);
    let corpus = Corpus::from_inputs(
        &input,
        Some(vec![
            flat_series("mild", 22., 24),
            flat_series("heatwave", 80., 24),
        ]),
        None,
    )
    .unwrap();

    let batch = run_batch(&corpus, &BatchOptions::for_corpus(&corpus)).unwrap();

    assert_eq!(batch.results.len() + batch.failures.len(), 16);
    assert!(!batch.results.is_empty());
    assert!(!batch.failures.is_empty());
    for failure in &batch.failures {
        assert!(matches!(
            failure.error,
            RunError::NumericalDivergence { .. }
        ));
        assert_eq!(failure.seed, run_seed(42, failure.run_index));
    }
    assert_eq!(batch.summarize(50).unwrap().n, batch.results.len());
}

#[rstest]
fn test_missing_ensemble_fails_every_run() {
    let mut input = short_input(1, 4);
    input.request.climate_mode = ClimateMode::Historical;
    let corpus = corpus(&input);

    match run_batch(&corpus, &BatchOptions::for_corpus(&corpus)) {
        Err(CoolsimError::AllRunsFailed {
            attempted,
            first_failure,
        }) => {
            assert_eq!(attempted, 4);
            assert_eq!(
                first_failure,
                RunError::Generation(GenerationError::EmptyEnsemble)
            );
        }
        other => panic!("expected every run to fail, got {other:?}"),
    }
}

#[rstest]
fn test_cancelled_batch_reports_no_statistics() {
    let corpus = corpus(&short_input(1, 8));
    let options = BatchOptions::for_corpus(&corpus);
    options.cancellation.cancel();

    let batch = run_batch(&corpus, &options).unwrap();
    assert!(batch.results.is_empty());
    assert_eq!(batch.skipped, 8);
    assert!(batch.cancelled);
    assert_eq!(batch.summarize(50), Err(EmptyBatchError));
}

#[rstest]
fn test_metered_energy_and_cost_never_decrease() {
    let corpus = corpus(&short_input(3, 8));
    let batch = run_batch(&corpus, &BatchOptions::for_corpus(&corpus)).unwrap();
    let running_total = |series: &[f64]| {
        series
            .iter()
            .scan(0_f64, |total, value| {
                *total += value;
                Some(*total)
            })
            .collect::<Vec<_>>()
    };

    for result in &batch.results {
        assert_eq!(result.hourly_cooling_energy_kwh.len(), 72);
        assert_eq!(result.hourly_cost.len(), 72);
        assert!(result.hourly_cooling_energy_kwh.iter().all(|energy| *energy >= 0.));
        assert!(result.hourly_cost.iter().all(|cost| *cost >= 0.));
        assert!(result
            .hourly_cooling_fraction
            .iter()
            .all(|fraction| (0. ..=1.).contains(fraction)));

        let cumulative_energy = running_total(&result.hourly_cooling_energy_kwh);
        let cumulative_cost = running_total(&result.hourly_cost);
        assert!(cumulative_energy.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!(cumulative_cost.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!(is_close!(
            cumulative_energy[71],
            result.cooling_energy_kwh,
            rel_tol = 1e-9
        ));
        assert!(is_close!(
            cumulative_cost[71],
            result.total_cost,
            rel_tol = 1e-9
        ));
    }
}

#[rstest]
fn test_stop_signal_interrupts_run_in_progress() {
    let corpus = corpus(&short_input(1, 1));
    let token = CancellationToken::new();
    token.cancel();

    assert_eq!(
        corpus.run_single(0, 42, &StopSignal::new(token, None)),
        Err(RunError::Cancelled)
    );
    assert_eq!(
        corpus.run_single(0, 42, &StopSignal::new(CancellationToken::new(), Some(Duration::ZERO))),
        Err(RunError::Cancelled)
    );
    assert!(corpus.run_single(0, 42, &StopSignal::never()).is_ok());
}

#[rstest]
fn test_cancelling_mid_batch_keeps_completed_runs_intact() {
    let input = short_input(7, 24);
    let reference = corpus(&input);
    let reference = run_batch(&reference, &BatchOptions::for_corpus(&reference)).unwrap();

    let corpus = Arc::new(corpus(&input));
    let options = BatchOptions {
        threads: Some(2),
        ..BatchOptions::for_corpus(&corpus)
    };
    let handle = BatchHandle::spawn(corpus, options);
    while matches!(
        handle.status(),
        BatchStatus::NotStarted | BatchStatus::Running { completed: 0, .. }
    ) {
        std::thread::sleep(Duration::from_millis(1));
    }
    handle.cancel();

    let outcome = match handle.wait() {
        BatchStatus::Done(outcome) => outcome,
        other => panic!("expected a finished batch, got {other:?}"),
    };
    assert!(outcome.cancelled);
    assert!(!outcome.results.is_empty());
    assert_eq!(
        outcome.results.len() + outcome.failures.len() + outcome.skipped,
        24
    );
    for result in &outcome.results {
        assert_eq!(result, &reference.results[result.run_index]);
    }
}

#[rstest]
fn test_timeout_mid_batch_keeps_completed_runs_intact() {
    let input = short_input(7, 24);
    let corpus = corpus(&input);
    let reference = run_batch(&corpus, &BatchOptions::for_corpus(&corpus)).unwrap();

    let batch = run_batch(
        &corpus,
        &BatchOptions {
            threads: Some(1),
            timeout: Some(Duration::from_millis(20)),
            ..BatchOptions::for_corpus(&corpus)
        },
    )
    .unwrap();

    assert_eq!(
        batch.results.len() + batch.failures.len() + batch.skipped,
        24
    );
    assert_eq!(batch.cancelled, batch.skipped > 0);
    for result in &batch.results {
        assert_eq!(result, &reference.results[result.run_index]);
    }
}

#[rstest]
fn test_batch_handle_runs_to_completion() {
    let corpus = Arc::new(corpus(&short_input(1, 4)));
    let options = BatchOptions::for_corpus(&corpus);
    let handle = BatchHandle::spawn(corpus, options);

    match handle.status() {
        BatchStatus::NotStarted | BatchStatus::Running { total: 4, .. } | BatchStatus::Done(_) => {}
        other => panic!("unexpected status {other:?}"),
    }
    match handle.wait() {
        BatchStatus::Done(outcome) => {
            assert_eq!(outcome.results.len(), 4);
            assert!(!outcome.cancelled);
        }
        other => panic!("expected a finished batch, got {other:?}"),
    }
}

#[rstest]
fn test_batch_handle_reports_failure() {
    let mut input = short_input(1, 2);
    input.request.climate_mode = ClimateMode::Historical;
    let corpus = Arc::new(corpus(&input));
    let options = BatchOptions::for_corpus(&corpus);

    assert!(matches!(
        BatchHandle::spawn(corpus, options).wait(),
        BatchStatus::Failed(_)
    ));
}
