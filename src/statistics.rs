//! Reductions of a batch of runs into summary statistics and binned distributions.
use crate::core::units::HOURS_PER_DAY;
use crate::corpus::RunResult;
use crate::errors::EmptyBatchError;
use serde::Serialize;
use statrs::statistics::Statistics;

/// Percentile (0-100) of a set of numbers, interpolating linearly between the closest ranks
/// (rank = p / 100 · (n - 1)). This matches numpy's default "linear" method.
pub fn percentile(numbers: &[f64], percentile: f64) -> f64 {
    if numbers.is_empty() {
        return f64::NAN;
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (percentile / 100.).clamp(0., 1.) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

fn min_max(numbers: &[f64]) -> (f64, f64) {
    numbers.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), &number| (min.min(number), max.max(number)),
    )
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    /// bin edges, one more than the number of bins
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Fixed-bin-count histogram over [min, max] of the samples. When every sample is equal the
/// histogram collapses to a single bin holding all of them.
pub fn histogram(samples: &[f64], bins: usize) -> Histogram {
    let (min, max) = min_max(samples);
    if samples.is_empty() || min == max || bins <= 1 {
        return Histogram {
            edges: if samples.is_empty() {
                vec![]
            } else {
                vec![min, max]
            },
            counts: if samples.is_empty() {
                vec![]
            } else {
                vec![samples.len()]
            },
        };
    }

    let width = (max - min) / bins as f64;
    let mut edges = (0..bins)
        .map(|bin| min + bin as f64 * width)
        .collect::<Vec<_>>();
    edges.push(max);

    let mut counts = vec![0; bins];
    for sample in samples {
        // the last bin is closed on the right
        let bin = (((sample - min) / width).floor() as usize).min(bins - 1);
        counts[bin] += 1;
    }

    Histogram { edges, counts }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateStatistics {
    pub n: usize,
    pub mean: f64,
    /// sample standard deviation, zero for a single sample
    pub std_dev: f64,
    pub median: f64,
    /// 90th percentile, the risk-oriented budgeting figure
    #[serde(rename = "costo90")]
    pub p90: f64,
    pub min: f64,
    pub max: f64,
    pub histogram: Histogram,
}

pub fn describe(
    samples: &[f64],
    histogram_bins: usize,
) -> Result<AggregateStatistics, EmptyBatchError> {
    if samples.is_empty() {
        return Err(EmptyBatchError);
    }
    let (min, max) = min_max(samples);
    let histogram = histogram(samples, histogram_bins);

    if min == max {
        return Ok(AggregateStatistics {
            n: samples.len(),
            mean: min,
            std_dev: 0.,
            median: min,
            p90: min,
            min,
            max,
            histogram,
        });
    }

    Ok(AggregateStatistics {
        n: samples.len(),
        mean: Statistics::mean(samples.iter()),
        std_dev: if samples.len() > 1 {
            Statistics::std_dev(samples.iter())
        } else {
            0.
        },
        median: percentile(samples, 50.),
        p90: percentile(samples, 90.),
        min,
        max,
        histogram,
    })
}

/// Summarise the total costs of a batch of runs.
pub fn summarize(
    results: &[RunResult],
    histogram_bins: usize,
) -> Result<AggregateStatistics, EmptyBatchError> {
    let costs = results
        .iter()
        .map(|result| result.total_cost)
        .collect::<Vec<_>>();
    describe(&costs, histogram_bins)
}

/// Element-wise mean across runs of an equal-length per-run series.
pub fn mean_series(results: &[RunResult], series: impl Fn(&RunResult) -> &[f64]) -> Vec<f64> {
    let len = results.iter().map(|result| series(result).len()).max().unwrap_or(0);
    (0..len)
        .map(|idx| {
            let values = results
                .iter()
                .filter_map(|result| series(result).get(idx).copied())
                .collect::<Vec<_>>();
            values.iter().sum::<f64>() / values.len() as f64
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HourOfDayProfile {
    pub mean: Vec<f64>,
    pub p25: Vec<f64>,
    pub p75: Vec<f64>,
}

/// Distribution of an hourly series by hour of the day, pooled over every run and every day.
pub fn hour_of_day_profile(
    results: &[RunResult],
    series: impl Fn(&RunResult) -> &[f64],
) -> HourOfDayProfile {
    let hours_per_day = HOURS_PER_DAY as usize;
    let mut by_hour = vec![vec![]; hours_per_day];
    for result in results {
        for (hour, value) in series(result).iter().enumerate() {
            by_hour[hour % hours_per_day].push(*value);
        }
    }

    HourOfDayProfile {
        mean: by_hour
            .iter()
            .map(|values| values.iter().sum::<f64>() / values.len() as f64)
            .collect(),
        p25: by_hour.iter().map(|values| percentile(values, 25.)).collect(),
        p75: by_hour.iter().map(|values| percentile(values, 75.)).collect(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StrategyComparison {
    /// reduction in mean cost of the optimized strategy relative to the baseline, in %
    pub mean_improvement_pct: f64,
    /// reduction in 90th percentile cost relative to the baseline, in %
    pub p90_improvement_pct: f64,
}

pub fn compare_strategies(
    baseline: &AggregateStatistics,
    optimized: &AggregateStatistics,
) -> StrategyComparison {
    StrategyComparison {
        mean_improvement_pct: (baseline.mean - optimized.mean) / baseline.mean * 100.,
        p90_improvement_pct: (baseline.p90 - optimized.p90) / baseline.p90 * 100.,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn numbers() -> [f64; 10] {
        [9.0, 3.0, 3.0, 4.0, 5.0, 4.9, 8.0, 3.3, 2.0, 0.1]
    }

    #[fixture]
    fn other_numbers() -> [f64; 10] {
        [14.2, 16.5, 3.4, 7.8, 18.4, 10.5, 7.4, 2.9, 22.3, 16.0]
    }

    #[rstest]
    fn test_percentile(numbers: [f64; 10]) {
        assert_relative_eq!(percentile(&numbers, 70.), 4.93, epsilon = 1e-9);
        assert_relative_eq!(percentile(&numbers, 50.), 3.65, epsilon = 1e-9);
        assert_relative_eq!(percentile(&numbers, 0.), 0.1);
        assert_relative_eq!(percentile(&numbers, 100.), 9.0);
    }

    #[rstest]
    fn test_percentile_with_other_cases(other_numbers: [f64; 10]) {
        assert_relative_eq!(percentile(&other_numbers, 80.), 16.88, epsilon = 1e-9);
        assert_relative_eq!(percentile(&other_numbers, 90.), 18.79, epsilon = 1e-9);
    }

    #[rstest]
    fn should_bin_samples_over_range(other_numbers: [f64; 10]) {
        let histogram = histogram(&other_numbers, 4);
        assert_eq!(histogram.edges.len(), 5);
        assert_relative_eq!(histogram.edges[0], 2.9);
        assert_relative_eq!(histogram.edges[4], 22.3);
        assert_eq!(histogram.counts.iter().sum::<usize>(), 10);
        assert_eq!(histogram.counts, vec![3, 2, 3, 2]);
    }

    #[rstest]
    fn should_collapse_identical_samples_to_one_bin() {
        let samples = [5535.25; 7];
        let stats = describe(&samples, 50).unwrap();
        assert_eq!(stats.histogram.counts, vec![7]);
        assert_eq!(stats.histogram.edges, vec![5535.25, 5535.25]);
        assert_eq!(stats.mean, 5535.25);
        assert_eq!(stats.p90, 5535.25);
        assert_eq!(stats.std_dev, 0.);
    }

    #[rstest]
    fn should_describe_samples(numbers: [f64; 10]) {
        let stats = describe(&numbers, 50).unwrap();
        assert_eq!(stats.n, 10);
        assert_relative_eq!(stats.mean, 4.23, epsilon = 1e-12);
        assert_relative_eq!(stats.min, 0.1);
        assert_relative_eq!(stats.max, 9.0);
        assert_relative_eq!(stats.median, 3.65, epsilon = 1e-9);
        assert!(stats.p90 >= stats.median);
        assert_eq!(stats.histogram.counts.iter().sum::<usize>(), 10);
        assert_eq!(stats.histogram.edges.len(), 51);
    }

    #[rstest]
    fn should_give_zero_std_dev_for_single_sample() {
        let stats = describe(&[12.5], 10).unwrap();
        assert_eq!(stats.std_dev, 0.);
        assert_eq!(stats.mean, 12.5);
    }

    #[rstest]
    fn should_fail_loudly_for_empty_batch() {
        assert_eq!(describe(&[], 50), Err(EmptyBatchError));
        assert_eq!(summarize(&[], 50), Err(EmptyBatchError));
    }

    #[rstest]
    fn should_compare_strategies() {
        let baseline = describe(&[100., 200.], 2).unwrap();
        let optimized = describe(&[90., 180.], 2).unwrap();
        let comparison = compare_strategies(&baseline, &optimized);
        assert_relative_eq!(comparison.mean_improvement_pct, 10., epsilon = 1e-9);
        assert_relative_eq!(comparison.p90_improvement_pct, 10., epsilon = 1e-9);
    }
}
