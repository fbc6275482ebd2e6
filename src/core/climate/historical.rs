use crate::core::climate::{ClimateSource, ClimateTrajectory};
use crate::errors::GenerationError;
use rand::Rng;
use rand_pcg::Pcg64;
use std::sync::Arc;

/// A labelled hourly ambient temperature series from a prior year.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoricalSeries {
    pub label: String,
    pub temperatures: Vec<f64>,
}

/// Resamples whole historical months: each run picks one series of the ensemble uniformly at
/// random and uses it verbatim.
#[derive(Clone, Debug)]
pub struct HistoricalEnsemble {
    series: Arc<[HistoricalSeries]>,
    expected_len: usize,
}

impl HistoricalEnsemble {
    pub(crate) fn new(series: Vec<HistoricalSeries>, expected_len: usize) -> Self {
        Self {
            series: series.into(),
            expected_len,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|series| series.label.as_str())
    }
}

impl ClimateSource for HistoricalEnsemble {
    fn generate(&self, rng: &mut Pcg64) -> Result<ClimateTrajectory, GenerationError> {
        if self.series.is_empty() {
            return Err(GenerationError::EmptyEnsemble);
        }
        let chosen = &self.series[rng.random_range(0..self.series.len())];
        if chosen.temperatures.len() != self.expected_len {
            return Err(GenerationError::SeriesLength {
                label: chosen.label.clone(),
                expected: self.expected_len,
                actual: chosen.temperatures.len(),
            });
        }

        ClimateTrajectory::hourly(chosen.temperatures.clone()).ensure_finite()
    }
}
