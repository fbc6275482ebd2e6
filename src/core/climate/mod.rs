pub mod historical;
pub mod statistical;

use crate::core::climate::historical::HistoricalEnsemble;
use crate::core::climate::statistical::StatisticalClimate;
use crate::core::units::SECONDS_PER_HOUR;
use crate::errors::GenerationError;
use rand_pcg::Pcg64;

/// An ordered series of ambient air temperatures (ºC) sampled at a fixed step, spanning the
/// simulated month. Owned by the single run that generated it.
#[derive(Clone, Debug, PartialEq)]
pub struct ClimateTrajectory {
    step_in_seconds: u32,
    temperatures: Vec<f64>,
}

impl ClimateTrajectory {
    pub fn new(temperatures: Vec<f64>, step_in_seconds: u32) -> Self {
        Self {
            step_in_seconds,
            temperatures,
        }
    }

    pub fn hourly(temperatures: Vec<f64>) -> Self {
        Self::new(temperatures, SECONDS_PER_HOUR)
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// Ambient temperature at an elapsed time, linearly interpolated between samples and held
    /// constant past the last one.
    pub fn air_temp_at(&self, elapsed_seconds: f64) -> f64 {
        let Some(last) = self.temperatures.last() else {
            return f64::NAN;
        };
        let position = (elapsed_seconds / self.step_in_seconds as f64).max(0.);
        let idx = position.floor() as usize;
        if idx + 1 >= self.temperatures.len() {
            return *last;
        }
        let frac = position - idx as f64;
        let (before, after) = (self.temperatures[idx], self.temperatures[idx + 1]);

        before + (after - before) * frac
    }

    /// Ambient temperature recorded for a given sample (hour) index.
    pub fn sample(&self, idx: usize) -> f64 {
        self.temperatures[idx.min(self.temperatures.len().saturating_sub(1))]
    }

    pub(crate) fn ensure_finite(self) -> Result<Self, GenerationError> {
        match self.temperatures.iter().position(|temp| !temp.is_finite()) {
            Some(hour) => Err(GenerationError::NonFiniteTemperature { hour }),
            None => Ok(self),
        }
    }
}

/// Something that can produce a fresh month-long climate trajectory for one run.
pub trait ClimateSource {
    fn generate(&self, rng: &mut Pcg64) -> Result<ClimateTrajectory, GenerationError>;
}

#[derive(Clone, Debug)]
pub enum ClimateGenerator {
    Statistical(StatisticalClimate),
    Historical(HistoricalEnsemble),
}

macro_rules! per_climate {
    ($val:expr, $pattern:pat => { $res:expr }) => {
        match $val {
            ClimateGenerator::Statistical($pattern) => $res,
            ClimateGenerator::Historical($pattern) => $res,
        }
    };
}

impl ClimateSource for ClimateGenerator {
    fn generate(&self, rng: &mut Pcg64) -> Result<ClimateTrajectory, GenerationError> {
        per_climate!(self, source => { source.generate(rng) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[fixture]
    fn trajectory() -> ClimateTrajectory {
        ClimateTrajectory::hourly(vec![10., 20., 14.])
    }

    #[rstest]
    #[case(0., 10.)]
    #[case(1800., 15.)]
    #[case(3600., 20.)]
    #[case(5400., 17.)]
    #[case(7200., 14.)]
    #[case(100_000., 14.)]
    fn should_interpolate_air_temperature(
        trajectory: ClimateTrajectory,
        #[case] elapsed: f64,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(trajectory.air_temp_at(elapsed), expected);
    }

    #[rstest]
    fn should_reject_non_finite_samples() {
        let trajectory = ClimateTrajectory::hourly(vec![10., f64::NAN, 12.]);
        assert_eq!(
            trajectory.ensure_finite(),
            Err(GenerationError::NonFiniteTemperature { hour: 1 })
        );
    }
}
