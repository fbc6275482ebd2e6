use crate::core::climate::{ClimateSource, ClimateTrajectory};
use crate::core::units::HOURS_PER_DAY;
use crate::errors::GenerationError;
use crate::input::{DiurnalShape, NegativeRangeHandling};
use rand_distr::{Distribution, Normal, NormalError};
use rand_pcg::Pcg64;
use std::f64::consts::PI;

/// Number of draws of a daily range attempted before a run is failed when negative ranges are
/// rejected rather than clamped.
const MAX_RANGE_DRAWS: usize = 100;
/// Furthest (in hours) a jittered daily extreme may move from its anchor hour.
const MAX_EXTREME_HOUR_SHIFT: f64 = 1.;

/// Generates ambient trajectories by drawing each day's minimum temperature and temperature
/// range from normal distributions, then shaping the hours of the day between the extremes.
#[derive(Clone, Debug)]
pub struct StatisticalClimate {
    daily_minimum: Normal<f64>,
    daily_range: Normal<f64>,
    days: usize,
    diurnal_shape: DiurnalShape,
    negative_range: NegativeRangeHandling,
    trough_hour: f64,
    peak_hour: f64,
    extreme_hour_jitter: Option<Normal<f64>>,
}

#[derive(Clone, Copy, Debug)]
struct DailyExtremes {
    minimum: f64,
    maximum: f64,
    trough_hour: f64,
    peak_hour: f64,
}

impl StatisticalClimate {
    /// Arguments:
    /// * `minimum_mean`, `minimum_std_dev` - distribution of the daily minimum temperature, in ºC
    /// * `range_mean`, `range_std_dev` - distribution of the daily range (max - min), in K
    /// * `days` - number of days to generate
    /// * `trough_hour`, `peak_hour` - hours of the day at which the minimum and maximum occur
    /// * `extreme_hour_std_dev` - std dev (hours) of the jitter applied to the extreme hours, zero for none
    pub(crate) fn new(
        minimum_mean: f64,
        minimum_std_dev: f64,
        range_mean: f64,
        range_std_dev: f64,
        days: usize,
        diurnal_shape: DiurnalShape,
        negative_range: NegativeRangeHandling,
        trough_hour: f64,
        peak_hour: f64,
        extreme_hour_std_dev: f64,
    ) -> Result<Self, NormalError> {
        Ok(Self {
            daily_minimum: Normal::new(minimum_mean, minimum_std_dev)?,
            daily_range: Normal::new(range_mean, range_std_dev)?,
            days,
            diurnal_shape,
            negative_range,
            trough_hour,
            peak_hour,
            extreme_hour_jitter: if extreme_hour_std_dev > 0. {
                Some(Normal::new(0., extreme_hour_std_dev)?)
            } else {
                None
            },
        })
    }

    fn draw_day(&self, day: usize, rng: &mut Pcg64) -> Result<DailyExtremes, GenerationError> {
        let minimum = self.daily_minimum.sample(rng);
        let range = match self.negative_range {
            NegativeRangeHandling::Clamp => self.daily_range.sample(rng).max(0.),
            NegativeRangeHandling::Reject => (0..MAX_RANGE_DRAWS)
                .map(|_| self.daily_range.sample(rng))
                .find(|range| *range >= 0.)
                .ok_or(GenerationError::NegativeRange {
                    day,
                    attempts: MAX_RANGE_DRAWS,
                })?,
        };
        let trough_hour = self.jittered(self.trough_hour, rng);
        let peak_hour = self.jittered(self.peak_hour, rng);

        Ok(DailyExtremes {
            minimum,
            maximum: minimum + range,
            trough_hour,
            peak_hour,
        })
    }

    fn jittered(&self, anchor_hour: f64, rng: &mut Pcg64) -> f64 {
        match &self.extreme_hour_jitter {
            Some(jitter) => {
                anchor_hour
                    + jitter
                        .sample(rng)
                        .clamp(-MAX_EXTREME_HOUR_SHIFT, MAX_EXTREME_HOUR_SHIFT)
            }
            None => anchor_hour,
        }
    }
}

impl ClimateSource for StatisticalClimate {
    fn generate(&self, rng: &mut Pcg64) -> Result<ClimateTrajectory, GenerationError> {
        let days = (0..self.days)
            .map(|day| self.draw_day(day, rng))
            .collect::<Result<Vec<_>, _>>()?;
        let hours_per_day = HOURS_PER_DAY as usize;

        let temperatures = (0..days.len() * hours_per_day)
            .map(|hour| {
                let day = hour / hours_per_day;
                let hour_of_day = (hour % hours_per_day) as f64;
                match self.diurnal_shape {
                    DiurnalShape::Cosine => cosine_profile(&days[day], hour_of_day),
                    DiurnalShape::SplitCosine => split_cosine_profile(
                        &days[day.saturating_sub(1)],
                        &days[day],
                        &days[(day + 1).min(days.len() - 1)],
                        hour_of_day,
                    ),
                }
            })
            .collect();

        ClimateTrajectory::hourly(temperatures).ensure_finite()
    }
}

/// Single cosine centred on the day's mean, peaking at the peak hour.
fn cosine_profile(today: &DailyExtremes, hour_of_day: f64) -> f64 {
    let mean = (today.minimum + today.maximum) / 2.;
    let amplitude = (today.maximum - today.minimum) / 2.;

    mean + amplitude * (2. * PI * (hour_of_day - today.peak_hour) / HOURS_PER_DAY as f64).cos()
}

/// Half-cosine segments between consecutive extremes: the previous day's maximum falls to
/// today's minimum at the trough hour, rises to today's maximum at the peak hour, then falls
/// towards the next day's minimum.
fn split_cosine_profile(
    previous: &DailyExtremes,
    today: &DailyExtremes,
    next: &DailyExtremes,
    hour_of_day: f64,
) -> f64 {
    let hours_per_day = HOURS_PER_DAY as f64;
    if hour_of_day < today.trough_hour {
        half_cosine(
            (previous.peak_hour - hours_per_day, previous.maximum),
            (today.trough_hour, today.minimum),
            hour_of_day,
        )
    } else if hour_of_day < today.peak_hour {
        half_cosine(
            (today.trough_hour, today.minimum),
            (today.peak_hour, today.maximum),
            hour_of_day,
        )
    } else {
        half_cosine(
            (today.peak_hour, today.maximum),
            (next.trough_hour + hours_per_day, next.minimum),
            hour_of_day,
        )
    }
}

fn half_cosine(start: (f64, f64), end: (f64, f64), hour: f64) -> f64 {
    let (start_hour, start_temp) = start;
    let (end_hour, end_temp) = end;
    let progress = (hour - start_hour) / (end_hour - start_hour);

    start_temp + (end_temp - start_temp) * (1. - (PI * progress).cos()) / 2.
}
