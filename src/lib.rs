#![allow(clippy::too_many_arguments)]

pub mod core;
pub mod corpus;
pub mod errors;
pub mod input;
pub mod monte_carlo;
pub mod output;
pub mod read_climate_file;
mod simulation_time;
pub mod statistics;
#[cfg(test)]
mod tests;

#[cfg(test)]
#[macro_use]
extern crate is_close;

use crate::core::climate::historical::HistoricalSeries;
use crate::core::cooling_systems::equipment_catalog::EquipmentProfile;
use crate::core::energy_supply::tariff::TariffData;
use crate::corpus::{Corpus, RunResult};
use crate::errors::{CoolsimError, EmptyBatchError};
use crate::input::{ingest_input, ClimateMode, PolicyKind, RunRequest};
use crate::monte_carlo::{run_batch, BatchOptions, BatchOutcome, CancellationToken};
use crate::output::Output;
use crate::statistics::{
    compare_strategies, hour_of_day_profile, mean_series, AggregateStatistics, HourOfDayProfile,
    StrategyComparison,
};
use csv::WriterBuilder;
use indexmap::IndexMap;
use serde::Serialize;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::info;

/// Temperatures (ºC) at which each catalogued COP curve is sampled for charting.
const COP_CURVE_SAMPLE_RANGE: (i32, i32) = (15, 45);

/// Data files supplied alongside the input document.
#[derive(Clone, Debug, Default)]
pub struct ExternalData {
    pub climate_ensemble: Option<Vec<HistoricalSeries>>,
    pub tariff: Option<TariffData>,
}

/// Values that replace fields of the input document's run request.
#[derive(Clone, Debug, Default)]
pub struct RequestOverrides {
    pub n_runs: Option<i64>,
    pub seed: Option<u64>,
    pub control_policy: Option<PolicyKind>,
    pub climate_mode: Option<ClimateMode>,
    pub equipment_id: Option<String>,
}

impl RequestOverrides {
    fn apply(&self, request: &mut RunRequest) {
        if let Some(n_runs) = self.n_runs {
            request.n_runs = n_runs;
        }
        if let Some(seed) = self.seed {
            request.seed = seed;
        }
        if let Some(policy) = self.control_policy {
            request.control_policy = policy;
        }
        if let Some(mode) = self.climate_mode {
            request.climate_mode = mode;
        }
        if let Some(equipment_id) = &self.equipment_id {
            request.equipment_id = equipment_id.clone();
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProjectOptions {
    pub overrides: RequestOverrides,
    pub threads: Option<usize>,
    pub timeout: Option<Duration>,
    /// run both policies on the same seeds and compare them
    pub compare: bool,
    pub cancellation: CancellationToken,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailedRun {
    pub run_index: usize,
    pub seed: u64,
    pub reason: String,
}

/// Everything reported for a completed batch.
#[derive(Clone, Debug, Serialize)]
pub struct ResultPayload {
    pub request: RunRequest,
    pub equipment_id: String,
    pub equipment_profile: EquipmentProfile,
    pub cost_samples: Vec<f64>,
    pub aggregate_statistics: AggregateStatistics,
    pub failed_runs: Vec<FailedRun>,
    pub skipped_runs: usize,
    pub cancelled: bool,
    pub mean_cooling_energy_kwh: f64,
    pub mean_it_energy_kwh: f64,
    pub mean_hours_above_comfort_limit: f64,
    pub hourly_mean_ambient_temps: Vec<f64>,
    pub hourly_mean_room_temps: Vec<f64>,
    pub hour_of_day_ambient_temps: HourOfDayProfile,
    pub hour_of_day_room_temps: HourOfDayProfile,
    pub hour_of_day_cooling_fraction: Vec<f64>,
    pub daily_max_room_temps: Vec<f64>,
    pub cop_curves: IndexMap<String, Vec<(f64, f64)>>,
}

impl ResultPayload {
    pub fn from_batch(corpus: &Corpus, batch: &BatchOutcome) -> Result<Self, EmptyBatchError> {
        let aggregate_statistics = batch.summarize(corpus.settings.histogram_bins)?;
        let results = &batch.results;
        let mean_of = |value: fn(&RunResult) -> f64| {
            results.iter().map(value).sum::<f64>() / results.len() as f64
        };

        Ok(Self {
            request: corpus.request.clone(),
            equipment_id: corpus.equipment_id.clone(),
            equipment_profile: corpus.equipment.clone(),
            cost_samples: batch.cost_samples(),
            aggregate_statistics,
            failed_runs: batch
                .failures
                .iter()
                .map(|failure| FailedRun {
                    run_index: failure.run_index,
                    seed: failure.seed,
                    reason: failure.error.to_string(),
                })
                .collect(),
            skipped_runs: batch.skipped,
            cancelled: batch.cancelled,
            mean_cooling_energy_kwh: mean_of(|result| result.cooling_energy_kwh),
            mean_it_energy_kwh: mean_of(|result| result.it_energy_kwh),
            mean_hours_above_comfort_limit: mean_of(|result| result.hours_above_comfort_limit),
            hourly_mean_ambient_temps: mean_series(results, |result| {
                result.hourly_ambient_temps.as_slice()
            }),
            hourly_mean_room_temps: mean_series(results, |result| {
                result.hourly_room_temps.as_slice()
            }),
            hour_of_day_ambient_temps: hour_of_day_profile(results, |result| {
                result.hourly_ambient_temps.as_slice()
            }),
            hour_of_day_room_temps: hour_of_day_profile(results, |result| {
                result.hourly_room_temps.as_slice()
            }),
            hour_of_day_cooling_fraction: hour_of_day_profile(results, |result| {
                result.hourly_cooling_fraction.as_slice()
            })
            .mean,
            daily_max_room_temps: mean_series(results, |result| {
                result.daily_max_room_temps.as_slice()
            }),
            cop_curves: corpus
                .catalog
                .iter()
                .map(|(id, profile)| {
                    let (from, to) = COP_CURVE_SAMPLE_RANGE;
                    (id.clone(), profile.cop_curve.samples(from, to))
                })
                .collect(),
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectResults {
    pub payloads: IndexMap<PolicyKind, ResultPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<StrategyComparison>,
}

pub fn run_project(
    input: impl Read,
    output: impl Output,
    external_data: ExternalData,
    options: &ProjectOptions,
) -> Result<ProjectResults, CoolsimError> {
    let mut input = ingest_input(input)?;
    options.overrides.apply(&mut input.request);

    let policies = if options.compare {
        vec![PolicyKind::Baseline, PolicyKind::Optimized]
    } else {
        vec![input.request.control_policy]
    };

    let mut payloads = IndexMap::new();
    for policy in policies {
        input.request.control_policy = policy;
        let corpus = Corpus::from_inputs(
            &input,
            external_data.climate_ensemble.clone(),
            external_data.tariff.clone(),
        )?;
        let batch_options = BatchOptions {
            threads: options.threads,
            timeout: options.timeout,
            cancellation: options.cancellation.clone(),
            ..BatchOptions::for_corpus(&corpus)
        };

        let batch = run_batch(&corpus, &batch_options)?;
        let payload = ResultPayload::from_batch(&corpus, &batch)?;
        info!(
            %policy,
            mean = payload.aggregate_statistics.mean,
            costo90 = payload.aggregate_statistics.p90,
            "batch summarised"
        );

        if !output.is_noop() {
            write_payload(&output, &policy.to_string(), &payload, &batch)
                .map_err(CoolsimError::ErrorInOutput)?;
        }
        payloads.insert(policy, payload);
    }

    let comparison = match (
        payloads.get(&PolicyKind::Baseline),
        payloads.get(&PolicyKind::Optimized),
    ) {
        (Some(baseline), Some(optimized)) if options.compare => Some(compare_strategies(
            &baseline.aggregate_statistics,
            &optimized.aggregate_statistics,
        )),
        _ => None,
    };
    if let Some(comparison) = &comparison {
        if !output.is_noop() {
            write_json(&output, "comparison", comparison).map_err(CoolsimError::ErrorInOutput)?;
        }
    }

    Ok(ProjectResults {
        payloads,
        comparison,
    })
}

fn write_json(
    output: &impl Output,
    location_key: &str,
    value: &impl Serialize,
) -> anyhow::Result<()> {
    let mut writer = output.writer_for_location_key(location_key, "json")?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    Ok(())
}

#[derive(Serialize)]
struct CostSampleRow {
    run_index: usize,
    seed: u64,
    total_cost: f64,
    cooling_cost: f64,
    it_cost: f64,
    cooling_energy_kwh: f64,
    peak_room_temp: f64,
    hours_above_comfort_limit: f64,
}

impl From<&RunResult> for CostSampleRow {
    fn from(result: &RunResult) -> Self {
        Self {
            run_index: result.run_index,
            seed: result.seed,
            total_cost: result.total_cost,
            cooling_cost: result.cooling_cost,
            it_cost: result.it_cost,
            cooling_energy_kwh: result.cooling_energy_kwh,
            peak_room_temp: result.peak_room_temp,
            hours_above_comfort_limit: result.hours_above_comfort_limit,
        }
    }
}

fn write_payload(
    output: &impl Output,
    policy_key: &str,
    payload: &ResultPayload,
    batch: &BatchOutcome,
) -> anyhow::Result<()> {
    write_json(output, &format!("{policy_key}__results"), payload)?;

    let location_key = format!("{policy_key}__cost_samples");
    let writer = output.writer_for_location_key(&location_key, "csv")?;
    let mut writer = WriterBuilder::new().from_writer(writer);
    for result in &batch.results {
        writer.serialize(CostSampleRow::from(result))?;
    }
    writer.flush()?;

    Ok(())
}
