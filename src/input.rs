use crate::core::cooling_systems::equipment_catalog::{built_in_catalog, EquipmentCatalog};
use crate::core::units::{celsius_to_kelvin, HOURS_PER_DAY, SECONDS_PER_HOUR};
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::{BufReader, Read};
use strum::{Display, EnumString};

pub fn ingest_input(json: impl Read) -> anyhow::Result<Input> {
    let reader = BufReader::new(json);
    Ok(serde_json::from_reader(reader)?)
}

/// A complete batch configuration. Every section falls back to its defaults, so `{}` is a
/// valid document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Input {
    #[validate]
    pub physical: PhysicalParameters,
    #[validate]
    pub climate: ClimateParameters,
    #[validate]
    pub simulation: SimulationSettings,
    pub control: ControlThresholds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_catalog: Option<EquipmentCatalog>,
    #[validate]
    pub request: RunRequest,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicalParameters {
    /// exterior surface area, in m2
    #[validate(exclusive_minimum = 0.)]
    pub area: f64,
    /// heat transfer coefficient, in W / (m2.K)
    #[validate(exclusive_minimum = 0.)]
    pub u_value: f64,
    /// fixed IT heat load, in W
    #[validate(exclusive_minimum = 0.)]
    pub servers_heat_load: f64,
    /// thermal capacitance of the room, in J / K
    #[validate(exclusive_minimum = 0.)]
    pub thermal_capacitance: f64,
    /// maximum cooling power, in W
    #[validate(exclusive_minimum = 0.)]
    pub max_cooling_power: f64,
    /// energy price, in currency / kWh
    #[validate(exclusive_minimum = 0.)]
    pub tariff: f64,
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self {
            area: 126.,
            u_value: 5.5,
            servers_heat_load: 45_000.,
            thermal_capacitance: 2_000_000.,
            max_cooling_power: 60_000.,
            tariff: 0.13,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiurnalShape {
    Cosine,
    SplitCosine,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NegativeRangeHandling {
    Clamp,
    Reject,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ClimateParameters {
    /// mean daily minimum temperature, in ºC
    pub t_min_mean: f64,
    #[validate(minimum = 0.)]
    pub t_min_std_dev: f64,
    /// mean daily range (max - min), in K
    pub range_mean: f64,
    #[validate(minimum = 0.)]
    pub range_std_dev: f64,
    pub diurnal_shape: DiurnalShape,
    pub negative_range: NegativeRangeHandling,
    #[validate(minimum = 0.)]
    #[validate(exclusive_maximum = 24.)]
    pub trough_hour: f64,
    #[validate(minimum = 0.)]
    #[validate(exclusive_maximum = 24.)]
    pub peak_hour: f64,
    /// std dev of the jitter applied to the hours of the daily extremes, in hours
    #[validate(minimum = 0.)]
    pub extreme_hour_std_dev: f64,
}

impl Default for ClimateParameters {
    fn default() -> Self {
        Self {
            t_min_mean: 20.1,
            t_min_std_dev: 2.5,
            range_mean: 11.4,
            range_std_dev: 3.0,
            diurnal_shape: DiurnalShape::Cosine,
            negative_range: NegativeRangeHandling::Clamp,
            trough_hour: 5.,
            peak_hour: 15.,
            extreme_hour_std_dev: 0.,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntegrationMethod {
    ForwardEuler,
    Rk4,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// simulated horizon, in days; at most a year
    #[validate(minimum = 1)]
    #[validate(maximum = 366)]
    pub days: u32,
    /// interval between control decisions, in s; must divide an hour
    #[validate(minimum = 1)]
    pub decision_interval: u32,
    /// integration substeps per decision interval
    #[validate(minimum = 1)]
    pub substeps: u32,
    pub integration_method: IntegrationMethod,
    /// room temperature at the start of every run, in ºC
    pub initial_room_temp: f64,
    /// room temperatures outside this range (ºC) fail the run
    pub valid_temp_range: (f64, f64),
    /// room temperature above which time is counted as uncomfortable, in ºC
    pub comfort_limit: f64,
    #[validate(minimum = 1)]
    pub histogram_bins: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            days: 31,
            decision_interval: 60,
            substeps: 6,
            integration_method: IntegrationMethod::Rk4,
            initial_room_temp: 24.,
            valid_temp_range: (-80., 150.),
            comfort_limit: 25.,
            histogram_bins: 50,
        }
    }
}

impl SimulationSettings {
    pub fn total_hours(&self) -> u32 {
        self.days * HOURS_PER_DAY
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaselineThresholds {
    pub t_hot: f64,
}

impl Default for BaselineThresholds {
    fn default() -> Self {
        Self { t_hot: 25. }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizedThresholds {
    pub t_low: f64,
    pub t_hot: f64,
    pub cop_threshold: f64,
}

impl Default for OptimizedThresholds {
    fn default() -> Self {
        Self {
            t_low: 25.,
            t_hot: 27.,
            cop_threshold: 3.6,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlThresholds {
    pub baseline: BaselineThresholds,
    pub optimized: OptimizedThresholds,
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Baseline,
    Optimized,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClimateMode {
    #[default]
    Statistical,
    Historical,
}

/// Replacement values for individual thresholds of the selected policy.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdOverrides {
    pub t_hot: Option<f64>,
    pub t_low: Option<f64>,
    pub cop_threshold: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct RunRequest {
    pub equipment_id: String,
    #[validate(minimum = 1)]
    pub n_runs: i64,
    pub control_policy: PolicyKind,
    pub climate_mode: ClimateMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_overrides: Option<ThresholdOverrides>,
    pub seed: u64,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            equipment_id: "eficiente".to_string(),
            n_runs: 200,
            control_policy: PolicyKind::Baseline,
            climate_mode: ClimateMode::Statistical,
            threshold_overrides: None,
            seed: 42,
        }
    }
}

impl Input {
    pub fn catalog(&self) -> EquipmentCatalog {
        self.equipment_catalog
            .clone()
            .unwrap_or_else(built_in_catalog)
    }

    /// Thresholds for the requested policy with any overrides applied.
    pub fn effective_thresholds(&self) -> ControlThresholds {
        let mut thresholds = self.control;
        if let Some(overrides) = self.request.threshold_overrides {
            match self.request.control_policy {
                PolicyKind::Baseline => {
                    if let Some(t_hot) = overrides.t_hot {
                        thresholds.baseline.t_hot = t_hot;
                    }
                }
                PolicyKind::Optimized => {
                    let optimized = &mut thresholds.optimized;
                    optimized.t_hot = overrides.t_hot.unwrap_or(optimized.t_hot);
                    optimized.t_low = overrides.t_low.unwrap_or(optimized.t_low);
                    optimized.cop_threshold =
                        overrides.cop_threshold.unwrap_or(optimized.cop_threshold);
                }
            }
        }
        thresholds
    }

    /// Check every configuration rule that can be checked before a batch starts.
    pub fn check(&self) -> Result<(), ConfigurationError> {
        self.validate()
            .map_err(|errors| ConfigurationError::new(errors.to_string()))?;

        let physical = &self.physical;
        if physical.max_cooling_power <= physical.servers_heat_load {
            return Err(ConfigurationError::new(format!(
                "maximum cooling power ({} W) must exceed the servers' heat load ({} W)",
                physical.max_cooling_power, physical.servers_heat_load
            )));
        }

        let climate = &self.climate;
        if climate.trough_hour >= climate.peak_hour {
            return Err(ConfigurationError::new(format!(
                "daily minimum hour ({}) must come before the daily maximum hour ({})",
                climate.trough_hour, climate.peak_hour
            )));
        }

        let simulation = &self.simulation;
        if SECONDS_PER_HOUR % simulation.decision_interval != 0 {
            return Err(ConfigurationError::new(format!(
                "decision interval ({} s) must divide an hour",
                simulation.decision_interval
            )));
        }
        let (min_temp, max_temp) = simulation.valid_temp_range;
        celsius_to_kelvin(min_temp).map_err(|err| ConfigurationError::new(err.to_string()))?;
        if !(min_temp < max_temp) {
            return Err(ConfigurationError::new(format!(
                "valid room temperature range ({min_temp}, {max_temp}) is empty"
            )));
        }
        if !(min_temp..=max_temp).contains(&simulation.initial_room_temp) {
            return Err(ConfigurationError::new(format!(
                "initial room temperature ({}) lies outside the valid range",
                simulation.initial_room_temp
            )));
        }

        let catalog = self.catalog();
        for (equipment_id, profile) in &catalog {
            profile.check(equipment_id)?;
        }
        if !catalog.contains_key(&self.request.equipment_id) {
            return Err(ConfigurationError::new(format!(
                "unknown equipment id '{}'",
                self.request.equipment_id
            )));
        }

        Ok(())
    }
}
