use crate::core::climate::historical::{HistoricalEnsemble, HistoricalSeries};
use crate::core::climate::statistical::StatisticalClimate;
use crate::core::climate::{ClimateGenerator, ClimateSource};
use crate::core::cooling_systems::air_conditioning::AirConditioning;
use crate::core::cooling_systems::equipment_catalog::{EquipmentCatalog, EquipmentProfile};
use crate::core::controls::cooling_control::{
    ControlPolicy, CopAwareDeadbandControl, ThermostatControl,
};
use crate::core::energy_supply::energy_supply::{
    EnergySupply, EnergySupplyError, COOLING_END_USER, IT_LOAD_END_USER,
};
use crate::core::energy_supply::tariff::{Tariff, TariffData};
use crate::core::space_cool_demand::thermal_room::{AmbientSpan, HeatFlows, ThermalRoom};
use crate::core::units::{watt_seconds_to_kwh, SECONDS_PER_HOUR};
use crate::errors::{ConfigurationError, RunError};
use crate::input::{
    ClimateMode, Input, PhysicalParameters, PolicyKind, RunRequest, SimulationSettings,
};
use crate::monte_carlo::StopSignal;
use crate::simulation_time::SimulationTime;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::Serialize;
use tracing::{debug, instrument};

/// Largest relative gap tolerated between the heat stored in the room and the net heat
/// integrated over a run.
pub const ENERGY_BALANCE_TOLERANCE: f64 = 1e-9;

/// The validated, immutable configuration of a batch, shared read-only by every run.
#[derive(Clone, Debug)]
pub struct Corpus {
    pub physical: PhysicalParameters,
    pub settings: SimulationSettings,
    pub request: RunRequest,
    pub equipment_id: String,
    pub equipment: EquipmentProfile,
    pub catalog: EquipmentCatalog,
    pub room: ThermalRoom,
    pub policy: ControlPolicy,
    pub climate: ClimateGenerator,
    pub tariff: Tariff,
    pub simulation_time: SimulationTime,
}

/// Terminal snapshot of a single run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    pub run_index: usize,
    pub seed: u64,
    pub total_cost: f64,
    pub cooling_cost: f64,
    pub it_cost: f64,
    pub cooling_energy_kwh: f64,
    pub it_energy_kwh: f64,
    pub peak_room_temp: f64,
    pub mean_room_temp: f64,
    pub hourly_room_temps: Vec<f64>,
    pub hourly_ambient_temps: Vec<f64>,
    pub hourly_cop: Vec<f64>,
    /// fraction of each hour the cooling unit was running
    pub hourly_cooling_fraction: Vec<f64>,
    /// electricity drawn by the cooling unit in each hour, in kWh
    pub hourly_cooling_energy_kwh: Vec<f64>,
    /// cost of all electricity drawn in each hour
    pub hourly_cost: Vec<f64>,
    pub daily_max_room_temps: Vec<f64>,
    pub hours_above_comfort_limit: f64,
    pub energy_balance_residual: f64,
}

/// Mutable values owned by one run for its lifetime.
struct RunState {
    room_temp: f64,
    heat: HeatFlows,
    peak_room_temp: f64,
    temp_seconds: f64,
    elapsed: f64,
    hourly_temp_seconds: Vec<f64>,
    hourly_cop_sum: Vec<f64>,
    hourly_decisions: Vec<u32>,
    hourly_cooling_seconds: Vec<f64>,
    daily_max_room_temps: Vec<f64>,
    seconds_above_comfort: f64,
}

impl RunState {
    fn new(initial_room_temp: f64, hours: usize, days: usize) -> Self {
        Self {
            room_temp: initial_room_temp,
            heat: HeatFlows::default(),
            peak_room_temp: initial_room_temp,
            temp_seconds: 0.,
            elapsed: 0.,
            hourly_temp_seconds: vec![0.; hours],
            hourly_cop_sum: vec![0.; hours],
            hourly_decisions: vec![0; hours],
            hourly_cooling_seconds: vec![0.; hours],
            daily_max_room_temps: vec![f64::NEG_INFINITY; days],
            seconds_above_comfort: 0.,
        }
    }

    fn record_substep(
        &mut self,
        room_temp: f64,
        duration: f64,
        hour: usize,
        day: usize,
        cooling: bool,
        comfort_limit: f64,
    ) {
        self.room_temp = room_temp;
        self.peak_room_temp = self.peak_room_temp.max(room_temp);
        self.temp_seconds += room_temp * duration;
        self.elapsed += duration;
        self.hourly_temp_seconds[hour] += room_temp * duration;
        if cooling {
            self.hourly_cooling_seconds[hour] += duration;
        }
        self.daily_max_room_temps[day] = self.daily_max_room_temps[day].max(room_temp);
        if room_temp > comfort_limit {
            self.seconds_above_comfort += duration;
        }
    }
}

impl Corpus {
    pub fn from_inputs(
        input: &Input,
        ensemble: Option<Vec<HistoricalSeries>>,
        tariff_data: Option<TariffData>,
    ) -> Result<Self, ConfigurationError> {
        input.check()?;

        let physical = input.physical;
        let settings = input.simulation;
        let climate_params = input.climate;
        let total_hours = settings.total_hours();

        let catalog = input.catalog();
        let equipment_id = input.request.equipment_id.clone();
        let equipment = catalog
            .get(&equipment_id)
            .cloned()
            .ok_or_else(|| ConfigurationError::new(format!("unknown equipment id '{equipment_id}'")))?;

        let thresholds = input.effective_thresholds();
        let policy = match input.request.control_policy {
            PolicyKind::Baseline => {
                ControlPolicy::Baseline(ThermostatControl::new(thresholds.baseline.t_hot)?)
            }
            PolicyKind::Optimized => ControlPolicy::Optimized(CopAwareDeadbandControl::new(
                thresholds.optimized.t_low,
                thresholds.optimized.t_hot,
                thresholds.optimized.cop_threshold,
            )?),
        };

        let climate = match input.request.climate_mode {
            ClimateMode::Statistical => ClimateGenerator::Statistical(
                StatisticalClimate::new(
                    climate_params.t_min_mean,
                    climate_params.t_min_std_dev,
                    climate_params.range_mean,
                    climate_params.range_std_dev,
                    settings.days as usize,
                    climate_params.diurnal_shape,
                    climate_params.negative_range,
                    climate_params.trough_hour,
                    climate_params.peak_hour,
                    climate_params.extreme_hour_std_dev,
                )
                .map_err(|err| {
                    ConfigurationError::new(format!("invalid climate distribution: {err}"))
                })?,
            ),
            ClimateMode::Historical => ClimateGenerator::Historical(HistoricalEnsemble::new(
                ensemble.unwrap_or_default(),
                total_hours as usize,
            )),
        };

        let tariff = match tariff_data {
            Some(data) => Tariff::TimeOfUse(data),
            None => Tariff::Flat(physical.tariff),
        };
        if let Some(covered) = tariff.timesteps_covered() {
            if covered < total_hours as usize {
                return Err(ConfigurationError::new(format!(
                    "time-of-use tariff covers {covered} hours but the simulation needs {total_hours}"
                )));
            }
        }
        if tariff.prices().any(|price| !price.is_finite() || price < 0.) {
            return Err(ConfigurationError::new(
                "tariff prices must be finite and non-negative",
            ));
        }

        Ok(Self {
            physical,
            settings,
            request: input.request.clone(),
            equipment_id,
            equipment,
            catalog,
            room: ThermalRoom::new(
                physical.area,
                physical.u_value,
                physical.servers_heat_load,
                physical.thermal_capacitance,
            ),
            policy,
            climate,
            tariff,
            simulation_time: SimulationTime::new(total_hours, settings.decision_interval),
        })
    }

    pub fn n_runs(&self) -> usize {
        self.request.n_runs.max(0) as usize
    }

    /// Simulate one month for one climate draw.
    #[instrument(level = "debug", skip(self, stop))]
    pub fn run_single(
        &self,
        run_index: usize,
        seed: u64,
        stop: &StopSignal,
    ) -> Result<RunResult, RunError> {
        let mut rng = Pcg64::seed_from_u64(seed);
        let climate = self.climate.generate(&mut rng)?;

        let hours = self.simulation_time.total_hours();
        let days = self.settings.days as usize;
        let substeps = self.settings.substeps;
        let method = self.settings.integration_method;
        let (min_valid_temp, max_valid_temp) = self.settings.valid_temp_range;

        let mut energy_supply = EnergySupply::new(hours);
        let air_conditioning = AirConditioning::new(
            self.physical.max_cooling_power,
            self.equipment.cop_curve.clone(),
            energy_supply.connection(COOLING_END_USER)?,
        );
        let it_load = energy_supply.connection(IT_LOAD_END_USER)?;

        let mut state = RunState::new(self.settings.initial_room_temp, hours, days);

        for step in self.simulation_time.iter() {
            if step.is_start_of_hour() && stop.should_stop() {
                return Err(RunError::Cancelled);
            }
            let hour = step.current_hour();
            let day = step.current_day();
            let step_start = step.time();
            let cop_now = air_conditioning.cop(climate.air_temp_at(step_start));
            let cooling_power = self.policy.cooling_demand(
                state.room_temp,
                cop_now,
                air_conditioning.cooling_capacity(),
            );
            state.hourly_cop_sum[hour] += cop_now;
            state.hourly_decisions[hour] += 1;

            let substep = step.timestep as f64 / substeps as f64;
            for k in 0..substeps {
                let start = step_start + k as f64 * substep;
                let ambient = AmbientSpan {
                    start: climate.air_temp_at(start),
                    mid: climate.air_temp_at(start + substep / 2.),
                    end: climate.air_temp_at(start + substep),
                };
                let (room_temp, flows) =
                    self.room
                        .advance(method, state.room_temp, ambient, cooling_power, substep);

                if !room_temp.is_finite() || !(min_valid_temp..=max_valid_temp).contains(&room_temp)
                {
                    return Err(RunError::NumericalDivergence {
                        time_in_seconds: start + substep,
                        reason: format!(
                            "room temperature {room_temp} outside valid range [{min_valid_temp}, {max_valid_temp}]"
                        ),
                    });
                }

                state.heat += flows;
                state.record_substep(
                    room_temp,
                    substep,
                    hour,
                    day,
                    cooling_power > 0.,
                    self.settings.comfort_limit,
                );
                air_conditioning.demand_energy(
                    cooling_power,
                    ambient.mid,
                    substep,
                    &mut energy_supply,
                    hour,
                )?;
                energy_supply.demand_energy(
                    &it_load,
                    watt_seconds_to_kwh(self.room.internal_gains(), substep),
                    hour,
                )?;
            }
        }

        let stored = self.room.thermal_capacitance()
            * (state.room_temp - self.settings.initial_room_temp);
        let energy_balance_residual = (stored - state.heat.net()).abs() / state.heat.gross();
        if !(energy_balance_residual <= ENERGY_BALANCE_TOLERANCE) {
            return Err(RunError::NumericalDivergence {
                time_in_seconds: state.elapsed,
                reason: format!(
                    "energy balance residual {energy_balance_residual:e} exceeds {ENERGY_BALANCE_TOLERANCE:e}"
                ),
            });
        }

        let costs = energy_supply.cost_by_end_user(&self.tariff)?;
        let cooling_cost = costs.get(COOLING_END_USER).copied().unwrap_or_default();
        let it_cost = costs.get(IT_LOAD_END_USER).copied().unwrap_or_default();
        let hourly_cost = energy_supply
            .results_total()
            .iter()
            .enumerate()
            .map(|(idx, energy)| -> Result<f64, EnergySupplyError> {
                Ok(energy * self.tariff.price(idx)?)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let seconds_per_hour = SECONDS_PER_HOUR as f64;

        let result = RunResult {
            run_index,
            seed,
            total_cost: cooling_cost + it_cost,
            cooling_cost,
            it_cost,
            cooling_energy_kwh: energy_supply.total_for_end_user(COOLING_END_USER)?,
            it_energy_kwh: energy_supply.total_for_end_user(IT_LOAD_END_USER)?,
            peak_room_temp: state.peak_room_temp,
            mean_room_temp: state.temp_seconds / state.elapsed,
            hourly_room_temps: state
                .hourly_temp_seconds
                .iter()
                .map(|temp_seconds| temp_seconds / seconds_per_hour)
                .collect(),
            hourly_ambient_temps: (0..hours).map(|hour| climate.sample(hour)).collect(),
            hourly_cop: state
                .hourly_cop_sum
                .iter()
                .zip(&state.hourly_decisions)
                .map(|(cop_sum, decisions)| cop_sum / (*decisions).max(1) as f64)
                .collect(),
            hourly_cooling_fraction: state
                .hourly_cooling_seconds
                .iter()
                .map(|seconds| seconds / seconds_per_hour)
                .collect(),
            hourly_cooling_energy_kwh: energy_supply
                .results_by_end_user()
                .get(COOLING_END_USER)
                .cloned()
                .unwrap_or_default(),
            hourly_cost,
            daily_max_room_temps: state.daily_max_room_temps,
            hours_above_comfort_limit: state.seconds_above_comfort / seconds_per_hour,
            energy_balance_residual,
        };
        debug!(
            run_index,
            total_cost = result.total_cost,
            peak_room_temp = result.peak_room_temp,
            "run complete"
        );

        Ok(result)
    }
}
