use crate::core::energy_supply::tariff::Tariff;
use indexmap::IndexMap;
use thiserror::Error;

pub const COOLING_END_USER: &str = "cooling";
pub const IT_LOAD_END_USER: &str = "it_load";

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EnergySupplyError {
    #[error("The end user name '{0}' was already used.")]
    DuplicateEndUser(String),
    #[error("End user '{0}' is not registered with this energy supply")]
    UnknownEndUser(String),
    #[error("Timestep index {index} is outside the {timesteps} metered timesteps")]
    TimestepOutOfRange { index: usize, timesteps: usize },
    #[error("There was no tariff electricity price for the timestep ID {0}")]
    NoPriceForTimestep(usize),
}

/// Electricity meter for a single run: energy demanded (in kWh) per timestep, broken down by
/// the end users connected to it.
#[derive(Clone, Debug)]
pub struct EnergySupply {
    simulation_timesteps: usize,
    demand_total: Vec<f64>,
    demand_by_end_user: IndexMap<String, Vec<f64>>,
}

/// A handle identifying one registered end user of an [`EnergySupply`].
#[derive(Clone, Debug)]
pub struct EnergySupplyConnection {
    end_user_idx: usize,
    pub(crate) end_user_name: String,
}

impl EnergySupply {
    pub fn new(simulation_timesteps: usize) -> Self {
        Self {
            simulation_timesteps,
            demand_total: vec![0.; simulation_timesteps],
            demand_by_end_user: Default::default(),
        }
    }

    pub fn connection(
        &mut self,
        end_user_name: &str,
    ) -> Result<EnergySupplyConnection, EnergySupplyError> {
        if self.demand_by_end_user.contains_key(end_user_name) {
            return Err(EnergySupplyError::DuplicateEndUser(
                end_user_name.to_string(),
            ));
        }
        let (end_user_idx, _) = self
            .demand_by_end_user
            .insert_full(end_user_name.into(), vec![0.; self.simulation_timesteps]);

        Ok(EnergySupplyConnection {
            end_user_idx,
            end_user_name: end_user_name.to_string(),
        })
    }

    /// Record energy demanded (in kWh) by a connected end user in the given timestep.
    pub fn demand_energy(
        &mut self,
        connection: &EnergySupplyConnection,
        amount_demanded: f64,
        timestep_idx: usize,
    ) -> Result<(), EnergySupplyError> {
        if timestep_idx >= self.simulation_timesteps {
            return Err(EnergySupplyError::TimestepOutOfRange {
                index: timestep_idx,
                timesteps: self.simulation_timesteps,
            });
        }
        let (_, demand) = self
            .demand_by_end_user
            .get_index_mut(connection.end_user_idx)
            .ok_or_else(|| EnergySupplyError::UnknownEndUser(connection.end_user_name.clone()))?;
        demand[timestep_idx] += amount_demanded;
        self.demand_total[timestep_idx] += amount_demanded;

        Ok(())
    }

    /// Return list of the total demand on this energy supply for each timestep
    pub fn results_total(&self) -> &[f64] {
        &self.demand_total
    }

    /// Return the demand from each end user on this energy supply for each timestep.
    pub fn results_by_end_user(&self) -> &IndexMap<String, Vec<f64>> {
        &self.demand_by_end_user
    }

    pub fn total_for_end_user(&self, end_user_name: &str) -> Result<f64, EnergySupplyError> {
        self.demand_by_end_user
            .get(end_user_name)
            .map(|demand| demand.iter().sum())
            .ok_or_else(|| EnergySupplyError::UnknownEndUser(end_user_name.to_string()))
    }

    /// Cost of the energy demanded by each end user, pricing every timestep at the tariff.
    pub fn cost_by_end_user(
        &self,
        tariff: &Tariff,
    ) -> Result<IndexMap<String, f64>, EnergySupplyError> {
        self.demand_by_end_user
            .iter()
            .map(|(end_user, demand)| -> Result<_, EnergySupplyError> {
                let cost = demand
                    .iter()
                    .enumerate()
                    .map(|(idx, energy)| -> Result<f64, EnergySupplyError> {
                        Ok(energy * tariff.price(idx)?)
                    })
                    .sum::<Result<f64, EnergySupplyError>>()?;
                Ok((end_user.clone(), cost))
            })
            .collect()
    }
}
