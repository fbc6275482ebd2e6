use crate::core::cooling_systems::cop_curve::CopCurve;
use crate::core::energy_supply::energy_supply::{
    EnergySupply, EnergySupplyConnection, EnergySupplyError,
};
use crate::core::units::watt_seconds_to_kwh;

/// Lower bound applied to the COP at evaluation, keeping electrical power finite.
pub const MIN_COP: f64 = 1e-3;
/// Cooling demands at or below this (in W) draw no electrical power.
pub const DEMAND_THRESHOLD: f64 = 1.;

/// An on/off air conditioning unit whose efficiency depends on the ambient temperature.
#[derive(Clone, Debug)]
pub struct AirConditioning {
    /// maximum cooling power of the unit, in W
    cooling_capacity: f64,
    cop_curve: CopCurve,
    energy_supply_connection: EnergySupplyConnection,
}

impl AirConditioning {
    /// Arguments:
    /// * `cooling_capacity` - maximum cooling power of the system, in W
    /// * `cop_curve` - COP of the unit as a function of ambient temperature
    /// * `energy_supply_connection` - end user of the run's energy supply to meter against
    pub(crate) fn new(
        cooling_capacity: f64,
        cop_curve: CopCurve,
        energy_supply_connection: EnergySupplyConnection,
    ) -> Self {
        Self {
            cooling_capacity,
            cop_curve,
            energy_supply_connection,
        }
    }

    pub fn cooling_capacity(&self) -> f64 {
        self.cooling_capacity
    }

    pub fn cop_curve(&self) -> &CopCurve {
        &self.cop_curve
    }

    pub fn cop(&self, ambient_temp: f64) -> f64 {
        self.cop_curve.cop_at(ambient_temp).max(MIN_COP)
    }

    /// Electrical power (in W) drawn to deliver the cooling demand (in W)
    pub fn electrical_power(&self, cooling_demand: f64, ambient_temp: f64) -> f64 {
        if cooling_demand > DEMAND_THRESHOLD {
            cooling_demand / self.cop(ambient_temp)
        } else {
            0.
        }
    }

    /// Deliver cooling (in W) for a duration (in s), metering the electricity drawn against the
    /// energy supply for the given timestep.
    ///
    /// Returns the electrical energy drawn, in kWh
    pub fn demand_energy(
        &self,
        cooling_demand: f64,
        ambient_temp: f64,
        duration: f64,
        energy_supply: &mut EnergySupply,
        timestep_idx: usize,
    ) -> Result<f64, EnergySupplyError> {
        let energy = watt_seconds_to_kwh(
            self.electrical_power(cooling_demand, ambient_temp),
            duration,
        );
        energy_supply.demand_energy(&self.energy_supply_connection, energy, timestep_idx)?;

        Ok(energy)
    }
}
