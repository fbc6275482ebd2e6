// This module contains the control policies deciding when the room's cooling unit runs.

macro_rules! per_policy {
    ($val:expr, $pattern:pat => { $res:expr }) => {
        match $val {
            ControlPolicy::Baseline($pattern) => $res,
            ControlPolicy::Optimized($pattern) => $res,
        }
    };
}

use crate::errors::ConfigurationError;
use crate::input::PolicyKind;
use serde::Serialize;

/// Whether cooling is requested at a decision instant. Demand always means full capacity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoolingState {
    Off,
    Demand,
}

pub trait ControlBehaviour: Send + Sync {
    /// Decide the cooling state from the current room temperature (ºC) and the COP the unit
    /// would achieve at the current ambient temperature.
    fn decide(&self, room_temp: f64, cop_now: f64) -> CoolingState;
}

/// Single-threshold thermostat: cool at full power whenever the room is above `t_hot`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThermostatControl {
    t_hot: f64,
}

impl ThermostatControl {
    pub(crate) fn new(t_hot: f64) -> Result<Self, ConfigurationError> {
        if !t_hot.is_finite() {
            return Err(ConfigurationError::new(
                "baseline threshold t_hot must be finite",
            ));
        }
        Ok(Self { t_hot })
    }
}

impl ControlBehaviour for ThermostatControl {
    fn decide(&self, room_temp: f64, _cop_now: f64) -> CoolingState {
        if room_temp > self.t_hot {
            CoolingState::Demand
        } else {
            CoolingState::Off
        }
    }
}

/// Deadband controller that always cools at or above `t_hot`, pre-cools between `t_low` and
/// `t_hot` only while the unit is running efficiently, and is off below `t_low`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CopAwareDeadbandControl {
    t_low: f64,
    t_hot: f64,
    cop_threshold: f64,
}

impl CopAwareDeadbandControl {
    pub(crate) fn new(
        t_low: f64,
        t_hot: f64,
        cop_threshold: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(t_low.is_finite() && t_hot.is_finite() && cop_threshold.is_finite()) {
            return Err(ConfigurationError::new(
                "optimized control thresholds must be finite",
            ));
        }
        if t_low >= t_hot {
            return Err(ConfigurationError::new(format!(
                "optimized control requires t_low ({t_low}) below t_hot ({t_hot})"
            )));
        }
        if cop_threshold <= 0. {
            return Err(ConfigurationError::new(format!(
                "optimized control cop_threshold must be positive (got {cop_threshold})"
            )));
        }
        Ok(Self {
            t_low,
            t_hot,
            cop_threshold,
        })
    }
}

impl ControlBehaviour for CopAwareDeadbandControl {
    fn decide(&self, room_temp: f64, cop_now: f64) -> CoolingState {
        if room_temp >= self.t_hot {
            CoolingState::Demand
        } else if room_temp >= self.t_low && cop_now > self.cop_threshold {
            CoolingState::Demand
        } else {
            CoolingState::Off
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlPolicy {
    Baseline(ThermostatControl),
    Optimized(CopAwareDeadbandControl),
}

impl ControlPolicy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            ControlPolicy::Baseline(_) => PolicyKind::Baseline,
            ControlPolicy::Optimized(_) => PolicyKind::Optimized,
        }
    }

    /// Cooling power requested (in W) given the capacity of the unit
    pub fn cooling_demand(&self, room_temp: f64, cop_now: f64, cooling_capacity: f64) -> f64 {
        match self.decide(room_temp, cop_now) {
            CoolingState::Demand => cooling_capacity,
            CoolingState::Off => 0.,
        }
    }
}

impl ControlBehaviour for ControlPolicy {
    fn decide(&self, room_temp: f64, cop_now: f64) -> CoolingState {
        per_policy!(self, policy => { policy.decide(room_temp, cop_now) })
    }
}
