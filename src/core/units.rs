use thiserror::Error;

pub const JOULES_PER_KILOWATT_HOUR: u32 = 3_600_000;
pub const SECONDS_PER_HOUR: u32 = 3_600;
pub const HOURS_PER_DAY: u32 = 24;
pub const SECONDS_PER_DAY: u32 = SECONDS_PER_HOUR * HOURS_PER_DAY;

pub fn joules_to_kwh(energy_in_joules: f64) -> f64 {
    energy_in_joules / JOULES_PER_KILOWATT_HOUR as f64
}

/// Energy (kWh) delivered by a constant power (W) over a duration (s)
pub fn watt_seconds_to_kwh(power_in_watts: f64, duration_in_seconds: f64) -> f64 {
    joules_to_kwh(power_in_watts * duration_in_seconds)
}

pub(crate) fn celsius_to_kelvin(temp_c: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_c < -273.15 {
        Err(BelowAbsoluteZeroError::from_c(temp_c))
    } else {
        Ok(temp_c + 273.15)
    }
}

#[derive(Debug, Error)]
#[error("A temperature of {k}ºK/{}ºC was encountered, which is less than absolute zero", k - 273.15)]
pub(crate) struct BelowAbsoluteZeroError {
    k: f64,
}

impl BelowAbsoluteZeroError {
    fn from_c(c: f64) -> Self {
        Self { k: c + 273.15 }
    }
}
