use crate::core::energy_supply::energy_supply::EnergySupplyError;
use serde::Deserialize;
use std::io::Read;

/// Price of electricity, in currency / kWh.
#[derive(Clone, Debug, PartialEq)]
pub enum Tariff {
    Flat(f64),
    /// One price per simulated hour
    TimeOfUse(TariffData),
}

impl Tariff {
    pub(crate) fn price(&self, timestep_idx: usize) -> Result<f64, EnergySupplyError> {
        match self {
            Tariff::Flat(price) => Ok(*price),
            Tariff::TimeOfUse(data) => data.price(timestep_idx),
        }
    }

    /// Number of timesteps priced by this tariff, if limited.
    pub fn timesteps_covered(&self) -> Option<usize> {
        match self {
            Tariff::Flat(_) => None,
            Tariff::TimeOfUse(data) => Some(data.prices.len()),
        }
    }

    pub(crate) fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        let (flat, series) = match self {
            Tariff::Flat(price) => (Some(*price), &[][..]),
            Tariff::TimeOfUse(data) => (None, data.prices.as_slice()),
        };
        flat.into_iter().chain(series.iter().copied())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TariffData {
    prices: Vec<f64>,
}

#[derive(Clone, Debug, Deserialize)]
struct TariffRow {
    price: f64,
}

impl TariffData {
    /// Read a price series from CSV with a `price` column, one row per simulated hour in order.
    pub fn new(csv: impl Read) -> anyhow::Result<Self> {
        Ok(Self {
            prices: csv::Reader::from_reader(csv)
                .deserialize::<TariffRow>()
                .map(|row| row.map(|row| row.price))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn from_prices(prices: Vec<f64>) -> Self {
        Self { prices }
    }

    pub(crate) fn price(&self, timestep_idx: usize) -> Result<f64, EnergySupplyError> {
        self.prices
            .get(timestep_idx)
            .copied()
            .ok_or(EnergySupplyError::NoPriceForTimestep(timestep_idx))
    }
}
