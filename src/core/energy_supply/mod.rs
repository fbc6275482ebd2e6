pub mod energy_supply;
pub mod tariff;
