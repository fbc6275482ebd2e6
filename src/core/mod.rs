pub mod climate;
pub mod controls;
pub mod cooling_systems;
pub mod energy_supply;
pub mod space_cool_demand;
pub mod units;
