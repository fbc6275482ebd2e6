pub mod air_conditioning;
pub mod cop_curve;
pub mod equipment_catalog;
