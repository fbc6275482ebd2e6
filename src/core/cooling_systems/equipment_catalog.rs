use crate::core::cooling_systems::cop_curve::CopCurve;
use crate::errors::ConfigurationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

/// Named cooling equipment presets, keyed by equipment id.
pub type EquipmentCatalog = IndexMap<String, EquipmentProfile>;

/// A cooling unit preset. Serialised in the catalog's published shape.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EquipmentProfile {
    pub name: String,
    #[validate(exclusive_minimum = 0.)]
    pub cop_nominal: f64,
    /// nominal cooling power, in W
    #[serde(rename = "potencia_nominal")]
    #[validate(exclusive_minimum = 0.)]
    pub nominal_power: f64,
    /// acquisition price, in USD
    #[serde(rename = "precio")]
    #[validate(minimum = 0.)]
    pub price: f64,
    /// service life, in years
    #[serde(rename = "vida_util")]
    #[validate(minimum = 1)]
    pub service_life: u32,
    /// annual maintenance cost, in USD
    #[serde(rename = "mantenimiento_anual")]
    #[validate(minimum = 0.)]
    pub annual_maintenance: f64,
    pub cop_curve: CopCurve,
}

impl EquipmentProfile {
    pub(crate) fn check(&self, equipment_id: &str) -> Result<(), ConfigurationError> {
        self.validate().map_err(|errors| {
            ConfigurationError::new(format!("equipment '{equipment_id}' is invalid: {errors}"))
        })?;
        self.cop_curve.validate().map_err(|err| {
            ConfigurationError::new(format!("equipment '{equipment_id}': {err}"))
        })
    }
}

fn affine_preset(
    name: &str,
    cop_nominal: f64,
    slope: f64,
    floor: f64,
    price: f64,
    service_life: u32,
    annual_maintenance: f64,
) -> EquipmentProfile {
    EquipmentProfile {
        name: name.to_string(),
        cop_nominal,
        nominal_power: 55_000.,
        price,
        service_life,
        annual_maintenance,
        cop_curve: CopCurve::Affine {
            reference_temp: 35.,
            cop_at_reference: cop_nominal,
            slope,
            floor,
            ceiling: None,
        },
    }
}

pub fn built_in_catalog() -> EquipmentCatalog {
    IndexMap::from([
        (
            "economico".to_string(),
            affine_preset("Economico (Estándar)", 2.8, -0.05, 1.0, 3500., 8, 280.),
        ),
        (
            "eficiente".to_string(),
            affine_preset("Eficiente (Inverter)", 3.2, -0.06, 1.2, 5800., 12, 220.),
        ),
        (
            "premium".to_string(),
            affine_preset("Premium (VRF)", 3.8, -0.07, 1.5, 9200., 15, 180.),
        ),
    ])
}
