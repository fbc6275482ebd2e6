use crate::errors::ConfigurationError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Lowest coefficient of performance a curve may take anywhere in its domain.
pub const MIN_CURVE_COP: f64 = 1.0;

/// Coefficient of performance of a cooling unit as a function of ambient temperature (ºC).
///
/// Both forms must be non-increasing with temperature and never dip below 1.0.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum CopCurve {
    /// COP = clamp(cop_at_reference + slope · (T - reference_temp), floor, ceiling)
    Affine {
        reference_temp: f64,
        cop_at_reference: f64,
        slope: f64,
        floor: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ceiling: Option<f64>,
    },
    /// Linear interpolation between (temperature, COP) points, held flat outside them.
    PiecewiseLinear { points: Vec<(f64, f64)> },
}

impl CopCurve {
    pub fn cop_at(&self, ambient_temp: f64) -> f64 {
        match self {
            CopCurve::Affine {
                reference_temp,
                cop_at_reference,
                slope,
                floor,
                ceiling,
            } => {
                let cop = (cop_at_reference + slope * (ambient_temp - reference_temp)).max(*floor);
                match ceiling {
                    Some(ceiling) => cop.min(*ceiling),
                    None => cop,
                }
            }
            CopCurve::PiecewiseLinear { points } => interpolate(points, ambient_temp),
        }
    }

    /// Largest COP the curve reaches over the given ambient temperature range.
    pub fn max_cop_between(&self, lowest_temp: f64, highest_temp: f64) -> f64 {
        // curves are non-increasing so the coldest end is always the best
        self.cop_at(lowest_temp.min(highest_temp))
    }

    /// Sample the curve at each whole degree between two temperatures (inclusive).
    pub fn samples(&self, from_temp: i32, to_temp: i32) -> Vec<(f64, f64)> {
        (from_temp..=to_temp)
            .map(|temp| (temp as f64, self.cop_at(temp as f64)))
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            CopCurve::Affine {
                reference_temp,
                cop_at_reference,
                slope,
                floor,
                ceiling,
            } => {
                if ![*reference_temp, *cop_at_reference, *slope, *floor]
                    .iter()
                    .all(|value| value.is_finite())
                {
                    return Err(ConfigurationError::new(
                        "affine COP curve parameters must be finite",
                    ));
                }
                if *slope > 0. {
                    return Err(ConfigurationError::new(format!(
                        "COP curve slope must not be positive (got {slope})"
                    )));
                }
                if *floor < MIN_CURVE_COP {
                    return Err(ConfigurationError::new(format!(
                        "COP curve floor must be at least {MIN_CURVE_COP} (got {floor})"
                    )));
                }
                if let Some(ceiling) = ceiling {
                    if !ceiling.is_finite() || ceiling < floor {
                        return Err(ConfigurationError::new(format!(
                            "COP curve ceiling ({ceiling}) must be finite and not below its floor ({floor})"
                        )));
                    }
                }
                Ok(())
            }
            CopCurve::PiecewiseLinear { points } => {
                if points.is_empty() {
                    return Err(ConfigurationError::new(
                        "piecewise linear COP curve needs at least one point",
                    ));
                }
                if points
                    .iter()
                    .any(|(temp, cop)| !temp.is_finite() || !cop.is_finite())
                {
                    return Err(ConfigurationError::new(
                        "piecewise linear COP curve points must be finite",
                    ));
                }
                if let Some((_, cop)) = points.iter().find(|(_, cop)| *cop < MIN_CURVE_COP) {
                    return Err(ConfigurationError::new(format!(
                        "COP curve dips below {MIN_CURVE_COP} (got {cop})"
                    )));
                }
                for ((temp_a, cop_a), (temp_b, cop_b)) in points.iter().tuple_windows() {
                    if temp_b <= temp_a {
                        return Err(ConfigurationError::new(
                            "COP curve temperatures must be strictly increasing",
                        ));
                    }
                    if cop_b > cop_a {
                        return Err(ConfigurationError::new(format!(
                            "COP curve is not monotonically non-increasing between {temp_a}ºC and {temp_b}ºC"
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return f64::NAN;
    };
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    points
        .iter()
        .tuple_windows()
        .find(|(_, (x_b, _))| x <= *x_b)
        .map(|((x_a, y_a), (x_b, y_b))| y_a + (y_b - y_a) * (x - x_a) / (x_b - x_a))
        .unwrap_or(last.1)
}
