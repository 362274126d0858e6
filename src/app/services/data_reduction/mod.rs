//! Data reduction: derived quantities from aligned measurements
//!
//! Each variable an instrument measures has one reduction routine that turns
//! an aligned [`Measurement`] into named derived values (pH₂O, pCO₂, fCO₂).
//! Routines are registered in a closed set keyed by variable name; adding a
//! variable means adding a registry arm and its reducer module.
//!
//! [`Measurement`]: crate::app::models::Measurement

pub mod calculators;
pub mod no_reduction;
pub mod reducer;
pub mod saildrone_atmospheric;
pub mod saildrone_marine;
pub mod underway_atmospheric;
pub mod underway_marine;

#[cfg(test)]
pub mod tests;

// Re-export key types for convenience
pub use no_reduction::NoReductionReducer;
pub use reducer::{
    CalculationParameter, DataReducer, DataReductionRecord, make_parameter_id,
    parameter_sequence, variable_id_for_parameter,
};
pub use saildrone_atmospheric::SaildroneAtmosphericPco2Reducer;
pub use saildrone_marine::SaildroneMarinePco2Reducer;
pub use underway_atmospheric::UnderwayAtmosphericPco2Reducer;
pub use underway_marine::UnderwayMarinePco2Reducer;

use crate::app::models::Variable;
use crate::{Error, Result};

/// The xCO₂ sensor type name reported by ASVCO₂ systems
const ASVCO2_XCO2_PARAMETER: &str = "xCO₂ (dry, no standards)";

/// Get the data reducer for a variable.
///
/// The registry is a closed set: an unknown variable name is a configuration
/// fault discovered before any measurement is processed.
pub fn get_reducer(variable: &Variable) -> Result<Box<dyn DataReducer>> {
    match variable.name.as_str() {
        "Underway Marine pCO₂" => Ok(Box::new(UnderwayMarinePco2Reducer::new(variable.clone()))),
        "Underway Atmospheric pCO₂" => {
            Ok(Box::new(UnderwayAtmosphericPco2Reducer::new(variable.clone())))
        }
        "SailDrone Marine CO₂ NRT" => {
            Ok(Box::new(SaildroneMarinePco2Reducer::new(variable.clone())))
        }
        "SailDrone Atmospheric CO₂ NRT" => {
            Ok(Box::new(SaildroneAtmosphericPco2Reducer::new(variable.clone())))
        }
        "ASVCO₂ Water" => Ok(Box::new(UnderwayMarinePco2Reducer::with_xco2_parameter(
            variable.clone(),
            ASVCO2_XCO2_PARAMETER,
        ))),
        "Soderman" => Ok(Box::new(NoReductionReducer::new(variable.clone()))),
        _ => Err(Error::data_reduction(format!(
            "Cannot find reducer for variable '{}'",
            variable.name
        ))),
    }
}

/// Whether a variable name has a registered reducer
pub fn is_registered(variable_name: &str) -> bool {
    matches!(
        variable_name,
        "Underway Marine pCO₂"
            | "Underway Atmospheric pCO₂"
            | "SailDrone Marine CO₂ NRT"
            | "SailDrone Atmospheric CO₂ NRT"
            | "ASVCO₂ Water"
            | "Soderman"
    )
}

/// Get the ordered calculation parameters for a variable.
///
/// With `include_calculation_columns` false, only `is_result` parameters
/// (the published columns) are returned.
pub fn get_calculation_parameters(
    variable: &Variable,
    include_calculation_columns: bool,
) -> Result<Vec<CalculationParameter>> {
    let reducer = get_reducer(variable)?;

    Ok(reducer
        .calculation_parameters()
        .iter()
        .filter(|p| include_calculation_columns || p.is_result)
        .cloned()
        .collect())
}

/// Get the parameter a parameter id refers to within its variable
pub fn get_variable_parameter(
    variable: &Variable,
    parameter_id: i64,
) -> Result<CalculationParameter> {
    let sequence = parameter_sequence(parameter_id) as usize;
    let reducer = get_reducer(variable)?;

    reducer
        .calculation_parameters()
        .get(sequence)
        .cloned()
        .ok_or_else(|| {
            Error::data_reduction(format!(
                "Variable '{}' has no parameter with id {parameter_id}",
                variable.name
            ))
        })
}
