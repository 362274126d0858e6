//! Data reduction for underway marine pCO₂ systems
//!
//! Computes surface water pCO₂ and fCO₂ from an equilibrator-based
//! underway system: water vapour pressure at the equilibrator, pCO₂ at
//! equilibrator temperature, the Takahashi et al. (1993) correction back
//! to intake temperature, and the final fugacity.

use super::calculators;
use super::reducer::{
    CalculationParameter, DataReducer, DataReductionRecord, make_parameter_id, required_value,
};
use crate::Result;
use crate::app::models::{Instrument, Measurement, Variable};

/// The default xCO₂ input for underway marine systems
const XCO2_PARAMETER: &str = "xCO₂ water (dry, no standards)";

#[derive(Debug)]
pub struct UnderwayMarinePco2Reducer {
    variable: Variable,
    required: [&'static str; 5],
    xco2_parameter: &'static str,
    parameters: Vec<CalculationParameter>,
}

impl UnderwayMarinePco2Reducer {
    pub fn new(variable: Variable) -> Self {
        Self::with_xco2_parameter(variable, XCO2_PARAMETER)
    }

    /// Some platforms report the dry gas under a different sensor type
    /// name; everything else about the calculation is unchanged.
    pub fn with_xco2_parameter(variable: Variable, xco2_parameter: &'static str) -> Self {
        let parameters = vec![
            CalculationParameter::new(
                make_parameter_id(variable.id, 0),
                "ΔT",
                "Water-Equilibrator Temperature Difference",
                "DELTAT",
                "°C",
                false,
            ),
            CalculationParameter::new(
                make_parameter_id(variable.id, 1),
                "pH₂O",
                "Marine Water Vapour Pressure",
                "RH2OX0EQ",
                "hPa",
                false,
            ),
            CalculationParameter::new(
                make_parameter_id(variable.id, 2),
                "pCO₂ TE Wet",
                "pCO₂ In Water - Equilibrator Temperature",
                "PCO2IG02",
                "μatm",
                false,
            ),
            CalculationParameter::new(
                make_parameter_id(variable.id, 3),
                "pCO₂ SST",
                "pCO₂ In Water",
                "PCO2TK02",
                "μatm",
                true,
            ),
            CalculationParameter::new(
                make_parameter_id(variable.id, 4),
                "fCO₂",
                "fCO₂ In Water",
                "FCO2XXXX",
                "μatm",
                true,
            ),
        ];

        Self {
            variable,
            required: [
                "Intake Temperature",
                "Salinity",
                "Equilibrator Temperature",
                "Equilibrator Pressure",
                xco2_parameter,
            ],
            xco2_parameter,
            parameters,
        }
    }
}

impl DataReducer for UnderwayMarinePco2Reducer {
    fn variable(&self) -> &Variable {
        &self.variable
    }

    fn required_type_names(&self) -> &[&str] {
        &self.required
    }

    fn calculation_parameters(&self) -> &[CalculationParameter] {
        &self.parameters
    }

    fn do_calculation(
        &self,
        _instrument: &Instrument,
        measurement: &Measurement,
        record: &mut DataReductionRecord,
    ) -> Result<()> {
        let intake_temperature = required_value(measurement, "Intake Temperature")?;
        let salinity = required_value(measurement, "Salinity")?;
        let equilibrator_temperature = required_value(measurement, "Equilibrator Temperature")?;
        let equilibrator_pressure = required_value(measurement, "Equilibrator Pressure")?;
        let xco2 = required_value(measurement, self.xco2_parameter)?;

        let delta_temperature = (intake_temperature - equilibrator_temperature).abs();
        let ph2o = calculators::calc_ph2o(salinity, equilibrator_temperature);
        let pco2_te_wet = calculators::calc_pco2_te_wet(xco2, equilibrator_pressure, ph2o);
        let pco2_sst =
            calculators::calc_pco2_sst(pco2_te_wet, intake_temperature, equilibrator_temperature);
        let fco2 =
            calculators::calc_fco2(pco2_sst, xco2, equilibrator_pressure, intake_temperature);

        record.put("ΔT", delta_temperature)?;
        record.put("pH₂O", ph2o)?;
        record.put("pCO₂ TE Wet", pco2_te_wet)?;
        record.put("pCO₂ SST", pco2_sst)?;
        record.put("fCO₂", fco2)?;

        Ok(())
    }
}
