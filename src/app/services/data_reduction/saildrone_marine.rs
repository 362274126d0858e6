//! Data reduction for NRT marine fCO₂ from SailDrones
//!
//! Calculations from Sutton et al. 2014 (doi: 10.5194/essd-6-353-2014).
//! SailDrones have no separate equilibrator temperature; the intake
//! temperature is used throughout.

use super::calculators;
use super::reducer::{
    CalculationParameter, DataReducer, DataReductionRecord, make_parameter_id, required_value,
};
use crate::Result;
use crate::app::models::{Instrument, Measurement, Variable};

#[derive(Debug)]
pub struct SaildroneMarinePco2Reducer {
    variable: Variable,
    parameters: Vec<CalculationParameter>,
}

const REQUIRED: [&str; 4] = [
    "Intake Temperature",
    "Salinity",
    "LICOR Pressure (Equilibrator)",
    "xCO₂ water (dry, no standards)",
];

impl SaildroneMarinePco2Reducer {
    pub fn new(variable: Variable) -> Self {
        let parameters = vec![
            CalculationParameter::new(
                make_parameter_id(variable.id, 0),
                "pH₂O",
                "Marine Water Vapour Pressure",
                "RH2OX0EQ",
                "hPa",
                false,
            ),
            CalculationParameter::new(
                make_parameter_id(variable.id, 1),
                "pCO₂",
                "pCO₂ In Water",
                "PCO2TK02",
                "μatm",
                true,
            ),
            CalculationParameter::new(
                make_parameter_id(variable.id, 2),
                "fCO₂",
                "fCO₂ In Water",
                "FCO2XXXX",
                "μatm",
                true,
            ),
        ];

        Self {
            variable,
            parameters,
        }
    }
}

impl DataReducer for SaildroneMarinePco2Reducer {
    fn variable(&self) -> &Variable {
        &self.variable
    }

    fn required_type_names(&self) -> &[&str] {
        &REQUIRED
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
        let licor_pressure = required_value(measurement, "LICOR Pressure (Equilibrator)")?;
        let xco2 = required_value(measurement, "xCO₂ water (dry, no standards)")?;

        let ph2o = calculators::calc_ph2o(salinity, intake_temperature);
        let pco2 = calculators::calc_pco2_te_wet(xco2, licor_pressure, ph2o);
        let fco2 = calculators::calc_fco2(pco2, xco2, licor_pressure, intake_temperature);

        record.put("pH₂O", ph2o)?;
        record.put("pCO₂", pco2)?;
        record.put("fCO₂", fco2)?;

        Ok(())
    }
}
