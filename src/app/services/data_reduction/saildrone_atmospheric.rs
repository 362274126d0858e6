//! Data reduction for NRT atmospheric fCO₂ from SailDrones
//!
//! Calculations from Sutton et al. 2014 (doi: 10.5194/essd-6-353-2014).
//! Sea water salinity is used by the vapour pressure calculation; its
//! influence is negligible but the formulation requires it.

use super::calculators;
use super::reducer::{
    CalculationParameter, DataReducer, DataReductionRecord, make_parameter_id, required_value,
};
use crate::Result;
use crate::app::models::{Instrument, Measurement, Variable};

#[derive(Debug)]
pub struct SaildroneAtmosphericPco2Reducer {
    variable: Variable,
    parameters: Vec<CalculationParameter>,
}

const REQUIRED: [&str; 4] = [
    "Air Temperature",
    "Salinity",
    "LICOR Pressure (Atmosphere)",
    "xCO₂ atmosphere (dry, no standards)",
];

impl SaildroneAtmosphericPco2Reducer {
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
                "pCO₂ In Atmosphere",
                "ACO2XXXX",
                "μatm",
                true,
            ),
            CalculationParameter::new(
                make_parameter_id(variable.id, 2),
                "fCO₂",
                "fCO₂ In Atmosphere",
                "FCO2WTAT",
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

impl DataReducer for SaildroneAtmosphericPco2Reducer {
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
        let air_temperature = required_value(measurement, "Air Temperature")?;
        let salinity = required_value(measurement, "Salinity")?;
        let licor_pressure = required_value(measurement, "LICOR Pressure (Atmosphere)")?;
        let xco2 = required_value(measurement, "xCO₂ atmosphere (dry, no standards)")?;

        let ph2o = calculators::calc_ph2o(salinity, air_temperature);
        let pco2 = calculators::calc_pco2_te_wet(xco2, licor_pressure, ph2o);
        let fco2 = calculators::calc_fco2(pco2, xco2, licor_pressure, air_temperature);

        record.put("pH₂O", ph2o)?;
        record.put("pCO₂", pco2)?;
        record.put("fCO₂", fco2)?;

        Ok(())
    }
}
