//! A reducer that performs no reduction
//!
//! Used for variables whose values are exported as measured, with no
//! derived quantities.

use super::reducer::{CalculationParameter, DataReducer, DataReductionRecord};
use crate::Result;
use crate::app::models::{Instrument, Measurement, Variable};

#[derive(Debug)]
pub struct NoReductionReducer {
    variable: Variable,
}

impl NoReductionReducer {
    pub fn new(variable: Variable) -> Self {
        Self { variable }
    }
}

impl DataReducer for NoReductionReducer {
    fn variable(&self) -> &Variable {
        &self.variable
    }

    fn required_type_names(&self) -> &[&str] {
        &[]
    }

    fn calculation_parameters(&self) -> &[CalculationParameter] {
        &[]
    }

    fn do_calculation(
        &self,
        _instrument: &Instrument,
        _measurement: &Measurement,
        _record: &mut DataReductionRecord,
    ) -> Result<()> {
        Ok(())
    }
}
