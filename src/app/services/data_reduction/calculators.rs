//! Shared calculation functions for data reduction
//!
//! The physical constants in these formulas are documented values from the
//! literature, not tunables. All temperatures arrive in degrees Celsius and
//! are converted to Kelvin internally; pressures arrive in hPa.

use crate::constants::{CELSIUS_TO_KELVIN, PASCALS_TO_ATMOSPHERES};

/// Convert a temperature from Celsius to Kelvin
pub fn kelvin(celsius: f64) -> f64 {
    celsius + CELSIUS_TO_KELVIN
}

/// Convert a pressure from hPa to atmospheres
fn atmospheres(pressure_hpa: f64) -> f64 {
    pressure_hpa * 100.0 * PASCALS_TO_ATMOSPHERES
}

/// Water vapour pressure (pH₂O), from Weiss and Price (1980).
///
/// The salinity influence is small but required by the formulation.
pub fn calc_ph2o(salinity: f64, temperature: f64) -> f64 {
    let kelvin = kelvin(temperature);
    (24.4543
        - 67.4509 * (100.0 / kelvin)
        - 4.8489 * (kelvin / 100.0).ln()
        - 0.000544 * salinity)
        .exp()
}

/// pCO₂ from dry xCO₂ and the total (wet air) pressure at equilibration
pub fn calc_pco2_te_wet(xco2: f64, pressure: f64, ph2o: f64) -> f64 {
    xco2 * (atmospheres(pressure) - ph2o)
}

/// Temperature correction of pCO₂ from the equilibrator to the intake,
/// from Takahashi et al. (1993)
pub fn calc_pco2_sst(pco2_te_wet: f64, sst: f64, equilibrator_temperature: f64) -> f64 {
    pco2_te_wet * (0.0423 * (sst - equilibrator_temperature)).exp()
}

/// fCO₂ from pCO₂, using the virial coefficients of CO₂ in air
pub fn calc_fco2(pco2: f64, xco2: f64, pressure: f64, temperature: f64) -> f64 {
    let kelvin = kelvin(temperature);
    let b = -1636.75 + 12.0408 * kelvin - 0.0327957 * kelvin.powi(2)
        + 3.16528e-5 * kelvin.powi(3);
    let delta = 57.7 - 0.118 * kelvin;

    pco2 * (((b + 2.0 * (1.0 - xco2 * 1e-6).powi(2) * delta) * atmospheres(pressure))
        / (82.0575 * kelvin))
        .exp()
}
