//! Tests for data reduction
//!
//! Shared fixtures: a minimal instrument, variables for each registered
//! reducer, and a measurement builder that takes (sensor type, value) pairs.


use crate::app::models::{
    FileDefinition, Flag, Instrument, Measurement, MeasurementValue, RunTypeAssignment,
    RunTypeCategory, Variable,
};
use chrono::{DateTime, TimeZone, Utc};

pub fn variable(id: i64, name: &str) -> Variable {
    Variable {
        id,
        name: name.to_string(),
    }
}

pub fn measurement_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()
}

/// A measurement carrying the given sensor values, all flagged good
pub fn measurement(values: &[(&str, f64)]) -> Measurement {
    Measurement {
        dataset_id: 1,
        time: measurement_time(),
        run_type: "equ".to_string(),
        category: RunTypeCategory::Measurement {
            variable: "Underway Marine pCO₂".to_string(),
        },
        longitude: Some(-24.5),
        latitude: Some(63.1),
        values: values
            .iter()
            .map(|(sensor_type, value)| {
                (
                    sensor_type.to_string(),
                    MeasurementValue::new(*sensor_type, Some(*value), Flag::Good, vec![]),
                )
            })
            .collect(),
    }
}

pub fn test_instrument() -> Instrument {
    let mut co2 = FileDefinition::new("CO2 Analyser");
    co2.run_type_column = Some(0);
    co2.assign_run_type(
        "equ",
        RunTypeAssignment::Category(RunTypeCategory::Measurement {
            variable: "Underway Marine pCO₂".to_string(),
        }),
    );

    Instrument {
        id: 1,
        name: "Test Ship".to_string(),
        file_definitions: vec![co2],
        sensor_types: vec![],
        sensor_assignments: vec![],
        variables: vec![variable(1, "Underway Marine pCO₂")],
        pre_flushing_time: 0,
        post_flushing_time: 0,
    }
}

/// The standard numeric fixture: 20 °C, salinity 35, 380 μatm dry xCO₂,
/// 1013.25 hPa
pub mod fixture {
    pub const TEMPERATURE: f64 = 20.0;
    pub const SALINITY: f64 = 35.0;
    pub const XCO2: f64 = 380.0;
    pub const PRESSURE: f64 = 1013.25;
}
