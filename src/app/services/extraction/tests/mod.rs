//! Tests for dataset extraction jobs
//!
//! Shared fixture: an underway pCO₂ ship with a CO₂ analyser stream (run
//! types, xCO₂, equilibrator temperature and pressure) and a
//! thermosalinograph stream (intake temperature, salinity, position).


use crate::app::adapters::persistence::InMemoryStore;
use crate::app::models::{
    CalibrationSet, Dataset, FileDefinition, Instrument, RunTypeAssignment, RunTypeCategory,
    SensorAssignment, SensorCalibration, SensorType, Variable,
};
use crate::app::services::raw_data::{LineSource, MemoryLine, MemoryLineSource};
use chrono::{DateTime, TimeZone, Utc};

pub fn time(minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 15, 12, minute, second).unwrap()
}

pub fn test_dataset() -> Dataset {
    Dataset::new(
        1,
        1,
        "SHIP_20230615",
        Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2023, 6, 15, 13, 0, 0).unwrap(),
    )
    .unwrap()
}

pub fn underway_instrument() -> Instrument {
    let mut co2 = FileDefinition::new("CO2 Analyser");
    co2.run_type_column = Some(0);
    co2.assign_run_type(
        "equ",
        RunTypeAssignment::Category(RunTypeCategory::Measurement {
            variable: "Underway Marine pCO₂".to_string(),
        }),
    );
    co2.assign_run_type(
        "std1",
        RunTypeAssignment::Category(RunTypeCategory::InternalCalibration),
    );

    let mut tsg = FileDefinition::new("Thermosalinograph");
    tsg.has_position = true;

    let sensor_type = |id, name: &str| SensorType {
        id,
        name: name.to_string(),
        diagnostic: false,
    };

    let assignment = |id, sensor_type: &str, file: &str, column| SensorAssignment {
        database_id: id,
        sensor_type: sensor_type.to_string(),
        file: file.to_string(),
        column,
        missing_value: "-999".to_string(),
    };

    Instrument {
        id: 1,
        name: "Test Ship".to_string(),
        file_definitions: vec![co2, tsg],
        sensor_types: vec![
            sensor_type(1, "xCO₂ water (dry, no standards)"),
            sensor_type(2, "Equilibrator Temperature"),
            sensor_type(3, "Equilibrator Pressure"),
            sensor_type(4, "Intake Temperature"),
            sensor_type(5, "Salinity"),
        ],
        sensor_assignments: vec![
            assignment(101, "xCO₂ water (dry, no standards)", "CO2 Analyser", 1),
            assignment(102, "Equilibrator Temperature", "CO2 Analyser", 2),
            assignment(103, "Equilibrator Pressure", "CO2 Analyser", 3),
            assignment(201, "Intake Temperature", "Thermosalinograph", 0),
            assignment(202, "Salinity", "Thermosalinograph", 1),
        ],
        variables: vec![Variable {
            id: 1,
            name: "Underway Marine pCO₂".to_string(),
        }],
        pre_flushing_time: 0,
        post_flushing_time: 0,
    }
}

/// CO₂ analyser rows: (time, run type, xCO₂, equilibrator temperature,
/// equilibrator pressure)
pub fn co2_lines(rows: &[(DateTime<Utc>, &str, &str, &str, &str)]) -> Box<dyn LineSource> {
    let lines = rows
        .iter()
        .map(|(time, run_type, xco2, eq_temp, eq_press)| MemoryLine {
            time: *time,
            fields: vec![
                run_type.to_string(),
                xco2.to_string(),
                eq_temp.to_string(),
                eq_press.to_string(),
            ],
        })
        .collect();

    Box::new(MemoryLineSource::new("co2.txt", lines).with_run_type_column(0))
}

/// Thermosalinograph rows: (time, intake temperature, salinity), fixed
/// position
pub fn tsg_lines(rows: &[(DateTime<Utc>, &str, &str)]) -> Box<dyn LineSource> {
    let lines = rows
        .iter()
        .map(|(time, sst, salinity)| MemoryLine {
            time: *time,
            fields: vec![
                sst.to_string(),
                salinity.to_string(),
                "-24.5".to_string(),
                "63.1".to_string(),
            ],
        })
        .collect();

    Box::new(MemoryLineSource::new("tsg.txt", lines).with_position_columns(2, 3))
}

/// The standard three-record source pair: one calibration run and two
/// measurements at 20 °C / 35 PSU
pub fn standard_sources() -> Vec<Box<dyn LineSource>> {
    vec![
        co2_lines(&[
            (time(0, 0), "std1", "250.0", "20.0", "1013.25"),
            (time(0, 10), "equ", "380.0", "20.0", "1013.25"),
            (time(0, 20), "equ", "381.0", "20.0", "1013.25"),
        ]),
        tsg_lines(&[
            (time(0, 0), "20.0", "35.0"),
            (time(0, 10), "20.0", "35.0"),
            (time(0, 20), "20.0", "35.0"),
        ]),
    ]
}

/// A store preloaded with a valid identity calibration for the intake
/// temperature column
pub fn store_with_calibrations() -> InMemoryStore {
    let store = InMemoryStore::new();
    let deployed = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    store.add_calibrations(
        1,
        deployed,
        CalibrationSet::new(1, vec![SensorCalibration::new(201, deployed, vec![0.0, 1.0])]),
    );

    store
}
