//! Tests for record alignment
//!
//! Shared fixtures: a two-stream instrument (a run-type-bearing CO₂
//! analyser and a follower thermosalinograph with position data) and a
//! single-stream variant used by the flushing tests.


use crate::app::models::{
    CalibrationSet, Dataset, FileDefinition, Instrument, RunTypeAssignment, RunTypeCategory,
    SensorAssignment, SensorCalibration, SensorType, Variable,
};
use crate::app::services::raw_data::{
    DataSetRawData, LineSource, MemoryLine, MemoryLineSource, RawDataRecord,
};
use crate::config::AveragingMode;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

/// A time within the test dataset's window (12:00 - 13:00 on 2023-06-15)
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

/// CO₂ analyser stream: run type in column 0, xCO₂ in column 1
pub fn co2_definition() -> FileDefinition {
    let mut definition = FileDefinition::new("CO2 Analyser");
    definition.run_type_column = Some(0);
    definition.assign_run_type(
        "equ",
        RunTypeAssignment::Category(RunTypeCategory::Measurement {
            variable: "Underway Marine pCO₂".to_string(),
        }),
    );
    definition.assign_run_type("equ2", RunTypeAssignment::Alias("equ".to_string()));
    definition.assign_run_type(
        "std1",
        RunTypeAssignment::Category(RunTypeCategory::InternalCalibration),
    );
    definition.assign_run_type("ign", RunTypeAssignment::Category(RunTypeCategory::Ignored));
    definition
}

/// Thermosalinograph stream: SST in column 0, salinity in column 1,
/// position in columns 2/3. No run types.
fn tsg_definition() -> FileDefinition {
    let mut definition = FileDefinition::new("Thermosalinograph");
    definition.has_position = true;
    definition
}

pub fn two_file_instrument(pre_flushing: i64, post_flushing: i64) -> Instrument {
    Instrument {
        id: 1,
        name: "Test Ship".to_string(),
        file_definitions: vec![co2_definition(), tsg_definition()],
        sensor_types: vec![
            SensorType {
                id: 1,
                name: "xCO₂ water (dry, no standards)".to_string(),
                diagnostic: false,
            },
            SensorType {
                id: 2,
                name: "Intake Temperature".to_string(),
                diagnostic: false,
            },
            SensorType {
                id: 3,
                name: "Salinity".to_string(),
                diagnostic: false,
            },
        ],
        sensor_assignments: vec![
            SensorAssignment {
                database_id: 101,
                sensor_type: "xCO₂ water (dry, no standards)".to_string(),
                file: "CO2 Analyser".to_string(),
                column: 1,
                missing_value: "-999".to_string(),
            },
            SensorAssignment {
                database_id: 201,
                sensor_type: "Intake Temperature".to_string(),
                file: "Thermosalinograph".to_string(),
                column: 0,
                missing_value: "-999".to_string(),
            },
            SensorAssignment {
                database_id: 202,
                sensor_type: "Salinity".to_string(),
                file: "Thermosalinograph".to_string(),
                column: 1,
                missing_value: "-999".to_string(),
            },
        ],
        variables: vec![Variable {
            id: 1,
            name: "Underway Marine pCO₂".to_string(),
        }],
        pre_flushing_time: pre_flushing,
        post_flushing_time: post_flushing,
    }
}

/// An instrument with only the CO₂ analyser stream
pub fn single_file_instrument(pre_flushing: i64, post_flushing: i64) -> Instrument {
    let mut instrument = two_file_instrument(pre_flushing, post_flushing);
    instrument.file_definitions.truncate(1);
    instrument.sensor_assignments.truncate(1);
    instrument
}

/// Build a CO₂ analyser line source from (time, run type, xCO₂) rows
pub fn co2_lines(rows: &[(DateTime<Utc>, &str, &str)]) -> Box<dyn LineSource> {
    let lines = rows
        .iter()
        .map(|(time, run_type, xco2)| MemoryLine {
            time: *time,
            fields: vec![run_type.to_string(), xco2.to_string()],
        })
        .collect();

    Box::new(MemoryLineSource::new("co2.txt", lines).with_run_type_column(0))
}

/// Build a thermosalinograph line source from (time, SST, salinity) rows,
/// with a fixed position
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

/// Calibrations: Intake Temperature (201) gets `0.5 + 2x`; everything else
/// is uncalibrated
pub fn test_calibrations() -> CalibrationSet {
    CalibrationSet::new(
        1,
        vec![SensorCalibration::new(
            201,
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            vec![0.5, 2.0],
        )],
    )
}

pub fn build_aligner(
    instrument: Instrument,
    sources: Vec<Box<dyn LineSource>>,
    mode: AveragingMode,
) -> DataSetRawData {
    DataSetRawData::new(
        Arc::new(instrument),
        &test_dataset(),
        sources,
        test_calibrations(),
        mode,
    )
    .unwrap()
}

/// Drain the aligner into a record list
pub fn collect_records(aligner: &mut DataSetRawData) -> Vec<RawDataRecord> {
    let mut records = Vec::new();
    while let Some(record) = aligner.next_record().unwrap() {
        records.push(record);
    }
    records
}
