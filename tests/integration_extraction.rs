//! End-to-end extraction tests
//!
//! These tests run the whole pipeline through the public API: raw lines in,
//! aligned and reduced results in the store, with the dataset walking the
//! status ladder.

use chrono::{DateTime, TimeZone, Utc};
use float_cmp::{ApproxEq, F64Margin};
use pco2_processor::app::adapters::persistence::InMemoryStore;
use pco2_processor::app::models::{
    CalibrationSet, Dataset, DatasetStatus, FileDefinition, Instrument, RunTypeAssignment,
    RunTypeCategory, SensorAssignment, SensorCalibration, SensorType, Variable,
};
use pco2_processor::app::services::extraction::{CancelFlag, ExtractionJob};
use pco2_processor::app::services::raw_data::{LineSource, MemoryLine, MemoryLineSource};
use pco2_processor::config::{AveragingMode, ExtractionConfig};
use std::sync::Arc;

fn time(minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 15, 12, minute, second).unwrap()
}

/// An underway ship instrument: gas analyser (run types, xCO₂,
/// equilibrator temperature and pressure) plus thermosalinograph (intake
/// temperature, salinity, position)
fn ship() -> Instrument {
    let mut analyser = FileDefinition::new("CO2 Analyser");
    analyser.run_type_column = Some(0);
    analyser.assign_run_type(
        "equ",
        RunTypeAssignment::Category(RunTypeCategory::Measurement {
            variable: "Underway Marine pCO₂".to_string(),
        }),
    );
    analyser.assign_run_type(
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
        name: "RV Integration".to_string(),
        file_definitions: vec![analyser, tsg],
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

fn analyser_lines(rows: &[(DateTime<Utc>, &str, &str, &str, &str)]) -> Box<dyn LineSource> {
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

fn tsg_lines(rows: &[(DateTime<Utc>, &str, &str)]) -> Box<dyn LineSource> {
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

fn dataset() -> Dataset {
    Dataset::new(
        7,
        1,
        "RV_20230615",
        Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2023, 6, 15, 13, 0, 0).unwrap(),
    )
    .unwrap()
}

fn store() -> InMemoryStore {
    let store = InMemoryStore::new();
    let deployed = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    store.add_calibrations(
        1,
        deployed,
        CalibrationSet::new(1, vec![SensorCalibration::new(201, deployed, vec![0.0, 1.0])]),
    );

    store
}

#[test]
fn test_raw_lines_become_stored_reduction_records() {
    let sources = vec![
        analyser_lines(&[
            (time(0, 0), "std1", "250.0", "20.0", "1013.25"),
            (time(0, 10), "equ", "380.0", "20.0", "1013.25"),
            (time(0, 20), "equ", "380.0", "20.0", "1013.25"),
        ]),
        tsg_lines(&[
            (time(0, 0), "20.0", "35.0"),
            (time(0, 10), "20.0", "35.0"),
            (time(0, 20), "20.0", "35.0"),
        ]),
    ];

    let store = store();
    let mut dataset = dataset();
    let job = ExtractionJob::new(Arc::new(ship()), ExtractionConfig::default()).unwrap();

    let summary = job
        .run(&mut dataset, sources, &store, &CancelFlag::new())
        .unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(summary.measurements, 2);
    assert_eq!(dataset.status, DatasetStatus::AutoQc);
    assert_eq!(
        store.status_history(dataset.id),
        vec![
            DatasetStatus::DataExtraction,
            DatasetStatus::DataReduction,
            DatasetStatus::AutoQc,
        ]
    );

    // Both measurements were identical, so both reduction records carry the
    // reference fixture values: 380 μatm dry at 20 °C, salinity 35, one
    // standard atmosphere
    let records = store.stored_reduction_records(dataset.id);
    assert_eq!(records.len(), 2);

    let kelvin: f64 = 293.15;
    let ph2o = (24.4543
        - 67.4509 * (100.0 / kelvin)
        - 4.8489 * (kelvin / 100.0).ln()
        - 0.000544 * 35.0)
        .exp();
    let pco2 = 380.0 * (1.0 - ph2o);

    for record in &records {
        let computed_ph2o = record.value("pH₂O").unwrap();
        let computed_pco2 = record.value("pCO₂ SST").unwrap();
        let computed_fco2 = record.value("fCO₂").unwrap();

        assert!(computed_ph2o.approx_eq(ph2o, F64Margin { ulps: 2, epsilon: ph2o * 1e-6 }));
        assert!(computed_pco2.approx_eq(pco2, F64Margin { ulps: 2, epsilon: pco2 * 1e-6 }));
        assert!(computed_fco2 < computed_pco2);
        assert!(computed_fco2 > computed_pco2 * 0.995);
    }
}

#[test]
fn test_minute_averaging_end_to_end() {
    // Two samples inside minute zero, two inside minute one
    let sources = vec![
        analyser_lines(&[
            (time(0, 10), "equ", "380.0", "20.0", "1013.25"),
            (time(0, 40), "equ", "382.0", "20.0", "1013.25"),
            (time(1, 10), "equ", "390.0", "20.0", "1013.25"),
            (time(1, 40), "equ", "392.0", "20.0", "1013.25"),
        ]),
        tsg_lines(&[
            (time(0, 20), "20.0", "35.0"),
            (time(0, 50), "22.0", "35.0"),
            (time(1, 20), "20.0", "35.0"),
            (time(1, 50), "22.0", "35.0"),
        ]),
    ];

    let store = store();
    let mut dataset = dataset();
    let config = ExtractionConfig {
        averaging_mode: AveragingMode::EveryMinute,
        ..ExtractionConfig::default()
    };
    let job = ExtractionJob::new(Arc::new(ship()), config).unwrap();

    let summary = job
        .run(&mut dataset, sources, &store, &CancelFlag::new())
        .unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(summary.measurements, 2);

    // Record times are truncated to their minute, and the dataset bounds
    // follow the extracted range
    assert_eq!(dataset.start, time(0, 0));
    assert_eq!(dataset.end, time(1, 0));

    // The averaged xCO₂ values reach the stored sensor values
    let sensor_values = store.stored_sensor_values(dataset.id);
    let xco2: Vec<_> = sensor_values
        .iter()
        .filter(|v| v.column_id == 101)
        .map(|v| v.value)
        .collect();
    assert_eq!(xco2, vec![Some(381.0), Some(391.0)]);
}

#[test]
fn test_failed_job_reports_error_and_stores_nothing() {
    let sources = vec![
        analyser_lines(&[(time(0, 10), "equ", "380.0", "20.0", "1013.25")]),
        tsg_lines(&[(time(0, 10), "20.0", "35.0")]),
    ];

    // No calibrations registered at all
    let store = InMemoryStore::new();
    let mut dataset = dataset();
    let job = ExtractionJob::new(Arc::new(ship()), ExtractionConfig::default()).unwrap();

    let result = job.run(&mut dataset, sources, &store, &CancelFlag::new());

    assert!(result.is_err());
    assert_eq!(dataset.status, DatasetStatus::Error);
    assert_eq!(dataset.messages.len(), 1);
    assert!(store.stored_sensor_values(dataset.id).is_empty());
    assert!(store.stored_reduction_records(dataset.id).is_empty());

    let messages = store.dataset_messages(dataset.id);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].detail.contains("Calibration"));
}
