//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use loadsynth_core::schedule::is_weekend;
use loadsynth_core::{
    export_csv, generate_timeseries, load_templates, place_probabilistic_weekly,
    place_uniform_random, read_csv, synthesize_activation, CalendarWindow, CsvLayout,
    GenerationMethod, GenerationParams, PlacementMode, ScheduleConfig, Strategy, SynthError,
};
use serde_json::json;
use tempfile::tempdir;

fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn write_library(dir: &Path) {
    let document = json!({
        "time_warping_patterns": [
            {
                "power_sequence": [0.0, 10.0, 20.0, 10.0, 0.0],
                "statistical_features": {"max_power": 20.0},
                "total_duration_seconds": 35.0
            },
            {
                "power_sequence": [0.0, 400.0, 1900.0, 2100.0, 2050.0, 800.0, 100.0, 0.0],
                "statistical_features": {"max_power": 2100.0}
            },
            {
                "power_sequence": [50.0, 1200.0, 1300.0, 1250.0, 200.0, 50.0]
            }
        ]
    });
    fs::write(
        dir.join("dishwasher_time_warping_patterns.json"),
        serde_json::to_string_pretty(&document).unwrap(),
    )
    .unwrap();
}

fn evening_schedule() -> ScheduleConfig {
    ScheduleConfig::from_json_str(
        r#"{
            "activations_per_week": 7,
            "weekday": {"hour_probabilities": {"18-21": 1.0}},
            "weekend": {"hour_probabilities": {"10-14": 1.0}}
        }"#,
    )
    .unwrap()
}

#[test]
fn direct_scaling_keeps_the_power_band() {
    let dir = tempdir().unwrap();
    write_library(dir.path());
    let templates = load_templates(dir.path()).unwrap();
    assert_eq!(templates.len(), 3);

    let params = GenerationParams::new(2000.0, 1.0, Strategy::DirectScaling { index: 0 })
        .with_timesteps(7, 7);
    let curve = synthesize_activation(&templates, &params).unwrap();
    assert_eq!(curve.len(), 8);
    let samples = curve.samples();
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(max > 1800.0 && max <= 2000.0 + 1e-6, "max {max}");
    assert!(min.abs() < 1e-6, "min {min}");
}

#[test]
fn every_method_yields_a_non_negative_curve() {
    let dir = tempdir().unwrap();
    write_library(dir.path());
    let templates = load_templates(dir.path()).unwrap();
    for method in ["weighted", "interpolate", "scaling", "dtw"] {
        let method: GenerationMethod = method.parse().unwrap();
        let params = GenerationParams::new(1800.0, 45.0, Strategy::from_method(method, 1));
        let curve = synthesize_activation(&templates, &params).unwrap();
        assert_eq!(curve.len(), 45, "{method}");
        assert!(curve.samples().iter().all(|v| *v >= 0.0), "{method}");
        assert!(curve.peak() > 0.0, "{method}");
    }
}

#[test]
fn weekly_schedule_lands_in_its_windows() {
    let dir = tempdir().unwrap();
    write_library(dir.path());
    let templates = load_templates(dir.path()).unwrap();
    let params = GenerationParams::new(2000.0, 90.0, Strategy::WeightedAverage);
    let window = CalendarWindow::new(at(1, 1, 0, 0), at(1, 7, 23, 59), 60).unwrap();
    let series = generate_timeseries(
        &templates,
        &params,
        &window,
        &PlacementMode::Weekly(evening_schedule()),
        Some(42),
    )
    .unwrap();

    let starts = series.activation_starts();
    assert_eq!(starts.len(), 7);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= 90);
    }
    for &start in starts {
        let ts = series.points()[start].timestamp;
        let hours = if is_weekend(&ts) { 10..14 } else { 18..21 };
        assert!(hours.contains(&ts.hour()), "start {ts} outside its window");
    }
}

#[test]
fn uniform_placement_round_trips_through_csv() {
    let dir = tempdir().unwrap();
    write_library(dir.path());
    let templates = load_templates(dir.path()).unwrap();
    let params = GenerationParams::new(1500.0, 30.0, Strategy::DtwAverage { reference: 1 });
    let curve = synthesize_activation(&templates, &params).unwrap();
    let series =
        place_uniform_random(&curve, at(3, 1, 0, 0), at(3, 3, 23, 59), 2, 60, Some(3)).unwrap();
    assert_eq!(series.len(), 3 * 1440);
    assert_eq!(series.activation_starts().len(), 6);

    let path = dir.path().join("out/dishwasher_consumption.csv");
    export_csv(&series, &path, CsvLayout::Player).unwrap();
    let points = read_csv(&path, CsvLayout::Player).unwrap();
    assert_eq!(points.len(), series.len());
    for (read, original) in points.iter().zip(series.points()) {
        assert_eq!(read.timestamp, original.timestamp);
        assert!((read.power - original.power).abs() <= 0.05 + 1e-9);
    }
}

#[test]
fn entry_points_surface_errors() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        load_templates(dir.path().join("absent")),
        Err(SynthError::NotFound(_))
    ));

    write_library(dir.path());
    let templates = load_templates(dir.path()).unwrap();
    let params = GenerationParams::new(2000.0, 10.0, Strategy::default());
    let curve = synthesize_activation(&templates, &params).unwrap();
    let reversed = place_probabilistic_weekly(
        &curve,
        at(1, 7, 0, 0),
        at(1, 1, 0, 0),
        &evening_schedule(),
        60,
        Some(1),
    );
    assert!(matches!(reversed, Err(SynthError::InvalidArgument(_))));
}
