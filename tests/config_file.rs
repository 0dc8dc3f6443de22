//! Configuration file to threaded run, end to end.

use std::io::Write;

use sidereal_clock::{
    derive, spawn, AccumulatorWidth, ClockConfig, ConfigError, CsvDriftLog, DriftObserver,
    PulseCounter, RunBudget, SiderealError,
};

fn write_config(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("clock.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(json.as_bytes()).unwrap();
    path
}

#[test]
fn loaded_config_drives_threaded_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "width": 32,
            "scale_factor": null,
            "report_every_seconds": 1,
            "test_seconds": 5
        }"#,
    );

    let config = ClockConfig::load(&path).unwrap();
    assert_eq!(config.width, AccumulatorWidth::W32);

    let pair = config.frequency_pair().unwrap();
    let scaled = derive::<u32>(&pair, config.scale()).unwrap();
    let observer =
        DriftObserver::new(pair, config.solar_ticks, config.report_every_events()).unwrap();

    let csv_path = dir.path().join("drift.csv");
    let mut log = CsvDriftLog::create(&csv_path).unwrap();

    let handle = spawn(
        scaled,
        observer,
        PulseCounter::new(),
        RunBudget::Events(config.test_events()),
    )
    .unwrap();
    for sample in handle.reports().iter() {
        log.record(&sample).unwrap();
    }
    let (stats, counter, observer) = handle.join().unwrap();
    log.flush().unwrap();

    assert_eq!(stats.events, 312_500);
    assert_eq!(stats.reports, 5);
    assert_eq!(counter.pulses(), stats.pulses);
    // 5 s * 32857.7158 ticks/s
    assert_eq!(counter.pulses(), 164_288);
    assert_eq!(observer.events(), stats.events);
    let (lo, hi) = observer.phase_error_range().unwrap();
    assert!(lo > -1.0 && hi < 1.0);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 5);
    assert_eq!(&rows[4][0], "312500");
    assert_eq!(&rows[4][1], "164288");
}

#[test]
fn reference_scale_rejected_for_32_bit_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, r#"{ "width": 32, "scale_factor": 70000 }"#);

    let config = ClockConfig::load(&path).unwrap();
    let pair = config.frequency_pair().unwrap();
    let err = derive::<u32>(&pair, config.scale()).unwrap_err();
    assert!(matches!(err, ConfigError::LimitOverflow { bits: 32, .. }));

    // The crate error wraps it with context
    let wrapped = SiderealError::from(err);
    assert!(wrapped.to_string().starts_with("Invalid configuration:"));
}

#[test]
fn missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ClockConfig::load(dir.path().join("absent.json")),
        Err(SiderealError::Io(_))
    ));

    let path = write_config(&dir, "{ width: 32 ");
    assert!(matches!(
        ClockConfig::load(&path),
        Err(SiderealError::ParseError(_))
    ));
}
