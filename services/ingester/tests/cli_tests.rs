//! Runs the ingester binary end to end on the Spotter sample files.

use std::path::{Path, PathBuf};
use std::process::Command;

use netcdf::AttributeValue;
use test_utils::{find_test_file, temp_test_dir};

fn sample(name: &str) -> Option<PathBuf> {
    find_test_file(name)
}

fn write_config(dir: &Path, storage_root: &Path) -> PathBuf {
    let yaml = format!(
        r#"
storage:
  root: {}
pipelines:
  - name: wave
    pattern: '\d{{4}}_FLT\.CSV$'
    datastream:
      location_id: clallam
      dataset_name: wave
      data_level: a1
    attrs:
      title: Clallam Bay wave displacement
    writer:
      time_interval: 5
      time_unit: min
      compression: true
      encoding:
        dir:
          _FillValue: ""
  - name: gps
    pattern: '\d{{4}}_LOC\.CSV$'
    datastream:
      location_id: clallam
      dataset_name: gps
      data_level: a1
"#,
        storage_root.display()
    );
    let path = dir.join("ingester.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn ingester() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ingester"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_ingest_spotter_files() {
    let (flt, loc) = match (sample("0001_FLT.CSV"), sample("0001_LOC.CSV")) {
        (Some(flt), Some(loc)) => (flt, loc),
        _ => {
            eprintln!("SKIPPED: Spotter sample files not found");
            return;
        }
    };
    let work = temp_test_dir();
    let root = work.path().join("storage");
    let config = write_config(work.path(), &root);

    let output = ingester()
        .arg("--config")
        .arg(&config)
        .arg(&flt)
        .arg(&loc)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "ingester failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let wave_dir = root.join("clallam.wave.a1");
    let mut wave: Vec<_> = std::fs::read_dir(&wave_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    wave.sort();
    assert_eq!(
        wave,
        vec![
            "clallam.wave.a1.20210801.235500.nc",
            "clallam.wave.a1.20210802.000000.nc",
        ]
    );
    assert!(root
        .join("clallam.gps.a1/clallam.gps.a1.20210801.235500.nc")
        .is_file());

    // the derived window is a complete file of its own
    let file = netcdf::open(wave_dir.join("clallam.wave.a1.20210802.000000.nc")).unwrap();
    assert_eq!(file.dimension("time").unwrap().len(), 750);
    assert_eq!(file.dimension("dir").unwrap().len(), 3);
    match file.attribute("title").unwrap().value().unwrap() {
        AttributeValue::Str(s) => assert_eq!(s, "Clallam Bay wave displacement"),
        other => panic!("unexpected title {:?}", other),
    }
    match file.attribute("datastream").unwrap().value().unwrap() {
        AttributeValue::Str(s) => assert_eq!(s, "clallam.wave.a1"),
        other => panic!("unexpected datastream {:?}", other),
    }

    let dir = file.variable("dir").unwrap();
    assert!(dir.attribute("_FillValue").is_none());
    assert_eq!(dir.get_string([0]).unwrap(), "x");

    let time = file.variable("time").unwrap();
    let secs: Vec<f64> = time.get_values::<f64, _>(..).unwrap();
    assert_eq!(secs[0], 1_627_862_400.0);
}

#[test]
fn test_storage_root_override() {
    let flt = match sample("0001_FLT.CSV") {
        Some(flt) => flt,
        None => {
            eprintln!("SKIPPED: Spotter sample files not found");
            return;
        }
    };
    let work = temp_test_dir();
    let config = write_config(work.path(), &work.path().join("unused"));
    let root = work.path().join("override");

    let status = ingester()
        .arg("--config")
        .arg(&config)
        .arg("--storage-root")
        .arg(&root)
        .arg("--json-logs")
        .arg(&flt)
        .status()
        .unwrap();

    assert!(status.success());
    assert!(root.join("clallam.wave.a1").is_dir());
    assert!(!work.path().join("unused/clallam.wave.a1").exists());
}

#[test]
fn test_failed_input_gives_non_zero_exit() {
    let work = temp_test_dir();
    let root = work.path().join("storage");
    let config = write_config(work.path(), &root);

    let bad = work.path().join("0009_FLT.CSV");
    std::fs::write(&bad, "millis,GPS_Epoch_Time(s)\n1,not-a-time\n").unwrap();

    let output = ingester().arg("--config").arg(&config).arg(&bad).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("0009_FLT.CSV"));
}

#[test]
fn test_missing_inputs_is_usage_error() {
    let work = temp_test_dir();
    let config = write_config(work.path(), &work.path().join("storage"));

    let status = ingester().arg("--config").arg(&config).status().unwrap();
    assert_eq!(status.code(), Some(2));
}
