use netcdf::AttributeValue;
use slog::{o, Discard, Logger};
use spice2nc::{
    assemble_dataset, parse_response, DataVariable, DatasetWriter, MetadataComposer,
    NetcdfWriter, OutputDataset, ParsedResponse, PipelineError, PositionResolver,
    StationPosition,
};
use std::fs;
use time::macros::datetime;

const BODY: &str = r#"{
    "spiceID": "SPICE34",
    "surface_snow_thickness": [
        {"t": "2024-01-01 00:00:00", "v": 12.5},
        {"t": "2024-01-01 00:10:00", "v": null},
        {"t": "2024-01-01 00:20:00", "v": 13.0}
    ],
    "air_temperature": [
        {"t": "2024-01-01 00:00:00", "v": -10.25},
        {"t": "2024-01-01 00:10:00", "v": -10.5},
        {"t": "2024-01-01 00:20:00", "v": null}
    ],
    "relative_humidity": [
        {"t": "2024-01-01 00:00:00", "v": 80},
        {"t": "2024-01-01 00:10:00", "v": 81},
        {"t": "2024-01-01 00:20:00", "v": 82}
    ],
    "air_pressure": [
        {"t": "2024-01-01 00:00:00", "v": 1001.5},
        {"t": "2024-01-01 00:10:00", "v": 1001.0},
        {"t": "2024-01-01 00:20:00", "v": 1000.5}
    ],
    "metadata": {
        "surface_snow_thickness": {"v": {"units": "cm", "_FillValue": -999}},
        "air_temperature": {"v": {"units": "degC", "_FillValue": -999}},
        "relative_humidity": {"v": {"units": "%"}},
        "air_pressure": {"v": {"units": "hPa"}}
    }
}"#;

fn logger() -> Logger {
    Logger::root(Discard, o!())
}

fn dataset() -> OutputDataset {
    let payload = match parse_response(BODY).unwrap() {
        ParsedResponse::Payload(payload) => payload,
        ParsedResponse::NoData => panic!("expected payload"),
    };
    assemble_dataset(
        &payload,
        "SPICE34",
        PositionResolver::FixedLookup(StationPosition {
            lat: 77.08636,
            lon: 15.62725,
        }),
        &MetadataComposer::default(),
        datetime!(2024-02-01 08:30:00 UTC),
    )
    .unwrap()
}

fn text(value: AttributeValue) -> String {
    match value {
        AttributeValue::Str(text) => text,
        other => panic!("expected text attribute, got {:?}", other),
    }
}

#[test]
fn test_writes_cf_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/spice34.nc");

    NetcdfWriter::new(logger()).write(&dataset(), &path).unwrap();

    let file = netcdf::open(&path).unwrap();
    let time_dim = file.dimension("time").unwrap();
    assert!(time_dim.is_unlimited());
    assert_eq!(time_dim.len(), 3);

    let time = file.variable("time").unwrap();
    assert_eq!(time.get_values::<i32, _>(..).unwrap(), vec![0, 600, 1200]);
    assert_eq!(
        text(time.attribute("units").unwrap().value().unwrap()),
        "seconds since 2024-01-01 00:00:00"
    );
    assert_eq!(
        text(time.attribute("long_name").unwrap().value().unwrap()),
        "time of observation"
    );

    let snow = file.variable("surface_snow_thickness").unwrap();
    assert_eq!(
        snow.get_values::<f32, _>(..).unwrap(),
        vec![12.5, -999.0, 13.0]
    );
    assert_eq!(
        snow.attribute("_FillValue").unwrap().value().unwrap(),
        AttributeValue::Float(-999.0)
    );
    assert_eq!(text(snow.attribute("units").unwrap().value().unwrap()), "cm");

    let humidity = file.variable("relative_humidity").unwrap();
    assert!(humidity.attribute("_FillValue").is_none());
    assert_eq!(
        text(humidity.attribute("standard_name").unwrap().value().unwrap()),
        "relative_humidity"
    );

    let lat = file.variable("lat").unwrap();
    assert!(lat.dimensions().is_empty());
    let lat_value = lat.get_values::<f32, _>(..).unwrap();
    assert_eq!(lat_value, vec![77.08636_f32]);
    assert_eq!(
        text(lat.attribute("units").unwrap().value().unwrap()),
        "degree_north"
    );

    assert_eq!(
        text(file.attribute("title").unwrap().value().unwrap()),
        "Measurement data from SPICE34 station"
    );
    assert_eq!(
        text(file.attribute("time_coverage_end").unwrap().value().unwrap()),
        "2024-01-01T00:20:00Z"
    );
    assert_eq!(
        text(file.attribute("date_created").unwrap().value().unwrap()),
        "2024-02-01T08:30:00Z"
    );
}

#[test]
fn test_rewrite_replaces_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spice34.nc");
    let writer = NetcdfWriter::new(logger());

    writer.write(&dataset(), &path).unwrap();
    writer.write(&dataset(), &path).unwrap();

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let file = netcdf::open(&path).unwrap();
    assert_eq!(file.dimension("time").unwrap().len(), 3);
}

#[test]
fn test_failed_write_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spice34.nc");

    let mut broken = dataset();
    broken.variables.push(DataVariable {
        name: String::from("undeclared"),
        dims: vec![String::from("time")],
        values: vec![1.0, 2.0, 3.0],
        attributes: Default::default(),
    });

    let err = NetcdfWriter::new(logger())
        .write(&broken, &path)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Encoding(_)));
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
