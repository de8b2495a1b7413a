use time::OffsetDateTime;

use crate::{PipelineError, Quantity, RawObservationPayload};

/// One quantity's values on its time axis, with the attributes readers need.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableSeries {
    pub quantity: Quantity,
    pub times: Vec<OffsetDateTime>,
    /// Missing entries already carry `fill_value` when one is declared, NaN otherwise
    pub values: Vec<f64>,
    pub units: Option<String>,
    pub fill_value: Option<f64>,
}

impl VariableSeries {
    pub fn name(&self) -> &'static str {
        self.quantity.standard_name()
    }

    pub fn long_name(&self) -> &'static str {
        self.quantity.long_name()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

pub fn assemble_variable(
    payload: &RawObservationPayload,
    quantity: Quantity,
) -> Result<VariableSeries, PipelineError> {
    let samples = payload.series(quantity).ok_or_else(|| {
        PipelineError::StructuralMismatch(format!("variable {} missing from payload", quantity))
    })?;

    let metadata = payload.metadata_for(quantity);
    let units = metadata.and_then(|meta| meta.units.clone());
    let fill_value = metadata.and_then(|meta| meta.fill_value);

    let times = samples
        .iter()
        .map(|sample| sample.t.to_datetime())
        .collect::<Result<Vec<_>, _>>()?;
    let values = samples
        .iter()
        .map(|sample| sample.v.or(fill_value).unwrap_or(f64::NAN))
        .collect();

    Ok(VariableSeries {
        quantity,
        times,
        values,
        units,
        fill_value,
    })
}

/// Assembles all four quantities and checks they share one time axis.
///
/// The axis must be non-empty and strictly increasing, and every quantity must
/// carry exactly the timestamps of the first one.
pub fn assemble_variables(
    payload: &RawObservationPayload,
) -> Result<Vec<VariableSeries>, PipelineError> {
    let series = Quantity::ALL
        .iter()
        .map(|quantity| assemble_variable(payload, *quantity))
        .collect::<Result<Vec<_>, _>>()?;

    let reference = &series[0];
    if reference.is_empty() {
        return Err(PipelineError::StructuralMismatch(String::from(
            "payload has an empty time axis",
        )));
    }
    if let Some(pair) = reference.times.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(PipelineError::StructuralMismatch(format!(
            "time axis of {} is not strictly increasing at {}",
            reference.name(),
            pair[1]
        )));
    }

    for other in &series[1..] {
        if other.len() != reference.len() {
            return Err(PipelineError::StructuralMismatch(format!(
                "{} has {} samples but {} has {}",
                other.name(),
                other.len(),
                reference.name(),
                reference.len()
            )));
        }
        if other.times != reference.times {
            return Err(PipelineError::StructuralMismatch(format!(
                "{} is not aligned with {}",
                other.name(),
                reference.name()
            )));
        }
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_response, ParsedResponse};
    use time::macros::datetime;

    fn payload(body: &str) -> RawObservationPayload {
        match parse_response(body).unwrap() {
            ParsedResponse::Payload(payload) => *payload,
            ParsedResponse::NoData => panic!("expected payload"),
        }
    }

    fn series_json(values: &[Option<f64>]) -> String {
        let samples: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let v = v.map_or(String::from("null"), |v| v.to_string());
                format!(r#"{{"t": "2024-01-01 00:{:02}:00", "v": {}}}"#, i * 10, v)
            })
            .collect();
        format!("[{}]", samples.join(","))
    }

    fn full_payload(snow: &[Option<f64>], other: &[Option<f64>]) -> String {
        format!(
            r#"{{
                "surface_snow_thickness": {},
                "air_temperature": {},
                "relative_humidity": {},
                "air_pressure": {},
                "metadata": {{
                    "surface_snow_thickness": {{"v": {{"units": "cm", "_FillValue": -999.0}}}},
                    "air_temperature": {{"v": {{"units": "degC"}}}},
                    "relative_humidity": {{"v": {{"units": "%", "_FillValue": null}}}},
                    "air_pressure": {{"v": {{"units": "hPa", "_FillValue": -1}}}}
                }}
            }}"#,
            series_json(snow),
            series_json(other),
            series_json(other),
            series_json(other)
        )
    }

    #[test]
    fn test_assemble_all_variables() {
        let body = full_payload(&[Some(10.0), Some(11.0)], &[Some(1.0), Some(2.0)]);
        let series = assemble_variables(&payload(&body)).unwrap();

        assert_eq!(series.len(), 4);
        for variable in &series {
            assert_eq!(variable.times.len(), variable.values.len());
            assert_eq!(
                variable.times,
                vec![
                    datetime!(2024-01-01 00:00:00 UTC),
                    datetime!(2024-01-01 00:10:00 UTC)
                ]
            );
        }
        assert_eq!(series[0].name(), "surface_snow_thickness");
        assert_eq!(series[0].long_name(), "snow thickness measured at station");
        assert_eq!(series[0].units.as_deref(), Some("cm"));
        assert_eq!(series[0].values, vec![10.0, 11.0]);
    }

    #[test]
    fn test_fill_value_replaces_missing() {
        let body = full_payload(&[Some(10.0), None], &[None, Some(2.0)]);
        let series = assemble_variables(&payload(&body)).unwrap();

        let snow = &series[0];
        assert_eq!(snow.fill_value, Some(-999.0));
        assert_eq!(snow.values, vec![10.0, -999.0]);

        let pressure = &series[3];
        assert_eq!(pressure.fill_value, Some(-1.0));
        assert_eq!(pressure.values, vec![-1.0, 2.0]);
    }

    #[test]
    fn test_no_fill_value_keeps_gap() {
        let body = full_payload(&[Some(10.0), Some(11.0)], &[None, Some(2.0)]);
        let series = assemble_variables(&payload(&body)).unwrap();

        let temperature = &series[1];
        assert_eq!(temperature.fill_value, None);
        assert!(temperature.values[0].is_nan());

        // an explicit null is the same as no fill value
        let humidity = &series[2];
        assert_eq!(humidity.fill_value, None);
        assert!(humidity.values[0].is_nan());
    }

    #[test]
    fn test_missing_variable_is_structural() {
        let body = format!(
            r#"{{"surface_snow_thickness": {s}, "air_temperature": {s}, "relative_humidity": {s}}}"#,
            s = series_json(&[Some(1.0)])
        );
        let err = assemble_variables(&payload(&body)).unwrap_err();
        match err {
            PipelineError::StructuralMismatch(msg) => assert!(msg.contains("air_pressure")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_mismatched_lengths_are_structural() {
        let body = full_payload(&[Some(1.0), Some(2.0), Some(3.0)], &[Some(1.0), Some(2.0)]);
        let err = assemble_variables(&payload(&body)).unwrap_err();
        assert!(matches!(err, PipelineError::StructuralMismatch(_)));
    }

    #[test]
    fn test_unaligned_times_are_structural() {
        let shifted = r#"[{"t": "2024-01-01 00:00:00", "v": 1}, {"t": "2024-01-01 00:15:00", "v": 2}]"#;
        let body = format!(
            r#"{{"surface_snow_thickness": {s}, "air_temperature": {s}, "relative_humidity": {s}, "air_pressure": {shifted}}}"#,
            s = series_json(&[Some(1.0), Some(2.0)]),
            shifted = shifted
        );
        let err = assemble_variables(&payload(&body)).unwrap_err();
        assert!(matches!(err, PipelineError::StructuralMismatch(_)));
    }

    #[test]
    fn test_non_increasing_axis_is_structural() {
        let repeated = r#"[{"t": "2024-01-01 00:00:00", "v": 1}, {"t": "2024-01-01 00:00:00", "v": 2}]"#;
        let body = format!(
            r#"{{"surface_snow_thickness": {s}, "air_temperature": {s}, "relative_humidity": {s}, "air_pressure": {s}}}"#,
            s = repeated
        );
        let err = assemble_variables(&payload(&body)).unwrap_err();
        assert!(matches!(err, PipelineError::StructuralMismatch(_)));
    }

    #[test]
    fn test_empty_axis_is_structural() {
        let body = r#"{"surface_snow_thickness": [], "air_temperature": [], "relative_humidity": [], "air_pressure": []}"#;
        let err = assemble_variables(&payload(body)).unwrap_err();
        assert!(matches!(err, PipelineError::StructuralMismatch(_)));
    }
}
