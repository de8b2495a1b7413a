use serde::Deserialize;
use std::collections::HashMap;
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};

use crate::{PipelineError, Quantity};

/// Body the SPICE endpoint returns when nothing matches the request.
pub const EMPTY_RESULT_MARKER: &str = "0 results";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawTimestamp {
    Text(String),
    Epoch(i64),
}

impl RawTimestamp {
    /// Reads the sample time at whole-second resolution, always as UTC.
    pub fn to_datetime(&self) -> Result<OffsetDateTime, PipelineError> {
        let parsed = match self {
            RawTimestamp::Text(raw) => parse_source_time(raw),
            RawTimestamp::Epoch(secs) => OffsetDateTime::from_unix_timestamp(*secs).ok(),
        };
        parsed.ok_or_else(|| {
            PipelineError::StructuralMismatch(format!("unreadable sample time: {:?}", self))
        })
    }
}

fn parse_source_time(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim().trim_end_matches('Z');
    // sub-second digits are dropped, not rounded
    let whole_seconds = trimmed.split('.').next()?;
    let normalized = whole_seconds.replacen('T', " ", 1);
    PrimitiveDateTime::parse(
        &normalized,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sample {
    pub t: RawTimestamp,
    pub v: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ValueMetadata {
    pub units: Option<String>,
    #[serde(rename = "_FillValue")]
    pub fill_value: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VariableMetadata {
    #[serde(default)]
    pub v: ValueMetadata,
}

/// Decoded station response. Unknown keys (e.g. the echoed `spiceID`) are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawObservationPayload {
    #[serde(default)]
    pub metadata: HashMap<String, VariableMetadata>,
    pub surface_snow_thickness: Option<Vec<Sample>>,
    pub air_temperature: Option<Vec<Sample>>,
    pub relative_humidity: Option<Vec<Sample>>,
    pub air_pressure: Option<Vec<Sample>>,
    pub latitude: Option<Vec<Sample>>,
    pub longitude: Option<Vec<Sample>>,
    #[serde(alias = "accuracy_radius")]
    pub cep: Option<Vec<Sample>>,
}

impl RawObservationPayload {
    pub fn series(&self, quantity: Quantity) -> Option<&[Sample]> {
        match quantity {
            Quantity::SurfaceSnowThickness => self.surface_snow_thickness.as_deref(),
            Quantity::AirTemperature => self.air_temperature.as_deref(),
            Quantity::RelativeHumidity => self.relative_humidity.as_deref(),
            Quantity::AirPressure => self.air_pressure.as_deref(),
        }
    }

    pub fn metadata_for(&self, quantity: Quantity) -> Option<&ValueMetadata> {
        self.metadata
            .get(quantity.standard_name())
            .map(|meta| &meta.v)
    }
}

#[derive(Debug)]
pub enum ParsedResponse {
    Payload(Box<RawObservationPayload>),
    NoData,
}

/// Decodes a response body, telling the empty-result marker apart from garbage.
pub fn parse_response(body: &str) -> Result<ParsedResponse, PipelineError> {
    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) if body == EMPTY_RESULT_MARKER => return Ok(ParsedResponse::NoData),
        Err(e) => return Err(PipelineError::MalformedResponse(e)),
    };

    let payload: RawObservationPayload = serde_json::from_value(json).map_err(|e| {
        PipelineError::StructuralMismatch(format!("unexpected payload layout: {}", e))
    })?;
    Ok(ParsedResponse::Payload(Box::new(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_empty_result_marker_is_not_an_error() {
        assert!(matches!(
            parse_response("0 results").unwrap(),
            ParsedResponse::NoData
        ));
        // parsing is pure, asking twice answers the same
        assert!(matches!(
            parse_response("0 results").unwrap(),
            ParsedResponse::NoData
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse_response("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));

        let err = parse_response("0 results found").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }

    #[test]
    fn test_non_object_json_is_structural() {
        let err = parse_response("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, PipelineError::StructuralMismatch(_)));
    }

    #[test]
    fn test_payload_fields() {
        let body = r#"{
            "spiceID": "SPICE34",
            "air_temperature": [{"t": "2024-01-01 00:00:00", "v": -12.5}, {"t": "2024-01-01 00:10:00", "v": null}],
            "metadata": {"air_temperature": {"v": {"units": "degC", "_FillValue": -999}}}
        }"#;
        let ParsedResponse::Payload(payload) = parse_response(body).unwrap() else {
            panic!("expected payload");
        };

        let samples = payload.series(Quantity::AirTemperature).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].v, Some(-12.5));
        assert_eq!(samples[1].v, None);
        assert!(payload.series(Quantity::AirPressure).is_none());

        let meta = payload.metadata_for(Quantity::AirTemperature).unwrap();
        assert_eq!(meta.units.as_deref(), Some("degC"));
        assert_eq!(meta.fill_value, Some(-999.0));
        assert!(payload.metadata_for(Quantity::AirPressure).is_none());
    }

    #[test]
    fn test_sample_time_formats() {
        let expected = datetime!(2024-03-05 06:07:08 UTC);
        for raw in [
            "2024-03-05 06:07:08",
            "2024-03-05T06:07:08",
            "2024-03-05T06:07:08Z",
            "2024-03-05 06:07:08.999",
        ] {
            let ts = RawTimestamp::Text(raw.to_string());
            assert_eq!(ts.to_datetime().unwrap(), expected, "{}", raw);
        }
        let epoch = RawTimestamp::Epoch(expected.unix_timestamp());
        assert_eq!(epoch.to_datetime().unwrap(), expected);
    }

    #[test]
    fn test_bad_sample_time() {
        let ts = RawTimestamp::Text("yesterday".to_string());
        assert!(matches!(
            ts.to_datetime(),
            Err(PipelineError::StructuralMismatch(_))
        ));
    }
}
