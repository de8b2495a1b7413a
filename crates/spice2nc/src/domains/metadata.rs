use serde::Deserialize;
use time::{macros::format_description, OffsetDateTime};

use crate::{Attributes, PipelineError, StationPosition};

const SUMMARY: &str = "Data from SPICE stations includes snow depth measurements, surface \
    temperature, relative humidity, and atmospheric pressure. These stations and their data \
    are a part of the CRIOS project.";

const KEYWORDS: [&str; 4] = [
    "EARTH SCIENCE > CRYOSPHERE > SNOW/ICE > SNOW DEPTH",
    "EARTH SCIENCE > ATMOSPHERE > ATMOSPHERIC TEMPERATURE > SURFACE TEMPERATURE > AIR TEMPERATURE",
    "EARTH SCIENCE > ATMOSPHERE > ATMOSPHERIC WATER VAPOR > WATER VAPOR INDICATORS > HUMIDITY > RELATIVE HUMIDITY",
    "EARTH SCIENCE > ATMOSPHERE > ATMOSPHERIC PRESSURE > ATMOSPHERIC PRESSURE MEASUREMENTS",
];

pub const PLACEHOLDER_TEXT: &str = "PLACEHOLDER: to be completed";

/// Whether provenance attributes are written out or left for manual completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetadataProfile {
    #[default]
    Complete,
    Placeholder,
}

/// Creator and licensing fields, overridable from the `[provenance]` config table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Provenance {
    pub creator_type: String,
    pub creator_institution: String,
    pub creator_name: String,
    pub creator_email: String,
    pub creator_url: String,
    pub project: String,
    pub license: String,
}

impl Default for Provenance {
    fn default() -> Self {
        Provenance {
            creator_type: String::from("person"),
            creator_institution: String::from("University of Silesia"),
            creator_name: String::from("Łukasz Małarzewski"),
            creator_email: String::from("lukasz.malarzewski@us.edu.pl"),
            creator_url: String::from(
                "https://us.edu.pl/instytut/inoz/en/osoby/malarzewski-lukasz/",
            ),
            project: String::from("CRIOS"),
            license: String::from("https://spdx.org/licenses/CC-BY-4.0 (CC-BY-4.0)"),
        }
    }
}

impl Provenance {
    fn placeholder() -> Self {
        Provenance {
            creator_type: PLACEHOLDER_TEXT.to_string(),
            creator_institution: PLACEHOLDER_TEXT.to_string(),
            creator_name: PLACEHOLDER_TEXT.to_string(),
            creator_email: PLACEHOLDER_TEXT.to_string(),
            creator_url: PLACEHOLDER_TEXT.to_string(),
            project: PLACEHOLDER_TEXT.to_string(),
            license: PLACEHOLDER_TEXT.to_string(),
        }
    }
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SSZ`, dropping any sub-second part.
pub fn format_utc_seconds(value: OffsetDateTime) -> Result<String, PipelineError> {
    let whole_seconds = value
        .to_offset(time::UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| PipelineError::Encoding(format!("invalid timestamp: {}", e)))?;
    Ok(whole_seconds.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
    ))?)
}

#[derive(Clone, Debug, Default)]
pub struct MetadataComposer {
    profile: MetadataProfile,
    provenance: Provenance,
}

impl MetadataComposer {
    pub fn new(profile: MetadataProfile, provenance: Provenance) -> Self {
        MetadataComposer {
            profile,
            provenance,
        }
    }

    /// Builds the CF/ACDD global attribute block for one station file.
    pub fn compose(
        &self,
        station_id: &str,
        position: StationPosition,
        time_axis: &[OffsetDateTime],
        created_at: OffsetDateTime,
    ) -> Result<Attributes, PipelineError> {
        let (first, last) = match (time_axis.first(), time_axis.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(PipelineError::StructuralMismatch(String::from(
                    "cannot derive time coverage from an empty axis",
                )))
            }
        };
        let created = format_utc_seconds(created_at)?;
        let provenance = match self.profile {
            MetadataProfile::Complete => self.provenance.clone(),
            MetadataProfile::Placeholder => Provenance::placeholder(),
        };
        let lat = position.lat.to_string();
        let lon = position.lon.to_string();

        let mut attrs = Attributes::default();
        attrs.insert("title", format!("Measurement data from {} station", station_id));
        attrs.insert("summary", SUMMARY);
        attrs.insert("keywords", KEYWORDS.join(","));
        attrs.insert("keywords_vocabulary", "GCMD Science Keywords");
        attrs.insert("geospatial_lat_min", lat.clone());
        attrs.insert("geospatial_lat_max", lat);
        attrs.insert("geospatial_lon_min", lon.clone());
        attrs.insert("geospatial_lon_max", lon);
        attrs.insert("time_coverage_start", format_utc_seconds(first)?);
        attrs.insert("time_coverage_end", format_utc_seconds(last)?);
        attrs.insert("Conventions", "CF-1.11, ACDD-1.3");
        attrs.insert("history", format!("{}, created file.", created));
        attrs.insert("date_created", created);
        attrs.insert("creator_type", provenance.creator_type);
        attrs.insert("creator_institution", provenance.creator_institution);
        attrs.insert("creator_name", provenance.creator_name);
        attrs.insert("creator_email", provenance.creator_email);
        attrs.insert("creator_url", provenance.creator_url);
        attrs.insert("project", provenance.project);
        attrs.insert("license", provenance.license);
        attrs.insert("iso_topic_category", "climatologyMeteorologyAtmosphere");
        attrs.insert("activity_type", "In Situ Land-based station");
        attrs.insert("operational_status", "Not available");
        attrs.insert("featureType", "timeSeries");
        Ok(attrs)
    }
}
