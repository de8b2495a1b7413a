use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::{PipelineError, StationPosition, VariableSeries};

pub const TIME_DIM: &str = "time";
pub const FILL_VALUE_ATTR: &str = "_FillValue";

#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Text(String),
    Float(f64),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

/// Insertion-ordered attribute list; re-inserting a name replaces its value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(Vec<(String, AttrValue)>);

impl Attributes {
    pub fn insert(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(AttrValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageType {
    Float32,
    Int32,
}

/// On-disk representation requested from the writer.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoding {
    storage: BTreeMap<String, StorageType>,
    unlimited_dims: Vec<String>,
}

impl Encoding {
    /// Time as int32 seconds on a growable axis, everything else float32.
    pub fn declare<'a>(variable_names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut storage: BTreeMap<String, StorageType> = variable_names
            .into_iter()
            .map(|name| (name.to_string(), StorageType::Float32))
            .collect();
        storage.insert(TIME_DIM.to_string(), StorageType::Int32);

        Encoding {
            storage,
            unlimited_dims: vec![TIME_DIM.to_string()],
        }
    }

    pub fn storage_type(&self, name: &str) -> Option<StorageType> {
        self.storage.get(name).copied()
    }

    pub fn is_unlimited(&self, dim: &str) -> bool {
        self.unlimited_dims.iter().any(|d| d == dim)
    }

    pub fn storage(&self) -> impl Iterator<Item = (&str, StorageType)> {
        self.storage.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

/// A data variable: dimensioned by time, or scalar when `dims` is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub values: Vec<f64>,
    pub attributes: Attributes,
}

impl DataVariable {
    pub fn fill_value(&self) -> Option<f64> {
        match self.attributes.get(FILL_VALUE_ATTR) {
            Some(AttrValue::Float(fill)) => Some(*fill),
            _ => None,
        }
    }
}

impl From<VariableSeries> for DataVariable {
    fn from(series: VariableSeries) -> Self {
        let mut attributes = Attributes::default();
        attributes.insert("long_name", series.long_name());
        attributes.insert("standard_name", series.name());
        if let Some(units) = series.units {
            attributes.insert("units", units);
        }
        attributes.insert("coverage_content_type", "physicalMeasurement");
        if let Some(fill) = series.fill_value {
            attributes.insert(FILL_VALUE_ATTR, fill);
        }

        DataVariable {
            name: series.quantity.standard_name().to_string(),
            dims: vec![TIME_DIM.to_string()],
            values: series.values,
            attributes,
        }
    }
}

/// Time offsets as they go to disk.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEncoding {
    pub units: String,
    pub offsets: Vec<i32>,
}

/// Everything one output file holds, ready for a [`crate::DatasetWriter`].
#[derive(Clone, Debug, PartialEq)]
pub struct OutputDataset {
    pub time: Vec<OffsetDateTime>,
    pub time_attributes: Attributes,
    pub variables: Vec<DataVariable>,
    pub global_attributes: Attributes,
    pub encoding: Encoding,
}

impl OutputDataset {
    pub fn new(
        series: Vec<VariableSeries>,
        position: StationPosition,
        global_attributes: Attributes,
    ) -> Result<Self, PipelineError> {
        let time = series
            .first()
            .map(|first| first.times.clone())
            .ok_or_else(|| PipelineError::StructuralMismatch(String::from("no variables")))?;

        let mut variables: Vec<DataVariable> = series.into_iter().map(DataVariable::from).collect();
        variables.push(coordinate("lat", position.lat, "degree_north", "latitude"));
        variables.push(coordinate("lon", position.lon, "degree_east", "longitude"));

        let mut time_attributes = Attributes::default();
        time_attributes.insert("standard_name", "time");
        time_attributes.insert("long_name", "time of observation");

        let encoding = Encoding::declare(variables.iter().map(|v| v.name.as_str()));

        Ok(OutputDataset {
            time,
            time_attributes,
            variables,
            global_attributes,
            encoding,
        })
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Whole seconds since the first observation, as int32.
    pub fn encode_time(&self) -> Result<TimeEncoding, PipelineError> {
        let origin = self
            .time
            .first()
            .copied()
            .ok_or_else(|| PipelineError::Encoding(String::from("empty time axis")))?;
        let origin = origin
            .replace_nanosecond(0)
            .map_err(|e| PipelineError::Encoding(e.to_string()))?;

        let offsets = self
            .time
            .iter()
            .map(|t| {
                let seconds = t.unix_timestamp() - origin.unix_timestamp();
                i32::try_from(seconds).map_err(|_| {
                    PipelineError::Encoding(format!("{} is out of int32 range from {}", t, origin))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let units = format!(
            "seconds since {}",
            origin.format(time::macros::format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))?
        );
        Ok(TimeEncoding { units, offsets })
    }
}

fn coordinate(name: &str, value: f64, units: &str, standard_name: &str) -> DataVariable {
    let mut attributes = Attributes::default();
    attributes.insert("units", units);
    attributes.insert("standard_name", standard_name);
    DataVariable {
        name: name.to_string(),
        dims: Vec::new(),
        values: vec![value],
        attributes,
    }
}
