use slog::{debug, info, Logger};
use spice_netcdf_core::ensure_parent_dir;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    AttrValue, Attributes, DataVariable, OutputDataset, PipelineError, StorageType,
    FILL_VALUE_ATTR, TIME_DIM,
};

/// Sink that turns an assembled dataset into a file at `path`.
pub trait DatasetWriter: Send + Sync {
    fn write(&self, dataset: &OutputDataset, path: &Path) -> Result<(), PipelineError>;
}

/// Temporary sibling of the destination, removed on drop unless committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn beside(target: &Path) -> Result<Self, PipelineError> {
        let file_name = target.file_name().ok_or_else(|| {
            PipelineError::Encoding(format!("{} is not a file path", target.display()))
        })?;
        let path = target.with_file_name(format!(".{}.partial", file_name.to_string_lossy()));
        Ok(PartialFile {
            path,
            committed: false,
        })
    }

    fn commit(mut self, target: &Path) -> Result<(), PipelineError> {
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

pub struct NetcdfWriter {
    logger: Logger,
}

impl NetcdfWriter {
    pub fn new(logger: Logger) -> Self {
        NetcdfWriter { logger }
    }
}

impl DatasetWriter for NetcdfWriter {
    /// Writes into a temporary file and renames it over `path` only once
    /// the netCDF handle is closed, so `path` is never left half written.
    fn write(&self, dataset: &OutputDataset, path: &Path) -> Result<(), PipelineError> {
        ensure_parent_dir(path)?;
        let partial = PartialFile::beside(path)?;
        debug!(self.logger, "writing to temporary file {}", partial.path.display());

        write_netcdf(dataset, &partial.path)?;
        partial.commit(path)?;

        info!(
            self.logger,
            "wrote {} time steps to {}",
            dataset.time.len(),
            path.display()
        );
        Ok(())
    }
}

fn write_netcdf(dataset: &OutputDataset, path: &Path) -> Result<(), PipelineError> {
    let time = dataset.encode_time()?;
    let steps = time.offsets.len();

    let mut file = netcdf::create(path)?;
    if dataset.encoding.is_unlimited(TIME_DIM) {
        file.add_unlimited_dimension(TIME_DIM)?;
    } else {
        file.add_dimension(TIME_DIM, steps)?;
    }

    match dataset.encoding.storage_type(TIME_DIM) {
        Some(StorageType::Int32) => {
            let mut var = file.add_variable::<i32>(TIME_DIM, &[TIME_DIM])?;
            put_attributes(&mut var, &dataset.time_attributes)?;
            var.put_attribute("units", time.units.as_str())?;
            var.put_attribute("calendar", "proleptic_gregorian")?;
            var.put_values(&time.offsets, (0..steps,))?;
        }
        other => {
            return Err(PipelineError::Encoding(format!(
                "time must be declared int32, found {:?}",
                other
            )))
        }
    }

    for variable in &dataset.variables {
        match dataset.encoding.storage_type(&variable.name) {
            Some(StorageType::Float32) => put_float_variable(&mut file, variable)?,
            other => {
                return Err(PipelineError::Encoding(format!(
                    "{} must be declared float32, found {:?}",
                    variable.name, other
                )))
            }
        }
    }

    for (name, value) in dataset.global_attributes.iter() {
        match value {
            AttrValue::Text(text) => file.add_attribute(name, text.as_str())?,
            AttrValue::Float(number) => file.add_attribute(name, *number)?,
        };
    }

    // handle is closed here, before the caller renames the file
    drop(file);
    Ok(())
}

fn put_float_variable(
    file: &mut netcdf::FileMut,
    variable: &DataVariable,
) -> Result<(), PipelineError> {
    let dims: Vec<&str> = variable.dims.iter().map(String::as_str).collect();
    let values: Vec<f32> = variable.values.iter().map(|v| *v as f32).collect();

    let mut var = file.add_variable::<f32>(&variable.name, &dims)?;
    if let Some(fill) = variable.fill_value() {
        var.set_fill_value(fill as f32)?;
    }
    put_attributes(&mut var, &variable.attributes)?;

    if dims.is_empty() {
        var.put_values(&values, ..)?;
    } else {
        var.put_values(&values, (0..values.len(),))?;
    }
    Ok(())
}

fn put_attributes(
    var: &mut netcdf::VariableMut<'_>,
    attributes: &Attributes,
) -> Result<(), PipelineError> {
    for (name, value) in attributes.iter() {
        match value {
            // declared through set_fill_value so the type matches the variable
            AttrValue::Float(_) if name == FILL_VALUE_ATTR => continue,
            AttrValue::Text(text) => var.put_attribute(name, text.as_str())?,
            AttrValue::Float(number) => var.put_attribute(name, *number)?,
        };
    }
    Ok(())
}
