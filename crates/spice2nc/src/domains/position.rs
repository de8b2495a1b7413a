use crate::{PipelineError, Positioning, RawObservationPayload, Sample};

/// Single location written for the whole file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StationPosition {
    pub lat: f64,
    pub lon: f64,
}

/// Chooses between the surveyed table entry and the payload's own position fixes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PositionResolver {
    FixedLookup(StationPosition),
    WeightedAverage,
}

impl From<&Positioning> for PositionResolver {
    fn from(positioning: &Positioning) -> Self {
        match positioning {
            Positioning::Fixed { lat, lon } => PositionResolver::FixedLookup(StationPosition {
                lat: *lat,
                lon: *lon,
            }),
            Positioning::Gps => PositionResolver::WeightedAverage,
        }
    }
}

impl PositionResolver {
    pub fn resolve(&self, payload: &RawObservationPayload) -> Result<StationPosition, PipelineError> {
        match self {
            // -999/-999 placeholders pass through untouched
            PositionResolver::FixedLookup(position) => Ok(*position),
            PositionResolver::WeightedAverage => {
                let lats = position_values(payload.latitude.as_deref(), "latitude")?;
                let lons = position_values(payload.longitude.as_deref(), "longitude")?;
                let ceps = position_values(payload.cep.as_deref(), "cep")?;
                weighted_position(&lats, &lons, &ceps)
            }
        }
    }
}

fn position_values(samples: Option<&[Sample]>, name: &str) -> Result<Vec<f64>, PipelineError> {
    let samples = samples.ok_or_else(|| {
        PipelineError::StructuralMismatch(format!("position series {} missing from payload", name))
    })?;
    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            sample.v.ok_or_else(|| {
                PipelineError::StructuralMismatch(format!("position series {} has a gap at {}", name, i))
            })
        })
        .collect()
}

/// Normalised inverse-CEP weights: a fix twice as precise counts twice as much.
pub fn inverse_cep_weights(ceps: &[f64]) -> Result<Vec<f64>, PipelineError> {
    if ceps.is_empty() {
        return Err(PipelineError::StructuralMismatch(String::from(
            "no position fixes to average",
        )));
    }
    if let Some(bad) = ceps.iter().find(|cep| !cep.is_finite() || **cep <= 0.0) {
        return Err(PipelineError::DegenerateWeighting(format!(
            "accuracy radius {} cannot be inverted",
            bad
        )));
    }

    let inverse: Vec<f64> = ceps.iter().map(|cep| 1.0 / cep).collect();
    let total: f64 = inverse.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(PipelineError::DegenerateWeighting(format!(
            "inverse radii sum to {}",
            total
        )));
    }

    Ok(inverse.into_iter().map(|w| w / total).collect())
}

pub fn weighted_position(
    lats: &[f64],
    lons: &[f64],
    ceps: &[f64],
) -> Result<StationPosition, PipelineError> {
    if lats.len() != lons.len() || lats.len() != ceps.len() {
        return Err(PipelineError::StructuralMismatch(format!(
            "position series lengths differ: latitude {}, longitude {}, cep {}",
            lats.len(),
            lons.len(),
            ceps.len()
        )));
    }

    let weights = inverse_cep_weights(ceps)?;
    let mean = |values: &[f64]| -> f64 {
        values
            .iter()
            .zip(&weights)
            .map(|(value, weight)| value * weight)
            .sum()
    };

    Ok(StationPosition {
        lat: round_to_hundredths(mean(lats)),
        lon: round_to_hundredths(mean(lons)),
    })
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
