use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Placeholder coordinate for stations that are not operational yet.
pub const UNKNOWN_COORDINATE: f64 = -999.0;

/// How a station's position is obtained.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "positioning", rename_all = "lowercase")]
pub enum Positioning {
    /// Surveyed location, never read from the payload
    Fixed { lat: f64, lon: f64 },
    /// Position fixes reported alongside the measurements
    Gps,
}

/// Station id to positioning capability, built once at startup.
#[derive(Clone, Debug)]
pub struct StationTable {
    stations: BTreeMap<String, Positioning>,
}

impl Default for StationTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StationTable {
    pub fn builtin() -> Self {
        let stations = [
            ("SPICE34", 77.08636, 15.62725),
            ("SPICE35", 77.06198, 15.20614),
            ("SPICE36", 78.6765, 12.0399),
            // not installed yet
            ("SPICE37", UNKNOWN_COORDINATE, UNKNOWN_COORDINATE),
            ("SPICE38", 77.51715, 14.39992),
        ]
        .into_iter()
        .map(|(id, lat, lon)| (id.to_string(), Positioning::Fixed { lat, lon }))
        .collect();

        StationTable { stations }
    }

    /// Adds or replaces entries, e.g. from the `[stations]` config table.
    pub fn with_overrides(mut self, overrides: HashMap<String, Positioning>) -> Self {
        self.stations.extend(overrides);
        self
    }

    pub fn get(&self, station_id: &str) -> Option<&Positioning> {
        self.stations.get(station_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stations.keys().map(String::as_str)
    }
}
