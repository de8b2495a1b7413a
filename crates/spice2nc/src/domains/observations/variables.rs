use std::fmt;

/// The four physical quantities every SPICE station reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    SurfaceSnowThickness,
    AirTemperature,
    RelativeHumidity,
    AirPressure,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [
        Quantity::SurfaceSnowThickness,
        Quantity::AirTemperature,
        Quantity::RelativeHumidity,
        Quantity::AirPressure,
    ];

    /// CF standard name, also the payload key and the netCDF variable name
    pub fn standard_name(&self) -> &'static str {
        match self {
            Quantity::SurfaceSnowThickness => "surface_snow_thickness",
            Quantity::AirTemperature => "air_temperature",
            Quantity::RelativeHumidity => "relative_humidity",
            Quantity::AirPressure => "air_pressure",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Quantity::SurfaceSnowThickness => "snow thickness measured at station",
            Quantity::AirTemperature => "air temperature measured at station",
            Quantity::RelativeHumidity => "relative humidity measured at station",
            Quantity::AirPressure => "air pressure measured at station",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.standard_name())
    }
}
