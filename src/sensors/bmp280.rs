use {
    crate::{
        devices::bmp280::{Bmp280, ALTERNATE_ADDRESS, DEFAULT_ADDRESS},
        error::{ReadError, SetupError},
        schema::{Field, FieldType, Schema},
        sensors::{Kind, Measurement, ReadingRequest, Sensor, Unit},
    },
    embedded_hal::blocking::{
        delay::DelayMs,
        i2c::{Write, WriteRead},
    },
    log::debug,
    serde::Deserialize,
    std::fmt::Debug,
};

pub use crate::devices::bmp280::{altitude, DEFAULT_SEA_LEVEL_PRESSURE};

kinds! {
    pub enum Bmp280Kind {
        Pressure => ("pressure", Unit::Hectopascal),
        Temperature => ("temperature", Unit::Celsius),
        Altitude => ("altitude", Unit::Metre),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Bmp280Config {
    /// hPa, reference for altitude readings.
    pub sea_level_pressure: f32,
    pub address: u8,
}

impl Default for Bmp280Config {
    fn default() -> Self {
        Bmp280Config {
            sea_level_pressure: DEFAULT_SEA_LEVEL_PRESSURE,
            address: DEFAULT_ADDRESS,
        }
    }
}

impl<I2C, D, E> Sensor for Bmp280<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u8>,
    E: Debug,
{
    const MODULE: &'static str = "bmp280";

    type Kind = Bmp280Kind;
    type Config = Bmp280Config;
    type I2c = I2C;
    type Delay = D;

    fn default_kind() -> Bmp280Kind {
        Bmp280Kind::Pressure
    }

    fn setup(i2c: I2C, delay: D, config: &Bmp280Config) -> Result<Self, SetupError> {
        let mut sensor = Bmp280::new(i2c, delay, config.address).map_err(|e| {
            SetupError::DeviceNotResponding {
                device: "BMP280",
                address: config.address,
                reason: format!("{:?}", e),
            }
        })?;
        sensor.set_sea_level_pressure(config.sea_level_pressure);
        debug!(
            "BMP280 at {:#04x}, sea level pressure {} hPa",
            config.address, config.sea_level_pressure
        );

        Ok(sensor)
    }

    fn read(&mut self, request: &ReadingRequest<Bmp280Kind>) -> Result<Measurement, ReadError> {
        let value = match request.kind {
            Bmp280Kind::Pressure => self.pressure(),
            Bmp280Kind::Temperature => self.temperature(),
            Bmp280Kind::Altitude => self.altitude(),
        }
        .map_err(|e| request.fault(e))?;

        let unit = request.kind.unit();
        Ok(value.map_or(Measurement::unavailable(unit), |v| Measurement::new(v, unit)))
    }

    fn config_schema() -> Schema {
        Schema::new()
            .field(
                Field::new("sea_level_pressure", FieldType::Float)
                    .default_value(f64::from(DEFAULT_SEA_LEVEL_PRESSURE)),
            )
            .field(
                Field::new("address", FieldType::Integer)
                    .default_value(DEFAULT_ADDRESS)
                    .allowed([DEFAULT_ADDRESS, ALTERNATE_ADDRESS]),
            )
    }
}
