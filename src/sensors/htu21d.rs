use {
    crate::{
        devices::htu21d::{Htu21d, ADDRESS},
        error::{ReadError, SetupError},
        sensors::{Kind, Measurement, ReadingRequest, Sensor, Unit},
    },
    embedded_hal::blocking::{
        delay::DelayMs,
        i2c::{Read, Write, WriteRead},
    },
    serde::Deserialize,
    std::fmt::Debug,
};

kinds! {
    pub enum Htu21dKind {
        Humidity => ("humidity", Unit::Percent),
        Temperature => ("temperature", Unit::Celsius),
    }
}

/// The HTU21D has a fixed address and nothing to configure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Htu21dConfig {}

impl<I2C, D, E> Sensor for Htu21d<I2C, D>
where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u8>,
    E: Debug,
{
    const MODULE: &'static str = "htu21d";

    type Kind = Htu21dKind;
    type Config = Htu21dConfig;
    type I2c = I2C;
    type Delay = D;

    fn default_kind() -> Htu21dKind {
        Htu21dKind::Humidity
    }

    fn setup(i2c: I2C, delay: D, _config: &Htu21dConfig) -> Result<Self, SetupError> {
        Htu21d::new(i2c, delay).map_err(|e| SetupError::DeviceNotResponding {
            device: "HTU21D",
            address: ADDRESS,
            reason: format!("{:?}", e),
        })
    }

    fn read(&mut self, request: &ReadingRequest<Htu21dKind>) -> Result<Measurement, ReadError> {
        let value = match request.kind {
            Htu21dKind::Humidity => self.relative_humidity(),
            Htu21dKind::Temperature => self.temperature(),
        }
        .map_err(|e| request.fault(e))?;

        Ok(Measurement::new(value, request.kind.unit()))
    }
}
