use {
    crate::{
        bus,
        devices::{bmp280::Bmp280, htu21d::Htu21d},
        error::SetupError,
        schema::Schema,
        sensors::{DynSensor, Kind, Sensor},
    },
    linux_embedded_hal::{Delay, I2cdev},
    serde_yaml::{Mapping, Value},
};

pub type LinuxBmp280 = Bmp280<I2cdev, Delay>;
pub type LinuxHtu21d = Htu21d<I2cdev, Delay>;

pub struct Module {
    pub name: &'static str,
    pub kinds: fn() -> Vec<&'static str>,
    /// Module specific keys of a `sensor_modules` entry.
    pub config_schema: fn() -> Schema,
    /// Module specific keys of a `sensor_inputs` entry.
    pub sensor_schema: fn() -> Schema,
    pub setup: fn(&str, &Mapping) -> Result<Box<dyn DynSensor>, SetupError>,
}

pub static MODULES: &[Module] = &[
    Module {
        name: <LinuxBmp280 as Sensor>::MODULE,
        kinds: kinds::<LinuxBmp280>,
        config_schema: <LinuxBmp280 as Sensor>::config_schema,
        sensor_schema: <LinuxBmp280 as Sensor>::sensor_schema,
        setup: setup::<LinuxBmp280>,
    },
    Module {
        name: <LinuxHtu21d as Sensor>::MODULE,
        kinds: kinds::<LinuxHtu21d>,
        config_schema: <LinuxHtu21d as Sensor>::config_schema,
        sensor_schema: <LinuxHtu21d as Sensor>::sensor_schema,
        setup: setup::<LinuxHtu21d>,
    },
];

pub fn lookup(name: &str) -> Option<&'static Module> {
    MODULES.iter().find(|m| m.name == name)
}

pub fn names() -> Vec<&'static str> {
    MODULES.iter().map(|m| m.name).collect()
}

fn kinds<S: Sensor>() -> Vec<&'static str> {
    S::declared_kinds().iter().map(|k| k.as_str()).collect()
}

fn setup<S>(path: &str, section: &Mapping) -> Result<Box<dyn DynSensor>, SetupError>
where
    S: Sensor<I2c = I2cdev, Delay = Delay> + Send + 'static,
{
    let config: S::Config =
        serde_yaml::from_value(Value::Mapping(section.clone())).map_err(|e| {
            SetupError::InvalidConfig {
                module: S::MODULE.to_string(),
                reason: e.to_string(),
            }
        })?;

    let i2c = bus::open(path)?;
    let sensor = S::setup(i2c, Delay, &config)?;

    Ok(Box::new(sensor))
}
