use {
    crate::{
        bus::DEFAULT_BUS,
        error::ConfigError,
        registry::{self, Module},
        schema::{Field, FieldType, Schema},
    },
    serde::Deserialize,
    serde_yaml::{Mapping, Value},
    std::{collections::HashSet, fs, path::Path, time::Duration},
};

const DEFAULT_CLIENT_ID: &str = "sensor-gateway";
const DEFAULT_INTERVAL: u64 = 60;
const DEFAULT_DIGITS: u64 = 2;
// an f32 carries no more than this many meaningful decimals
const MAX_DIGITS: u64 = 15;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub sensor_modules: Vec<Mapping>,
    #[serde(default)]
    pub sensor_inputs: Vec<Mapping>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: Option<String>,
    pub topic_prefix: Option<String>,
    /// Seconds.
    pub keep_alive: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            host: "localhost".to_string(),
            port: 1883,
            client_id: None,
            topic_prefix: None,
            keep_alive: 5,
        }
    }
}

impl MqttConfig {
    /// Applies `MQTT_ADDR` and `MQTT_PORT`, and falls back to `BALENA_DEVICE_UUID` for the
    /// client id when the file does not set one.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("MQTT_ADDR") {
            self.host = host;
        }
        if let Some(port) = var("MQTT_PORT") {
            self.port = port.parse().map_err(|_| {
                ConfigError::invalid("MQTT_PORT", format!("'{}' is not a port number", port))
            })?;
        }
        if self.client_id.is_none() {
            self.client_id = var("BALENA_DEVICE_UUID");
        }
        Ok(())
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID)
    }

    pub fn topic_prefix(&self) -> &str {
        self.topic_prefix.as_deref().unwrap_or_else(|| self.client_id())
    }
}

pub struct ModuleEntry {
    pub name: String,
    pub module: &'static Module,
    pub bus: String,
    /// The section with every default applied.
    pub config: Mapping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEntry {
    pub name: String,
    /// Name of the module entry to read from.
    pub module: String,
    pub kind: String,
    pub interval: Duration,
    pub digits: usize,
}

pub struct Plan {
    pub modules: Vec<ModuleEntry>,
    pub inputs: Vec<InputEntry>,
}

fn module_schema() -> Schema {
    Schema::new()
        .field(Field::new("name", FieldType::String).required())
        .field(Field::new("module", FieldType::String).required())
        .field(Field::new("bus", FieldType::String).default_value(DEFAULT_BUS))
}

fn input_schema() -> Schema {
    Schema::new()
        .field(Field::new("name", FieldType::String).required())
        .field(Field::new("module", FieldType::String).required())
        .field(Field::new("interval", FieldType::Integer).default_value(DEFAULT_INTERVAL))
        .field(Field::new("digits", FieldType::Integer).default_value(DEFAULT_DIGITS))
}

fn string(resolved: &Mapping, key: &str) -> String {
    resolved
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Config::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Checks every section against the schemas of the module it names. Nothing here
    /// touches hardware.
    pub fn validate(&self) -> Result<Plan, ConfigError> {
        let mut modules: Vec<ModuleEntry> = Vec::new();
        for (i, section) in self.sensor_modules.iter().enumerate() {
            let label = format!("sensor_modules[{}]", i);
            let module = section
                .get("module")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ConfigError::invalid(&label, "'module' must name a sensor module")
                })?;
            let module = registry::lookup(module).ok_or_else(|| {
                ConfigError::invalid(
                    &label,
                    format!(
                        "unknown module '{}', expected one of {}",
                        module,
                        registry::names().join(", ")
                    ),
                )
            })?;

            let config = module_schema()
                .extend((module.config_schema)())
                .validate(&label, section)?;
            let name = string(&config, "name");
            if modules.iter().any(|m| m.name == name) {
                return Err(ConfigError::invalid(
                    &label,
                    format!("duplicate module name '{}'", name),
                ));
            }

            modules.push(ModuleEntry {
                name,
                module,
                bus: string(&config, "bus"),
                config,
            });
        }

        let mut inputs = Vec::new();
        let mut names = HashSet::new();
        for (i, section) in self.sensor_inputs.iter().enumerate() {
            let label = format!("sensor_inputs[{}]", i);
            let target = section
                .get("module")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ConfigError::invalid(&label, "'module' must name a sensor module entry")
                })?;
            let entry = modules.iter().find(|m| m.name == target).ok_or_else(|| {
                ConfigError::invalid(&label, format!("no sensor module named '{}'", target))
            })?;

            let resolved = input_schema()
                .extend((entry.module.sensor_schema)())
                .validate(&label, section)?;
            let name = string(&resolved, "name");
            if !names.insert(name.clone()) {
                return Err(ConfigError::invalid(
                    &label,
                    format!("duplicate input name '{}'", name),
                ));
            }

            let interval = resolved
                .get("interval")
                .and_then(Value::as_u64)
                .filter(|&secs| secs > 0)
                .ok_or_else(|| {
                    ConfigError::invalid(&label, "'interval' must be a positive number of seconds")
                })?;
            let digits = resolved
                .get("digits")
                .and_then(Value::as_u64)
                .ok_or_else(|| ConfigError::invalid(&label, "'digits' must not be negative"))?;
            if digits > MAX_DIGITS {
                return Err(ConfigError::invalid(
                    &label,
                    format!("'digits' must be at most {}", MAX_DIGITS),
                ));
            }

            inputs.push(InputEntry {
                name,
                module: entry.name.clone(),
                kind: string(&resolved, "type"),
                interval: Duration::from_secs(interval),
                digits: digits as usize,
            });
        }

        Ok(Plan { modules, inputs })
    }
}
