use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("I2C bus {path} is unavailable: {reason}")]
    BusUnavailable { path: String, reason: String },

    #[error("{device} is not responding at address {address:#04x}: {reason}")]
    DeviceNotResponding {
        device: &'static str,
        address: u8,
        reason: String,
    },

    #[error("invalid configuration for {module} module: {reason}")]
    InvalidConfig { module: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("sensor '{sensor}' was not configured to return '{kind}', expected one of {expected}")]
    UnsupportedKind {
        sensor: String,
        kind: String,
        expected: String,
    },

    #[error("sensor '{sensor}' failed to read {kind}: {reason}")]
    HardwareFault {
        sensor: String,
        kind: &'static str,
        reason: String,
    },
}

impl ReadError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReadError::HardwareFault { .. })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{section}: {reason}")]
    Invalid { section: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(section: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            section: section.into(),
            reason: reason.into(),
        }
    }
}
