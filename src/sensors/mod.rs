use {
    crate::{
        error::{ReadError, SetupError},
        schema::{Field, FieldType, Schema},
    },
    serde::de::DeserializeOwned,
    std::fmt,
};

// Closed set of kinds a module can be asked for, with the configured name and unit of each.
macro_rules! kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => ($text:literal, $unit:expr)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::sensors::Kind for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            fn unit(self) -> $crate::sensors::Unit {
                match self {
                    $($name::$variant => $unit),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::sensors::Kind::as_str(*self))
            }
        }
    };
}

pub mod bmp280;
pub mod htu21d;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Hectopascal,
    Metre,
    Percent,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Unit::Celsius => "°C",
            Unit::Hectopascal => "hPa",
            Unit::Metre => "m",
            Unit::Percent => "%",
        };
        f.write_str(symbol)
    }
}

pub trait Kind: Copy + Eq + fmt::Display + Send + 'static {
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    fn unit(self) -> Unit;

    fn parse(kind: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == kind)
    }

    /// `'a', 'b' or 'c'`, for error messages.
    fn describe_all() -> String {
        let quoted = Self::ALL
            .iter()
            .map(|k| format!("'{}'", k.as_str()))
            .collect::<Vec<_>>();
        match quoted.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
            _ => quoted.join(""),
        }
    }
}

/// A single reading. `value` is `None` when the chip reported that no valid result is
/// available, which is distinct from a failed transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    value: Option<f32>,
    unit: Unit,
}

impl Measurement {
    pub fn new(value: f32, unit: Unit) -> Self {
        Measurement {
            value: Some(value),
            unit,
        }
    }

    pub fn unavailable(unit: Unit) -> Self {
        Measurement { value: None, unit }
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// The value rounded to `digits` decimal places, as published.
    pub fn format(&self, digits: usize) -> Option<String> {
        self.value.map(|v| format!("{:.*}", digits, v))
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "{} {}", v, self.unit),
            None => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRequest<K> {
    pub kind: K,
    pub name: String,
}

impl<K: Kind> ReadingRequest<K> {
    pub fn new(name: impl Into<String>, kind: K) -> Self {
        ReadingRequest {
            kind,
            name: name.into(),
        }
    }

    pub fn resolve(name: &str, kind: &str) -> Result<Self, ReadError> {
        K::parse(kind)
            .map(|k| ReadingRequest::new(name, k))
            .ok_or_else(|| ReadError::UnsupportedKind {
                sensor: name.to_string(),
                kind: kind.to_string(),
                expected: K::describe_all(),
            })
    }

    pub(crate) fn fault<E: fmt::Debug>(&self, e: E) -> ReadError {
        ReadError::HardwareFault {
            sensor: self.name.clone(),
            kind: self.kind.as_str(),
            reason: format!("{:?}", e),
        }
    }
}

/// Reads block for the whole transaction and are never cached or retried.
pub trait Sensor: Sized {
    const MODULE: &'static str;

    type Kind: Kind;
    type Config: DeserializeOwned + Default;
    type I2c;
    type Delay;

    /// Kind read when an input does not configure one.
    fn default_kind() -> Self::Kind;

    fn setup(i2c: Self::I2c, delay: Self::Delay, config: &Self::Config)
        -> Result<Self, SetupError>;

    fn read(&mut self, request: &ReadingRequest<Self::Kind>) -> Result<Measurement, ReadError>;

    fn declared_kinds() -> &'static [Self::Kind] {
        <Self::Kind as Kind>::ALL
    }

    /// Keys accepted in the module section, besides `name`, `module` and `bus`.
    fn config_schema() -> Schema {
        Schema::new()
    }

    /// Keys accepted in an input reading from this module, besides `name`, `module`,
    /// `interval` and `digits`.
    fn sensor_schema() -> Schema {
        Schema::new().field(
            Field::new("type", FieldType::String)
                .default_value(Self::default_kind().as_str())
                .allowed(Self::declared_kinds().iter().map(|k| k.as_str())),
        )
    }
}

pub trait DynSensor: Send {
    /// Resolves `kind` and reads it. An unknown kind fails before the bus is touched.
    fn dispatch(&mut self, name: &str, kind: &str) -> Result<Measurement, ReadError>;
}

impl<S: Sensor + Send> DynSensor for S {
    fn dispatch(&mut self, name: &str, kind: &str) -> Result<Measurement, ReadError> {
        let request = ReadingRequest::<S::Kind>::resolve(name, kind)?;
        self.read(&request)
    }
}
