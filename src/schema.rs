use {
    crate::error::ConfigError,
    serde_yaml::{Mapping, Value},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub allowed: Option<Vec<Value>>,
}

impl Field {
    pub fn new(key: &'static str, ty: FieldType) -> Self {
        Field {
            key,
            ty,
            required: false,
            default: None,
            allowed: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allowed<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Type checks a value, widening integers where a float is expected.
    fn check(&self, section: &str, value: &Value) -> Result<Value, ConfigError> {
        let checked = match (self.ty, value) {
            (FieldType::String, Value::String(s)) if s.is_empty() => {
                return Err(ConfigError::invalid(
                    section,
                    format!("'{}' must not be empty", self.key),
                ))
            }
            (FieldType::String, Value::String(_)) => value.clone(),
            (FieldType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => value.clone(),
            (FieldType::Float, Value::Number(n)) => match n.as_f64() {
                Some(f) => Value::from(f),
                None => value.clone(),
            },
            _ => {
                return Err(ConfigError::invalid(
                    section,
                    format!("'{}' must be of type {}", self.key, self.ty),
                ))
            }
        };

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&checked) {
                return Err(ConfigError::invalid(
                    section,
                    format!(
                        "unallowed value {} for '{}', expected one of {}",
                        render(&checked),
                        self.key,
                        allowed.iter().map(render).collect::<Vec<_>>().join(", ")
                    ),
                ));
            }
        }

        Ok(checked)
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.retain(|f| f.key != field.key);
        self.fields.push(field);
        self
    }

    /// Adds every field of `other`, replacing fields with the same key.
    pub fn extend(self, other: Schema) -> Self {
        other.fields.into_iter().fold(self, Schema::field)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Checks `entry` and returns it with defaults applied. Unknown keys are rejected.
    pub fn validate(&self, section: &str, entry: &Mapping) -> Result<Mapping, ConfigError> {
        for key in entry.keys() {
            let known = key.as_str().map_or(false, |k| self.get(k).is_some());
            if !known {
                return Err(ConfigError::invalid(
                    section,
                    format!("unknown key {}", render(key)),
                ));
            }
        }

        let mut resolved = Mapping::new();
        for field in &self.fields {
            let value = match (entry.get(field.key), &field.default) {
                (Some(value), _) => field.check(section, value)?,
                (None, Some(default)) => default.clone(),
                (None, None) if field.required => {
                    return Err(ConfigError::invalid(
                        section,
                        format!("required key '{}' is missing", field.key),
                    ))
                }
                (None, None) => continue,
            };
            resolved.insert(Value::from(field.key), value);
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .field(Field::new("name", FieldType::String).required())
            .field(Field::new("sea_level_pressure", FieldType::Float).default_value(1021.2))
            .field(
                Field::new("type", FieldType::String)
                    .default_value("pressure")
                    .allowed(["pressure", "temperature"]),
            )
    }

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn applies_defaults() {
        let resolved = schema().validate("test", &mapping("name: outside")).unwrap();

        assert_eq!(resolved.get("name"), Some(&Value::from("outside")));
        assert_eq!(resolved.get("sea_level_pressure"), Some(&Value::from(1021.2)));
        assert_eq!(resolved.get("type"), Some(&Value::from("pressure")));
    }

    #[test]
    fn keeps_supplied_values() {
        let resolved = schema()
            .validate(
                "test",
                &mapping("{name: outside, sea_level_pressure: 1013.25, type: temperature}"),
            )
            .unwrap();

        assert_eq!(resolved.get("sea_level_pressure"), Some(&Value::from(1013.25)));
        assert_eq!(resolved.get("type"), Some(&Value::from("temperature")));
    }

    #[test]
    fn widens_integers_to_floats() {
        let resolved = schema()
            .validate("test", &mapping("{name: outside, sea_level_pressure: 1013}"))
            .unwrap();

        assert_eq!(resolved.get("sea_level_pressure"), Some(&Value::from(1013.0)));
    }

    #[test]
    fn rejects_bad_entries() {
        let cases = [
            ("sea_level_pressure: 1013.25", "required key 'name' is missing"),
            ("{name: outside, type: bogus}", "unallowed value 'bogus' for 'type'"),
            ("{name: outside, sea_level_pressure: high}", "must be of type float"),
            ("{name: ''}", "'name' must not be empty"),
            ("{name: outside, interval: 5}", "unknown key 'interval'"),
        ];

        for (yaml, message) in cases {
            let err = schema().validate("test", &mapping(yaml)).unwrap_err();
            assert!(err.to_string().contains(message), "{}: {}", yaml, err);
        }
    }

    #[test]
    fn extend_replaces_fields() {
        let base = Schema::new().field(Field::new("type", FieldType::String));
        let merged = base.extend(schema());

        assert_eq!(merged.fields().len(), 3);
        assert_eq!(
            merged.get("type").unwrap().default,
            Some(Value::from("pressure"))
        );
    }
}
