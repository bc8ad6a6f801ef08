use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};
use crate::core::{MigrateError, Result};

/// A single column value.
///
/// Serialized untagged so that JSON fixtures read as plain scalars:
/// `null`, `true`, `42`, `1.5`, `"Default"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            // Identifiers exported as strings by some dumps
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Column type of a non-null value.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Integer(_) => Some(DataType::Integer),
            Self::Float(_) => Some(DataType::Float),
            Self::Text(_) => Some(DataType::Text),
        }
    }

    /// Converts the value to `target`, following [`DataType::can_cast_to`].
    pub fn cast_to(&self, target: &DataType) -> Result<Value> {
        let Some(source) = self.data_type() else {
            return Ok(Self::Null);
        };
        if target.is_compatible(self) {
            return Ok(self.clone());
        }
        if !source.can_cast_to(target) {
            return Err(MigrateError::TypeMismatch(format!(
                "Cannot cast {} to {}",
                self.type_name(),
                target
            )));
        }

        match (self, target) {
            (Self::Integer(i), DataType::Float) => Ok(Self::Float(*i as f64)),
            (_, DataType::Text) => Ok(Self::Text(self.to_string())),
            (Self::Text(s), DataType::Integer) => s.trim().parse::<i64>().map(Self::Integer).map_err(|_| {
                MigrateError::TypeMismatch(format!("Cannot cast '{}' to {}", s, target))
            }),
            _ => Err(MigrateError::TypeMismatch(format!(
                "Cannot cast {} to {}",
                self.type_name(),
                target
            ))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

// Float equality is bitwise so that Eq and Hash agree for identity keys.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            Self::Integer(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Self::Float(f) => {
                2u8.hash(state);
                f.to_bits().hash(state);
            }
            Self::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Self::Boolean(b) => {
                4u8.hash(state);
                b.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Self::Integer, Value::Integer(_))
                | (Self::Float, Value::Float(_))
                | (Self::Float, Value::Integer(_))
                | (Self::Text, Value::Text(_))
                | (Self::Boolean, Value::Boolean(_))
        )
    }

    pub fn can_cast_to(&self, other: &DataType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (Self::Integer, Self::Float) => true,
            (Self::Integer, Self::Text) => true,
            (Self::Float, Self::Text) => true,
            (Self::Boolean, Self::Text) => true,
            (Self::Text, Self::Integer) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Float(3.5), Value::Float(3.5));
        assert_ne!(Value::Integer(1), Value::Integer(2));
        assert_ne!(Value::Integer(1), Value::Text("1".into()));
    }

    #[test]
    fn test_type_compatibility() {
        let int_type = DataType::Integer;
        assert!(int_type.is_compatible(&Value::Integer(42)));
        assert!(int_type.is_compatible(&Value::Null));
        assert!(!int_type.is_compatible(&Value::Text("hello".into())));
    }

    #[test]
    fn test_cast_to_text_and_back() {
        assert_eq!(Value::Integer(7).cast_to(&DataType::Text).unwrap(), Value::Text("7".into()));
        assert_eq!(Value::Text(" 12".into()).cast_to(&DataType::Integer).unwrap(), Value::Integer(12));
        assert!(Value::Text("abc".into()).cast_to(&DataType::Integer).is_err());
        assert!(Value::Boolean(true).cast_to(&DataType::Integer).is_err());
        assert_eq!(Value::Null.cast_to(&DataType::Integer).unwrap(), Value::Null);
    }

    #[test]
    fn test_cast_follows_type_rules() {
        assert!(DataType::Integer.can_cast_to(&DataType::Float));
        assert!(!DataType::Float.can_cast_to(&DataType::Integer));
        assert!(Value::Float(2.0).cast_to(&DataType::Integer).is_err());
        assert_eq!(Value::Integer(2).cast_to(&DataType::Float).unwrap(), Value::Float(2.0));
        assert_eq!(Value::Float(1.5).cast_to(&DataType::Text).unwrap(), Value::Text("1.5".into()));
    }

    #[test]
    fn test_json_scalars_deserialize_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 4, 2.5, "Default"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Boolean(true),
                Value::Integer(4),
                Value::Float(2.5),
                Value::Text("Default".into()),
            ]
        );
    }

    #[test]
    fn test_as_i64_accepts_numeric_text() {
        assert_eq!(Value::Text("19".into()).as_i64(), Some(19));
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.2).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }
}
