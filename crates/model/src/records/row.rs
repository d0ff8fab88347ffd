use crate::core::value::Value;
use serde::{Deserialize, Serialize};

/// A single named native value inside a [`NativeRow`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

/// A row as decoded from a driver, still in native representation.
///
/// Column order follows the backend's result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NativeRow {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl NativeRow {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        NativeRow {
            entity: entity.to_string(),
            field_values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values.iter().find(|f| f.name == field)
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.field_values.push(FieldValue {
            name: name.into(),
            value,
        });
    }

    pub fn names(&self) -> Vec<&str> {
        self.field_values.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }
}

impl IntoIterator for NativeRow {
    type Item = FieldValue;
    type IntoIter = std::vec::IntoIter<FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.field_values.into_iter()
    }
}
