use crate::core::canonical::CanonicalValue;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use std::fmt;

/// An ordered field-name to canonical-value map.
///
/// Produced by marshalling a native row; this is the only record shape that
/// crosses the data-layer boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, CanonicalValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CanonicalValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Inserts or replaces `name`, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: CanonicalValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<CanonicalValue>) -> Self {
        self.insert(name, value.into());
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<CanonicalValue> {
        let pos = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonicalValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = (String, CanonicalValue);
    type IntoIter = std::vec::IntoIter<(String, CanonicalValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, CanonicalValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, CanonicalValue)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((k, v)) = access.next_entry::<String, CanonicalValue>()? {
                    record.insert(k, v);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces_in_place() {
        let mut record = Record::new().with("id", "a").with("price", "1.00");
        record.insert("listed", CanonicalValue::Boolean(true));
        record.insert("price", CanonicalValue::Decimal("2.00".into()));

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["id", "price", "listed"]);
        assert_eq!(record.get("price"), Some(&CanonicalValue::Decimal("2.00".into())));
    }

    #[test]
    fn test_serde_preserves_field_order() {
        let record = Record::new().with("z", 1).with("a", true);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"z":1,"a":true}"#);

        let back: Record = serde_json::from_str(r#"{"b":null,"a":"x"}"#).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
