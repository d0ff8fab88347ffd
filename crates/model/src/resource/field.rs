use crate::core::{
    canonical::CanonicalValue,
    data_type::{CanonicalType, Encoding, NativeFamily},
};
use serde::{Deserialize, Serialize};

/// Describes one column or document path of a resource.
///
/// Produced once by schema discovery; may be adjusted afterwards with a
/// [`FieldOverride`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub ordinal: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub canonical_type: CanonicalType,
    pub native_type: String,
    #[serde(default)]
    pub encoding: Encoding,
    pub required: bool,
    pub primary_key: bool,
    #[serde(default)]
    pub is_auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

impl FieldDescriptor {
    pub fn new(name: &str, canonical_type: CanonicalType, native_type: &str) -> Self {
        FieldDescriptor {
            ordinal: 0,
            name: name.to_string(),
            canonical_type,
            native_type: native_type.to_string(),
            encoding: Encoding::infer(canonical_type, NativeFamily::classify(native_type)),
            required: false,
            primary_key: false,
            is_auto_increment: false,
            default: None,
            max_length: None,
            precision: None,
            scale: None,
            min_value: None,
            max_value: None,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.canonical_type.is_numeric()
    }

    /// Applies a caller override on top of the discovered values.
    ///
    /// A changed canonical type re-derives the encoding from the native type,
    /// so `INTEGER` + `datetime` becomes epoch seconds.
    pub fn merge(&mut self, over: &FieldOverride) {
        if let Some(canonical) = over.canonical_type {
            if canonical != self.canonical_type {
                self.canonical_type = canonical;
                self.encoding =
                    Encoding::infer(canonical, NativeFamily::classify(&self.native_type));
            }
        }
        if let Some(required) = over.required {
            self.required = required;
        }
        if let Some(pk) = over.primary_key {
            self.primary_key = pk;
        }
        if over.max_length.is_some() {
            self.max_length = over.max_length;
        }
        if over.precision.is_some() {
            self.precision = over.precision;
        }
        if over.scale.is_some() {
            self.scale = over.scale;
        }
        if over.min_value.is_some() {
            self.min_value = over.min_value;
        }
        if over.max_value.is_some() {
            self.max_value = over.max_value;
        }
        if let Some(default) = &over.default {
            self.default = Some(default.to_string());
        }
    }
}

/// Caller-supplied adjustments for a discovered field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldOverride {
    pub name: String,
    #[serde(default, rename = "type")]
    pub canonical_type: Option<CanonicalType>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub primary_key: Option<bool>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub default: Option<CanonicalValue>,
}
