//! Field inference from sampled documents.
//!
//! Collections carry no catalog, so fields are derived from the newest
//! documents. A path seen with several value shapes resolves to the
//! highest-priority one.

use crate::document::mongo::convert::flatten;
use bson::{Bson, Document, spec::BinarySubtype};
use model::{
    core::data_type::{CanonicalType, Encoding},
    resource::field::FieldDescriptor,
};
use std::collections::{BTreeSet, HashMap};

pub const ID_FIELD: &str = "_id";

/// Observed value shapes, declared in resolution priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Shape {
    DateTime,
    Decimal,
    Integer,
    Float,
    Boolean,
    Json,
    String,
}

impl Shape {
    /// `None` for nulls, which say nothing about the field's type.
    pub fn of(value: &Bson) -> Option<Shape> {
        match value {
            Bson::Null | Bson::Undefined => None,
            Bson::DateTime(_) | Bson::Timestamp(_) => Some(Shape::DateTime),
            Bson::Decimal128(_) => Some(Shape::Decimal),
            Bson::Int32(_) | Bson::Int64(_) => Some(Shape::Integer),
            Bson::Double(_) => Some(Shape::Float),
            Bson::Boolean(_) => Some(Shape::Boolean),
            Bson::Array(_) | Bson::Document(_) => Some(Shape::Json),
            _ => Some(Shape::String),
        }
    }

    pub fn canonical_type(&self) -> CanonicalType {
        match self {
            Shape::DateTime => CanonicalType::DateTime,
            Shape::Decimal => CanonicalType::Decimal,
            Shape::Integer => CanonicalType::Integer,
            Shape::Float => CanonicalType::Float,
            Shape::Boolean => CanonicalType::Boolean,
            Shape::Json => CanonicalType::Json,
            Shape::String => CanonicalType::String,
        }
    }
}

/// BSON type name reported as the field's native type.
fn native_name(value: &Bson) -> &'static str {
    match value {
        Bson::DateTime(_) => "date",
        Bson::Timestamp(_) => "timestamp",
        Bson::Decimal128(_) => "decimal",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Double(_) => "double",
        Bson::Boolean(_) => "bool",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::ObjectId(_) => "objectId",
        Bson::Binary(b) if b.subtype == BinarySubtype::Uuid => "uuid",
        Bson::Binary(_) => "binData",
        _ => "string",
    }
}

#[derive(Default)]
struct PathStats {
    shapes: BTreeSet<Shape>,
    native: Option<(Shape, &'static str)>,
}

/// Infers descriptors for every dotted path in `samples`, in first-seen
/// order with `_id` first. `_id` is always the primary key.
pub fn infer_fields(samples: &[Document]) -> Vec<FieldDescriptor> {
    let mut order: Vec<String> = vec![ID_FIELD.to_string()];
    let mut stats: HashMap<String, PathStats> = HashMap::new();

    for doc in samples {
        for (path, value) in flatten(doc) {
            if !stats.contains_key(&path) && path != ID_FIELD {
                order.push(path.clone());
            }
            let entry = stats.entry(path).or_default();
            if let Some(shape) = Shape::of(value) {
                entry.shapes.insert(shape);
                if entry.native.is_none_or(|(seen, _)| shape < seen) {
                    entry.native = Some((shape, native_name(value)));
                }
            }
        }
    }

    order
        .into_iter()
        .enumerate()
        .map(|(ordinal, path)| {
            let path_stats = stats.get(&path);
            let shape = path_stats
                .and_then(|s| s.shapes.iter().next().copied())
                .unwrap_or(Shape::String);
            let native = path_stats
                .and_then(|s| s.native.map(|(_, name)| name))
                .unwrap_or(if path == ID_FIELD { "objectId" } else { "string" });

            let mut field = FieldDescriptor::new(&path, shape.canonical_type(), native)
                .with_encoding(Encoding::Native);
            field.ordinal = ordinal;
            if path == ID_FIELD {
                // Identifiers cross the boundary as opaque strings.
                field.canonical_type = CanonicalType::String;
                field.primary_key = true;
                field.is_auto_increment = true;
            }
            field
        })
        .collect()
}
