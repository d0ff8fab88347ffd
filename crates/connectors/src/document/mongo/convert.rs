//! Conversion between BSON and native [`Value`]s, and between nested
//! documents and rows keyed by dotted field paths.

use crate::error::AdapterError;
use bigdecimal::BigDecimal;
use bson::{
    Binary, Bson, DateTime as BsonDateTime, Decimal128, Document, oid::ObjectId,
    spec::BinarySubtype,
};
use chrono::NaiveTime;
use model::{core::value::Value, records::row::NativeRow};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A native value with no lossless BSON form.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("`{value}` cannot be stored as BSON: {reason}")]
pub struct EncodeError {
    pub value: String,
    pub reason: String,
}

impl From<EncodeError> for AdapterError {
    fn from(err: EncodeError) -> Self {
        AdapterError::Validation(err.to_string())
    }
}

pub fn from_bson(bson: &Bson) -> Value {
    match bson {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Double(f) => Value::Float(*f),
        Bson::Int32(i) => Value::Int(i64::from(*i)),
        Bson::Int64(i) => Value::Int(*i),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Boolean(b) => Value::Boolean(*b),
        Bson::DateTime(dt) => Value::Timestamp(dt.to_chrono()),
        Bson::ObjectId(oid) => Value::ObjectId(oid.bytes()),
        Bson::Decimal128(d) => decode_decimal128(d),
        Bson::Binary(bin) if bin.subtype == BinarySubtype::Uuid => Uuid::from_slice(&bin.bytes)
            .map_or_else(|_| Value::Bytes(bin.bytes.clone()), Value::Uuid),
        Bson::Binary(bin) => Value::Bytes(bin.bytes.clone()),
        Bson::Timestamp(ts) => Value::Int(i64::from(ts.time)),
        Bson::Array(_) | Bson::Document(_) => Value::Json(bson.clone().into_relaxed_extjson()),
        other => Value::String(other.to_string()),
    }
}

pub fn to_bson(value: Value) -> Result<Bson, EncodeError> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Int(i) => Bson::Int64(i),
        Value::Uint(u) => match i64::try_from(u) {
            Ok(i) => Bson::Int64(i),
            Err(_) => Bson::Decimal128(encode_decimal128(&BigDecimal::from(u))?),
        },
        Value::Float(f) => Bson::Double(f),
        Value::Decimal(d) => Bson::Decimal128(encode_decimal128(&d)?),
        Value::String(s) => Bson::String(s),
        Value::Boolean(b) => Bson::Boolean(b),
        Value::Json(json) => {
            Bson::try_from(json.clone()).unwrap_or_else(|_| Bson::String(json.to_string()))
        }
        Value::Uuid(u) => uuid_binary(&u),
        Value::Bytes(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes,
        }),
        Value::Date(d) => {
            Bson::DateTime(BsonDateTime::from_chrono(d.and_time(NaiveTime::MIN).and_utc()))
        }
        Value::Time(t) => Bson::String(t.to_string()),
        Value::Timestamp(dt) => Bson::DateTime(BsonDateTime::from_chrono(dt)),
        Value::TimestampNaive(n) => Bson::DateTime(BsonDateTime::from_chrono(n.and_utc())),
        Value::ObjectId(bytes) => Bson::ObjectId(ObjectId::from_bytes(bytes)),
        Value::List(items) => Bson::Array(
            items
                .into_iter()
                .map(to_bson)
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

pub fn uuid_binary(uuid: &Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Uuid,
        bytes: uuid.as_bytes().to_vec(),
    })
}

/// Fails for values Decimal128 cannot hold exactly, such as coefficients of
/// more than 34 digits.
pub fn encode_decimal128(decimal: &BigDecimal) -> Result<Decimal128, EncodeError> {
    let text = decimal.to_plain_string();
    Decimal128::from_str(&text).map_err(|e| EncodeError {
        value: text,
        reason: format!("not representable as Decimal128 ({e:?})"),
    })
}

/// NaN and infinities have no decimal form and are kept as their text.
pub fn decode_decimal128(decimal: &Decimal128) -> Value {
    let text = decimal.to_string();
    match text.parse::<BigDecimal>() {
        Ok(d) => Value::Decimal(d),
        Err(_) => Value::String(text),
    }
}

/// Leaf values of `doc` keyed by dotted path. Non-empty subdocuments are
/// descended into; arrays and empty documents are leaves.
pub fn flatten(doc: &Document) -> Vec<(String, &Bson)> {
    let mut out = Vec::new();
    walk("", doc, &mut out);
    out
}

fn walk<'a>(prefix: &str, doc: &'a Document, out: &mut Vec<(String, &'a Bson)>) {
    for (key, value) in doc {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Bson::Document(inner) if !inner.is_empty() => walk(&path, inner, out),
            _ => out.push((path, value)),
        }
    }
}

/// Reads a dotted path, descending through subdocuments.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

/// A row with one value per requested path, in `paths` order.
pub fn to_native_row(entity: &str, doc: &Document, paths: &[String]) -> NativeRow {
    let mut row = NativeRow::new(entity, Vec::with_capacity(paths.len()));
    for path in paths {
        row.push(path.clone(), get_path(doc, path).map_or(Value::Null, from_bson));
    }
    row
}

/// Rebuilds the nested document a row of dotted paths describes.
pub fn nest(row: NativeRow) -> Result<Document, EncodeError> {
    let mut doc = Document::new();
    for field in row {
        insert_path(&mut doc, &field.name, to_bson(field.value)?);
    }
    Ok(doc)
}

fn insert_path(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// `$set` body for a partial update; dotted paths address nested fields.
pub fn set_document(values: NativeRow) -> Result<Document, EncodeError> {
    values
        .into_iter()
        .map(|field| Ok((field.name, to_bson(field.value)?)))
        .collect()
}
