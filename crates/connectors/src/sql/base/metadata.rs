//! Catalog rows shared by the relational backends and the helpers that
//! parse native type strings.

use model::{
    core::data_type::{CanonicalType, Encoding},
    resource::field::FieldDescriptor,
};

/// One column as reported by a relational catalog, before the canonical
/// mapping is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnInfo {
    pub ordinal: usize,
    pub name: String,
    /// Full native type string, e.g. `decimal(10,2)` or `varchar(64)`.
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub max_length: Option<usize>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl ColumnInfo {
    pub fn into_descriptor(self, canonical: CanonicalType, encoding: Encoding) -> FieldDescriptor {
        let (base, args) = type_args(&self.data_type);
        let unsigned = self.data_type.to_ascii_lowercase().contains("unsigned");
        let (min_value, max_value) = match integer_bounds(&base, unsigned) {
            Some((min, max)) if canonical == CanonicalType::Integer => (Some(min), Some(max)),
            _ => (None, None),
        };

        let mut field = FieldDescriptor::new(&self.name, canonical, &self.data_type)
            .with_encoding(encoding)
            .required(!self.is_nullable && self.default.is_none() && !self.is_auto_increment);
        field.ordinal = self.ordinal;
        field.primary_key = self.is_primary_key;
        field.is_auto_increment = self.is_auto_increment;
        field.default = self.default;
        field.max_length = self
            .max_length
            .or_else(|| canonical.is_textual().then(|| args.first().map(|n| *n as usize)).flatten());
        field.precision = self.precision.or_else(|| {
            (canonical == CanonicalType::Decimal)
                .then(|| args.first().copied())
                .flatten()
        });
        field.scale = self.scale.or_else(|| {
            (canonical == CanonicalType::Decimal)
                .then(|| args.get(1).copied())
                .flatten()
        });
        field.min_value = min_value;
        field.max_value = max_value;
        field
    }
}

/// Splits `DECIMAL(10, 2) UNSIGNED` into `("DECIMAL", [10, 2])`.
pub fn type_args(native: &str) -> (String, Vec<u32>) {
    let trimmed = native.trim();
    match trimmed.split_once('(') {
        Some((base, rest)) => {
            let inner = rest.split(')').next().unwrap_or_default();
            let args = inner
                .split(',')
                .filter_map(|a| a.trim().parse::<u32>().ok())
                .collect();
            (base.trim().to_ascii_uppercase(), args)
        }
        None => {
            let base = trimmed
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();
            (base, Vec::new())
        }
    }
}

/// Value range of the fixed-width integer types.
pub fn integer_bounds(base: &str, unsigned: bool) -> Option<(f64, f64)> {
    let bits = match base {
        "TINYINT" => 8,
        "SMALLINT" | "INT2" | "SMALLSERIAL" => 16,
        "MEDIUMINT" => 24,
        "INT" | "INTEGER" | "INT4" | "SERIAL" => 32,
        "BIGINT" | "INT8" | "BIGSERIAL" => 64,
        _ => return None,
    };
    Some(if unsigned {
        (0.0, 2f64.powi(bits) - 1.0)
    } else {
        (-(2f64.powi(bits - 1)), 2f64.powi(bits - 1) - 1.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_args() {
        assert_eq!(type_args("decimal(10, 2)"), ("DECIMAL".into(), vec![10, 2]));
        assert_eq!(type_args("VARCHAR(64)"), ("VARCHAR".into(), vec![64]));
        assert_eq!(type_args("int unsigned"), ("INT".into(), vec![]));
        assert_eq!(type_args(""), (String::new(), vec![]));
    }

    #[test]
    fn test_descriptor_picks_up_type_arguments() {
        let price = ColumnInfo {
            name: "price".into(),
            data_type: "DECIMAL(10,2)".into(),
            is_nullable: false,
            ..Default::default()
        }
        .into_descriptor(CanonicalType::Decimal, Encoding::Native);
        assert_eq!((price.precision, price.scale), (Some(10), Some(2)));
        assert!(price.required);

        let rooms = ColumnInfo {
            name: "rooms".into(),
            data_type: "tinyint unsigned".into(),
            is_nullable: true,
            ..Default::default()
        }
        .into_descriptor(CanonicalType::Integer, Encoding::Native);
        assert_eq!((rooms.min_value, rooms.max_value), (Some(0.0), Some(255.0)));
        assert!(!rooms.required);

        let id = ColumnInfo {
            name: "id".into(),
            data_type: "INTEGER".into(),
            is_primary_key: true,
            is_auto_increment: true,
            ..Default::default()
        }
        .into_descriptor(CanonicalType::Integer, Encoding::Native);
        assert!(id.primary_key && id.is_auto_increment && !id.required);
    }
}
