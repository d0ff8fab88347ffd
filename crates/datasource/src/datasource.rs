//! The caller-facing entry point over one connector.
//!
//! Every request passes through here: filters are normalized and validated
//! against the backend, filter literals and written values are converted to
//! the native form of their field, and every row read back is marshalled to
//! canonical values. Native values never leave this module.

use connectors::{
    adapter::{BackendKind, Connector},
    error::AdapterError,
    marshal::TypeMarshaller,
    requests::ListRequest,
};
use model::{
    core::{canonical::CanonicalValue, value::Value},
    filter::{Filter, FilterInput, Operator, normalize, validate},
    pagination::{
        page::{Bounds, ListQuery, ListResult, MinMax},
        sort::SortSpec,
    },
    records::{record::Record, row::NativeRow},
    resource::{field::FieldDescriptor, resource::Resource},
};
use std::sync::Arc;
use tracing::debug;

pub struct Datasource {
    id: String,
    connector: Arc<dyn Connector>,
}

impl Datasource {
    pub fn new(id: &str, connector: Arc<dyn Connector>) -> Self {
        Datasource {
            id: id.to_string(),
            connector,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> BackendKind {
        self.connector.kind()
    }

    /// Discovered fields of `table`, straight from the backend catalog.
    pub async fn discover_fields(&self, table: &str) -> Result<Vec<FieldDescriptor>, AdapterError> {
        self.connector.discover_fields(table).await
    }

    /// One page of records plus the total number of matches.
    pub async fn get_data(
        &self,
        resource: &Resource,
        query: &ListQuery,
    ) -> Result<ListResult, AdapterError> {
        let filter = self.prepare_filter(resource, query.filters.as_ref())?;
        if filter.is_unsatisfiable() {
            debug!("Filter on `{}` can match nothing; skipping query", resource.id);
            return Ok(ListResult::empty());
        }
        check_sort(resource, &query.sort)?;

        let request = ListRequest::builder()
            .filter(filter)
            .sort(query.sort.clone())
            .limit(query.limit)
            .offset(query.offset)
            .build();
        let (rows, total) = tokio::try_join!(
            self.connector.list(resource, &request),
            self.connector.count(resource, &request.filter),
        )?;
        Ok(ListResult {
            data: rows
                .into_iter()
                .map(|row| self.to_record(resource, row))
                .collect(),
            total,
        })
    }

    pub async fn count(
        &self,
        resource: &Resource,
        filters: Option<&FilterInput>,
    ) -> Result<u64, AdapterError> {
        let filter = self.prepare_filter(resource, filters)?;
        if filter.is_unsatisfiable() {
            return Ok(0);
        }
        self.connector.count(resource, &filter).await
    }

    pub async fn get_record_by_pk(
        &self,
        resource: &Resource,
        id: &str,
    ) -> Result<Option<Record>, AdapterError> {
        let Some(id) = self.native_id(resource, id) else {
            return Ok(None);
        };
        let row = self.connector.find_by_pk(resource, &id).await?;
        Ok(row.map(|row| self.to_record(resource, row)))
    }

    /// Bounds of the resource's opted-in columns; empty when none are.
    pub async fn get_min_max(
        &self,
        resource: &Resource,
    ) -> Result<MinMax<CanonicalValue>, AdapterError> {
        let bounds = self
            .connector
            .min_max(resource, &resource.min_max_columns)
            .await?;
        let marshaller = self.connector.marshaller();
        bounds
            .into_iter()
            .map(|(column, Bounds { min, max })| {
                let field = field(resource, &column)?;
                let bounds = Bounds {
                    min: marshaller.to_canonical(field, min),
                    max: marshaller.to_canonical(field, max),
                };
                Ok((column, bounds))
            })
            .collect()
    }

    /// Inserts `record` and returns the canonical primary key it was stored
    /// under.
    pub async fn create_record(
        &self,
        resource: &Resource,
        record: Record,
    ) -> Result<CanonicalValue, AdapterError> {
        let pk = resource.primary_key();
        let row = self.to_row(resource, record)?;
        let id = self.connector.create(resource, row).await?;
        Ok(self.connector.marshaller().to_canonical(pk, id))
    }

    /// Fails with [`AdapterError::NotFound`] when no record has `id`.
    pub async fn update_record(
        &self,
        resource: &Resource,
        id: &str,
        values: Record,
    ) -> Result<(), AdapterError> {
        let Some(native_id) = self.native_id(resource, id) else {
            return Err(AdapterError::NotFound {
                resource: resource.id.clone(),
                id: id.to_string(),
            });
        };
        let row = self.to_row(resource, values)?;
        self.connector.update(resource, &native_id, row).await
    }

    /// `true` iff a record was removed.
    pub async fn delete_record(&self, resource: &Resource, id: &str) -> Result<bool, AdapterError> {
        match self.native_id(resource, id) {
            Some(id) => self.connector.delete(resource, &id).await,
            None => Ok(false),
        }
    }

    /// Whether no other record holds `value` in `field`.
    ///
    /// Best-effort: the check and any following write are separate
    /// statements, so concurrent writers can both pass it. Only a unique
    /// constraint in the store itself is authoritative.
    pub async fn is_unique(
        &self,
        resource: &Resource,
        field_name: &str,
        value: CanonicalValue,
        exclude_id: Option<&str>,
    ) -> Result<bool, AdapterError> {
        let field = field(resource, field_name)?;
        let native = self
            .connector
            .marshaller()
            .to_native(field, value.typed(field.canonical_type))?;
        let mut children = vec![Filter::compare(field_name, Operator::Eq, native)];
        // Connectors match the excluded key under every encoding it may be
        // stored with.
        if let Some(exclude) = exclude_id {
            if let Some(id) = self.native_id(resource, exclude) {
                let pk = resource.primary_key();
                children.push(Filter::compare(&pk.name, Operator::Ne, id));
            }
        }
        Ok(self.connector.count(resource, &Filter::and(children)).await? == 0)
    }

    pub async fn close(&self) -> Result<(), AdapterError> {
        self.connector.close().await
    }

    fn prepare_filter(
        &self,
        resource: &Resource,
        input: Option<&FilterInput>,
    ) -> Result<Filter, AdapterError> {
        let filter = normalize(input)?;
        let filter = validate(filter, self.connector.operator_support(), resource)?;
        self.coerce_literals(resource, filter)
    }

    /// Converts comparison literals to the native form of their field, so
    /// `"true"` compares against a 0/1 column and `"12"` against an integer.
    /// Pattern operands stay text.
    fn coerce_literals(&self, resource: &Resource, filter: Filter) -> Result<Filter, AdapterError> {
        filter.try_map_values(&mut |name, op, value| {
            if matches!(
                op,
                Operator::Like | Operator::ILike | Operator::IsEmpty | Operator::IsNotEmpty
            ) {
                return Ok(value);
            }
            self.coerce_literal(field(resource, name)?, value)
        })
    }

    fn coerce_literal(&self, field: &FieldDescriptor, value: Value) -> Result<Value, AdapterError> {
        let canonical = literal_to_canonical(value).typed(field.canonical_type);
        Ok(self.connector.marshaller().to_native(field, canonical)?)
    }

    /// The native form of an opaque primary-key string, or `None` when the
    /// key cannot be represented and so cannot exist.
    fn native_id(&self, resource: &Resource, id: &str) -> Option<Value> {
        let pk = resource.primary_key();
        let canonical = CanonicalValue::from(id).typed(pk.canonical_type);
        match self.connector.marshaller().to_native(pk, canonical) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("Primary key `{id}` of `{}` is unrepresentable: {err}", resource.id);
                None
            }
        }
    }

    fn to_record(&self, resource: &Resource, row: NativeRow) -> Record {
        let marshaller = self.connector.marshaller();
        let mut record = Record::new();
        for field_value in row {
            let canonical = match resource.field(&field_value.name) {
                Some(descriptor) => marshaller.to_canonical(descriptor, field_value.value),
                None => continue,
            };
            record.insert(field_value.name, canonical);
        }
        record
    }

    fn to_row(&self, resource: &Resource, record: Record) -> Result<NativeRow, AdapterError> {
        let marshaller = self.connector.marshaller();
        let mut row = NativeRow::new(&resource.table, Vec::with_capacity(record.len()));
        for (name, value) in record {
            let descriptor = field(resource, &name)?;
            let native = marshaller.to_native(descriptor, value.typed(descriptor.canonical_type))?;
            row.push(name, native);
        }
        Ok(row)
    }
}

fn field<'a>(resource: &'a Resource, name: &str) -> Result<&'a FieldDescriptor, AdapterError> {
    resource.field(name).ok_or_else(|| {
        AdapterError::Validation(format!("Resource `{}` has no field `{name}`", resource.id))
    })
}

fn check_sort(resource: &Resource, sort: &[SortSpec]) -> Result<(), AdapterError> {
    for spec in sort {
        field(resource, &spec.field)?;
    }
    Ok(())
}

/// Re-reads a boundary literal as the canonical value it was written as.
fn literal_to_canonical(value: Value) -> CanonicalValue {
    match value {
        Value::Null => CanonicalValue::Null,
        Value::Boolean(b) => CanonicalValue::Boolean(b),
        Value::Int(i) => CanonicalValue::Integer(i),
        Value::Uint(u) => match i64::try_from(u) {
            Ok(i) => CanonicalValue::Integer(i),
            Err(_) => CanonicalValue::Decimal(u.to_string()),
        },
        Value::Float(f) => CanonicalValue::Float(f),
        Value::Json(json) => CanonicalValue::Json(json),
        other => match other.as_string() {
            Some(s) => CanonicalValue::String(s),
            None => CanonicalValue::String(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_to_canonical() {
        assert_eq!(literal_to_canonical(Value::Int(3)), CanonicalValue::Integer(3));
        assert_eq!(
            literal_to_canonical(Value::String("a".into())),
            CanonicalValue::String("a".into())
        );
        assert_eq!(
            literal_to_canonical(Value::Uint(u64::MAX)),
            CanonicalValue::Decimal(u64::MAX.to_string())
        );
    }
}
