use super::field::{FieldDescriptor, FieldOverride};
use crate::error::SchemaError;
use serde::Serialize;

/// A named table or collection together with its field descriptors.
///
/// A resource always has exactly one primary-key field; it is resolved
/// once when the resource is built.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Resource {
    pub id: String,
    pub table: String,
    pub datasource: String,
    fields: Vec<FieldDescriptor>,
    #[serde(skip)]
    primary_key: usize,
    /// Columns for which min/max aggregates are computed. Empty by default so
    /// no unindexed scans happen unless asked for.
    pub min_max_columns: Vec<String>,
}

impl Resource {
    pub fn new(
        id: &str,
        table: &str,
        datasource: &str,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::NoFields(id.to_string()));
        }
        let primary_key = resolve_primary_key(id, &fields)?;
        Ok(Resource {
            id: id.to_string(),
            table: table.to_string(),
            datasource: datasource.to_string(),
            fields,
            primary_key,
            min_max_columns: Vec::new(),
        })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.fields[self.primary_key]
    }

    /// Every min/max column must name a field.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for column in &self.min_max_columns {
            if self.field(column).is_none() {
                return Err(SchemaError::UnknownField {
                    resource: self.id.clone(),
                    field: column.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Merges caller overrides into discovered fields. Overrides naming an
/// unknown field are rejected.
pub fn merge_overrides(
    resource: &str,
    fields: &mut [FieldDescriptor],
    overrides: &[FieldOverride],
) -> Result<(), SchemaError> {
    for over in overrides {
        let field = fields
            .iter_mut()
            .find(|f| f.name == over.name)
            .ok_or_else(|| SchemaError::UnknownField {
                resource: resource.to_string(),
                field: over.name.clone(),
            })?;
        field.merge(over);
    }
    Ok(())
}

fn resolve_primary_key(resource: &str, fields: &[FieldDescriptor]) -> Result<usize, SchemaError> {
    let mut keys = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.primary_key)
        .map(|(i, _)| i);
    match (keys.next(), keys.next()) {
        (Some(index), None) => Ok(index),
        (None, _) => Err(SchemaError::MissingPrimaryKey(resource.to_string())),
        (Some(_), Some(_)) => Err(SchemaError::MultiplePrimaryKeys(resource.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_type::CanonicalType;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", CanonicalType::String, "TEXT").primary(),
            FieldDescriptor::new("price", CanonicalType::Decimal, "DECIMAL(10,2)"),
        ]
    }

    #[test]
    fn test_exactly_one_primary_key() {
        let resource = Resource::new("apartments", "apartments", "main", fields()).unwrap();
        assert_eq!(resource.primary_key().name, "id");

        let mut two = fields();
        two[1].primary_key = true;
        assert_eq!(
            Resource::new("apartments", "apartments", "main", two),
            Err(SchemaError::MultiplePrimaryKeys("apartments".into()))
        );

        let mut none = fields();
        none.iter_mut().for_each(|f| f.primary_key = false);
        assert_eq!(
            Resource::new("apartments", "apartments", "main", none),
            Err(SchemaError::MissingPrimaryKey("apartments".into()))
        );

        let err = Resource::new("ghosts", "ghosts", "main", vec![]).unwrap_err();
        assert!(err.to_string().contains("ghosts"));
    }

    #[test]
    fn test_overrides_can_supply_the_primary_key() {
        let mut keyless = fields();
        keyless[0].primary_key = false;
        let overrides = [FieldOverride {
            name: "price".into(),
            primary_key: Some(true),
            ..Default::default()
        }];
        merge_overrides("apartments", &mut keyless, &overrides).unwrap();
        let resource = Resource::new("apartments", "apartments", "main", keyless).unwrap();
        assert_eq!(resource.primary_key().name, "price");

        let unknown = [FieldOverride {
            name: "area".into(),
            ..Default::default()
        }];
        assert!(matches!(
            merge_overrides("apartments", &mut fields(), &unknown),
            Err(SchemaError::UnknownField { field, .. }) if field == "area"
        ));
    }

    #[test]
    fn test_validate_names_the_field() {
        let mut resource = Resource::new("apartments", "apartments", "main", fields()).unwrap();
        resource.min_max_columns = vec!["area".into()];
        assert!(matches!(
            resource.validate(),
            Err(SchemaError::UnknownField { field, .. }) if field == "area"
        ));
    }
}
