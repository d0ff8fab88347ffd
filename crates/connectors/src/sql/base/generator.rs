use crate::{requests::ListRequest, sql::base::filter::SqlFilterCompiler};
use model::{
    core::value::Value,
    error::FilterError,
    filter::Filter,
    pagination::sort::SortDirection,
    records::row::NativeRow,
    resource::resource::Resource,
};
use planner::{
    ast::{
        expr::{BinaryOperator, Expr},
        statement::{Assignment, Delete, Insert, OrderDir, Read, TableRef, Update},
    },
    dialect::Dialect,
    render::{Render, Renderer},
};

pub use planner::ast::statement::{max_alias, min_alias};

/// Alias of the single column produced by [`QueryGenerator::count`].
pub const COUNT_ALIAS: &str = "total";

/// Builds every statement the relational connectors run, rendered for one
/// dialect.
pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn list(
        &self,
        resource: &Resource,
        request: &ListRequest,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut read = Read::rows(table_of(resource), columns(resource))
            .filter(SqlFilterCompiler.compile(&request.filter)?);
        for sort in request.stable_sort(&resource.primary_key().name) {
            let direction = match sort.direction {
                SortDirection::Asc => OrderDir::Asc,
                SortDirection::Desc => OrderDir::Desc,
            };
            read = read.order_by(&sort.field, direction);
        }
        Ok(self.render(&read.page(request.limit, request.offset)))
    }

    pub fn count(&self, resource: &Resource, filter: &Filter) -> Result<(String, Vec<Value>), FilterError> {
        let read = Read::count(table_of(resource), COUNT_ALIAS)
            .filter(SqlFilterCompiler.compile(filter)?);
        Ok(self.render(&read))
    }

    /// One `MIN`/`MAX` pair per column, aliased by [`min_alias`]/[`max_alias`].
    pub fn min_max(&self, resource: &Resource, columns: &[String]) -> (String, Vec<Value>) {
        self.render(&Read::bounds(table_of(resource), columns.to_vec()))
    }

    pub fn find_by_pk(&self, resource: &Resource, id: &Value) -> (String, Vec<Value>) {
        let read = Read::rows(table_of(resource), columns(resource))
            .filter(Some(pk_equals(resource, id)))
            .page(Some(1), 0);
        self.render(&read)
    }

    /// `INSERT`, with the primary key in `RETURNING` where the dialect has it.
    pub fn insert(&self, resource: &Resource, row: &NativeRow) -> (String, Vec<Value>) {
        let insert = Insert {
            table: table_of(resource),
            columns: row.field_values.iter().map(|f| f.name.clone()).collect(),
            values: row
                .field_values
                .iter()
                .map(|f| Expr::value(f.value.clone()))
                .collect(),
            returning: vec![resource.primary_key().name.clone()],
        };
        self.render(&insert)
    }

    pub fn update(&self, resource: &Resource, id: &Value, row: &NativeRow) -> (String, Vec<Value>) {
        let update = Update {
            table: table_of(resource),
            assignments: row
                .field_values
                .iter()
                .map(|f| Assignment {
                    column: f.name.clone(),
                    value: Expr::value(f.value.clone()),
                })
                .collect(),
            where_clause: Some(pk_equals(resource, id)),
        };
        self.render(&update)
    }

    pub fn delete(&self, resource: &Resource, id: &Value) -> (String, Vec<Value>) {
        let delete = Delete {
            table: table_of(resource),
            where_clause: Some(pk_equals(resource, id)),
        };
        self.render(&delete)
    }

    fn render<T: Render>(&self, node: &T) -> (String, Vec<Value>) {
        Renderer::render(node, self.dialect)
    }
}

pub fn table_of(resource: &Resource) -> TableRef {
    TableRef::parse(&resource.table)
}

fn columns(resource: &Resource) -> Vec<String> {
    resource.fields().iter().map(|f| f.name.clone()).collect()
}

fn pk_equals(resource: &Resource, id: &Value) -> Expr {
    Expr::binary(
        Expr::column(&resource.primary_key().name),
        BinaryOperator::Eq,
        Expr::value(id.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::data_type::CanonicalType,
        filter::Operator,
        pagination::sort::SortSpec,
        resource::field::FieldDescriptor,
    };
    use planner::dialect::{ClickHouse, MySql, Postgres, Sqlite};

    fn apartments() -> Resource {
        Resource::new(
            "apartments",
            "apartments",
            "main",
            vec![
                FieldDescriptor::new("id", CanonicalType::String, "TEXT").primary(),
                FieldDescriptor::new("price", CanonicalType::Decimal, "DECIMAL(10,2)"),
                FieldDescriptor::new("listed", CanonicalType::Boolean, "BOOLEAN"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_list_keeps_filter_and_page_params_in_step() {
        let request = ListRequest::builder()
            .filter(Filter::and(vec![
                Filter::compare("price", Operator::Gt, Value::Int(100)),
                Filter::compare("listed", Operator::Ne, Value::Boolean(false)),
            ]))
            .sort(vec![SortSpec::desc("price")])
            .limit(Some(10))
            .offset(20)
            .build();

        let (sql, params) = QueryGenerator::new(&Postgres)
            .list(&apartments(), &request)
            .unwrap();
        assert_eq!(
            sql,
            r#"SELECT "id", "price", "listed" FROM "apartments" WHERE (("price" > $1) AND (("listed" <> $2) OR ("listed" IS NULL))) ORDER BY "price" DESC, "id" ASC LIMIT $3 OFFSET $4"#
        );
        assert_eq!(
            params,
            vec![Value::Int(100), Value::Boolean(false), Value::Int(10), Value::Int(20)]
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let request = ListRequest::builder().offset(5).build();
        let (sql, _) = QueryGenerator::new(&Sqlite)
            .list(&apartments(), &request)
            .unwrap();
        assert!(sql.ends_with(r#"ORDER BY "id" ASC LIMIT -1 OFFSET ?1"#), "{sql}");
    }

    #[test]
    fn test_count_and_min_max() {
        let (sql, params) = QueryGenerator::new(&MySql)
            .count(&apartments(), &Filter::eq("listed", Value::Boolean(true)))
            .unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS `total` FROM `apartments` WHERE (`listed` = ?)"
        );
        assert_eq!(params, vec![Value::Boolean(true)]);

        let (sql, _) = QueryGenerator::new(&MySql).min_max(&apartments(), &["price".to_string()]);
        assert_eq!(
            sql,
            "SELECT MIN(`price`) AS `min_0`, MAX(`price`) AS `max_0` FROM `apartments`"
        );
    }

    #[test]
    fn test_writes_address_the_primary_key() {
        let generator = QueryGenerator::new(&Postgres);
        let id = Value::String("a".into());
        let mut row = NativeRow::new("apartments", vec![]);
        row.push("price", Value::String("1.50".into()));

        let (sql, params) = generator.update(&apartments(), &id, &row);
        assert_eq!(sql, r#"UPDATE "apartments" SET "price" = $1 WHERE ("id" = $2)"#);
        assert_eq!(params, vec![Value::String("1.50".into()), id.clone()]);

        let (sql, _) = generator.delete(&apartments(), &id);
        assert_eq!(sql, r#"DELETE FROM "apartments" WHERE ("id" = $1)"#);

        let (sql, _) = QueryGenerator::new(&ClickHouse).delete(&apartments(), &id);
        assert_eq!(sql, "ALTER TABLE `apartments` DELETE WHERE (`id` = {p0:String})");
    }

    #[test]
    fn test_schema_qualified_table() {
        let mut resource = apartments();
        resource.table = "listings.apartments".into();
        let (sql, _) = QueryGenerator::new(&Postgres).find_by_pk(&resource, &Value::String("a".into()));
        assert_eq!(
            sql,
            r#"SELECT "id", "price", "listed" FROM "listings"."apartments" WHERE ("id" = $1) LIMIT $2"#
        );
    }
}
