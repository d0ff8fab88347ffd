use crate::{
    ast::{
        expr::Expr,
        statement::{OrderDir, Projection, Read, max_alias, min_alias},
    },
    render::{Render, Renderer},
};
use model::core::value::Value;

impl Render for Read {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("SELECT ");
        self.projection.render(r);
        r.sql.push_str(" FROM ");
        r.push_table(&self.table);

        if let Some(filter) = &self.filter {
            r.sql.push_str(" WHERE ");
            filter.render(r);
        }

        for (i, (column, direction)) in self.order_by.iter().enumerate() {
            r.sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
            r.push_ident(column);
            r.sql.push_str(match direction {
                OrderDir::Asc => " ASC",
                OrderDir::Desc => " DESC",
            });
        }

        match self.limit {
            Some(limit) => {
                r.sql.push_str(" LIMIT ");
                push_count(limit, r);
            }
            None if self.offset > 0 => {
                if let Some(unbounded) = r.dialect.unbounded_limit() {
                    r.sql.push_str(" LIMIT ");
                    r.sql.push_str(unbounded);
                }
            }
            None => {}
        }
        if self.offset > 0 {
            r.sql.push_str(" OFFSET ");
            push_count(self.offset, r);
        }
    }
}

impl Render for Projection {
    fn render(&self, r: &mut Renderer) {
        match self {
            Projection::Columns(columns) if columns.is_empty() => r.sql.push('*'),
            Projection::Columns(columns) => r.push_ident_list(columns),
            Projection::Count(alias) => Expr::count_all().alias(alias).render(r),
            Projection::Bounds(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    Expr::call("MIN", vec![Expr::column(column)])
                        .alias(&min_alias(i))
                        .render(r);
                    r.sql.push_str(", ");
                    Expr::call("MAX", vec![Expr::column(column)])
                        .alias(&max_alias(i))
                        .render(r);
                }
            }
        }
    }
}

/// Page sizes are parameters unless the dialect wants literals.
fn push_count(n: u64, r: &mut Renderer) {
    let n = i64::try_from(n).unwrap_or(i64::MAX);
    if r.dialect.inline_pagination() {
        r.sql.push_str(&n.to_string());
    } else {
        r.add_param(Value::Int(n));
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{
            expr::{BinaryOperator, Expr},
            statement::{OrderDir, Read, TableRef},
        },
        dialect::{ClickHouse, MySql, Postgres, Sqlite},
        render::Renderer,
    };
    use model::core::value::Value;

    fn apartments() -> TableRef {
        TableRef::new("apartments")
    }

    fn filtered_page() -> Read {
        Read::rows(apartments(), vec!["id".into(), "price".into()])
            .filter(Some(Expr::and(vec![
                Expr::binary(
                    Expr::column("listed"),
                    BinaryOperator::Eq,
                    Expr::value(Value::Boolean(true)),
                ),
                Expr::InList {
                    expr: Box::new(Expr::column("city")),
                    list: vec![
                        Expr::value(Value::String("Oslo".into())),
                        Expr::value(Value::String("Rome".into())),
                    ],
                    negated: false,
                },
            ])))
            .order_by("price", OrderDir::Desc)
            .page(Some(10), 20)
    }

    #[test]
    fn test_page_params_follow_filter_params_postgres() {
        let (sql, params) = Renderer::render(&filtered_page(), &Postgres);
        assert_eq!(
            sql,
            r#"SELECT "id", "price" FROM "apartments" WHERE (("listed" = $1) AND ("city" IN ($2, $3))) ORDER BY "price" DESC LIMIT $4 OFFSET $5"#
        );
        assert_eq!(
            params,
            vec![
                Value::Boolean(true),
                Value::String("Oslo".into()),
                Value::String("Rome".into()),
                Value::Int(10),
                Value::Int(20),
            ]
        );
    }

    #[test]
    fn test_page_params_follow_filter_params_sqlite() {
        let (sql, params) = Renderer::render(&filtered_page(), &Sqlite);
        assert!(sql.ends_with("LIMIT ?4 OFFSET ?5"));
        assert_eq!(params.len(), 5);
        assert_eq!(params[3], Value::Int(10));
    }

    #[test]
    fn test_clickhouse_inlines_page() {
        let (sql, params) = Renderer::render(&filtered_page(), &ClickHouse);
        assert_eq!(
            sql,
            "SELECT `id`, `price` FROM `apartments` WHERE ((`listed` = {p0:Bool}) AND (`city` IN ({p1:String}, {p2:String}))) ORDER BY `price` DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_offset_without_limit() {
        let read = Read::rows(apartments(), vec![]).page(None, 5);
        assert_eq!(
            Renderer::render(&read, &MySql).0,
            "SELECT * FROM `apartments` LIMIT 18446744073709551615 OFFSET ?"
        );
        assert_eq!(
            Renderer::render(&read, &Postgres).0,
            r#"SELECT * FROM "apartments" OFFSET $1"#
        );
    }

    #[test]
    fn test_count_and_bounds() {
        let (sql, params) = Renderer::render(&Read::count(apartments(), "total"), &Postgres);
        assert_eq!(sql, r#"SELECT COUNT(*) AS "total" FROM "apartments""#);
        assert!(params.is_empty());

        let bounds = Read::bounds(apartments(), vec!["price".into(), "area".into()]);
        assert_eq!(
            Renderer::render(&bounds, &MySql).0,
            "SELECT MIN(`price`) AS `min_0`, MAX(`price`) AS `max_0`, MIN(`area`) AS `min_1`, MAX(`area`) AS `max_1` FROM `apartments`"
        );
    }
}
