use crate::{
    ast::{
        expr::Expr,
        statement::{Delete, Insert, Update},
    },
    render::{Render, Renderer},
};

impl Render for Insert {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("INSERT INTO ");
        r.push_table(&self.table);
        if self.columns.is_empty() {
            r.sql.push_str(" DEFAULT VALUES");
        } else {
            r.sql.push_str(" (");
            r.push_ident_list(&self.columns);
            r.sql.push_str(") VALUES (");
            for (i, value) in self.values.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                value.render(r);
            }
            r.sql.push(')');
        }

        if !self.returning.is_empty() && r.dialect.supports_returning() {
            r.sql.push_str(" RETURNING ");
            r.push_ident_list(&self.returning);
        }
    }
}

impl Render for Update {
    fn render(&self, r: &mut Renderer) {
        if r.dialect.uses_mutations() {
            r.sql.push_str("ALTER TABLE ");
            r.push_table(&self.table);
            r.sql.push_str(" UPDATE ");
        } else {
            r.sql.push_str("UPDATE ");
            r.push_table(&self.table);
            r.sql.push_str(" SET ");
        }

        for (i, assignment) in self.assignments.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            r.push_ident(&assignment.column);
            r.sql.push_str(" = ");
            assignment.value.render(r);
        }
        push_where(self.where_clause.as_ref(), r);
    }
}

impl Render for Delete {
    fn render(&self, r: &mut Renderer) {
        if r.dialect.uses_mutations() {
            r.sql.push_str("ALTER TABLE ");
            r.push_table(&self.table);
            r.sql.push_str(" DELETE");
        } else {
            r.sql.push_str("DELETE FROM ");
            r.push_table(&self.table);
        }
        push_where(self.where_clause.as_ref(), r);
    }
}

/// Mutations cannot omit `WHERE`.
fn push_where(condition: Option<&Expr>, r: &mut Renderer) {
    match condition {
        Some(condition) => {
            r.sql.push_str(" WHERE ");
            condition.render(r);
        }
        None if r.dialect.uses_mutations() => r.sql.push_str(" WHERE 1"),
        None => {}
    }
}
