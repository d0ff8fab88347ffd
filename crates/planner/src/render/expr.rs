use crate::{
    ast::expr::{BinaryOp, BinaryOperator, Expr, FunctionCall, Ident},
    render::{Render, Renderer},
};
use model::core::value::Value;

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.add_param(val.clone()),
            Expr::BinaryOp(op) => op.render(r),
            Expr::Group { op, children } => render_group(*op, children, r),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    let always = if *negated {
                        Expr::always_true()
                    } else {
                        Expr::always_false()
                    };
                    return always.render(r);
                }
                r.sql.push('(');
                expr.render(r);
                r.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    item.render(r);
                }
                r.sql.push_str("))");
            }
            Expr::IsNull { expr, negated } => {
                r.sql.push('(');
                expr.render(r);
                r.sql
                    .push_str(if *negated { " IS NOT NULL)" } else { " IS NULL)" });
            }
            Expr::Like {
                expr,
                pattern,
                case_insensitive,
            } => {
                r.sql.push('(');
                if !*case_insensitive {
                    expr.render(r);
                    r.sql.push_str(" LIKE ");
                    pattern.render(r);
                } else if r.dialect.supports_ilike() {
                    expr.render(r);
                    r.sql.push_str(" ILIKE ");
                    pattern.render(r);
                } else {
                    r.sql.push_str("LOWER(");
                    expr.render(r);
                    r.sql.push_str(") LIKE LOWER(");
                    pattern.render(r);
                    r.sql.push(')');
                }
                r.sql.push(')');
            }
            Expr::FunctionCall(func) => func.render(r),
            Expr::Raw { sql, params } => render_raw(sql, params, r),
            Expr::Literal(text) => {
                r.sql.push('(');
                r.sql.push_str(text);
                r.sql.push(')');
            }
            Expr::Alias { expr, alias } => {
                expr.render(r);
                r.sql.push_str(" AS ");
                r.push_ident(alias);
            }
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        if let Some(qualifier) = &self.qualifier {
            r.push_ident(qualifier);
            r.sql.push('.');
        }
        r.push_ident(&self.name);
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        r.sql.push('(');
        self.left.render(r);
        r.sql.push(' ');
        r.sql.push_str(self.op.symbol());
        r.sql.push(' ');
        self.right.render(r);
        r.sql.push(')');
    }
}

impl Render for FunctionCall {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&self.name);
        r.sql.push('(');
        if self.wildcard {
            r.sql.push('*');
        } else {
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                arg.render(r);
            }
        }
        r.sql.push(')');
    }
}

fn render_group(op: BinaryOperator, children: &[Expr], r: &mut Renderer) {
    if children.is_empty() {
        let identity = match op {
            BinaryOperator::Or => Expr::always_false(),
            _ => Expr::always_true(),
        };
        return identity.render(r);
    }

    r.sql.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            r.sql.push(' ');
            r.sql.push_str(op.symbol());
            r.sql.push(' ');
        }
        child.render(r);
    }
    r.sql.push(')');
}

/// Copies raw SQL, turning each `?` outside a quoted string into the next
/// dialect placeholder.
fn render_raw(sql: &str, params: &[Value], r: &mut Renderer) {
    let mut next = params.iter();
    let mut quote: Option<char> = None;

    r.sql.push('(');
    for ch in sql.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                r.sql.push(c);
            }
            (Some(_), c) => r.sql.push(c),
            (None, '\'' | '"' | '`') => {
                quote = Some(ch);
                r.sql.push(ch);
            }
            (None, '?') => r.add_param(next.next().cloned().unwrap_or(Value::Null)),
            (None, c) => r.sql.push(c),
        }
    }
    r.sql.push(')');
}

/// Number of `?` markers outside quoted strings.
pub fn count_raw_markers(sql: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut count = 0;
    for ch in sql.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '?') => count += 1,
            _ => {}
        }
    }
    count
}
