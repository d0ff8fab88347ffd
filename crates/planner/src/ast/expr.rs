//! Defines the AST for SQL expressions.

use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or table identifier, e.g., `users` or `users.id`.
    Identifier(Ident),

    /// A bound parameter value.
    Value(Value),

    /// A binary operation, e.g., `column = 'value'` or `a + b`.
    BinaryOp(Box<BinaryOp>),

    /// An AND/OR of any number of conditions, always parenthesized.
    /// An empty AND is true, an empty OR is false.
    Group { op: BinaryOperator, children: Vec<Expr> },

    /// `expr [NOT] IN (...)`, one parameter per element.
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// `expr IS [NOT] NULL`
    IsNull { expr: Box<Expr>, negated: bool },

    /// `expr LIKE pattern`; case-insensitive matching uses `ILIKE` where the
    /// dialect has it and `LOWER` on both sides elsewhere.
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        case_insensitive: bool,
    },

    /// A function call, e.g., `COUNT(*)` or `MAX(price)`.
    FunctionCall(FunctionCall),

    /// Caller-supplied SQL with `?` markers bound to `params` in order.
    Raw { sql: String, params: Vec<Value> },

    /// SQL text emitted verbatim.
    Literal(String),

    /// An aliased expression, e.g. `COUNT(*) AS total_count`
    Alias { expr: Box<Expr>, alias: String },
}

impl Expr {
    /// An unqualified column reference.
    pub fn column(name: &str) -> Expr {
        Expr::Identifier(Ident {
            qualifier: None,
            name: name.to_string(),
        })
    }

    /// A value bound as a parameter.
    pub fn value(value: Value) -> Expr {
        Expr::Value(value)
    }

    pub fn always_true() -> Expr {
        Expr::Literal("1 = 1".into())
    }

    pub fn always_false() -> Expr {
        Expr::Literal("1 = 0".into())
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    pub fn is_null(expr: Expr, negated: bool) -> Expr {
        Expr::IsNull {
            expr: Box::new(expr),
            negated,
        }
    }

    pub fn and(children: Vec<Expr>) -> Expr {
        Expr::Group {
            op: BinaryOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<Expr>) -> Expr {
        Expr::Group {
            op: BinaryOperator::Or,
            children,
        }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::FunctionCall(FunctionCall {
            name: name.to_string(),
            args,
            wildcard: false,
        })
    }

    pub fn count_all() -> Expr {
        Expr::FunctionCall(FunctionCall {
            name: "COUNT".into(),
            args: vec![],
            wildcard: true,
        })
    }

    pub fn alias(self, alias: &str) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            alias: alias.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub qualifier: Option<String>, // e.g., the 'users' in 'users.id'
    pub name: String,              // e.g., the 'id' in 'users.id'
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub wildcard: bool, // represents the '*' in 'COUNT(*)'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}
