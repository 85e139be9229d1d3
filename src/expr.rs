//! Expression and predicate ASTs for `WHERE` and `GROUPBYAGG`.
//!
//! The source this engine is modeled on builds expressions by interpolating
//! column names into a string and handing it to a host-language `eval`.
//! Here the configuration instead carries a small typed AST, compiled once
//! at operator construction into a `polars` expression tree. This removes
//! the injection/typing risk of string-built expressions entirely.

use chrono::NaiveDate;
use polars::prelude::{self as pl};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A literal value appearing in a predicate or arithmetic expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Bool(bool),
}

impl Literal {
    /// Parse a raw literal against a target column's dtype, per §4.1's
    /// "date literals detected by the target column's declared type" rule.
    pub fn coerce_to_dtype(
        raw: &Literal,
        dtype: &pl::DataType,
        node: &str,
        operator: &'static str,
    ) -> Result<Literal, EngineError> {
        match (raw, dtype) {
            (Literal::Str(s), pl::DataType::Date) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Literal::Date)
                    .map_err(|e| EngineError::TypeMismatch {
                        node: node.to_string(),
                        operator,
                        reason: format!("'{s}' is not an ISO date (YYYY-MM-DD): {e}"),
                    })
            }
            _ => Ok(raw.clone()),
        }
    }

    fn to_polars_lit(&self) -> pl::Expr {
        match self {
            Literal::Int(v) => pl::lit(*v),
            Literal::Float(v) => pl::lit(*v),
            Literal::Str(v) => pl::lit(v.clone()),
            Literal::Bool(v) => pl::lit(*v),
            Literal::Date(d) => {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
                let days = (*d - epoch).num_days() as i32;
                pl::lit(days).cast(pl::DataType::Date)
            }
        }
    }
}

/// Arithmetic binary operator, per §4.1's `GROUPBYAGG.col` grammar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// An arithmetic expression over column references and literals.
///
/// `Expr = Col(name) | Lit(value) | BinOp(op, Expr, Expr)`, exactly the
/// re-architecture called for in §9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Col(String),
    Lit(Literal),
    BinOp(ArithOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Col(name.into())
    }

    pub fn lit(value: Literal) -> Self {
        Expr::Lit(value)
    }

    pub fn add(self, rhs: Expr) -> Self {
        Expr::BinOp(ArithOp::Add, Box::new(self), Box::new(rhs))
    }

    pub fn sub(self, rhs: Expr) -> Self {
        Expr::BinOp(ArithOp::Sub, Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Self {
        Expr::BinOp(ArithOp::Mul, Box::new(self), Box::new(rhs))
    }

    pub fn div(self, rhs: Expr) -> Self {
        Expr::BinOp(ArithOp::Div, Box::new(self), Box::new(rhs))
    }

    /// Compile this AST into a `polars` expression. Column existence is
    /// validated by the caller against the frame's schema before use.
    pub fn to_polars(&self) -> pl::Expr {
        match self {
            Expr::Col(name) => pl::col(name),
            Expr::Lit(value) => value.to_polars_lit(),
            Expr::BinOp(op, lhs, rhs) => {
                let l = lhs.to_polars();
                let r = rhs.to_polars();
                match op {
                    ArithOp::Add => l + r,
                    ArithOp::Sub => l - r,
                    ArithOp::Mul => l * r,
                    ArithOp::Div => l / r,
                }
            }
        }
    }

    /// Every column name referenced anywhere in the expression tree.
    pub fn referenced_columns(&self, out: &mut Vec<String>) {
        match self {
            Expr::Col(name) => out.push(name.clone()),
            Expr::Lit(_) => {}
            Expr::BinOp(_, lhs, rhs) => {
                lhs.referenced_columns(out);
                rhs.referenced_columns(out);
            }
        }
    }
}

/// A comparison operator for an atomic predicate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// An atomic predicate: `column <op> literal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub left: String,
    pub op: CmpOp,
    pub right: Literal,
}

impl Predicate {
    pub fn to_polars(&self) -> pl::Expr {
        let col = pl::col(&self.left);
        let lit = self.right.to_polars_lit();
        match self.op {
            CmpOp::Eq => col.eq(lit),
            CmpOp::Ne => col.neq(lit),
            CmpOp::Lt => col.lt(lit),
            CmpOp::Le => col.lt_eq(lit),
            CmpOp::Gt => col.gt(lit),
            CmpOp::Ge => col.gt_eq(lit),
        }
    }
}

/// How the outer list of conjunct/disjunct groups in a [`Predicate`] matrix
/// composes with its inner lists, per §4.1's `WHERE` contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PredForm {
    /// Inner lists are conjunctions (AND); the outer list is a disjunction (OR).
    Dnf,
    /// Inner lists are disjunctions (OR); the outer list is a conjunction (AND).
    Cnf,
}

/// Compile a matrix of predicates (`list<list<Predicate>>`) plus its form
/// into a single boolean `polars` expression.
///
/// An empty outer list compiles to the trivially-true predicate (no rows
/// are filtered out), matching an empty `WHERE` clause.
pub fn compile_predicate_matrix(groups: &[Vec<Predicate>], form: PredForm) -> pl::Expr {
    if groups.is_empty() {
        return pl::lit(true);
    }
    let (inner_and, outer_and) = match form {
        PredForm::Dnf => (true, false),
        PredForm::Cnf => (false, true),
    };
    let group_exprs: Vec<pl::Expr> = groups
        .iter()
        .map(|group| fold_exprs(group.iter().map(|p| p.to_polars()), inner_and))
        .collect();
    fold_exprs(group_exprs.into_iter(), outer_and)
}

fn fold_exprs(mut exprs: impl Iterator<Item = pl::Expr>, and: bool) -> pl::Expr {
    let first = exprs.next().unwrap_or_else(|| pl::lit(true));
    exprs.fold(first, |acc, e| if and { acc.and(e) } else { acc.or(e) })
}

/// Validate that every column an [`Expr`] or predicate matrix references
/// exists on the given schema, surfacing `SchemaError` semantics.
pub fn validate_columns_exist(
    columns: &[String],
    schema: &pl::Schema,
    node: &str,
    operator: &'static str,
) -> Result<(), EngineError> {
    for name in columns {
        if schema.get(name).is_none() {
            return Err(EngineError::UnknownColumn {
                node: node.to_string(),
                operator,
                column: name.clone(),
            });
        }
    }
    Ok(())
}
