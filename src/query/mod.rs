//! Predicate parsing and evaluation
//!
//! Predicates are SQL-style boolean expressions over a result's facts, parsed
//! with sqlparser's generic dialect:
//!
//! - comparisons (`=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`)
//! - `AND`, `OR`, `NOT` and parentheses
//! - arithmetic (`+`, `-`, `*`, `/`, `%`) on numeric values
//! - `IS [NOT] NULL`, `[NOT] IN (...)`, `[NOT] BETWEEN ... AND ...`
//!
//! Identifiers resolve to fact values; double-quote names that are not plain
//! SQL identifiers (`"sysfs_cpu_vuln:spectre_v2" IS NULL`). A missing fact is
//! NULL and any comparison involving NULL is false.
//!
//! ```
//! use std::collections::BTreeMap;
//! use falba::model::Value;
//! use falba::query::Predicate;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pred = Predicate::parse("kernel_version = '6.1' AND nproc >= 8")?;
//! let mut facts = BTreeMap::new();
//! facts.insert("kernel_version".to_string(), Value::from("6.1"));
//! facts.insert("nproc".to_string(), Value::Int(16));
//! assert!(pred.evaluate(&facts)?);
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value as SqlValue};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use crate::model::Value;
use crate::{Error, Result};

/// Fact name to value mapping a predicate is evaluated against.
pub type Activation = BTreeMap<String, Value>;

/// A parsed boolean expression over facts.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Predicate {
    /// Parse a predicate expression.
    ///
    /// # Errors
    /// Returns [`Error::Predicate`] if:
    /// - the expression is empty
    /// - the syntax is invalid
    /// - trailing tokens follow a complete expression
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(Error::Predicate("empty expression".to_string()));
        }

        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(source)
            .map_err(|e| Error::Predicate(format!("parse error: {e}")))?;
        let expr = parser
            .parse_expr()
            .map_err(|e| Error::Predicate(format!("parse error: {e}")))?;

        let next = parser.peek_token();
        if next.token != Token::EOF {
            return Err(Error::Predicate(format!(
                "unexpected trailing input at {}",
                next.token
            )));
        }

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Source text of the predicate.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against an activation.
    ///
    /// A NULL result is false; an integer result is true when non-zero.
    ///
    /// # Errors
    /// Returns [`Error::Predicate`] if evaluation fails (type mismatch,
    /// division by zero, unsupported syntax) or the result is neither a
    /// boolean nor an integer
    pub fn evaluate(&self, activation: &Activation) -> Result<bool> {
        let result = eval(&self.expr, activation)?;
        truthy(result.as_ref())
            .map_err(|_| Error::Predicate(format!("{} does not evaluate to a boolean", self.source)))
    }
}

fn truthy(value: Option<&Value>) -> Result<bool> {
    match value {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Int(n)) => Ok(*n != 0),
        Some(other) => Err(Error::Predicate(format!(
            "expected a boolean, got {} {other}",
            other.type_name()
        ))),
    }
}

fn eval(expr: &Expr, activation: &Activation) -> Result<Option<Value>> {
    match expr {
        Expr::Identifier(ident) => Ok(activation.get(&ident.value).cloned()),
        Expr::CompoundIdentifier(parts) => {
            let name = parts
                .iter()
                .map(|p| p.value.as_str())
                .collect::<Vec<_>>()
                .join(".");
            Ok(activation.get(&name).cloned())
        }
        Expr::Value(value) => literal(value),
        Expr::Nested(inner) => eval(inner, activation),
        Expr::IsNull(inner) => Ok(Some(Value::Bool(eval(inner, activation)?.is_none()))),
        Expr::IsNotNull(inner) => Ok(Some(Value::Bool(eval(inner, activation)?.is_some()))),
        Expr::UnaryOp { op, expr } => unary(op, eval(expr, activation)?),
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => {
                if !truthy(eval(left, activation)?.as_ref())? {
                    return Ok(Some(Value::Bool(false)));
                }
                Ok(Some(Value::Bool(truthy(eval(right, activation)?.as_ref())?)))
            }
            BinaryOperator::Or => {
                if truthy(eval(left, activation)?.as_ref())? {
                    return Ok(Some(Value::Bool(true)));
                }
                Ok(Some(Value::Bool(truthy(eval(right, activation)?.as_ref())?)))
            }
            _ => binary(op, eval(left, activation)?, eval(right, activation)?),
        },
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let Some(needle) = eval(expr, activation)? else {
                return Ok(Some(Value::Bool(false)));
            };
            let mut found = false;
            for item in list {
                if let Some(candidate) = eval(item, activation)? {
                    if equal(&needle, &candidate) {
                        found = true;
                        break;
                    }
                }
            }
            Ok(Some(Value::Bool(found != *negated)))
        }
        Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            let (Some(v), Some(lo), Some(hi)) = (
                eval(expr, activation)?,
                eval(low, activation)?,
                eval(high, activation)?,
            ) else {
                return Ok(Some(Value::Bool(false)));
            };
            let inside = compare(&v, &lo)? != Ordering::Less && compare(&v, &hi)? != Ordering::Greater;
            Ok(Some(Value::Bool(inside != *negated)))
        }
        other => Err(Error::Predicate(format!("unsupported expression: {other}"))),
    }
}

fn literal(value: &SqlValue) -> Result<Option<Value>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Boolean(b) => Ok(Some(Value::Bool(*b))),
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
            Ok(Some(Value::Str(s.clone())))
        }
        SqlValue::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Some(Value::Int(i)))
            } else {
                n.parse::<f64>()
                    .map(|f| Some(Value::Float(f)))
                    .map_err(|_| Error::Predicate(format!("invalid number {n}")))
            }
        }
        other => Err(Error::Predicate(format!("unsupported literal: {other}"))),
    }
}

fn unary(op: &UnaryOperator, value: Option<Value>) -> Result<Option<Value>> {
    match op {
        UnaryOperator::Not => Ok(Some(Value::Bool(!truthy(value.as_ref())?))),
        UnaryOperator::Plus => match value {
            None => Ok(None),
            Some(v) if v.is_numeric() => Ok(Some(v)),
            Some(v) => Err(Error::Predicate(format!("cannot apply + to {}", v.type_name()))),
        },
        UnaryOperator::Minus => match value {
            None => Ok(None),
            Some(Value::Int(i)) => i
                .checked_neg()
                .map(|n| Some(Value::Int(n)))
                .ok_or_else(|| Error::Predicate("integer overflow".to_string())),
            Some(Value::Float(f)) => Ok(Some(Value::Float(-f))),
            Some(v) => Err(Error::Predicate(format!("cannot negate {}", v.type_name()))),
        },
        other => Err(Error::Predicate(format!("unsupported operator: {other}"))),
    }
}

fn binary(op: &BinaryOperator, left: Option<Value>, right: Option<Value>) -> Result<Option<Value>> {
    let is_comparison = matches!(
        op,
        BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
    );
    let (Some(l), Some(r)) = (left, right) else {
        // NULL compares false and propagates through arithmetic
        return Ok(is_comparison.then_some(Value::Bool(false)));
    };

    let result = match op {
        BinaryOperator::Eq => Value::Bool(equal(&l, &r)),
        BinaryOperator::NotEq => Value::Bool(!equal(&l, &r)),
        BinaryOperator::Lt => Value::Bool(compare(&l, &r)? == Ordering::Less),
        BinaryOperator::LtEq => Value::Bool(compare(&l, &r)? != Ordering::Greater),
        BinaryOperator::Gt => Value::Bool(compare(&l, &r)? == Ordering::Greater),
        BinaryOperator::GtEq => Value::Bool(compare(&l, &r)? != Ordering::Less),
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(op, &l, &r)?,
        other => return Err(Error::Predicate(format!("unsupported operator: {other}"))),
    };
    Ok(Some(result))
}

fn equal(l: &Value, r: &Value) -> bool {
    match (l.as_f64(), r.as_f64()) {
        #[allow(clippy::float_cmp)]
        (Some(a), Some(b)) => a == b,
        _ => l.matches(r),
    }
}

fn compare(l: &Value, r: &Value) -> Result<Ordering> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .ok_or_else(|| Error::Predicate("cannot order NaN".to_string())),
            _ => Err(Error::Predicate(format!(
                "cannot order {} {l} against {} {r}",
                l.type_name(),
                r.type_name()
            ))),
        },
    }
}

#[allow(clippy::cast_precision_loss)]
fn arithmetic(op: &BinaryOperator, l: &Value, r: &Value) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        let out = match op {
            BinaryOperator::Plus => a.checked_add(*b),
            BinaryOperator::Minus => a.checked_sub(*b),
            BinaryOperator::Multiply => a.checked_mul(*b),
            BinaryOperator::Divide => a.checked_div(*b),
            _ => a.checked_rem(*b),
        };
        return out
            .map(Value::Int)
            .ok_or_else(|| Error::Predicate(format!("integer overflow or division by zero in {a} {op} {b}")));
    }

    let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
        return Err(Error::Predicate(format!(
            "cannot apply {op} to {} and {}",
            l.type_name(),
            r.type_name()
        )));
    };
    if matches!(op, BinaryOperator::Divide | BinaryOperator::Modulo) && b == 0.0 {
        return Err(Error::Predicate("division by zero".to_string()));
    }
    Ok(Value::Float(match op {
        BinaryOperator::Plus => a + b,
        BinaryOperator::Minus => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        _ => a % b,
    }))
}
