//! Row filters.
//!
//! Two shapes are used:
//! - a match pattern: a partial row whose every column must be equal, used to
//!   address single records
//! - a query filter: a disjunction of column conditions written in the
//!   PostgREST `or` syntax, `column.operator.value` clauses joined by commas
//!
//! ```
//! use rowstate_client::QueryFilter;
//! use serde_json::json;
//!
//! let filter: QueryFilter = "age.gt.30,name.eq.bob".parse().unwrap();
//! let row = json!({ "name": "bob", "age": 12 });
//! assert!(filter.matches(row.as_object().unwrap()));
//! ```

use crate::types::Record;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a query filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The expression contained no clauses.
    #[error("empty filter expression")]
    Empty,

    /// A clause had no operator.
    #[error("missing operator in clause `{clause}`")]
    MissingOperator {
        /// The offending clause.
        clause: String,
    },

    /// A clause had no value.
    #[error("missing value in clause `{clause}`")]
    MissingValue {
        /// The offending clause.
        clause: String,
    },

    /// The operator is not supported.
    #[error("unknown operator `{op}`")]
    UnknownOperator {
        /// The operator as written.
        op: String,
    },
}

/// Comparison operator of a query condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Pattern match, `*` or `%` as wildcard.
    Like,
    /// Case-insensitive pattern match.
    Ilike,
    /// Identity check against `null`, `true` or `false`.
    Is,
}

impl Operator {
    /// Returns the operator's name in filter syntax.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::Is => "is",
        }
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "ilike" => Operator::Ilike,
            "is" => Operator::Is,
            other => {
                return Err(FilterError::UnknownOperator {
                    op: other.to_string(),
                })
            }
        })
    }
}

/// One `column.operator.value` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Column the condition reads.
    pub column: String,
    /// Whether the clause was prefixed with `not.`.
    pub negated: bool,
    /// Comparison operator.
    pub op: Operator,
    /// Right-hand side, as written.
    pub value: String,
}

impl Condition {
    /// Creates a condition.
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            negated: false,
            op,
            value: value.into(),
        }
    }

    /// Negates the condition.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Evaluates the condition against a row.
    ///
    /// A missing column reads as `null`.
    pub fn matches(&self, record: &Record) -> bool {
        let cell = record.get(&self.column).unwrap_or(&Value::Null);
        self.evaluate(cell) != self.negated
    }

    fn evaluate(&self, cell: &Value) -> bool {
        match self.op {
            Operator::Eq => compare(cell, &self.value) == Some(std::cmp::Ordering::Equal),
            Operator::Neq => {
                !cell.is_null() && compare(cell, &self.value) != Some(std::cmp::Ordering::Equal)
            }
            Operator::Gt => compare(cell, &self.value) == Some(std::cmp::Ordering::Greater),
            Operator::Gte => matches!(
                compare(cell, &self.value),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            ),
            Operator::Lt => compare(cell, &self.value) == Some(std::cmp::Ordering::Less),
            Operator::Lte => matches!(
                compare(cell, &self.value),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            ),
            Operator::Like => cell
                .as_str()
                .is_some_and(|s| wildcard_match(&self.value, s)),
            Operator::Ilike => cell.as_str().is_some_and(|s| {
                wildcard_match(&self.value.to_lowercase(), &s.to_lowercase())
            }),
            Operator::Is => match self.value.as_str() {
                "null" => cell.is_null(),
                "true" => cell.as_bool() == Some(true),
                "false" => cell.as_bool() == Some(false),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{}.not.{}.{}", self.column, self.op.as_str(), self.value)
        } else {
            write!(f, "{}.{}.{}", self.column, self.op.as_str(), self.value)
        }
    }
}

/// Compares a cell against a literal, typed by the cell.
fn compare(cell: &Value, literal: &str) -> Option<std::cmp::Ordering> {
    match cell {
        Value::Number(n) => {
            let lhs = n.as_f64()?;
            let rhs: f64 = literal.parse().ok()?;
            lhs.partial_cmp(&rhs)
        }
        Value::String(s) => Some(s.as_str().cmp(literal)),
        Value::Bool(b) => {
            let rhs: bool = literal.parse().ok()?;
            Some(b.cmp(&rhs))
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Matches `text` against a pattern where `*` and `%` match any run of
/// characters.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '*' || pattern[p] == '%') {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*' || *c == '%')
}

/// A disjunction of conditions: a row matches if any condition does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    conditions: Vec<Condition>,
}

impl QueryFilter {
    /// Creates a filter from conditions.
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// Parses a PostgREST `or` expression.
    pub fn parse(expression: &str) -> Result<Self, FilterError> {
        let conditions = expression
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(parse_clause)
            .collect::<Result<Vec<_>, _>>()?;

        if conditions.is_empty() {
            return Err(FilterError::Empty);
        }
        Ok(Self { conditions })
    }

    /// Returns the conditions.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns true if any condition matches the row.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().any(|c| c.matches(record))
    }
}

fn parse_clause(clause: &str) -> Result<Condition, FilterError> {
    let (column, rest) = clause
        .split_once('.')
        .ok_or_else(|| FilterError::MissingOperator {
            clause: clause.to_string(),
        })?;

    let (negated, rest) = match rest.strip_prefix("not.") {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    let (op, value) = rest
        .split_once('.')
        .ok_or_else(|| FilterError::MissingValue {
            clause: clause.to_string(),
        })?;

    if column.is_empty() || op.is_empty() {
        return Err(FilterError::MissingOperator {
            clause: clause.to_string(),
        });
    }

    Ok(Condition {
        column: column.to_string(),
        negated,
        op: op.parse()?,
        value: value.to_string(),
    })
}

impl FromStr for QueryFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{condition}")?;
        }
        Ok(())
    }
}

/// Row selection passed to table operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every row.
    All,
    /// Rows whose columns equal every column of the pattern.
    Match(Record),
    /// Rows matching any condition of the query filter.
    Any(QueryFilter),
}

impl Filter {
    /// Returns true if the row is selected.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Match(pattern) => pattern
                .iter()
                .all(|(column, value)| record.get(column) == Some(value)),
            Filter::Any(query) => query.matches(record),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str("*"),
            Filter::Match(pattern) => write!(f, "{}", Value::Object(pattern.clone())),
            Filter::Any(query) => write!(f, "{query}"),
        }
    }
}

impl From<QueryFilter> for Filter {
    fn from(query: QueryFilter) -> Self {
        Filter::Any(query)
    }
}
