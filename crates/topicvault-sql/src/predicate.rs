//! Predicate compiler: turns filter predicates into a SQL `WHERE` clause.
//!
//! Two renderings are offered:
//!
//! - [`compile_where`] is the default. Values and JSON paths become bound
//!   parameters, top-level field names must be plain identifiers and
//!   comparators must be operator tokens.
//! - [`compile_where_literal`] inlines every value into the SQL text without
//!   escaping. It exists for compatibility with stores that were queried
//!   with hand-built strings and must never receive untrusted input.
//!
//! ```text
//! TopLevel  { age,  =,    30    }  ->  age = ?1                         [30]
//! TopLevel  { name, LIKE, "bob" }  ->  LOWER(name) LIKE LOWER(?1)       ["bob"]
//! NestedJson{ city, =,    "Tokyo"} ->  JSON_EXTRACT(value, ?1) = ?2     ["$.city", "Tokyo"]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TopicError;
use crate::schema::VALUE_COLUMN;

/// A scalar embedded in a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Renders the value as inlined SQL text. Strings are wrapped in single
    /// quotes verbatim.
    fn to_literal(&self) -> String {
        match self {
            ScalarValue::String(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Integer(n) => write!(f, "{n}"),
            ScalarValue::Float(n) => write!(f, "{n}"),
            ScalarValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Integer(n)
    }
}

impl From<i32> for ScalarValue {
    fn from(n: i32) -> Self {
        ScalarValue::Integer(n.into())
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Float(n)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compares a physical table column.
    TopLevel {
        field: String,
        op: String,
        value: ScalarValue,
    },
    /// Compares a field nested inside the JSON `value` column. Dotted paths
    /// address deeper levels (`address.city`).
    NestedJson {
        path: String,
        op: String,
        value: ScalarValue,
    },
}

impl Predicate {
    pub fn top_level(
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> Self {
        Predicate::TopLevel {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    pub fn nested(
        path: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> Self {
        Predicate::NestedJson {
            path: path.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    fn op(&self) -> &str {
        match self {
            Predicate::TopLevel { op, .. } | Predicate::NestedJson { op, .. } => op,
        }
    }

    fn value(&self) -> &ScalarValue {
        match self {
            Predicate::TopLevel { value, .. } | Predicate::NestedJson { value, .. } => value,
        }
    }
}

/// Wire format for dynamic filters.
///
/// `isNotJsonParam: true` targets a top-level column; false or absent targets
/// a field nested in the JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub field_name: String,
    pub comparator: String,
    pub value: ScalarValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_not_json_param: Option<bool>,
}

impl From<QueryParams> for Predicate {
    fn from(p: QueryParams) -> Self {
        if p.is_not_json_param.unwrap_or(false) {
            Predicate::TopLevel {
                field: p.field_name,
                op: p.comparator,
                value: p.value,
            }
        } else {
            Predicate::NestedJson {
                path: p.field_name,
                op: p.comparator,
                value: p.value,
            }
        }
    }
}

/// Placeholder syntax of the target driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamStyle {
    /// `?1`, `?2`, ... (SQLite).
    #[default]
    Numbered,
    /// `?` for every parameter (MySQL).
    Positional,
}

impl ParamStyle {
    fn placeholder(self, n: usize) -> String {
        match self {
            ParamStyle::Numbered => format!("?{n}"),
            ParamStyle::Positional => "?".to_string(),
        }
    }
}

/// A compiled `WHERE` clause together with the values bound to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    /// Empty, or `WHERE` followed by the predicates joined with ` and `.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<ScalarValue>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

fn is_like(op: &str) -> bool {
    op.eq_ignore_ascii_case("LIKE")
}

/// Renders `<field> <op> <value>`, case-folding both sides for `LIKE`.
fn render_comparison(field: &str, op: &str, value: &str) -> String {
    if is_like(op) {
        format!("LOWER({field}) {op} LOWER({value})")
    } else {
        format!("{field} {op} {value}")
    }
}

fn json_extract(path_expr: &str) -> String {
    format!("JSON_EXTRACT({VALUE_COLUMN}, {path_expr})")
}

fn join_where(rendered: Vec<String>) -> String {
    if rendered.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", rendered.join(" and "))
    }
}

/// Compiles predicates into an inlined `WHERE` clause.
///
/// String values are single-quoted verbatim, other scalars are embedded
/// unquoted. Nothing is escaped.
pub fn compile_where_literal(predicates: &[Predicate]) -> String {
    let rendered = predicates
        .iter()
        .map(|p| {
            let value = p.value().to_literal();
            match p {
                Predicate::TopLevel { field, op, .. } => render_comparison(field, op, &value),
                Predicate::NestedJson { path, op, .. } => {
                    let field = json_extract(&format!("\"$.{path}\""));
                    render_comparison(&field, op, &value)
                }
            }
        })
        .collect();
    join_where(rendered)
}

/// Compiles predicates into a parameterised `WHERE` clause.
///
/// Fails with [`TopicError::InvalidIdentifier`] when a top-level field is not
/// a plain identifier or a nested path is empty, and with
/// [`TopicError::InvalidComparator`] when a comparator is not an operator
/// token.
pub fn compile_where(
    predicates: &[Predicate],
    style: ParamStyle,
) -> Result<WhereClause, TopicError> {
    let mut params = Vec::new();
    let mut rendered = Vec::with_capacity(predicates.len());

    for p in predicates {
        validate_comparator(p.op())?;
        let field = match p {
            Predicate::TopLevel { field, .. } => {
                validate_identifier(field)?;
                field.clone()
            }
            Predicate::NestedJson { path, .. } => {
                validate_path(path)?;
                params.push(ScalarValue::String(format!("$.{path}")));
                json_extract(&style.placeholder(params.len()))
            }
        };
        params.push(p.value().clone());
        let value = style.placeholder(params.len());
        rendered.push(render_comparison(&field, p.op(), &value));
    }

    Ok(WhereClause {
        sql: join_where(rendered),
        params,
    })
}

fn validate_identifier(name: &str) -> Result<(), TopicError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(TopicError::InvalidIdentifier(name.to_string()))
    }
}

fn validate_path(path: &str) -> Result<(), TopicError> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(TopicError::InvalidIdentifier(path.to_string()));
    }
    Ok(())
}

/// Accepts any operator made of letters, spaces and `= < > !`, so backend
/// specific tokens such as `NOT LIKE`, `REGEXP` or `<=>` pass through.
fn validate_comparator(op: &str) -> Result<(), TopicError> {
    let trimmed = op.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == ' ' || matches!(c, '=' | '<' | '>' | '!'));
    if valid {
        Ok(())
    } else {
        Err(TopicError::InvalidComparator(op.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_predicates_compile_to_nothing() {
        assert_eq!(compile_where_literal(&[]), "");
        let clause = compile_where(&[], ParamStyle::Numbered).unwrap();
        assert!(clause.is_empty());
        assert!(clause.params.is_empty());
    }

    #[test]
    fn literal_top_level_number() {
        let p = Predicate::top_level("age", "=", 30);
        assert_eq!(compile_where_literal(&[p]), "WHERE age = 30");
    }

    #[test]
    fn literal_top_level_like_is_case_folded() {
        let p = Predicate::top_level("name", "LIKE", "bob");
        assert_eq!(
            compile_where_literal(&[p]),
            "WHERE LOWER(name) LIKE LOWER('bob')"
        );
    }

    #[test]
    fn literal_nested_field() {
        let p = Predicate::nested("city", "=", "Tokyo");
        assert_eq!(
            compile_where_literal(&[p]),
            "WHERE JSON_EXTRACT(value, \"$.city\") = 'Tokyo'"
        );
    }

    #[test]
    fn literal_nested_like_wraps_extraction() {
        let p = Predicate::nested("city", "like", "tok%");
        assert_eq!(
            compile_where_literal(&[p]),
            "WHERE LOWER(JSON_EXTRACT(value, \"$.city\")) like LOWER('tok%')"
        );
    }

    #[test]
    fn literal_predicates_joined_in_order() {
        let preds = [
            Predicate::top_level("age", ">", 18),
            Predicate::nested("active", "=", true),
            Predicate::nested("score", "<", 2.5),
        ];
        assert_eq!(
            compile_where_literal(&preds),
            "WHERE age > 18 and JSON_EXTRACT(value, \"$.active\") = true \
             and JSON_EXTRACT(value, \"$.score\") < 2.5"
        );
    }

    #[test]
    fn literal_strings_are_not_escaped() {
        let p = Predicate::top_level("name", "=", "o'brien");
        assert_eq!(compile_where_literal(&[p]), "WHERE name = 'o'brien'");
    }

    #[test]
    fn parameterised_top_level() {
        let clause =
            compile_where(&[Predicate::top_level("age", "=", 30)], ParamStyle::Numbered).unwrap();
        assert_eq!(clause.sql, "WHERE age = ?1");
        assert_eq!(clause.params, vec![ScalarValue::Integer(30)]);
    }

    #[test]
    fn parameterised_nested_binds_path() {
        let preds = [
            Predicate::top_level("name", "LIKE", "bob%"),
            Predicate::nested("address.city", "=", "Tokyo"),
        ];
        let clause = compile_where(&preds, ParamStyle::Numbered).unwrap();
        assert_eq!(
            clause.sql,
            "WHERE LOWER(name) LIKE LOWER(?1) and JSON_EXTRACT(value, ?2) = ?3"
        );
        assert_eq!(
            clause.params,
            vec![
                ScalarValue::from("bob%"),
                ScalarValue::from("$.address.city"),
                ScalarValue::from("Tokyo"),
            ]
        );
    }

    #[test]
    fn positional_placeholders() {
        let preds = [
            Predicate::nested("level", ">=", 10),
            Predicate::top_level("id", "<>", "x"),
        ];
        let clause = compile_where(&preds, ParamStyle::Positional).unwrap();
        assert_eq!(clause.sql, "WHERE JSON_EXTRACT(value, ?) >= ? and id <> ?");
        assert_eq!(clause.params.len(), 3);
    }

    #[test]
    fn parameterised_rejects_unsafe_input() {
        let bad_field = Predicate::top_level("id; DROP TABLE x", "=", 1);
        let err = compile_where(&[bad_field], ParamStyle::Numbered).unwrap_err();
        assert_eq!(err.code(), "invalid_identifier");

        let bad_op = Predicate::top_level("id", "= 1 --", 1);
        let err = compile_where(&[bad_op], ParamStyle::Numbered).unwrap_err();
        assert_eq!(err.code(), "invalid_comparator");

        let bad_path = Predicate::nested("a..b", "=", 1);
        assert!(compile_where(&[bad_path], ParamStyle::Numbered).is_err());
    }

    #[test]
    fn open_comparators_pass_through() {
        let preds = [
            Predicate::nested("tag", "NOT LIKE", "x%"),
            Predicate::top_level("id", "!=", "y"),
        ];
        let clause = compile_where(&preds, ParamStyle::Numbered).unwrap();
        assert_eq!(
            clause.sql,
            "WHERE JSON_EXTRACT(value, ?1) NOT LIKE ?2 and id != ?3"
        );
    }

    #[test]
    fn query_params_wire_format() {
        let raw = serde_json::json!([
            { "fieldName": "id", "comparator": "=", "value": "abc", "isNotJsonParam": true },
            { "fieldName": "level", "comparator": ">", "value": 3 },
            { "fieldName": "ratio", "comparator": "<", "value": 0.5, "isNotJsonParam": false }
        ]);
        let params: Vec<QueryParams> = serde_json::from_value(raw).unwrap();
        let preds: Vec<Predicate> = params.into_iter().map(Predicate::from).collect();
        assert_eq!(preds[0], Predicate::top_level("id", "=", "abc"));
        assert_eq!(preds[1], Predicate::nested("level", ">", 3));
        assert_eq!(preds[2], Predicate::nested("ratio", "<", 0.5));
        assert_eq!(
            compile_where_literal(&preds),
            "WHERE id = 'abc' and JSON_EXTRACT(value, \"$.level\") > 3 \
             and JSON_EXTRACT(value, \"$.ratio\") < 0.5"
        );
    }
}
