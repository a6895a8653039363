//! Query filter objects built from request payloads.
//!
//! A filter payload is a JSON object of conditions:
//!
//! ```json
//! {
//!   "status": "active",
//!   "age": { "gte": 18, "lt": 65 },
//!   "or": [ { "role": "admin" }, { "role": { "in": ["owner", "editor"] } } ],
//!   "not": { "name": { "like": "test" } }
//! }
//! ```
//!
//! Keys are either logical operators (`and`, `or`, `not`) or searchable
//! attributes of the filter class. Structural problems are reported as a
//! reason string; the binder turns it into a malformed-filter error.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::schema::ClassSchema;
use crate::value::json_type_name;

/// A comparison operator on one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Like,
}

impl FilterOperator {
    /// All operators, in display order.
    pub const ALL: [FilterOperator; 9] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::Nin,
        Self::Like,
    ];

    /// Parse an operator key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.key() == key)
    }

    /// The payload key of the operator.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Like => "like",
        }
    }

    /// Whether the operand must be a list.
    pub fn expects_list(&self) -> bool {
        matches!(self, Self::In | Self::Nin)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A validated filter condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
    Not(Box<FilterCondition>),
    Compare {
        attribute: String,
        operator: FilterOperator,
        value: Value,
    },
}

impl FilterCondition {
    /// Render back to the canonical payload shape.
    pub fn to_json(&self) -> Value {
        match self {
            Self::And(items) => json!({ "and": items.iter().map(Self::to_json).collect::<Vec<_>>() }),
            Self::Or(items) => json!({ "or": items.iter().map(Self::to_json).collect::<Vec<_>>() }),
            Self::Not(inner) => json!({ "not": inner.to_json() }),
            Self::Compare {
                attribute,
                operator,
                value,
            } => {
                let mut ops = Map::new();
                ops.insert(operator.key().to_string(), value.clone());
                let mut outer = Map::new();
                outer.insert(attribute.clone(), Value::Object(ops));
                Value::Object(outer)
            }
        }
    }
}

/// A bound filter object.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFilter {
    class: String,
    conditions: Vec<FilterCondition>,
}

impl DataFilter {
    /// Validate a payload against the searchable attributes of `class`.
    ///
    /// Top-level conditions are implicitly combined with `and`. An empty
    /// object is a valid filter with no conditions.
    pub fn parse(class: &ClassSchema, payload: &Value) -> Result<Self, String> {
        let Value::Object(map) = payload else {
            return Err(format!(
                "expected an object of conditions, got {}",
                json_type_name(payload)
            ));
        };
        Ok(Self {
            class: class.name.clone(),
            conditions: parse_object(class, map)?,
        })
    }

    /// The filter class.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Top-level conditions.
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as JSON.
    pub fn to_json(&self) -> Value {
        json!({
            "class": self.class,
            "conditions": self.conditions.iter().map(FilterCondition::to_json).collect::<Vec<_>>(),
        })
    }
}

fn parse_object(class: &ClassSchema, map: &Map<String, Value>) -> Result<Vec<FilterCondition>, String> {
    let mut conditions = Vec::with_capacity(map.len());
    for (key, value) in map {
        let condition = match key.as_str() {
            "and" => FilterCondition::And(parse_list(class, key, value)?),
            "or" => FilterCondition::Or(parse_list(class, key, value)?),
            "not" => {
                let Value::Object(inner) = value else {
                    return Err(format!(
                        "`not` expects an object, got {}",
                        json_type_name(value)
                    ));
                };
                FilterCondition::Not(Box::new(parse_nested(class, key, inner)?))
            }
            attribute => {
                if class.property(attribute).is_none() {
                    return Err(format!("unknown filter attribute `{}`", attribute));
                }
                parse_attribute(attribute, value)?
            }
        };
        conditions.push(condition);
    }
    Ok(conditions)
}

/// A condition object under a logical operator; unlike the top level it
/// must not be empty.
fn parse_nested(
    class: &ClassSchema,
    key: &str,
    inner: &Map<String, Value>,
) -> Result<FilterCondition, String> {
    if inner.is_empty() {
        return Err(format!("`{}` expects at least one condition", key));
    }
    parse_object(class, inner).map(group)
}

fn parse_list(class: &ClassSchema, key: &str, value: &Value) -> Result<Vec<FilterCondition>, String> {
    let Value::Array(items) = value else {
        return Err(format!(
            "`{}` expects a list of conditions, got {}",
            key,
            json_type_name(value)
        ));
    };
    if items.is_empty() {
        return Err(format!("`{}` expects at least one condition", key));
    }
    items
        .iter()
        .map(|item| match item {
            Value::Object(inner) => parse_nested(class, key, inner),
            other => Err(format!(
                "`{}` items must be objects, got {}",
                key,
                json_type_name(other)
            )),
        })
        .collect()
}

fn parse_attribute(attribute: &str, value: &Value) -> Result<FilterCondition, String> {
    match value {
        Value::Array(_) => Err(format!(
            "attribute `{}` got a list; use the `in` operator",
            attribute
        )),
        Value::Object(ops) => {
            let mut conditions = Vec::with_capacity(ops.len());
            for (key, operand) in ops {
                let operator = FilterOperator::from_key(key).ok_or_else(|| {
                    format!("unknown operator `{}` for attribute `{}`", key, attribute)
                })?;
                check_operand(attribute, operator, operand)?;
                conditions.push(FilterCondition::Compare {
                    attribute: attribute.to_string(),
                    operator,
                    value: operand.clone(),
                });
            }
            if conditions.is_empty() {
                return Err(format!("attribute `{}` has no operators", attribute));
            }
            Ok(group(conditions))
        }
        scalar => Ok(FilterCondition::Compare {
            attribute: attribute.to_string(),
            operator: FilterOperator::Eq,
            value: scalar.clone(),
        }),
    }
}

fn check_operand(attribute: &str, operator: FilterOperator, operand: &Value) -> Result<(), String> {
    let is_scalar = |v: &Value| !matches!(v, Value::Array(_) | Value::Object(_));
    let valid = if operator.expects_list() {
        matches!(operand, Value::Array(items) if items.iter().all(is_scalar))
    } else {
        is_scalar(operand)
    };
    if valid {
        Ok(())
    } else {
        let expected = if operator.expects_list() {
            "a list of scalars"
        } else {
            "a scalar"
        };
        Err(format!(
            "operator `{}` on `{}` expects {}, got {}",
            operator,
            attribute,
            expected,
            json_type_name(operand)
        ))
    }
}

fn group(mut conditions: Vec<FilterCondition>) -> FilterCondition {
    if conditions.len() == 1 {
        conditions.remove(0)
    } else {
        FilterCondition::And(conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ClassKind, PropertySchema};

    fn user_filter() -> ClassSchema {
        ClassSchema::new("UserSearch", ClassKind::DataFilter)
            .with_property(PropertySchema::parse("name", "string").unwrap())
            .with_property(PropertySchema::parse("age", "int").unwrap())
            .with_property(PropertySchema::parse("role", "string").unwrap())
    }

    #[test]
    fn test_scalar_is_implicit_eq() {
        let filter = DataFilter::parse(&user_filter(), &json!({"name": "ann"})).unwrap();
        assert_eq!(
            filter.conditions(),
            &[FilterCondition::Compare {
                attribute: "name".into(),
                operator: FilterOperator::Eq,
                value: json!("ann"),
            }]
        );
    }

    #[test]
    fn test_operator_object_groups_into_and() {
        let filter = DataFilter::parse(&user_filter(), &json!({"age": {"gte": 18, "lt": 65}})).unwrap();
        match &filter.conditions()[0] {
            FilterCondition::And(items) => assert_eq!(items.len(), 2),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_operators() {
        let payload = json!({
            "or": [{"role": "admin"}, {"role": {"in": ["owner", "editor"]}}],
            "not": {"name": {"like": "test"}}
        });
        let filter = DataFilter::parse(&user_filter(), &payload).unwrap();
        assert_eq!(filter.conditions().len(), 2);
        assert!(filter
            .conditions()
            .iter()
            .any(|c| matches!(c, FilterCondition::Or(items) if items.len() == 2)));
        assert!(filter
            .conditions()
            .iter()
            .any(|c| matches!(c, FilterCondition::Not(_))));
    }

    #[test]
    fn test_empty_object_is_valid() {
        let filter = DataFilter::parse(&user_filter(), &json!({})).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_shape_errors() {
        let class = user_filter();
        assert!(DataFilter::parse(&class, &json!("name=ann")).is_err());
        assert!(DataFilter::parse(&class, &json!({"email": "x"}))
            .unwrap_err()
            .contains("unknown filter attribute"));
        assert!(DataFilter::parse(&class, &json!({"age": {"between": [1, 2]}}))
            .unwrap_err()
            .contains("unknown operator"));
        assert!(DataFilter::parse(&class, &json!({"age": {"in": 5}})).is_err());
        assert!(DataFilter::parse(&class, &json!({"age": {"gt": [5]}})).is_err());
        assert!(DataFilter::parse(&class, &json!({"or": {"age": 5}})).is_err());
        assert!(DataFilter::parse(&class, &json!({"and": []})).is_err());
        assert!(DataFilter::parse(&class, &json!({"not": {}}))
            .unwrap_err()
            .contains("`not` expects at least one condition"));
        assert!(DataFilter::parse(&class, &json!({"or": [{}]}))
            .unwrap_err()
            .contains("`or` expects at least one condition"));
        assert!(DataFilter::parse(&class, &json!({"and": [{"age": 1}, {}]})).is_err());
        assert!(DataFilter::parse(&class, &json!({})).unwrap().is_empty());
        assert!(DataFilter::parse(&class, &json!({"role": ["a", "b"]})).is_err());
    }

    #[test]
    fn test_to_json_is_canonical() {
        let filter = DataFilter::parse(&user_filter(), &json!({"name": "ann"})).unwrap();
        assert_eq!(
            filter.to_json(),
            json!({"class": "UserSearch", "conditions": [{"name": {"eq": "ann"}}]})
        );
    }
}
