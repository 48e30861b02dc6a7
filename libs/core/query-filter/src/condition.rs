use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

use crate::error::ValidationError;
use crate::operator::Operator;
use crate::value::FilterValue;

/// A single atomic predicate: `field operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
            case_sensitive: false,
        }
    }

    /// Build an `IS_NULL` / `IS_NOT_NULL` style condition with no value.
    pub fn null_check(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Field-level validation. Range operators additionally need a pair.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.field.trim().is_empty() {
            return Err(ValidationError::EmptyField);
        }

        if !self.operator.requires_value() {
            return Ok(());
        }

        // an absent `Option` converts to `Null`, which is no value either
        let value = self
            .value
            .as_ref()
            .filter(|value| !value.is_null())
            .ok_or_else(|| ValidationError::MissingValue {
                field: self.field.clone(),
                operator: self.operator,
            })?;

        if self.operator.is_range() && value.as_range().is_none() {
            return Err(ValidationError::InvalidRange {
                field: self.field.clone(),
                operator: self.operator,
            });
        }

        Ok(())
    }

    /// Copy of this condition with the operator negated, when it can be.
    pub fn inverted(&self) -> Option<Condition> {
        self.operator.inverse().map(|operator| Condition {
            operator,
            ..self.clone()
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {}", self.field, self.operator, value),
            None => write!(f, "{} {}", self.field, self.operator),
        }
    }
}

/// Sort direction. Parsing is lenient: anything that is not `desc` is `Asc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_default()
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(SortDirection::parse_lenient).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    /// `direction` is parsed leniently; invalid or empty input sorts ascending.
    pub fn new(field: impl Into<String>, direction: &str) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::parse_lenient(direction),
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.field.trim().is_empty() {
            return Err(ValidationError::EmptySortField);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_requires_field() {
        let condition = Condition::new("", Operator::Eq, 1);
        assert_eq!(condition.validate(), Err(ValidationError::EmptyField));
        let condition = Condition::new("   ", Operator::Eq, 1);
        assert_eq!(condition.validate(), Err(ValidationError::EmptyField));
    }

    #[test]
    fn test_condition_requires_value_unless_null_check() {
        let missing = Condition::null_check("email", Operator::Eq);
        let err = missing.validate().unwrap_err();
        assert_eq!(err.field(), Some("email"));

        assert!(Condition::null_check("deleted_at", Operator::IsNull).validate().is_ok());
        assert!(Condition::null_check("deleted_at", Operator::IsNotNull).validate().is_ok());
    }

    #[test]
    fn test_null_value_counts_as_missing() {
        let condition = Condition::new("email", Operator::Eq, None::<String>);
        assert_eq!(condition.value, Some(FilterValue::Null));
        assert_eq!(
            condition.validate(),
            Err(ValidationError::MissingValue {
                field: "email".to_string(),
                operator: Operator::Eq,
            })
        );

        let condition = Condition::new("age", Operator::Between, FilterValue::Null);
        assert!(matches!(
            condition.validate(),
            Err(ValidationError::MissingValue { .. })
        ));

        // null checks ignore whatever value they carry
        let condition = Condition::new("deleted_at", Operator::IsNull, FilterValue::Null);
        assert!(condition.validate().is_ok());
    }

    #[test]
    fn test_range_operator_needs_pair() {
        assert!(Condition::new("age", Operator::Between, (18, 30)).validate().is_ok());
        assert!(Condition::new("age", Operator::NotBetween, vec![18, 30]).validate().is_ok());

        let err = Condition::new("age", Operator::Between, 18).validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRange { .. }));
    }

    #[test]
    fn test_condition_display() {
        let condition = Condition::new("age", Operator::Gte, 18);
        assert_eq!(condition.to_string(), "age >= 18");
        let condition = Condition::null_check("deleted_at", Operator::IsNull);
        assert_eq!(condition.to_string(), "deleted_at IS_NULL");
    }

    #[test]
    fn test_inverted_keeps_value() {
        let condition = Condition::new("role", Operator::In, vec!["admin", "owner"]);
        let inverted = condition.inverted().unwrap();
        assert_eq!(inverted.operator, Operator::NotIn);
        assert_eq!(inverted.value, condition.value);
        assert!(Condition::new("name", Operator::ILike, "%a%").inverted().is_none());
    }

    #[test]
    fn test_sort_direction_is_lenient() {
        assert_eq!(SortDirection::parse_lenient("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse_lenient(""), SortDirection::Asc);
        assert_eq!(SortDirection::parse_lenient("sideways"), SortDirection::Asc);
        assert_eq!(OrderBy::new("name", "bogus").direction, SortDirection::Asc);
    }

    #[test]
    fn test_sort_direction_deserializes_leniently() {
        let order: OrderBy =
            serde_json::from_str(r#"{"field": "name", "direction": "nope"}"#).unwrap();
        assert_eq!(order.direction, SortDirection::Asc);
        let order: OrderBy =
            serde_json::from_str(r#"{"field": "name", "direction": "desc"}"#).unwrap();
        assert_eq!(order.direction, SortDirection::Desc);
        let order: OrderBy = serde_json::from_str(r#"{"field": "name"}"#).unwrap();
        assert_eq!(order.direction, SortDirection::Asc);
    }

    #[test]
    fn test_order_by_requires_field() {
        assert_eq!(OrderBy::asc("").validate(), Err(ValidationError::EmptySortField));
        assert!(OrderBy::desc("created_at").validate().is_ok());
    }
}
