use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Right-hand side of a condition.
///
/// Storage-agnostic on purpose: a backend decides how each variant maps onto
/// its own column types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    List(Vec<FilterValue>),
    /// Ordered `(low, high)` pair used by the range operators.
    Range(Box<FilterValue>, Box<FilterValue>),
}

impl FilterValue {
    pub fn range(low: impl Into<FilterValue>, high: impl Into<FilterValue>) -> Self {
        FilterValue::Range(Box::new(low.into()), Box::new(high.into()))
    }

    /// Bounds of a range value. A two-element list is accepted as well.
    pub fn as_range(&self) -> Option<(&FilterValue, &FilterValue)> {
        match self {
            FilterValue::Range(low, high) => Some((low, high)),
            FilterValue::List(items) if items.len() == 2 => Some((&items[0], &items[1])),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FilterValue]> {
        match self {
            FilterValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Null => f.write_str("NULL"),
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Int(i) => write!(f, "{i}"),
            FilterValue::Float(x) => write!(f, "{x}"),
            FilterValue::String(s) => write!(f, "'{s}'"),
            FilterValue::Timestamp(ts) => write!(f, "'{}'", ts.to_rfc3339()),
            FilterValue::Uuid(id) => write!(f, "'{id}'"),
            FilterValue::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            FilterValue::Range(low, high) => write!(f, "{low} AND {high}"),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        FilterValue::String(value.clone())
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Uuid(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FilterValue::Null, Into::into)
    }
}

impl<L: Into<FilterValue>, H: Into<FilterValue>> From<(L, H)> for FilterValue {
    fn from((low, high): (L, H)) -> Self {
        FilterValue::range(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(FilterValue::from(5), FilterValue::Int(5));
        assert_eq!(FilterValue::from("a"), FilterValue::String("a".into()));
        assert_eq!(
            FilterValue::from(vec!["a", "b"]),
            FilterValue::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
        assert_eq!(FilterValue::from((1, 10)), FilterValue::range(1, 10));
    }

    #[test]
    fn test_as_range_accepts_pair_list() {
        let pair = FilterValue::from(vec![1, 2]);
        let (low, high) = pair.as_range().unwrap();
        assert_eq!(low, &FilterValue::Int(1));
        assert_eq!(high, &FilterValue::Int(2));

        assert!(FilterValue::from(vec![1, 2, 3]).as_range().is_none());
        assert!(FilterValue::Int(1).as_range().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterValue::from(vec![1, 2]).to_string(), "(1, 2)");
        assert_eq!(FilterValue::range("a", "z").to_string(), "'a' AND 'z'");
        assert_eq!(FilterValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_serde_is_tagged() {
        let json = serde_json::to_value(FilterValue::Int(3)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "int", "value": 3}));
        let back: FilterValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, FilterValue::Int(3));
    }
}
