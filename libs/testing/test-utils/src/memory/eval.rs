//! Evaluate a `QueryFilter` against rows serialized to JSON.
//!
//! Comparisons follow SQL: a NULL or missing field never satisfies a
//! comparison, only `IS_NULL`.

use chrono::{DateTime, Utc};
use query_filter::{Condition, FilterValue, Operator, OrderBy, QueryFilter, SortDirection};
use regex::RegexBuilder;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use uuid::Uuid;

/// Walk a dotted path (`profile.city`) through nested objects.
pub(crate) fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |current, key| current.get(key))
}

/// `conditions` AND-ed, then OR-ed with every OR-group.
pub(crate) fn matches(row: &Value, filter: &QueryFilter) -> bool {
    let all = |group: &[Condition]| group.iter().all(|c| condition_matches(row, c));
    all(&filter.conditions) || filter.or_groups.iter().any(|group| all(group))
}

pub(crate) fn condition_matches(row: &Value, condition: &Condition) -> bool {
    let field = lookup(row, &condition.field).unwrap_or(&Value::Null);

    match condition.operator {
        Operator::IsNull => return field.is_null(),
        Operator::IsNotNull => return !field.is_null(),
        _ => {}
    }

    let Some(value) = condition.value.as_ref() else {
        return false;
    };
    if field.is_null() {
        return false;
    }

    let ordering = || compare(field, value);
    match condition.operator {
        Operator::Eq => ordering() == Some(Ordering::Equal),
        Operator::NotEq => matches!(ordering(), Some(Ordering::Less | Ordering::Greater)),
        Operator::Gt => ordering() == Some(Ordering::Greater),
        Operator::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => ordering() == Some(Ordering::Less),
        Operator::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),

        Operator::Like | Operator::StartsWith | Operator::EndsWith => {
            like(field, value, !condition.case_sensitive)
        }
        Operator::NotLike => field.is_string() && !like(field, value, !condition.case_sensitive),
        Operator::ILike => like(field, value, true),
        Operator::Contains => contains(field, value, !condition.case_sensitive),

        Operator::In => in_list(field, value),
        Operator::NotIn => value.as_list().is_some() && !in_list(field, value),

        Operator::Between => between(field, value).unwrap_or(false),
        Operator::NotBetween => between(field, value).is_some_and(|inside| !inside),

        Operator::IsNull | Operator::IsNotNull => unreachable!("handled above"),
    }
}

fn in_list(field: &Value, value: &FilterValue) -> bool {
    value
        .as_list()
        .is_some_and(|items| items.iter().any(|item| compare(field, item) == Some(Ordering::Equal)))
}

fn between(field: &Value, value: &FilterValue) -> Option<bool> {
    let (low, high) = value.as_range()?;
    let above_low = compare(field, low)? != Ordering::Less;
    let below_high = compare(field, high)? != Ordering::Greater;
    Some(above_low && below_high)
}

/// SQL LIKE: `%` is any run of characters, `_` exactly one.
fn like(field: &Value, pattern: &FilterValue, case_insensitive: bool) -> bool {
    let (Some(text), Some(pattern)) = (field.as_str(), pattern.as_str()) else {
        return false;
    };

    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');

    RegexBuilder::new(&expr)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .is_ok_and(|re| re.is_match(text))
}

fn contains(field: &Value, needle: &FilterValue, case_insensitive: bool) -> bool {
    let (Some(text), Some(needle)) = (field.as_str(), needle.as_str()) else {
        return false;
    };
    if case_insensitive {
        text.to_lowercase().contains(&needle.to_lowercase())
    } else {
        text.contains(needle)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn compare_numbers(left: &Number, right: &FilterValue) -> Option<Ordering> {
    match right {
        FilterValue::Int(i) => match left.as_i64() {
            Some(l) => Some(l.cmp(i)),
            None => left.as_f64()?.partial_cmp(&(*i as f64)),
        },
        FilterValue::Float(f) => left.as_f64()?.partial_cmp(f),
        _ => None,
    }
}

/// Order a stored field against a filter value; `None` when incomparable.
pub(crate) fn compare(field: &Value, value: &FilterValue) -> Option<Ordering> {
    match (field, value) {
        (Value::Null, _) | (_, FilterValue::Null) => None,
        (Value::Bool(l), FilterValue::Bool(r)) => Some(l.cmp(r)),
        (Value::Number(l), _) => compare_numbers(l, value),
        (Value::String(l), FilterValue::String(r)) => Some(l.as_str().cmp(r.as_str())),
        (Value::String(l), FilterValue::Timestamp(r)) => Some(parse_timestamp(l)?.cmp(r)),
        (Value::String(l), FilterValue::Uuid(r)) => Some(Uuid::parse_str(l).ok()?.cmp(r)),
        _ => None,
    }
}

/// Total order over stored values used for sorting and min/max.
/// NULL sorts first; timestamps compare chronologically.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => l.cmp(&r),
            _ => l
                .as_f64()
                .zip(r.as_f64())
                .and_then(|(l, r)| l.partial_cmp(&r))
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(l), Value::String(r)) => match (parse_timestamp(l), parse_timestamp(r)) {
            (Some(l), Some(r)) => l.cmp(&r),
            _ => l.cmp(r),
        },
        _ => left.to_string().cmp(&right.to_string()),
    }
}

/// Compare two rows by an `ORDER BY` list.
pub(crate) fn compare_rows(left: &Value, right: &Value, order_by: &[OrderBy]) -> Ordering {
    order_by
        .iter()
        .map(|order| {
            let l = lookup(left, &order.field).unwrap_or(&Value::Null);
            let r = lookup(right, &order.field).unwrap_or(&Value::Null);
            let ordering = compare_values(l, r);
            match order.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Stored JSON back into a typed filter value.
pub(crate) fn to_filter_value(value: &Value) -> FilterValue {
    match value {
        Value::Null => FilterValue::Null,
        Value::Bool(b) => FilterValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FilterValue::Int(i),
            None => FilterValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => {
            if let Some(ts) = parse_timestamp(s) {
                FilterValue::Timestamp(ts)
            } else if let Ok(id) = Uuid::parse_str(s) {
                FilterValue::Uuid(id)
            } else {
                FilterValue::String(s.clone())
            }
        }
        Value::Array(items) => FilterValue::List(items.iter().map(to_filter_value).collect()),
        Value::Object(_) => FilterValue::String(value.to_string()),
    }
}

/// Typed filter value into the JSON a serialized row would hold.
pub(crate) fn to_json(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Bool(*b),
        FilterValue::Int(i) => Value::from(*i),
        FilterValue::Float(f) => Value::from(*f),
        FilterValue::String(s) => Value::String(s.clone()),
        FilterValue::Timestamp(ts) => serde_json::to_value(ts).unwrap_or(Value::Null),
        FilterValue::Uuid(id) => Value::String(id.to_string()),
        FilterValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        FilterValue::Range(low, high) => Value::Array(vec![to_json(low), to_json(high)]),
    }
}

/// Bucket key for `group_by`: bare strings stay as they are.
pub(crate) fn group_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row() -> Value {
        json!({
            "id": "6f1c1d8e-0c9d-4a8b-9a4e-1d2c3b4a5f60",
            "name": "John Smith",
            "email": "john@example.com",
            "age": 34,
            "score": 7.5,
            "is_active": true,
            "role": "admin",
            "created_at": "2024-03-15T10:00:00Z",
            "deleted_at": null,
            "profile": { "city": "Oslo" }
        })
    }

    fn check(field: &str, operator: Operator, value: impl Into<FilterValue>) -> bool {
        condition_matches(&row(), &Condition::new(field, operator, value))
    }

    #[test]
    fn test_comparisons() {
        assert!(check("age", Operator::Eq, 34));
        assert!(check("age", Operator::NotEq, 35));
        assert!(check("age", Operator::Gt, 30));
        assert!(check("age", Operator::Gte, 34));
        assert!(check("age", Operator::Lt, 34.5));
        assert!(!check("age", Operator::Lte, 33));
        assert!(check("score", Operator::Gt, 7));
        assert!(check("is_active", Operator::Eq, true));
        assert!(check("role", Operator::Eq, "admin"));
    }

    #[test]
    fn test_like_family() {
        assert!(check("name", Operator::Like, "%john%"));
        assert!(check("name", Operator::ILike, "%JOHN%"));
        assert!(check("name", Operator::StartsWith, "John%"));
        assert!(check("name", Operator::EndsWith, "%Smith"));
        assert!(check("name", Operator::Like, "J_hn%"));
        assert!(check("name", Operator::NotLike, "%jane%"));
        assert!(check("name", Operator::Contains, "smith"));
        assert!(!check("email", Operator::Like, "%.org"));
    }

    #[test]
    fn test_case_sensitive_like() {
        let condition = Condition::new("name", Operator::Like, "%john%").case_sensitive(true);
        assert!(!condition_matches(&row(), &condition));
        let condition = Condition::new("name", Operator::Like, "%John%").case_sensitive(true);
        assert!(condition_matches(&row(), &condition));
    }

    #[test]
    fn test_like_escapes_regex_metacharacters() {
        assert!(!check("email", Operator::Like, "john@example.co."));
        assert!(check("email", Operator::Like, "john@example.com"));
    }

    #[test]
    fn test_arrays_and_ranges() {
        assert!(check("role", Operator::In, vec!["admin", "owner"]));
        assert!(check("role", Operator::NotIn, vec!["guest"]));
        assert!(check("age", Operator::Between, (30, 40)));
        assert!(check("age", Operator::Between, (34, 34)));
        assert!(check("age", Operator::NotBetween, (40, 50)));
    }

    #[test]
    fn test_timestamps_and_uuids() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();
        assert!(check("created_at", Operator::Between, (start, end)));
        assert!(check("created_at", Operator::Gt, start));

        let id = Uuid::parse_str("6f1c1d8e-0c9d-4a8b-9a4e-1d2c3b4a5f60").unwrap();
        assert!(check("id", Operator::Eq, id));
    }

    #[test]
    fn test_null_semantics() {
        let is_null = Condition::null_check("deleted_at", Operator::IsNull);
        assert!(condition_matches(&row(), &is_null));
        let missing = Condition::null_check("nickname", Operator::IsNull);
        assert!(condition_matches(&row(), &missing));
        assert!(!check("deleted_at", Operator::NotEq, "x"));
        assert!(!check("nickname", Operator::NotIn, vec!["x"]));
    }

    #[test]
    fn test_nested_lookup() {
        assert!(check("profile.city", Operator::Eq, "Oslo"));
    }

    #[test]
    fn test_or_groups() {
        let filter = QueryFilter {
            conditions: vec![Condition::new("role", Operator::Eq, "guest")],
            or_groups: vec![vec![
                Condition::new("age", Operator::Gt, 30),
                Condition::new("is_active", Operator::Eq, true),
            ]],
            ..Default::default()
        };
        assert!(matches(&row(), &filter));

        let filter = QueryFilter {
            conditions: vec![Condition::new("role", Operator::Eq, "guest")],
            or_groups: vec![vec![
                Condition::new("age", Operator::Gt, 30),
                Condition::new("is_active", Operator::Eq, false),
            ]],
            ..Default::default()
        };
        assert!(!matches(&row(), &filter));
    }

    #[test]
    fn test_compare_values_orders_timestamps_chronologically() {
        let earlier = json!("2024-03-15T10:00:00.500Z");
        let later = json!("2024-03-15T10:00:01Z");
        assert_eq!(compare_values(&earlier, &later), Ordering::Less);
        assert_eq!(compare_values(&Value::Null, &json!(1)), Ordering::Less);
    }

    #[test]
    fn test_value_round_trip_through_json() {
        assert_eq!(to_filter_value(&json!(3)), FilterValue::Int(3));
        assert_eq!(to_filter_value(&json!("admin")), FilterValue::String("admin".into()));
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            to_filter_value(&to_json(&FilterValue::Timestamp(ts))),
            FilterValue::Timestamp(ts)
        );
    }
}
