//! Named specifications over user-shaped entities.
//!
//! They assume the conventional column names below and work for any entity
//! type that stores them.

use chrono::{DateTime, Utc};

use crate::operator::Operator;
use crate::specification::Specification;
use crate::time_window::{self, CREATED_AT};
use crate::value::FilterValue;

pub const IS_ACTIVE: &str = "is_active";
pub const ROLE: &str = "role";
pub const EMAIL: &str = "email";
pub const NAME: &str = "name";

pub const ADMIN_ROLE: &str = "admin";

pub fn active<T>() -> Specification<T> {
    Specification::condition(IS_ACTIVE, Operator::Eq, true)
}

pub fn inactive<T>() -> Specification<T> {
    Specification::condition(IS_ACTIVE, Operator::Eq, false)
}

pub fn role<T>(role: &str) -> Specification<T> {
    Specification::condition(ROLE, Operator::Eq, role)
}

pub fn email<T>(email: &str) -> Specification<T> {
    Specification::condition(EMAIL, Operator::Eq, email)
}

/// Case-insensitive substring match on `name`.
pub fn name_contains<T>(fragment: &str) -> Specification<T> {
    Specification::condition(NAME, Operator::ILike, format!("%{fragment}%"))
}

pub fn created_between<T>(start: DateTime<Utc>, end: DateTime<Utc>) -> Specification<T> {
    Specification::condition(CREATED_AT, Operator::Between, FilterValue::range(start, end))
}

pub fn created_today<T>() -> Specification<T> {
    let (start, end) = time_window::today(Utc::now());
    created_between(start, end)
}

pub fn created_this_week<T>() -> Specification<T> {
    let (start, end) = time_window::this_week(Utc::now());
    created_between(start, end)
}

pub fn created_this_month<T>() -> Specification<T> {
    let (start, end) = time_window::this_month(Utc::now());
    created_between(start, end)
}

/// `active AND role = admin`
pub fn active_admins<T>() -> Specification<T> {
    active().and(&role(ADMIN_ROLE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    struct User;

    fn conditions(spec: Specification<User>) -> Vec<Condition> {
        spec.into_query_filter().conditions
    }

    #[test]
    fn test_single_condition_factories() {
        assert_eq!(
            conditions(active()),
            vec![Condition::new(IS_ACTIVE, Operator::Eq, true)]
        );
        assert_eq!(
            conditions(inactive()),
            vec![Condition::new(IS_ACTIVE, Operator::Eq, false)]
        );
        assert_eq!(
            conditions(role("editor")),
            vec![Condition::new(ROLE, Operator::Eq, "editor")]
        );
        assert_eq!(
            conditions(email("a@b.io")),
            vec![Condition::new(EMAIL, Operator::Eq, "a@b.io")]
        );
        assert_eq!(
            conditions(name_contains("jo")),
            vec![Condition::new(NAME, Operator::ILike, "%jo%")]
        );
    }

    #[test]
    fn test_active_admins_is_conjunction() {
        let found = conditions(active_admins());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].field, IS_ACTIVE);
        assert_eq!(found[1], Condition::new(ROLE, Operator::Eq, ADMIN_ROLE));
    }

    #[test]
    fn test_not_active_is_not_equal() {
        let found = conditions(active::<User>().not());
        assert_eq!(found[0].operator, Operator::NotEq);
    }

    #[test]
    fn test_created_windows_are_valid_ranges() {
        for spec in [created_today::<User>(), created_this_week(), created_this_month()] {
            let mut filter = spec.into_query_filter();
            assert!(filter.validate().is_ok());
            assert_eq!(filter.conditions[0].field, CREATED_AT);
            assert_eq!(filter.conditions[0].operator, Operator::Between);
        }
    }
}
