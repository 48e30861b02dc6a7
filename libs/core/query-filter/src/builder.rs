use chrono::{DateTime, Utc};
use tracing::warn;

use crate::condition::{Condition, OrderBy};
use crate::error::ValidationError;
use crate::filter::QueryFilter;
use crate::operator::Operator;
use crate::time_window::{self, CREATED_AT};
use crate::value::FilterValue;

/// Fluent assembler for [`QueryFilter`].
///
/// Every step takes `&mut self` and returns it for chaining, so a builder
/// has exactly one owner while a query is being put together. Share the
/// finished [`QueryFilter`], not the builder.
///
/// ```
/// use query_filter::QueryBuilder;
///
/// let filter = QueryBuilder::new()
///     .where_eq("role", "admin")
///     .where_like("name", "john")
///     .order_by_desc("created_at")
///     .paginate(2, 10)
///     .build();
///
/// assert_eq!(filter.conditions.len(), 2);
/// assert_eq!(filter.offset(), 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    filter: QueryFilter,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing filter.
    pub fn from_filter(filter: QueryFilter) -> Self {
        Self { filter }
    }

    /// Add `field operator value` to the AND-ed conditions.
    pub fn condition(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.filter.conditions.push(Condition::new(field, operator, value));
        self
    }

    /// Add a pre-built condition.
    pub fn push(&mut self, condition: Condition) -> &mut Self {
        self.filter.conditions.push(condition);
        self
    }

    pub fn where_eq(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::Eq, value)
    }

    pub fn where_not_eq(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::NotEq, value)
    }

    pub fn where_gt(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::Gt, value)
    }

    pub fn where_gte(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::Gte, value)
    }

    pub fn where_lt(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::Lt, value)
    }

    pub fn where_lte(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::Lte, value)
    }

    /// `LIKE '%value%'`
    pub fn where_like(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
        self.condition(field, Operator::Like, format!("%{value}%"))
    }

    /// `NOT_LIKE '%value%'`
    pub fn where_not_like(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
        self.condition(field, Operator::NotLike, format!("%{value}%"))
    }

    /// `ILIKE '%value%'`
    pub fn where_ilike(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
        self.condition(field, Operator::ILike, format!("%{value}%"))
    }

    /// `STARTS_WITH 'value%'`
    pub fn where_starts_with(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
        self.condition(field, Operator::StartsWith, format!("{value}%"))
    }

    /// `ENDS_WITH '%value'`
    pub fn where_ends_with(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
        self.condition(field, Operator::EndsWith, format!("%{value}"))
    }

    /// Plain substring match; no wildcards are added.
    pub fn where_contains(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
        self.condition(field, Operator::Contains, value)
    }

    pub fn where_in<V: Into<FilterValue>>(
        &mut self,
        field: impl Into<String>,
        values: Vec<V>,
    ) -> &mut Self {
        self.condition(field, Operator::In, values)
    }

    pub fn where_not_in<V: Into<FilterValue>>(
        &mut self,
        field: impl Into<String>,
        values: Vec<V>,
    ) -> &mut Self {
        self.condition(field, Operator::NotIn, values)
    }

    pub fn where_null(&mut self, field: impl Into<String>) -> &mut Self {
        self.push(Condition::null_check(field, Operator::IsNull))
    }

    pub fn where_not_null(&mut self, field: impl Into<String>) -> &mut Self {
        self.push(Condition::null_check(field, Operator::IsNotNull))
    }

    pub fn where_between(
        &mut self,
        field: impl Into<String>,
        low: impl Into<FilterValue>,
        high: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::Between, FilterValue::range(low, high))
    }

    pub fn where_not_between(
        &mut self,
        field: impl Into<String>,
        low: impl Into<FilterValue>,
        high: impl Into<FilterValue>,
    ) -> &mut Self {
        self.condition(field, Operator::NotBetween, FilterValue::range(low, high))
    }

    /// Add an OR-group: its conditions are AND-ed together and the group is
    /// OR-ed against the main conditions.
    pub fn or_where(&mut self, group: Vec<Condition>) -> &mut Self {
        self.filter.or_groups.push(group);
        self
    }

    /// `created_at BETWEEN start AND end`
    pub fn created_between(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> &mut Self {
        self.where_between(CREATED_AT, start, end)
    }

    pub fn created_today(&mut self) -> &mut Self {
        let (start, end) = time_window::today(Utc::now());
        self.created_between(start, end)
    }

    pub fn created_this_week(&mut self) -> &mut Self {
        let (start, end) = time_window::this_week(Utc::now());
        self.created_between(start, end)
    }

    pub fn created_this_month(&mut self) -> &mut Self {
        let (start, end) = time_window::this_month(Utc::now());
        self.created_between(start, end)
    }

    /// Add an ordering; an unrecognised direction sorts ascending.
    pub fn order_by(&mut self, field: impl Into<String>, direction: &str) -> &mut Self {
        self.filter.order_by.push(OrderBy::new(field, direction));
        self
    }

    pub fn order_by_asc(&mut self, field: impl Into<String>) -> &mut Self {
        self.filter.order_by.push(OrderBy::asc(field));
        self
    }

    pub fn order_by_desc(&mut self, field: impl Into<String>) -> &mut Self {
        self.filter.order_by.push(OrderBy::desc(field));
        self
    }

    pub fn page(&mut self, page: i64) -> &mut Self {
        self.filter.page = page;
        self
    }

    pub fn page_size(&mut self, page_size: i64) -> &mut Self {
        self.filter.page_size = page_size;
        self
    }

    pub fn paginate(&mut self, page: i64, page_size: i64) -> &mut Self {
        self.page(page).page_size(page_size)
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.filter.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.filter.offset = Some(offset);
        self
    }

    pub fn include(&mut self, relation: impl Into<String>) -> &mut Self {
        self.filter.include.push(relation.into());
        self
    }

    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.select.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn omit<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.omit.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Show soft-deleted rows alongside live ones.
    pub fn with_deleted(&mut self) -> &mut Self {
        self.filter.include_deleted = true;
        self
    }

    /// Show soft-deleted rows only. Wins over [`with_deleted`](Self::with_deleted).
    pub fn only_deleted(&mut self) -> &mut Self {
        self.filter.only_deleted = true;
        self
    }

    pub fn group_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.filter.group_by.push(field.into());
        self
    }

    pub fn having(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.filter.having.push(Condition::new(field, operator, value));
        self
    }

    /// Validate and return the filter, keeping going on structural errors.
    ///
    /// Paging is clamped either way. A structural error is logged and the
    /// filter is returned as assembled; use [`try_build`](Self::try_build)
    /// to get the error instead.
    pub fn build(&self) -> QueryFilter {
        let mut filter = self.filter.clone();
        if let Err(err) = filter.validate() {
            warn!(error = %err, "Query builder produced an invalid filter");
        }
        filter
    }

    /// Validate and return the filter, failing on the first structural error.
    pub fn try_build(&self) -> Result<QueryFilter, ValidationError> {
        let mut filter = self.filter.clone();
        filter.validate()?;
        Ok(filter)
    }

    /// Back to an empty filter (`page = 1`, `page_size = 20`) for reuse.
    pub fn reset(&mut self) -> &mut Self {
        self.filter = QueryFilter::default();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::SortDirection;

    fn only_condition(filter: &QueryFilter) -> &Condition {
        assert_eq!(filter.conditions.len(), 1);
        &filter.conditions[0]
    }

    #[test]
    fn test_wildcard_conventions() {
        let filter = QueryBuilder::new().where_like("name", "john").build();
        assert_eq!(only_condition(&filter).value, Some("%john%".into()));
        assert_eq!(only_condition(&filter).operator, Operator::Like);

        let filter = QueryBuilder::new().where_ilike("name", "john").build();
        assert_eq!(only_condition(&filter).value, Some("%john%".into()));
        assert_eq!(only_condition(&filter).operator, Operator::ILike);

        let filter = QueryBuilder::new().where_starts_with("name", "john").build();
        assert_eq!(only_condition(&filter).value, Some("john%".into()));

        let filter = QueryBuilder::new().where_ends_with("name", "john").build();
        assert_eq!(only_condition(&filter).value, Some("%john".into()));

        let filter = QueryBuilder::new().where_contains("name", "john").build();
        assert_eq!(only_condition(&filter).value, Some("john".into()));
    }

    #[test]
    fn test_comparison_helpers() {
        let filter = QueryBuilder::new()
            .where_eq("a", 1)
            .where_not_eq("b", 2)
            .where_gt("c", 3)
            .where_gte("d", 4)
            .where_lt("e", 5)
            .where_lte("f", 6)
            .build();
        let operators: Vec<Operator> = filter.conditions.iter().map(|c| c.operator).collect();
        assert_eq!(
            operators,
            vec![
                Operator::Eq,
                Operator::NotEq,
                Operator::Gt,
                Operator::Gte,
                Operator::Lt,
                Operator::Lte
            ]
        );
    }

    #[test]
    fn test_array_null_and_range_helpers() {
        let filter = QueryBuilder::new()
            .where_in("role", vec!["admin", "owner"])
            .where_not_in("status", vec!["banned"])
            .where_null("deleted_at")
            .where_not_null("email_verified_at")
            .where_between("age", 18, 30)
            .build();

        assert_eq!(
            filter.conditions[0].value,
            Some(FilterValue::List(vec!["admin".into(), "owner".into()]))
        );
        assert_eq!(filter.conditions[2].value, None);
        assert_eq!(filter.conditions[3].operator, Operator::IsNotNull);
        assert_eq!(filter.conditions[4].value, Some(FilterValue::range(18, 30)));
    }

    #[test]
    fn test_build_clamps_paging() {
        let filter = QueryBuilder::new().paginate(0, 1000).build();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 20);
    }

    #[test]
    fn test_build_swallows_structural_errors() {
        let filter = QueryBuilder::new().where_eq("", 1).page(-1).build();
        assert_eq!(filter.conditions.len(), 1);
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn test_try_build_propagates_structural_errors() {
        let err = QueryBuilder::new().where_eq("", 1).try_build().unwrap_err();
        assert_eq!(err, ValidationError::EmptyField);

        let err = QueryBuilder::new().order_by("", "desc").try_build().unwrap_err();
        assert_eq!(err, ValidationError::EmptySortField);

        let err = QueryBuilder::new().where_eq("email", None::<String>).try_build().unwrap_err();
        assert_eq!(err.field(), Some("email"));
    }

    #[test]
    fn test_ordering_and_projection() {
        let filter = QueryBuilder::new()
            .order_by("name", "sideways")
            .order_by_desc("created_at")
            .select(["id", "name"])
            .omit(["password_hash"])
            .include("profile")
            .build();
        assert_eq!(filter.order_by[0].direction, SortDirection::Asc);
        assert_eq!(filter.order_by[1].direction, SortDirection::Desc);
        assert_eq!(filter.select, vec!["id", "name"]);
        assert_eq!(filter.omit, vec!["password_hash"]);
        assert_eq!(filter.include, vec!["profile"]);
    }

    #[test]
    fn test_soft_delete_flags() {
        let filter = QueryBuilder::new().with_deleted().only_deleted().build();
        assert!(filter.include_deleted);
        assert!(filter.only_deleted);
        assert_eq!(filter.soft_delete_mode(), crate::SoftDeleteMode::OnlyDeleted);
    }

    #[test]
    fn test_or_where_and_grouping() {
        let filter = QueryBuilder::new()
            .where_eq("role", "admin")
            .or_where(vec![Condition::new("role", Operator::Eq, "owner")])
            .group_by("role")
            .having("count", Operator::Gt, 1)
            .build();
        assert_eq!(filter.or_groups.len(), 1);
        assert_eq!(filter.group_by, vec!["role"]);
        assert_eq!(filter.having.len(), 1);
    }

    #[test]
    fn test_created_today_is_between_on_created_at() {
        let before = Utc::now();
        let filter = QueryBuilder::new().created_today().build();
        let condition = only_condition(&filter);
        assert_eq!(condition.field, CREATED_AT);
        assert_eq!(condition.operator, Operator::Between);

        let (start, end) = condition.value.as_ref().and_then(|v| v.as_range()).unwrap();
        match (start, end) {
            (FilterValue::Timestamp(start), FilterValue::Timestamp(end)) => {
                assert!(*start <= before);
                assert!(before < *end);
                assert_eq!(*end - *start, chrono::Duration::days(1));
            }
            other => panic!("expected timestamps, got {other:?}"),
        }
    }

    #[test]
    fn test_created_week_and_month_windows() {
        let week = QueryBuilder::new().created_this_week().build();
        let month = QueryBuilder::new().created_this_month().build();
        assert_eq!(only_condition(&week).operator, Operator::Between);
        assert_eq!(only_condition(&month).field, CREATED_AT);
    }

    #[test]
    fn test_reset() {
        let mut builder = QueryBuilder::new();
        builder.where_eq("a", 1).paginate(5, 50).with_deleted();
        builder.reset();
        let filter = builder.build();
        assert_eq!(filter, QueryFilter::default());
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 20);
    }

    #[test]
    fn test_builder_is_reusable_after_build() {
        let mut builder = QueryBuilder::new();
        builder.where_eq("a", 1);
        let first = builder.build();
        builder.where_eq("b", 2);
        let second = builder.build();
        assert_eq!(first.conditions.len(), 1);
        assert_eq!(second.conditions.len(), 2);
    }
}
