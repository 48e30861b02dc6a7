use std::fmt;
use std::marker::PhantomData;
use tracing::warn;

use crate::condition::Condition;
use crate::filter::QueryFilter;
use crate::operator::Operator;
use crate::value::FilterValue;

/// A reusable, composable predicate over entities of type `T`, expressed as
/// a [`QueryFilter`].
///
/// Combinators never touch their operands; each returns a fresh
/// specification, so a built specification can be shared freely.
///
/// The algebra works on the filter's `conditions` list:
///
/// - [`and`](Self::and) concatenates both condition lists.
/// - [`or`](Self::or) appends `other`'s conditions as one OR-group. Any
///   OR-groups already on `other` are dropped.
/// - [`not`](Self::not) inverts each condition's operator in place. OR-groups
///   are left alone, so negating a specification that has OR-groups does
///   not follow De Morgan's laws.
pub struct Specification<T> {
    filter: QueryFilter,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Specification<T> {
    /// Matches every row.
    pub fn empty() -> Self {
        Self::from_filter(QueryFilter::default())
    }

    pub fn from_filter(filter: QueryFilter) -> Self {
        Self {
            filter,
            _entity: PhantomData,
        }
    }

    pub fn from_condition(condition: Condition) -> Self {
        Self::from_filter(QueryFilter {
            conditions: vec![condition],
            ..Default::default()
        })
    }

    /// Single-condition specification `field operator value`.
    pub fn condition(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self::from_condition(Condition::new(field, operator, value))
    }

    /// Always `true`.
    ///
    /// Specifications are translated into queries; they are not evaluated
    /// against values in memory. Whether in-memory evaluation should come
    /// from reflection or from caller-supplied accessors is undecided, so
    /// this stays a placeholder and must not be used for filtering.
    pub fn is_satisfied_by(&self, _entity: &T) -> bool {
        true
    }

    /// The wrapped filter, unchanged.
    pub fn to_query_filter(&self) -> QueryFilter {
        self.filter.clone()
    }

    pub fn into_query_filter(self) -> QueryFilter {
        self.filter
    }

    /// Conjunction: this filter with `other`'s conditions appended.
    ///
    /// Everything besides `conditions` (ordering, paging, OR-groups, ...)
    /// comes from `self`.
    pub fn and(&self, other: &Specification<T>) -> Specification<T> {
        let mut filter = self.filter.clone();
        filter.conditions.extend(other.filter.conditions.iter().cloned());
        Self::from_filter(filter)
    }

    /// Disjunction: `other`'s conditions become one more OR-group.
    ///
    /// Only `other.conditions` is folded in; `other`'s own OR-groups are
    /// not carried over.
    pub fn or(&self, other: &Specification<T>) -> Specification<T> {
        let mut filter = self.filter.clone();
        filter.or_groups.push(other.filter.conditions.clone());
        Self::from_filter(filter)
    }

    /// Negation by operator inversion of each entry in `conditions`.
    ///
    /// Operators without an inverse (`ILIKE`, `STARTS_WITH`, `ENDS_WITH`,
    /// `CONTAINS`) are kept as they are.
    pub fn not(&self) -> Specification<T> {
        let mut filter = self.filter.clone();
        for condition in &mut filter.conditions {
            match condition.operator.inverse() {
                Some(inverse) => condition.operator = inverse,
                None => warn!(
                    field = %condition.field,
                    operator = %condition.operator,
                    "Operator has no inverse; condition left unchanged"
                ),
            }
        }
        Self::from_filter(filter)
    }
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self::from_filter(self.filter.clone())
    }
}

impl<T> Default for Specification<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("entity", &std::any::type_name::<T>())
            .field("filter", &self.filter)
            .finish()
    }
}

impl<T> From<QueryFilter> for Specification<T> {
    fn from(filter: QueryFilter) -> Self {
        Self::from_filter(filter)
    }
}

/// Left fold of [`Specification::and`]. No input matches everything.
pub fn combine_specifications<T, I>(specs: I) -> Specification<T>
where
    I: IntoIterator<Item = Specification<T>>,
{
    let mut specs = specs.into_iter();
    match specs.next() {
        Some(first) => specs.fold(first, |acc, spec| acc.and(&spec)),
        None => Specification::empty(),
    }
}

/// Left fold of [`Specification::or`]. No input matches everything.
pub fn any_specification<T, I>(specs: I) -> Specification<T>
where
    I: IntoIterator<Item = Specification<T>>,
{
    let mut specs = specs.into_iter();
    match specs.next() {
        Some(first) => specs.fold(first, |acc, spec| acc.or(&spec)),
        None => Specification::empty(),
    }
}
