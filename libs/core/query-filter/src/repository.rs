//! Storage contract for consuming a [`QueryFilter`].
//!
//! Implementations translate filters into their own query language. The
//! engine never performs I/O itself: callers build a filter synchronously
//! and hand it off. Cancellation is the caller's business; dropping a
//! returned future abandons the operation.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use tracing::debug;

use crate::condition::OrderBy;
use crate::error::{RepositoryError, RepositoryResult};
use crate::filter::QueryFilter;
use crate::pagination::PaginatedResult;
use crate::value::FilterValue;

/// Column used to order `find_first` / `find_last` when the filter has no ordering.
pub const PRIMARY_KEY: &str = "id";

/// Generic persistence interface for entities of type `T`.
///
/// `T` is a plain data carrier; nothing is required of it here.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Primary key type.
    type Id: Send + Sync + 'static;

    /// Insert a new row and return it as stored.
    async fn create(&self, entity: T) -> RepositoryResult<T>;

    /// Replace the row with the same id; [`RepositoryError::NotFound`] when absent.
    async fn update(&self, entity: T) -> RepositoryResult<T>;

    /// Soft delete.
    async fn delete(&self, id: Self::Id) -> RepositoryResult<()>;

    /// Undo a soft delete.
    async fn restore(&self, id: Self::Id) -> RepositoryResult<()>;

    /// Fails with [`RepositoryError::NotFound`] when nothing matches.
    async fn find_by_id(&self, id: Self::Id) -> RepositoryResult<T>;

    /// The first matching row; [`RepositoryError::NotFound`] when none.
    async fn find_one(&self, filter: &QueryFilter) -> RepositoryResult<T>;

    /// Every matching row within the filter's offset/limit window.
    async fn find_many(&self, filter: &QueryFilter) -> RepositoryResult<Vec<T>>;

    /// Number of matching rows, ignoring paging.
    async fn count(&self, filter: &QueryFilter) -> RepositoryResult<i64>;

    /// Sum of `field` over matching rows; `0.0` when none match.
    async fn sum(&self, field: &str, filter: &QueryFilter) -> RepositoryResult<f64>;

    /// `None` when no row matches.
    async fn avg(&self, field: &str, filter: &QueryFilter) -> RepositoryResult<Option<f64>>;

    /// Smallest value of `field` among matching rows.
    async fn min(&self, field: &str, filter: &QueryFilter)
    -> RepositoryResult<Option<FilterValue>>;

    /// Largest value of `field` among matching rows.
    async fn max(&self, field: &str, filter: &QueryFilter)
    -> RepositoryResult<Option<FilterValue>>;

    /// Returns the number of rows written.
    async fn create_many(&self, entities: Vec<T>) -> RepositoryResult<u64>;

    /// Set `changes` on every matching row; returns the number of rows touched.
    async fn update_many(
        &self,
        filter: &QueryFilter,
        changes: HashMap<String, FilterValue>,
    ) -> RepositoryResult<u64>;

    /// Soft delete every matching row; returns the number of rows touched.
    async fn delete_many(&self, filter: &QueryFilter) -> RepositoryResult<u64>;

    /// Unique values of `field` among matching rows.
    async fn distinct(&self, field: &str, filter: &QueryFilter)
    -> RepositoryResult<Vec<FilterValue>>;

    /// Matching rows bucketed by the string form of `field`.
    async fn group_by(
        &self,
        field: &str,
        filter: &QueryFilter,
    ) -> RepositoryResult<HashMap<String, Vec<T>>>;

    /// Whether any row matches.
    async fn exists(&self, filter: &QueryFilter) -> RepositoryResult<bool> {
        Ok(self.count(filter).await? > 0)
    }

    /// First row under the filter's ordering, or by primary key when unordered.
    async fn find_first(&self, filter: &QueryFilter) -> RepositoryResult<T> {
        let first = single_row(filter, ordering_or_primary_key(filter));
        self.find_many(&first)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::NotFound("no record matches the filter".to_string()))
    }

    /// Last row under the filter's ordering, or by primary key when unordered.
    async fn find_last(&self, filter: &QueryFilter) -> RepositoryResult<T> {
        let reversed = ordering_or_primary_key(filter)
            .into_iter()
            .map(|order| OrderBy {
                direction: order.direction.reversed(),
                ..order
            })
            .collect();
        let last = single_row(filter, reversed);
        self.find_many(&last)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::NotFound("no record matches the filter".to_string()))
    }

    /// One page of rows with exact metadata.
    ///
    /// The filter is validated (and clamped) first. The total is counted with
    /// the same selection as the page, minus paging, and the page is fetched
    /// through [`QueryFilter::offset`] / [`QueryFilter::limit`]. Overrides
    /// must keep those three steps consistent or the metadata is wrong.
    async fn paginate(&self, filter: &QueryFilter) -> RepositoryResult<PaginatedResult<T>> {
        let mut filter = filter.clone();
        filter.validate()?;

        let total = self.count(&filter.without_paging()).await?;
        let rows = self.find_many(&filter).await?;
        debug!(
            total,
            page = filter.page,
            offset = filter.offset(),
            limit = filter.limit(),
            returned = rows.len(),
            "Fetched page"
        );

        Ok(PaginatedResult::new(rows, total, filter.page, filter.page_size))
    }
}

/// Transactional scope over a repository.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// Run `f` inside a transaction: `Ok` commits, `Err` rolls back and is
    /// returned unchanged. A nested call joins the enclosing transaction, so
    /// only the outermost boundary commits or rolls back.
    async fn with_transaction<R, F>(&self, f: F) -> RepositoryResult<R>
    where
        R: Send + 'static,
        F: for<'tx> FnOnce(&'tx Self) -> BoxFuture<'tx, RepositoryResult<R>> + Send + 'static;
}

fn ordering_or_primary_key(filter: &QueryFilter) -> Vec<OrderBy> {
    if filter.order_by.is_empty() {
        vec![OrderBy::asc(PRIMARY_KEY)]
    } else {
        filter.order_by.clone()
    }
}

fn single_row(filter: &QueryFilter, order_by: Vec<OrderBy>) -> QueryFilter {
    QueryFilter {
        order_by,
        page: 1,
        limit: Some(1),
        offset: None,
        ..filter.clone()
    }
}
