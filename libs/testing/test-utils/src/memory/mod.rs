//! In-memory [`Repository`] backend.
//!
//! Rows live in a `Vec` behind a `tokio::sync::RwLock` and are evaluated by
//! serializing them to JSON, so any serde entity works without per-type
//! query code. Not tuned for large data sets.

mod eval;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use query_filter::repository::PRIMARY_KEY;
use query_filter::{
    FilterValue, QueryFilter, Repository, RepositoryError, RepositoryResult, SoftDeleteMode,
    Transactional,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A row the in-memory backend can store.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> Uuid;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn set_deleted_at(&mut self, deleted_at: Option<DateTime<Utc>>);

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// In-memory implementation of [`Repository`] and [`Transactional`]
#[derive(Debug, Clone)]
pub struct InMemoryRepository<T: Entity> {
    rows: Arc<RwLock<Vec<T>>>,
    tx_lock: Arc<Mutex<()>>,
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            tx_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Pre-populated store; ids are not checked for duplicates.
    pub fn with_rows(rows: Vec<T>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            tx_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Every stored row, soft-deleted ones included, in insertion order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.rows.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Identity of the shared row store; clones report the same key.
    fn store_key(&self) -> usize {
        Arc::as_ptr(&self.rows) as usize
    }
}

fn to_row<T: Entity>(entity: &T) -> RepositoryResult<Value> {
    serde_json::to_value(entity).map_err(|e| RepositoryError::Backend(e.to_string()))
}

fn visible<T: Entity>(entity: &T, mode: SoftDeleteMode) -> bool {
    match mode {
        SoftDeleteMode::ExcludeDeleted => !entity.is_deleted(),
        SoftDeleteMode::IncludeDeleted => true,
        SoftDeleteMode::OnlyDeleted => entity.is_deleted(),
    }
}

/// Validated copy of `filter`.
fn checked(filter: &QueryFilter) -> RepositoryResult<QueryFilter> {
    let mut filter = filter.clone();
    filter.validate()?;
    Ok(filter)
}

/// Positions of matching rows in the filter's order, with their JSON form.
/// Paging is not applied.
fn select<T: Entity>(rows: &[T], filter: &QueryFilter) -> RepositoryResult<Vec<(usize, Value)>> {
    let mode = filter.soft_delete_mode();
    let mut selected = Vec::new();
    for (index, entity) in rows.iter().enumerate() {
        if !visible(entity, mode) {
            continue;
        }
        let row = to_row(entity)?;
        if eval::matches(&row, filter) {
            selected.push((index, row));
        }
    }

    if !filter.order_by.is_empty() {
        selected.sort_by(|(_, a), (_, b)| eval::compare_rows(a, b, &filter.order_by));
    }
    Ok(selected)
}

fn window<I: Iterator>(iter: I, filter: &QueryFilter) -> impl Iterator<Item = I::Item> {
    let skip = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
    let take = usize::try_from(filter.limit()).unwrap_or(0);
    iter.skip(skip).take(take)
}

/// Values of `field` across the selection. A field no selected row has is
/// reported as unknown.
fn column(selected: &[(usize, Value)], field: &str) -> RepositoryResult<Vec<Value>> {
    let values: Vec<Value> = selected
        .iter()
        .filter_map(|(_, row)| eval::lookup(row, field).cloned())
        .collect();
    if values.is_empty() && !selected.is_empty() {
        return Err(RepositoryError::UnknownField(field.to_string()));
    }
    Ok(values)
}

fn numbers(values: &[Value]) -> Vec<f64> {
    values.iter().filter_map(Value::as_f64).collect()
}

fn count_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl<T: Entity> InMemoryRepository<T> {
    async fn selection(&self, filter: &QueryFilter) -> RepositoryResult<Vec<(usize, Value)>> {
        let filter = checked(filter)?;
        let rows = self.rows.read().await;
        select(&rows, &filter)
    }

    async fn extreme(
        &self,
        field: &str,
        filter: &QueryFilter,
        pick: std::cmp::Ordering,
    ) -> RepositoryResult<Option<FilterValue>> {
        let selected = self.selection(filter).await?;
        let values = column(&selected, field)?;
        let best = values
            .iter()
            .filter(|v| !v.is_null())
            .reduce(|best, v| {
                if eval::compare_values(v, best) == pick {
                    v
                } else {
                    best
                }
            });
        Ok(best.map(eval::to_filter_value))
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    type Id = Uuid;

    #[instrument(skip(self, entity), fields(id = %entity.id()))]
    async fn create(&self, entity: T) -> RepositoryResult<T> {
        let mut rows = self.rows.write().await;
        let id = entity.id();
        if rows.iter().any(|r| r.id() == id) {
            return Err(RepositoryError::Conflict(format!("duplicate id {id}")));
        }
        rows.push(entity.clone());

        info!(id = %id, "Created record");
        Ok(entity)
    }

    #[instrument(skip(self, entity), fields(id = %entity.id()))]
    async fn update(&self, entity: T) -> RepositoryResult<T> {
        let mut rows = self.rows.write().await;
        let id = entity.id();
        let slot = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        *slot = entity.clone();

        info!(id = %id, "Updated record");
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id && !r.is_deleted())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        row.set_deleted_at(Some(Utc::now()));

        info!(id = %id, "Soft deleted record");
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> RepositoryResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        row.set_deleted_at(None);

        info!(id = %id, "Restored record");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<T> {
        let rows = self.rows.read().await;
        rows.iter()
            .find(|r| r.id() == id && !r.is_deleted())
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn find_one(&self, filter: &QueryFilter) -> RepositoryResult<T> {
        let filter = checked(filter)?;
        let rows = self.rows.read().await;
        select(&rows, &filter)?
            .first()
            .map(|(index, _)| rows[*index].clone())
            .ok_or_else(|| RepositoryError::NotFound("no record matches the filter".to_string()))
    }

    async fn find_many(&self, filter: &QueryFilter) -> RepositoryResult<Vec<T>> {
        let filter = checked(filter)?;
        let rows = self.rows.read().await;
        let selected = select(&rows, &filter)?;
        let page: Vec<T> = window(selected.into_iter(), &filter)
            .map(|(index, _)| rows[index].clone())
            .collect();

        debug!(returned = page.len(), "Fetched records");
        Ok(page)
    }

    async fn count(&self, filter: &QueryFilter) -> RepositoryResult<i64> {
        let selected = self.selection(filter).await?;
        Ok(i64::try_from(selected.len()).unwrap_or(i64::MAX))
    }

    async fn sum(&self, field: &str, filter: &QueryFilter) -> RepositoryResult<f64> {
        let selected = self.selection(filter).await?;
        Ok(numbers(&column(&selected, field)?).iter().sum())
    }

    async fn avg(&self, field: &str, filter: &QueryFilter) -> RepositoryResult<Option<f64>> {
        let selected = self.selection(filter).await?;
        let values = numbers(&column(&selected, field)?);
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    async fn min(
        &self,
        field: &str,
        filter: &QueryFilter,
    ) -> RepositoryResult<Option<FilterValue>> {
        self.extreme(field, filter, std::cmp::Ordering::Less).await
    }

    async fn max(
        &self,
        field: &str,
        filter: &QueryFilter,
    ) -> RepositoryResult<Option<FilterValue>> {
        self.extreme(field, filter, std::cmp::Ordering::Greater).await
    }

    /// All or nothing: one conflicting id rejects the whole batch.
    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn create_many(&self, entities: Vec<T>) -> RepositoryResult<u64> {
        let mut rows = self.rows.write().await;
        for (position, entity) in entities.iter().enumerate() {
            let id = entity.id();
            let duplicated = rows.iter().any(|r| r.id() == id)
                || entities[..position].iter().any(|e| e.id() == id);
            if duplicated {
                return Err(RepositoryError::Conflict(format!("duplicate id {id}")));
            }
        }

        let created = count_u64(entities.len());
        rows.extend(entities);

        info!(created, "Created records");
        Ok(created)
    }

    /// Applies to every matching row; paging is ignored.
    #[instrument(skip(self, filter, changes))]
    async fn update_many(
        &self,
        filter: &QueryFilter,
        changes: HashMap<String, FilterValue>,
    ) -> RepositoryResult<u64> {
        if changes.contains_key(PRIMARY_KEY) {
            return Err(RepositoryError::Conflict(format!(
                "{PRIMARY_KEY} cannot be changed in bulk"
            )));
        }
        let filter = checked(filter)?;
        let mut rows = self.rows.write().await;

        let mut updated = Vec::new();
        for (index, mut row) in select(&rows, &filter)? {
            let object = row
                .as_object_mut()
                .ok_or_else(|| RepositoryError::Backend("row is not an object".to_string()))?;
            for (field, value) in &changes {
                let slot = object
                    .get_mut(field)
                    .ok_or_else(|| RepositoryError::UnknownField(field.clone()))?;
                *slot = eval::to_json(value);
            }
            let entity: T = serde_json::from_value(row)
                .map_err(|e| RepositoryError::Backend(e.to_string()))?;
            updated.push((index, entity));
        }

        let count = count_u64(updated.len());
        for (index, entity) in updated {
            rows[index] = entity;
        }

        info!(updated = count, "Updated records");
        Ok(count)
    }

    /// Soft deletes every matching live row; paging is ignored.
    #[instrument(skip(self, filter))]
    async fn delete_many(&self, filter: &QueryFilter) -> RepositoryResult<u64> {
        let filter = checked(filter)?;
        let mut rows = self.rows.write().await;
        let now = Utc::now();

        let targets: Vec<usize> = select(&rows, &filter)?
            .into_iter()
            .map(|(index, _)| index)
            .filter(|index| !rows[*index].is_deleted())
            .collect();
        for index in &targets {
            rows[*index].set_deleted_at(Some(now));
        }

        let deleted = count_u64(targets.len());
        info!(deleted, "Soft deleted records");
        Ok(deleted)
    }

    /// First-seen order; NULL counts as a value.
    async fn distinct(
        &self,
        field: &str,
        filter: &QueryFilter,
    ) -> RepositoryResult<Vec<FilterValue>> {
        let selected = self.selection(filter).await?;
        let mut seen: Vec<Value> = Vec::new();
        for value in column(&selected, field)? {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        Ok(seen.iter().map(eval::to_filter_value).collect())
    }

    async fn group_by(
        &self,
        field: &str,
        filter: &QueryFilter,
    ) -> RepositoryResult<HashMap<String, Vec<T>>> {
        let filter = checked(filter)?;
        let rows = self.rows.read().await;
        let selected = select(&rows, &filter)?;
        column(&selected, field)?;

        let mut groups: HashMap<String, Vec<T>> = HashMap::new();
        for (index, row) in &selected {
            let key = eval::group_key(eval::lookup(row, field).unwrap_or(&Value::Null));
            groups.entry(key).or_default().push(rows[*index].clone());
        }
        Ok(groups)
    }
}

tokio::task_local! {
    /// Stores with a transaction open on the current task.
    static OPEN_TRANSACTIONS: HashSet<usize>;
}

/// Transactions are serialized and roll back by restoring a snapshot
/// taken on entry. Writes made outside a transaction while one is open are
/// lost on rollback.
///
/// A transaction opened from inside another one on the same store joins
/// it: the inner call neither locks nor snapshots, and only the outermost
/// call commits or rolls back.
#[async_trait]
impl<T: Entity> Transactional for InMemoryRepository<T> {
    async fn with_transaction<R, F>(&self, f: F) -> RepositoryResult<R>
    where
        R: Send + 'static,
        F: for<'tx> FnOnce(&'tx Self) -> BoxFuture<'tx, RepositoryResult<R>> + Send + 'static,
    {
        let store = self.store_key();
        let mut open = OPEN_TRANSACTIONS
            .try_with(|open| open.clone())
            .unwrap_or_default();
        if open.contains(&store) {
            debug!("Joined enclosing transaction");
            return f(self).await;
        }

        let _serialized = self.tx_lock.lock().await;
        let snapshot = self.rows.read().await.clone();
        debug!(rows = snapshot.len(), "Began transaction");

        open.insert(store);
        match OPEN_TRANSACTIONS.scope(open, f(self)).await {
            Ok(value) => {
                debug!("Committed transaction");
                Ok(value)
            }
            Err(err) => {
                *self.rows.write().await = snapshot;
                warn!(error = %err, "Rolled back transaction");
                Err(err)
            }
        }
    }
}
