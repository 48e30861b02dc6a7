use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::aggregation::AggregationResult;
use crate::filter::QueryFilter;
use crate::limits::{DEFAULT_PAGE_WINDOW, PageLimits};

/// `ceil(total / page_size)`, or 0 when `page_size <= 0`.
pub fn calculate_total_pages(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 || total <= 0 {
        return 0;
    }
    total / page_size + i64::from(total % page_size != 0)
}

/// Paging metadata derived from a total count and the rows actually returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub items_in_page: i64,
    pub has_previous: bool,
    pub has_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<i64>,
    /// 1-based index of the first row on this page.
    pub first_item_index: i64,
    /// 1-based, inclusive; follows the returned row count, so a short last
    /// page ends at the real last row.
    pub last_item_index: i64,
}

impl PaginationMeta {
    pub fn new(total_items: i64, page: i64, page_size: i64, items_in_page: i64) -> Self {
        let total_pages = calculate_total_pages(total_items, page_size);
        let has_previous = page > 1;
        let has_next = page < total_pages;
        let first_item_index = page
            .saturating_sub(1)
            .saturating_mul(page_size)
            .saturating_add(1);

        Self {
            current_page: page,
            total_pages,
            page_size,
            total_items,
            items_in_page,
            has_previous,
            has_next,
            previous_page: has_previous.then(|| page.saturating_sub(1)),
            next_page: has_next.then(|| page.saturating_add(1)),
            first_item_index,
            last_item_index: first_item_index.saturating_add(items_in_page).saturating_sub(1),
        }
    }

    /// Page numbers to show around the current page, at most `max_window` wide.
    ///
    /// The window is centred on the current page and shifted back inside
    /// `1..=total_pages` when it would overhang either end, so it is always
    /// full width when there are enough pages.
    pub fn page_range(&self, max_window: i64) -> Vec<i64> {
        if max_window <= 0 || self.total_pages <= 0 {
            return Vec::new();
        }
        if self.total_pages <= max_window {
            return (1..=self.total_pages).collect();
        }

        let last_start = self.total_pages - max_window + 1;
        let start = self
            .current_page
            .saturating_sub(max_window / 2)
            .clamp(1, last_start);

        (start..=start + max_window - 1).collect()
    }

    /// [`page_range`](Self::page_range) with a window of 5.
    pub fn default_page_range(&self) -> Vec<i64> {
        self.page_range(DEFAULT_PAGE_WINDOW)
    }

    /// [`page_range`](Self::page_range) with the configured window.
    pub fn page_range_with(&self, limits: &PageLimits) -> Vec<i64> {
        self.page_range(limits.page_window)
    }
}

/// One page of rows plus its paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<HashMap<String, AggregationResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_filters: Option<QueryFilter>,
}

impl<T> PaginatedResult<T> {
    /// `total` must be counted with the same selection that produced `data`.
    pub fn new(data: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let items_in_page = i64::try_from(data.len()).unwrap_or(i64::MAX);
        let pagination = PaginationMeta::new(total, page, page_size, items_in_page);
        debug!(
            total,
            page,
            page_size,
            items_in_page,
            total_pages = pagination.total_pages,
            "Built paginated result"
        );

        Self {
            data,
            pagination,
            aggregations: None,
            applied_filters: None,
        }
    }

    /// Attach a named aggregate.
    pub fn with_aggregation(mut self, name: impl Into<String>, result: AggregationResult) -> Self {
        self.aggregations
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), result);
        self
    }

    /// Replace all attached aggregates.
    pub fn with_aggregations(mut self, aggregations: HashMap<String, AggregationResult>) -> Self {
        self.aggregations = Some(aggregations);
        self
    }

    /// Record the filter the page was produced from.
    pub fn with_applied_filters(mut self, filter: QueryFilter) -> Self {
        self.applied_filters = Some(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn page_range(&self, max_window: i64) -> Vec<i64> {
        self.pagination.page_range(max_window)
    }

    pub fn page_range_with(&self, limits: &PageLimits) -> Vec<i64> {
        self.pagination.page_range_with(limits)
    }

    /// Convert every row, keeping metadata and annotations.
    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
            aggregations: self.aggregations,
            applied_filters: self.applied_filters,
        }
    }
}
