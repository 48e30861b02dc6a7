use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{Condition, OrderBy};
use crate::error::ValidationError;
use crate::limits::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, PageLimits};

/// Visibility of soft-deleted rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoftDeleteMode {
    /// Live rows only.
    #[default]
    ExcludeDeleted,
    /// Live and soft-deleted rows.
    IncludeDeleted,
    /// Soft-deleted rows only.
    OnlyDeleted,
}

/// Declarative, storage-agnostic query.
///
/// Row selection is `(all of conditions) OR (all of or_groups[0]) OR ...`:
/// each OR-group is AND-ed internally and OR-ed against the `conditions`
/// clause as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    #[serde(rename = "where")]
    pub conditions: Vec<Condition>,
    #[serde(rename = "or")]
    pub or_groups: Vec<Vec<Condition>>,
    pub order_by: Vec<OrderBy>,

    pub page: i64,
    pub page_size: i64,

    pub include: Vec<String>,
    pub select: Vec<String>,
    pub omit: Vec<String>,

    pub include_deleted: bool,
    pub only_deleted: bool,

    pub group_by: Vec<String>,
    pub having: Vec<Condition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            or_groups: Vec::new(),
            order_by: Vec::new(),
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            include: Vec::new(),
            select: Vec::new(),
            omit: Vec::new(),
            include_deleted: false,
            only_deleted: false,
            group_by: Vec::new(),
            having: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp paging and validate conditions and ordering with the default limits.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.validate_with(&PageLimits::default())
    }

    /// Clamp `page` and `page_size` in place, then validate every condition
    /// in `conditions` and every entry of `order_by`.
    ///
    /// Clamping never fails. The first structural error is returned as is;
    /// later ones are not collected. Running this twice is the same as
    /// running it once.
    pub fn validate_with(&mut self, limits: &PageLimits) -> Result<(), ValidationError> {
        let page = limits.clamp_page(self.page);
        if page != self.page {
            debug!(requested = self.page, clamped = page, "Clamped page");
            self.page = page;
        }

        let page_size = limits.clamp_page_size(self.page_size);
        if page_size != self.page_size {
            debug!(requested = self.page_size, clamped = page_size, "Clamped page size");
            self.page_size = page_size;
        }

        self.conditions.iter().try_for_each(Condition::validate)?;
        self.order_by.iter().try_for_each(OrderBy::validate)
    }

    /// Rows to skip: an explicit non-negative `offset` wins, otherwise
    /// `(page - 1) * page_size`.
    pub fn offset(&self) -> i64 {
        match self.offset {
            Some(offset) if offset >= 0 => offset,
            _ => self.page.saturating_sub(1).max(0).saturating_mul(self.page_size),
        }
    }

    /// Rows to fetch: an explicit positive `limit` wins, otherwise `page_size`.
    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => self.page_size,
        }
    }

    /// `only_deleted` takes precedence over `include_deleted`.
    pub fn soft_delete_mode(&self) -> SoftDeleteMode {
        if self.only_deleted {
            SoftDeleteMode::OnlyDeleted
        } else if self.include_deleted {
            SoftDeleteMode::IncludeDeleted
        } else {
            SoftDeleteMode::ExcludeDeleted
        }
    }

    /// The same row selection with paging and ordering removed, as used to
    /// count the total behind a page.
    pub fn without_paging(&self) -> QueryFilter {
        QueryFilter {
            order_by: Vec::new(),
            page: DEFAULT_PAGE,
            page_size: self.page_size,
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// True when the filter selects every live row.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.or_groups.is_empty()
    }
}
