//! Declarative query, specification and pagination engine.
//!
//! Filters are plain data that any storage backend can translate; the crate
//! does no I/O of its own.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐
//! │ QueryBuilder │   │ Specification  │  ← assemble / compose filters
//! └──────┬───────┘   └───────┬────────┘
//!        │                   │
//! ┌──────▼───────────────────▼──┐
//! │         QueryFilter         │  ← conditions, OR-groups, paging, ...
//! └──────────────┬──────────────┘
//!                │
//! ┌──────────────▼──────────────┐
//! │        Repository<T>        │  ← implemented by a storage backend
//! └──────────────┬──────────────┘
//!                │
//! ┌──────────────▼──────────────┐
//! │ PaginatedResult / Aggregate │  ← results with derived metadata
//! └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use query_filter::{specs, QueryBuilder, Specification};
//!
//! struct User;
//!
//! // Fluent construction
//! let filter = QueryBuilder::new()
//!     .where_eq("role", "admin")
//!     .where_starts_with("email", "ops")
//!     .order_by_desc("created_at")
//!     .paginate(1, 25)
//!     .build();
//! assert_eq!(filter.limit(), 25);
//!
//! // Composition
//! let spec: Specification<User> = specs::active().and(&specs::role("admin"));
//! assert_eq!(spec.to_query_filter().conditions.len(), 2);
//! ```

pub mod aggregation;
pub mod builder;
pub mod condition;
pub mod error;
pub mod filter;
pub mod limits;
pub mod operator;
pub mod pagination;
pub mod repository;
pub mod specification;
pub mod specs;
pub mod time_window;
pub mod value;

// Re-export commonly used types
pub use aggregation::AggregationResult;
pub use builder::QueryBuilder;
pub use condition::{Condition, OrderBy, SortDirection};
pub use error::{RepositoryError, RepositoryResult, ValidationError};
pub use filter::{QueryFilter, SoftDeleteMode};
pub use limits::PageLimits;
pub use operator::Operator;
pub use pagination::{PaginatedResult, PaginationMeta, calculate_total_pages};
pub use repository::{Repository, Transactional};
pub use specification::{Specification, any_specification, combine_specifications};
pub use value::FilterValue;
