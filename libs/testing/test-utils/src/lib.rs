//! Shared test utilities for query-filter consumers
//!
//! This crate provides reusable test infrastructure:
//! - `InMemoryRepository`: a reference `Repository` backend over a `Vec`
//! - `TestDataBuilder`: Deterministic test data generation
//! - `User`: the fixture entity the builder produces
//! - `assertions`: Custom assertion helpers
//!
//! # Usage
//!
//! ```rust,no_run
//! use query_filter::{specs, Repository, Specification};
//! use test_utils::{InMemoryRepository, TestDataBuilder, User};
//!
//! #[tokio::test]
//! async fn my_repository_test() {
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!     let repo = InMemoryRepository::with_rows(builder.users(50));
//!
//!     let admins: Specification<User> = specs::active_admins();
//!     let page = repo.paginate(&admins.to_query_filter()).await.unwrap();
//!     assert!(page.pagination.total_items > 0);
//! }
//! ```

mod fixtures;
mod memory;

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Once;
use uuid::Uuid;

pub use fixtures::{ROLES, User};
pub use memory::{Entity, InMemoryRepository};

static TRACING: Once = Once::new();

/// Install the development tracing subscriber once per test binary.
/// `RUST_LOG` still controls the level.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        core_config::tracing::init_tracing(&core_config::Environment::Development);
    });
}

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_paginate_users");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic id for the `index`-th generated row
    pub fn user_id(&self, index: u64) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[8..].copy_from_slice(&index.to_be_bytes());
        Uuid::from_bytes(bytes)
    }

    /// Generate a unique name for testing
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.name("user", "3"), "test-user-7-3");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Fixed reference instant all generated timestamps are derived from.
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// The `index`-th user.
    ///
    /// Roles cycle through [`ROLES`], every fourth user is inactive, ages
    /// run 20..60 and `created_at` steps one hour per index from [`epoch`](Self::epoch).
    pub fn user(&self, index: u64) -> User {
        let slot = usize::try_from(index % ROLES.len() as u64).unwrap_or(0);
        User {
            id: self.user_id(index),
            name: self.name("user", &index.to_string()),
            email: format!("user{index}@example.com"),
            role: ROLES[slot].to_string(),
            is_active: index % 4 != 0,
            age: 20 + i64::try_from(index % 40).unwrap_or(0),
            created_at: Self::epoch() + Duration::hours(i64::try_from(index).unwrap_or(0)),
            deleted_at: None,
        }
    }

    /// Users `0..count`.
    pub fn users(&self, count: u64) -> Vec<User> {
        (0..count).map(|i| self.user(i)).collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    use query_filter::PaginationMeta;
    use uuid::Uuid;

    /// Assert that two UUIDs are equal with a nice error message
    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert page position: current page, total pages and rows on the page
    pub fn assert_page(meta: &PaginationMeta, current: i64, total_pages: i64, items: i64) {
        assert_eq!(
            (meta.current_page, meta.total_pages, meta.items_in_page),
            (current, total_pages, items),
            "page metadata mismatch: {:?}",
            meta
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.user_id(0), builder2.user_id(0));
        assert_eq!(builder1.user(5), builder2.user(5));
    }

    #[test]
    fn test_data_builder_from_name() {
        let builder1 = TestDataBuilder::from_test_name("my_test");
        let builder2 = TestDataBuilder::from_test_name("my_test");

        assert_eq!(builder1.user_id(1), builder2.user_id(1));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        // Different test names should generate different data
        assert_ne!(builder1.user_id(0), builder2.user_id(0));
    }

    #[test]
    fn test_user_ids_are_unique_and_ordered() {
        let users = TestDataBuilder::new(1).users(10);
        for pair in users.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[test]
    fn test_user_distribution() {
        let users = TestDataBuilder::new(3).users(12);
        let admins = users.iter().filter(|u| u.role == "admin").count();
        let inactive = users.iter().filter(|u| !u.is_active).count();
        assert_eq!(admins, 4);
        assert_eq!(inactive, 3);
        assert!(users.iter().all(|u| u.deleted_at.is_none()));
    }

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
