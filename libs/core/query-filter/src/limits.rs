use core_config::{ConfigError, FromEnv, env_parse};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_WINDOW: i64 = 5;

/// Paging bounds applied when a filter is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Replaces any page size outside `[1, max_page_size]`.
    pub default_page_size: i64,
    pub max_page_size: i64,
    /// Width of the page-number window shown around the current page.
    pub page_window: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            page_window: DEFAULT_PAGE_WINDOW,
        }
    }
}

impl PageLimits {
    /// Clamp a page number: anything below 1 becomes 1.
    pub fn clamp_page(&self, page: i64) -> i64 {
        if page < DEFAULT_PAGE { DEFAULT_PAGE } else { page }
    }

    /// Clamp a page size: anything outside `[1, max_page_size]` becomes the default.
    pub fn clamp_page_size(&self, page_size: i64) -> i64 {
        if (1..=self.max_page_size).contains(&page_size) {
            page_size
        } else {
            self.default_page_size
        }
    }
}

impl FromEnv for PageLimits {
    /// Reads from environment variables with the built-in defaults:
    /// - QUERY_DEFAULT_PAGE_SIZE: defaults to 20
    /// - QUERY_MAX_PAGE_SIZE: defaults to 100
    /// - QUERY_PAGE_WINDOW: defaults to 5
    fn from_env() -> Result<Self, ConfigError> {
        let max_page_size = env_parse("QUERY_MAX_PAGE_SIZE", MAX_PAGE_SIZE)?;
        let default_page_size = env_parse("QUERY_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let page_window = env_parse("QUERY_PAGE_WINDOW", DEFAULT_PAGE_WINDOW)?;

        if max_page_size < 1 {
            return Err(ConfigError::ParseError {
                key: "QUERY_MAX_PAGE_SIZE".to_string(),
                details: format!("must be at least 1, got {max_page_size}"),
            });
        }
        if !(1..=max_page_size).contains(&default_page_size) {
            return Err(ConfigError::ParseError {
                key: "QUERY_DEFAULT_PAGE_SIZE".to_string(),
                details: format!("must be within 1..={max_page_size}, got {default_page_size}"),
            });
        }

        if page_window < 1 {
            return Err(ConfigError::ParseError {
                key: "QUERY_PAGE_WINDOW".to_string(),
                details: format!("must be at least 1, got {page_window}"),
            });
        }

        Ok(Self {
            default_page_size,
            max_page_size,
            page_window,
        })
    }
}
