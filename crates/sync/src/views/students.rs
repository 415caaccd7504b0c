//! Student list query state.
//!
//! Tracks the list filters and turns them into the `students` query key.
//! Changing the search, status, or page size resets to page 1.
//! [`StudentSearch`] feeds raw search input through a debouncer so the
//! key only changes once typing pauses.

use std::time::Duration;

use fly8_api::StudentFilters;
use fly8_cache::QueryKey;
use fly8_core::models::{Student, StudentStatusFilter};
use fly8_core::pagination::{page_numbers, PageItem, Paginated};
use serde_json::Value;

use crate::debounce::Debouncer;
use crate::keys;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentQuery {
    filters: StudentFilters,
}

impl StudentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &StudentFilters {
        &self.filters
    }

    pub fn key(&self) -> QueryKey {
        keys::students(&self.filters)
    }

    /// Apply a (debounced) search term. Returns `true` if the key changed.
    pub fn set_search(&mut self, search: &str) -> bool {
        let search = search.trim();
        let next = (!search.is_empty()).then(|| search.to_string());
        if next == self.filters.search {
            return false;
        }
        self.filters.search = next;
        self.filters.page = 1;
        true
    }

    pub fn set_status(&mut self, status: StudentStatusFilter) -> bool {
        if status == self.filters.status {
            return false;
        }
        self.filters.status = status;
        self.filters.page = 1;
        true
    }

    pub fn set_limit(&mut self, limit: u32) -> bool {
        let limit = limit.max(1);
        if limit == self.filters.limit {
            return false;
        }
        self.filters.limit = limit;
        self.filters.page = 1;
        true
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        if page == self.filters.page {
            return false;
        }
        self.filters.page = page;
        true
    }

    /// Decode a cached `students` response.
    pub fn decode(data: &Value) -> Result<Paginated<Student>, serde_json::Error> {
        Paginated::from_value(data, "students")
    }

    /// Page strip for the current page.
    pub fn page_items(&self, total_pages: u32) -> Vec<PageItem> {
        page_numbers(self.filters.page, total_pages)
    }
}

// ---------------------------------------------------------------------------
// Debounced search
// ---------------------------------------------------------------------------

/// Student list query driven by debounced search input.
pub struct StudentSearch {
    query: StudentQuery,
    input: Debouncer<String>,
}

impl StudentSearch {
    /// Must be called from within a Tokio runtime.
    pub fn new(delay: Duration) -> Self {
        Self {
            query: StudentQuery::new(),
            input: Debouncer::new(String::new(), delay),
        }
    }

    /// Record the search box contents. Takes effect once input settles.
    pub fn input(&self, text: &str) {
        self.input.push(text.to_string());
    }

    pub fn query(&self) -> &StudentQuery {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut StudentQuery {
        &mut self.query
    }

    pub fn key(&self) -> QueryKey {
        self.query.key()
    }

    /// Wait for settled input that changes the search, apply it, and
    /// return the new key. `None` once the debouncer has stopped.
    pub async fn next_key(&mut self) -> Option<QueryKey> {
        loop {
            let term = self.input.settled().await?;
            if self.query.set_search(&term) {
                tracing::debug!(search = %term.trim(), "Student search settled");
                return Some(self.query.key());
            }
        }
    }
}
