//! In-memory store for tests.

use super::{CourseStore, Filters, StoreError};
use crate::models::CourseRecord;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What the mock does when asked for rows.
pub enum MockStoreBehavior {
    Rows(Vec<CourseRecord>),
    Timeout,
    Unavailable,
}

/// Mock course store returning canned rows and recording the last lookup.
pub struct MockCourseStore {
    behavior: MockStoreBehavior,
    calls: AtomicUsize,
    last_lookup: Mutex<Option<MockLookup>>,
}

/// Arguments of the most recent lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum MockLookup {
    Title { query: String, limit: usize, filters: Filters },
    Embedding { dims: usize, limit: usize },
}

impl MockCourseStore {
    pub fn new(behavior: MockStoreBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_lookup: Mutex::new(None),
        }
    }

    pub fn with_rows(rows: Vec<CourseRecord>) -> Self {
        Self::new(MockStoreBehavior::Rows(rows))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_lookup(&self) -> Option<MockLookup> {
        self.last_lookup.lock().ok().and_then(|guard| guard.clone())
    }

    fn respond(&self, lookup: MockLookup, limit: usize) -> Result<Vec<CourseRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_lookup.lock() {
            *guard = Some(lookup);
        }

        match &self.behavior {
            MockStoreBehavior::Rows(rows) => Ok(rows.iter().take(limit).cloned().collect()),
            MockStoreBehavior::Timeout => Err(StoreError::Timeout),
            MockStoreBehavior::Unavailable => Err(StoreError::NetworkError(
                "connection refused".to_string(),
            )),
        }
    }
}

#[async_trait]
impl CourseStore for MockCourseStore {
    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
        filters: &Filters,
    ) -> Result<Vec<CourseRecord>, StoreError> {
        self.respond(
            MockLookup::Title {
                query: query.to_string(),
                limit,
                filters: filters.clone(),
            },
            limit,
        )
    }

    async fn match_by_embedding(
        &self,
        embedding: &[f32],
        limit: usize,
        _filters: &Filters,
    ) -> Result<Vec<CourseRecord>, StoreError> {
        self.respond(
            MockLookup::Embedding {
                dims: embedding.len(),
                limit,
            },
            limit,
        )
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        match self.behavior {
            MockStoreBehavior::Rows(_) => Ok(()),
            MockStoreBehavior::Timeout => Err(StoreError::Timeout),
            MockStoreBehavior::Unavailable => Err(StoreError::NetworkError(
                "connection refused".to_string(),
            )),
        }
    }
}
