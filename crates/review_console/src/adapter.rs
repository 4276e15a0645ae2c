//! Per-content-kind binding consumed by [`crate::ReviewConsole`].

use async_trait::async_trait;
use shared::{
    domain::{ItemId, ReviewDecision, ReviewStatus, StatusCounts},
    protocol::ReviewableItem,
};

use crate::error::AdapterError;

/// The two fields the console interprets. Everything else is carried opaquely.
pub trait Reviewable: Clone + Send + Sync + 'static {
    fn item_id(&self) -> &ItemId;
    fn review_status(&self) -> ReviewStatus;
}

impl Reviewable for ReviewableItem {
    fn item_id(&self) -> &ItemId {
        &self.id
    }

    fn review_status(&self) -> ReviewStatus {
        self.status
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total_pages: u32) -> Self {
        Self { items, total_pages }
    }
}

#[async_trait]
pub trait ReviewableEntity: Send + Sync + 'static {
    type Item: Reviewable;

    /// Short name used in log fields.
    fn kind_label(&self) -> &str {
        "content"
    }

    async fn fetch_page(
        &self,
        status: ReviewStatus,
        page: u32,
        limit: u32,
        query: &str,
    ) -> Result<PageResult<Self::Item>, AdapterError>;

    async fn fetch_counts(&self, query: &str) -> Result<StatusCounts, AdapterError>;

    async fn apply_review(
        &self,
        id: &ItemId,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> Result<Self::Item, AdapterError>;

    async fn remove(&self, id: &ItemId) -> Result<(), AdapterError>;
}
