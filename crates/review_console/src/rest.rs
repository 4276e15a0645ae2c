use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ContentKind, ItemId, ReviewDecision, ReviewStatus, StatusCounts},
    error::ApiError,
    protocol::{CountsQuery, ListQuery, Paginated, ReviewRequest, ReviewableItem},
};
use tracing::debug;

use crate::{
    adapter::{PageResult, ReviewableEntity},
    error::AdapterError,
};

/// How per-status totals are obtained from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStrategy {
    /// `GET <collection>/counts` returning all three totals at once.
    Dedicated,
    /// Three `limit=1` list calls whose `pagination.total` values are combined.
    ListProbe,
}

impl CountStrategy {
    pub fn for_kind(kind: ContentKind) -> Self {
        if kind.has_count_endpoint() {
            CountStrategy::Dedicated
        } else {
            CountStrategy::ListProbe
        }
    }
}

pub struct RestReviewAdapter {
    http: Client,
    server_url: String,
    kind: ContentKind,
    bearer_token: Option<String>,
    count_strategy: CountStrategy,
}

impl RestReviewAdapter {
    pub fn new(server_url: impl Into<String>, kind: ContentKind) -> Self {
        Self::with_client(Client::new(), server_url, kind)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>, kind: ContentKind) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            server_url,
            kind,
            bearer_token: None,
            count_strategy: CountStrategy::for_kind(kind),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_count_strategy(mut self, count_strategy: CountStrategy) -> Self {
        self.count_strategy = count_strategy;
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.server_url, self.kind.collection())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list(
        &self,
        status: ReviewStatus,
        page: u32,
        limit: u32,
        query: &str,
    ) -> Result<Paginated<ReviewableItem>, AdapterError> {
        let response = self
            .authorize(self.http.get(self.collection_url()))
            .query(&ListQuery {
                status,
                page,
                limit,
                query: query.to_string(),
            })
            .send()
            .await?;
        read_json(response).await
    }

    async fn probe_total(&self, status: ReviewStatus, query: &str) -> Result<u64, AdapterError> {
        Ok(self.list(status, 1, 1, query).await?.pagination.total)
    }
}

#[async_trait]
impl ReviewableEntity for RestReviewAdapter {
    type Item = ReviewableItem;

    fn kind_label(&self) -> &str {
        self.kind.collection()
    }

    async fn fetch_page(
        &self,
        status: ReviewStatus,
        page: u32,
        limit: u32,
        query: &str,
    ) -> Result<PageResult<ReviewableItem>, AdapterError> {
        let body = self.list(status, page, limit, query).await?;
        Ok(PageResult::new(body.data, body.pagination.total_pages))
    }

    async fn fetch_counts(&self, query: &str) -> Result<StatusCounts, AdapterError> {
        match self.count_strategy {
            CountStrategy::Dedicated => {
                let response = self
                    .authorize(self.http.get(format!("{}/counts", self.collection_url())))
                    .query(&CountsQuery {
                        query: query.to_string(),
                    })
                    .send()
                    .await?;
                read_json(response).await
            }
            CountStrategy::ListProbe => {
                let (pending, approved, rejected) = futures::try_join!(
                    self.probe_total(ReviewStatus::Pending, query),
                    self.probe_total(ReviewStatus::Approved, query),
                    self.probe_total(ReviewStatus::Rejected, query),
                )?;
                Ok(StatusCounts::new(pending, approved, rejected))
            }
        }
    }

    async fn apply_review(
        &self,
        id: &ItemId,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> Result<ReviewableItem, AdapterError> {
        debug!(kind = %self.kind, item_id = %id, decision = %decision, "rest: submitting review");
        let response = self
            .authorize(
                self.http
                    .post(format!("{}/review/{}", self.collection_url(), id.as_str())),
            )
            .json(&ReviewRequest {
                action: decision,
                comment: comment.map(str::to_string),
            })
            .send()
            .await?;
        read_json(response).await
    }

    async fn remove(&self, id: &ItemId) -> Result<(), AdapterError> {
        debug!(kind = %self.kind, item_id = %id, "rest: deleting item");
        let response = self
            .authorize(
                self.http
                    .delete(format!("{}/{}", self.collection_url(), id.as_str())),
            )
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AdapterError> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| AdapterError::network(format!("invalid response body: {e}")))
}

/// Maps non-2xx responses onto the adapter taxonomy, preferring the server's
/// `ApiError` message when the body carries one. An `unauthorized`/`forbidden`
/// error code counts as an authorization failure whatever the status.
async fn check_status(response: Response) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let api_error = serde_json::from_str::<ApiError>(&body).ok();
    let denied = status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || api_error.as_ref().is_some_and(ApiError::is_authorization);
    let message = api_error
        .map(|err| err.message)
        .unwrap_or_else(|| format!("server responded with {status}"));

    if denied {
        Err(AdapterError::Authorization(message))
    } else {
        Err(AdapterError::Network(message))
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
