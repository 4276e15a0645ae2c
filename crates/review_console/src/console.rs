//! Generic review console: one state machine shared by every moderation screen.
//!
//! Intents lock the state only for the synchronous part of a transition and
//! release it before awaiting the adapter, so intents issued from concurrent tasks
//! interleave freely. Every list fetch carries a request token; a response is applied
//! only if its token is still the latest issued one.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use shared::domain::{ItemId, ReviewDecision, ReviewStatus, StatusCounts};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    adapter::{PageResult, Reviewable, ReviewableEntity},
    error::{AdapterError, ConflictError, ConsoleErrorKind},
    location::ConsoleLocation,
    mutation_log::{Compensate, MutationLog},
};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub page_limit: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Error,
}

/// Render-ready state. Only the console mutates it; callers receive clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsoleState<T> {
    pub active_tab: ReviewStatus,
    pub page: u32,
    pub total_pages: u32,
    pub items: Vec<T>,
    pub counts: StatusCounts,
    pub query: String,
    pub status: LoadStatus,
    pub last_error: Option<AdapterError>,
}

impl<T> ConsoleState<T> {
    fn from_location(location: ConsoleLocation) -> Self {
        Self {
            active_tab: location.tab,
            page: location.page.max(1),
            total_pages: location.page.max(1),
            items: Vec::new(),
            counts: StatusCounts::default(),
            query: location.query,
            status: LoadStatus::Idle,
            last_error: None,
        }
    }

    pub fn location(&self) -> ConsoleLocation {
        ConsoleLocation {
            tab: self.active_tab,
            page: self.page,
            query: self.query.clone(),
        }
    }

    pub fn last_error_kind(&self) -> Option<ConsoleErrorKind> {
        self.last_error.as_ref().map(AdapterError::kind)
    }
}

/// How an intent concluded from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    /// The fetch result was applied, or the mutation was confirmed.
    Applied,
    /// Malformed arguments or unmet preconditions; nothing changed.
    Ignored,
    /// A newer fetch was issued before this one resolved; its result was dropped.
    Superseded,
    /// The adapter failed; the error is in `last_error` and any optimistic change
    /// was rolled back.
    Failed(ConsoleErrorKind),
}

#[derive(Debug, Clone)]
pub enum ConsoleEvent<T> {
    StateChanged(ConsoleState<T>),
    AuthorizationRequired,
}

/// State plus the bookkeeping needed to undo optimistic changes safely.
struct ConsoleCore<T> {
    state: ConsoleState<T>,
    list_in_flight: bool,
    /// Bumped whenever `items` is replaced wholesale (tab switch or applied fetch).
    view_generation: u64,
    /// Position of each item in the fetch that produced the current view.
    view_order: HashMap<ItemId, usize>,
    /// Bumped whenever authoritative counts replace the local cache.
    counts_generation: u64,
}

impl<T: Reviewable> ConsoleCore<T> {
    fn settle_status(&mut self) {
        self.state.status = if self.list_in_flight {
            LoadStatus::Loading
        } else if self.state.last_error.is_some() {
            LoadStatus::Error
        } else {
            LoadStatus::Idle
        };
    }

    fn clear_items(&mut self) {
        self.state.items.clear();
        self.view_order.clear();
        self.view_generation += 1;
    }

    fn apply_page(&mut self, mut page: PageResult<T>) -> usize {
        let tab = self.state.active_tab;
        let before = page.items.len();
        page.items.retain(|item| item.review_status() == tab);
        let dropped = before - page.items.len();

        self.view_order = page
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.item_id().clone(), index))
            .collect();
        self.view_generation += 1;
        self.state.items = page.items;
        self.state.total_pages = page.total_pages.max(1);
        dropped
    }

    fn apply_counts(&mut self, counts: StatusCounts) {
        self.state.counts = counts;
        self.counts_generation += 1;
    }

    fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.state
            .items
            .iter()
            .position(|item| item.item_id() == item_id)
    }

    /// Puts a rolled-back item back where it was, if the view it came from is
    /// still the one on screen.
    fn restore(&mut self, item: T, view_generation: u64) {
        if view_generation != self.view_generation
            || item.review_status() != self.state.active_tab
            || self.position(item.item_id()).is_some()
        {
            return;
        }

        let rank = self.view_order.get(item.item_id()).copied();
        let index = match rank {
            Some(rank) => self
                .state
                .items
                .iter()
                .position(|other| {
                    self.view_order
                        .get(other.item_id())
                        .is_some_and(|other_rank| *other_rank > rank)
                })
                .unwrap_or(self.state.items.len()),
            None => self.state.items.len(),
        };
        self.state.items.insert(index, item);
    }

    /// Adjusts paging after a confirmed removal using the last server-reported
    /// `total_pages` only. Returns true when the current page must be reloaded,
    /// moving back one page if the last page emptied.
    fn settle_after_removal(&mut self) -> bool {
        if !self.state.items.is_empty() {
            return false;
        }
        let page = self.state.page;
        if page > 1 && page >= self.state.total_pages {
            self.state.total_pages = page - 1;
            self.state.page = page - 1;
            return true;
        }
        page < self.state.total_pages
    }
}

/// Exact inverse of one optimistic `review` or `remove`.
struct Compensation<T> {
    decremented: Option<ReviewStatus>,
    incremented: Option<ReviewStatus>,
    counts_generation: u64,
    removed: Option<RemovedItem<T>>,
}

struct RemovedItem<T> {
    item: T,
    view_generation: u64,
}

impl<T: Reviewable> Compensate<ConsoleCore<T>> for Compensation<T> {
    fn compensate(self, core: &mut ConsoleCore<T>) {
        // Authoritative counts arrived in the meantime; they already reflect the server.
        if self.counts_generation == core.counts_generation {
            if let Some(status) = self.incremented {
                core.state.counts.decrement(status);
            }
            if let Some(status) = self.decremented {
                core.state.counts.increment(status);
            }
        }
        if let Some(removed) = self.removed {
            core.restore(removed.item, removed.view_generation);
        }
    }
}

struct ConsoleInner<T> {
    core: ConsoleCore<T>,
    log: MutationLog<Compensation<T>>,
    next_token: u64,
    latest_list_token: u64,
    latest_counts_token: u64,
}

impl<T: Reviewable> ConsoleInner<T> {
    fn issue_list_token(&mut self) -> ListRequest {
        self.next_token += 1;
        self.latest_list_token = self.next_token;
        self.core.list_in_flight = true;
        self.core.state.last_error = None;
        self.core.settle_status();
        ListRequest {
            token: self.next_token,
            status: self.core.state.active_tab,
            page: self.core.state.page,
            query: self.core.state.query.clone(),
        }
    }

    fn issue_counts_token(&mut self) -> CountsRequest {
        self.next_token += 1;
        self.latest_counts_token = self.next_token;
        CountsRequest {
            token: self.next_token,
            query: self.core.state.query.clone(),
        }
    }
}

struct ListRequest {
    token: u64,
    status: ReviewStatus,
    page: u32,
    query: String,
}

struct CountsRequest {
    token: u64,
    query: String,
}

pub struct ReviewConsole<A: ReviewableEntity> {
    adapter: Arc<A>,
    config: ConsoleConfig,
    inner: Mutex<ConsoleInner<A::Item>>,
    events: broadcast::Sender<ConsoleEvent<A::Item>>,
}

impl<A: ReviewableEntity> ReviewConsole<A> {
    pub fn new(adapter: Arc<A>, config: ConsoleConfig) -> Self {
        Self::with_location(adapter, config, ConsoleLocation::default())
    }

    /// Seeds tab, page and query from a restart hint. Nothing is fetched until
    /// [`ReviewConsole::refresh`] or another intent runs.
    pub fn with_location(adapter: Arc<A>, config: ConsoleConfig, location: ConsoleLocation) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            adapter,
            config: ConsoleConfig {
                page_limit: config.page_limit.max(1),
            },
            inner: Mutex::new(ConsoleInner {
                core: ConsoleCore {
                    state: ConsoleState::from_location(location),
                    list_in_flight: false,
                    view_generation: 0,
                    view_order: HashMap::new(),
                    counts_generation: 0,
                },
                log: MutationLog::new(),
                next_token: 0,
                latest_list_token: 0,
                latest_counts_token: 0,
            }),
            events,
        }
    }

    pub fn config(&self) -> ConsoleConfig {
        self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent<A::Item>> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ConsoleState<A::Item> {
        self.inner.lock().await.core.state.clone()
    }

    pub async fn pending_mutations(&self) -> usize {
        self.inner.lock().await.log.len()
    }

    /// Loads counts and the current page; used on mount.
    pub async fn refresh(&self) -> IntentOutcome {
        let (list, counts) = {
            let mut inner = self.inner.lock().await;
            let list = inner.issue_list_token();
            let counts = inner.issue_counts_token();
            self.publish(&inner.core);
            (list, counts)
        };
        let (list_outcome, counts_outcome) =
            futures::join!(self.run_list_fetch(list), self.run_counts_fetch(counts));
        merge_outcomes(list_outcome, counts_outcome)
    }

    pub async fn select_tab(&self, status: ReviewStatus) -> IntentOutcome {
        let request = {
            let mut inner = self.inner.lock().await;
            inner.core.state.active_tab = status;
            inner.core.state.page = 1;
            inner.core.clear_items();
            let request = inner.issue_list_token();
            self.publish(&inner.core);
            request
        };
        debug!(
            kind = self.adapter.kind_label(),
            status = %status,
            token = request.token,
            "review console: tab selected"
        );
        self.run_list_fetch(request).await
    }

    /// Pages are 1-based; `0` or anything past `total_pages` is ignored.
    pub async fn select_page(&self, page: u32) -> IntentOutcome {
        let request = {
            let mut inner = self.inner.lock().await;
            if page < 1 || page > inner.core.state.total_pages {
                debug!(
                    kind = self.adapter.kind_label(),
                    page,
                    total_pages = inner.core.state.total_pages,
                    "review console: ignoring out-of-range page"
                );
                return IntentOutcome::Ignored;
            }
            inner.core.state.page = page;
            let request = inner.issue_list_token();
            self.publish(&inner.core);
            request
        };
        self.run_list_fetch(request).await
    }

    /// Debouncing is the caller's job; every call issues fresh fetches.
    pub async fn search(&self, query: impl Into<String>) -> IntentOutcome {
        let query = query.into();
        let (list, counts) = {
            let mut inner = self.inner.lock().await;
            inner.core.state.query = query;
            inner.core.state.page = 1;
            let list = inner.issue_list_token();
            let counts = inner.issue_counts_token();
            self.publish(&inner.core);
            (list, counts)
        };
        let (list_outcome, counts_outcome) =
            futures::join!(self.run_list_fetch(list), self.run_counts_fetch(counts));
        merge_outcomes(list_outcome, counts_outcome)
    }

    /// Replaces the drifting local counts with authoritative ones.
    pub async fn refresh_counts(&self) -> IntentOutcome {
        let request = {
            let mut inner = self.inner.lock().await;
            inner.core.state.last_error = None;
            inner.core.settle_status();
            inner.issue_counts_token()
        };
        self.run_counts_fetch(request).await
    }

    /// Approves or rejects a visible pending item optimistically.
    ///
    /// Returns `Err` only when the item already has an unconfirmed change; in that
    /// case no adapter call is made.
    pub async fn review(
        &self,
        item_id: &ItemId,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<IntentOutcome, ConflictError> {
        {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            if inner.log.is_pending(item_id) {
                return Err(ConflictError {
                    item_id: item_id.clone(),
                });
            }
            let Some(index) = inner.core.position(item_id) else {
                debug!(item_id = %item_id, "review console: review target not visible");
                return Ok(IntentOutcome::Ignored);
            };
            if inner.core.state.items[index].review_status() != ReviewStatus::Pending {
                debug!(item_id = %item_id, "review console: review target is not pending");
                return Ok(IntentOutcome::Ignored);
            }

            let removed = if inner.core.state.active_tab == ReviewStatus::Pending {
                Some(RemovedItem {
                    item: inner.core.state.items.remove(index),
                    view_generation: inner.core.view_generation,
                })
            } else {
                None
            };
            // Move one unit between buckets, or nothing when the cached pending
            // count is already zero, so the total never changes.
            let target = decision.status();
            let moved = inner.core.state.counts.decrement(ReviewStatus::Pending);
            if moved {
                inner.core.state.counts.increment(target);
            }
            let (decremented, incremented) = if moved {
                (Some(ReviewStatus::Pending), Some(target))
            } else {
                (None, None)
            };

            inner.log.record(
                item_id.clone(),
                Compensation {
                    decremented,
                    incremented,
                    counts_generation: inner.core.counts_generation,
                    removed,
                },
            )?;
            inner.core.state.last_error = None;
            inner.core.settle_status();
            self.publish(&inner.core);
        }

        let result = self
            .adapter
            .apply_review(item_id, decision, comment.as_deref())
            .await
            .map(|_| ());
        Ok(self.settle_mutation(item_id, "review", result).await)
    }

    /// Deletes a visible item optimistically. The caller must have verified the
    /// admin capability; an `Authorization` failure is rolled back like any other.
    pub async fn remove(&self, item_id: &ItemId) -> Result<IntentOutcome, ConflictError> {
        {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            if inner.log.is_pending(item_id) {
                return Err(ConflictError {
                    item_id: item_id.clone(),
                });
            }
            let Some(index) = inner.core.position(item_id) else {
                debug!(item_id = %item_id, "review console: remove target not visible");
                return Ok(IntentOutcome::Ignored);
            };

            let view_generation = inner.core.view_generation;
            let item = inner.core.state.items.remove(index);
            let status = item.review_status();
            let decremented = inner.core.state.counts.decrement(status).then_some(status);

            inner.log.record(
                item_id.clone(),
                Compensation {
                    decremented,
                    incremented: None,
                    counts_generation: inner.core.counts_generation,
                    removed: Some(RemovedItem {
                        item,
                        view_generation,
                    }),
                },
            )?;
            inner.core.state.last_error = None;
            inner.core.settle_status();
            self.publish(&inner.core);
        }

        let result = self.adapter.remove(item_id).await;
        Ok(self.settle_mutation(item_id, "remove", result).await)
    }

    async fn settle_mutation(
        &self,
        item_id: &ItemId,
        action: &'static str,
        result: Result<(), AdapterError>,
    ) -> IntentOutcome {
        let follow_up = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            match result {
                Ok(()) => {
                    inner.log.commit(item_id);
                    info!(
                        kind = self.adapter.kind_label(),
                        item_id = %item_id,
                        action,
                        "review console: change confirmed"
                    );
                    let follow_up = if inner.core.settle_after_removal() {
                        Some(inner.issue_list_token())
                    } else {
                        None
                    };
                    self.publish(&inner.core);
                    follow_up
                }
                Err(err) => {
                    inner.log.rollback(item_id, &mut inner.core);
                    warn!(
                        kind = self.adapter.kind_label(),
                        item_id = %item_id,
                        action,
                        error = %err,
                        "review console: change rolled back"
                    );
                    let kind = err.kind();
                    inner.core.state.last_error = Some(err);
                    inner.core.settle_status();
                    self.publish(&inner.core);
                    self.notify_if_unauthorized(kind);
                    return IntentOutcome::Failed(kind);
                }
            }
        };

        if let Some(request) = follow_up {
            debug!(
                kind = self.adapter.kind_label(),
                page = request.page,
                token = request.token,
                "review console: reloading page after removal"
            );
            // The mutation itself succeeded; a failed reload lands in `last_error`.
            let _ = self.run_list_fetch(request).await;
        }
        IntentOutcome::Applied
    }

    async fn run_list_fetch(&self, mut request: ListRequest) -> IntentOutcome {
        loop {
            let result = self
                .adapter
                .fetch_page(
                    request.status,
                    request.page,
                    self.config.page_limit,
                    &request.query,
                )
                .await;

            let mut inner = self.inner.lock().await;
            if request.token != inner.latest_list_token {
                debug!(
                    kind = self.adapter.kind_label(),
                    token = request.token,
                    latest = inner.latest_list_token,
                    "review console: discarding stale page"
                );
                return IntentOutcome::Superseded;
            }

            match result {
                Ok(page) => {
                    let dropped = inner.core.apply_page(page);
                    if dropped > 0 {
                        warn!(
                            kind = self.adapter.kind_label(),
                            status = %request.status,
                            dropped,
                            "review console: page contained items from another status"
                        );
                    }
                    let state = &inner.core.state;
                    if state.page > state.total_pages && state.items.is_empty() {
                        inner.core.state.page = inner.core.state.total_pages;
                        request = inner.issue_list_token();
                        self.publish(&inner.core);
                        continue;
                    }
                    inner.core.list_in_flight = false;
                    inner.core.settle_status();
                    self.publish(&inner.core);
                    return IntentOutcome::Applied;
                }
                Err(err) => {
                    warn!(
                        kind = self.adapter.kind_label(),
                        status = %request.status,
                        page = request.page,
                        error = %err,
                        "review console: page fetch failed"
                    );
                    let kind = err.kind();
                    inner.core.list_in_flight = false;
                    inner.core.state.last_error = Some(err);
                    inner.core.settle_status();
                    self.publish(&inner.core);
                    self.notify_if_unauthorized(kind);
                    return IntentOutcome::Failed(kind);
                }
            }
        }
    }

    async fn run_counts_fetch(&self, request: CountsRequest) -> IntentOutcome {
        let result = self.adapter.fetch_counts(&request.query).await;

        let mut inner = self.inner.lock().await;
        if request.token != inner.latest_counts_token {
            debug!(
                kind = self.adapter.kind_label(),
                token = request.token,
                "review console: discarding stale counts"
            );
            return IntentOutcome::Superseded;
        }

        match result {
            Ok(counts) => {
                inner.core.apply_counts(counts);
                self.publish(&inner.core);
                IntentOutcome::Applied
            }
            Err(err) => {
                warn!(
                    kind = self.adapter.kind_label(),
                    error = %err,
                    "review console: counts fetch failed"
                );
                let kind = err.kind();
                inner.core.state.last_error = Some(err);
                inner.core.settle_status();
                self.publish(&inner.core);
                self.notify_if_unauthorized(kind);
                IntentOutcome::Failed(kind)
            }
        }
    }

    fn publish(&self, core: &ConsoleCore<A::Item>) {
        let _ = self
            .events
            .send(ConsoleEvent::StateChanged(core.state.clone()));
    }

    fn notify_if_unauthorized(&self, kind: ConsoleErrorKind) {
        if kind == ConsoleErrorKind::Authorization {
            warn!(
                kind = self.adapter.kind_label(),
                "review console: adapter rejected caller authorization"
            );
            let _ = self.events.send(ConsoleEvent::AuthorizationRequired);
        }
    }
}

fn merge_outcomes(list: IntentOutcome, counts: IntentOutcome) -> IntentOutcome {
    match (list, counts) {
        (IntentOutcome::Failed(kind), _) => IntentOutcome::Failed(kind),
        (_, IntentOutcome::Failed(kind)) => IntentOutcome::Failed(kind),
        (list, _) => list,
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
