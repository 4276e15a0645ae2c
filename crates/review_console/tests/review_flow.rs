use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use review_console::{
    ConsoleConfig, ConsoleErrorKind, ConsoleEvent, IntentOutcome, LoadStatus,
    RestReviewAdapter, ReviewConsole,
};
use shared::{
    domain::{ContentKind, ItemId, ReviewDecision, ReviewStatus, StatusCounts},
    error::{ApiError, ErrorCode},
    protocol::{Paginated, Pagination, ReviewRequest, ReviewableItem},
};
use tokio::{net::TcpListener, sync::Mutex};

const ADMIN_TOKEN: &str = "admin-secret";

#[derive(Clone)]
struct Backend {
    items: Arc<Mutex<Vec<ReviewableItem>>>,
    reviews_down: Arc<AtomicBool>,
}

async fn list_ads(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(status) = params
        .get("status")
        .and_then(|raw| raw.parse::<ReviewStatus>().ok())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, "status is required")),
        )
            .into_response();
    };
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);

    let matching: Vec<ReviewableItem> = backend
        .items
        .lock()
        .await
        .iter()
        .filter(|item| item.status == status)
        .cloned()
        .collect();
    let total = matching.len();
    let total_pages = total.div_ceil(limit).max(1);
    let data = matching
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();

    Json(Paginated {
        data,
        pagination: Pagination {
            total: total as u64,
            total_pages: total_pages as u32,
        },
    })
    .into_response()
}

async fn review_ad(
    State(backend): State<Backend>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Response {
    if backend.reviews_down.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, "review queue offline")),
        )
            .into_response();
    }
    let mut items = backend.items.lock().await;
    match items.iter_mut().find(|item| item.id.as_str() == id) {
        Some(item) => {
            item.status = body.action.status();
            Json(item.clone()).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(ErrorCode::NotFound, "no such advertisement")),
        )
            .into_response(),
    }
}

async fn delete_ad(
    State(backend): State<Backend>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let is_admin = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {ADMIN_TOKEN}"));
    if !is_admin {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiError::new(ErrorCode::Forbidden, "admin capability required")),
        )
            .into_response();
    }
    backend.items.lock().await.retain(|item| item.id.as_str() != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_backend(items: Vec<ReviewableItem>) -> (String, Backend) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let backend = Backend {
        items: Arc::new(Mutex::new(items)),
        reviews_down: Arc::new(AtomicBool::new(false)),
    };
    let app = Router::new()
        .route("/ads", get(list_ads))
        .route("/ads/review/:id", post(review_ad))
        .route("/ads/:id", delete(delete_ad))
        .with_state(backend.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), backend)
}

fn ad(id: &str, status: ReviewStatus) -> ReviewableItem {
    ReviewableItem::new(id, status)
        .with_field("headline", format!("Tutoring offer {id}"))
        .with_field("placement", "sidebar")
}

fn seed() -> Vec<ReviewableItem> {
    vec![
        ad("ad-1", ReviewStatus::Pending),
        ad("ad-2", ReviewStatus::Pending),
        ad("ad-3", ReviewStatus::Pending),
        ad("ad-4", ReviewStatus::Approved),
    ]
}

fn item_ids(items: &[ReviewableItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[tokio::test]
async fn moderator_approves_advertisement_end_to_end() {
    let (server_url, backend) = spawn_backend(seed()).await;
    let adapter = Arc::new(RestReviewAdapter::new(server_url, ContentKind::Advertisement));
    let console = ReviewConsole::new(adapter, ConsoleConfig { page_limit: 2 });

    assert_eq!(console.refresh().await, IntentOutcome::Applied);
    let state = console.snapshot().await;
    assert_eq!(item_ids(&state.items), vec!["ad-1", "ad-2"]);
    assert_eq!(state.total_pages, 2);
    assert_eq!(state.counts, StatusCounts::new(3, 1, 0));

    let outcome = console
        .review(
            &ItemId::new("ad-1"),
            ReviewDecision::Approved,
            Some("fits the guidelines".to_string()),
        )
        .await
        .expect("no conflict");
    assert_eq!(outcome, IntentOutcome::Applied);

    let state = console.snapshot().await;
    assert_eq!(item_ids(&state.items), vec!["ad-2"]);
    assert_eq!(state.counts, StatusCounts::new(2, 2, 0));
    assert_eq!(state.counts.total(), 4);

    assert_eq!(console.refresh_counts().await, IntentOutcome::Applied);
    assert_eq!(console.snapshot().await.counts, StatusCounts::new(2, 2, 0));

    assert_eq!(
        console.select_tab(ReviewStatus::Approved).await,
        IntentOutcome::Applied
    );
    let approved = console.snapshot().await;
    assert_eq!(item_ids(&approved.items), vec!["ad-1", "ad-4"]);
    assert!(approved.items[0].fields.contains_key("placement"));

    let stored = backend.items.lock().await;
    assert_eq!(stored[0].status, ReviewStatus::Approved);
}

#[tokio::test]
async fn review_outage_rolls_back_to_prior_state() {
    let (server_url, backend) = spawn_backend(seed()).await;
    let adapter = Arc::new(RestReviewAdapter::new(server_url, ContentKind::Advertisement));
    let console = ReviewConsole::new(adapter, ConsoleConfig::default());
    console.refresh().await;
    let before = console.snapshot().await;
    backend.reviews_down.store(true, Ordering::SeqCst);

    let outcome = console
        .review(&ItemId::new("ad-2"), ReviewDecision::Rejected, None)
        .await
        .expect("no conflict");

    assert_eq!(outcome, IntentOutcome::Failed(ConsoleErrorKind::Network));
    let after = console.snapshot().await;
    assert_eq!(after.items, before.items);
    assert_eq!(after.counts, before.counts);
    assert_eq!(after.page, before.page);
    assert_eq!(after.status, LoadStatus::Error);
    assert_eq!(
        after.last_error.map(|err| err.to_string()),
        Some("network error: review queue offline".to_string())
    );
}

#[tokio::test]
async fn delete_without_admin_token_is_rolled_back() {
    let (server_url, backend) = spawn_backend(seed()).await;
    let moderator = Arc::new(RestReviewAdapter::new(
        server_url.clone(),
        ContentKind::Advertisement,
    ));
    let console = ReviewConsole::new(moderator, ConsoleConfig::default());
    console.refresh().await;
    let mut events = console.subscribe_events();

    let outcome = console
        .remove(&ItemId::new("ad-3"))
        .await
        .expect("no conflict");

    assert_eq!(outcome, IntentOutcome::Failed(ConsoleErrorKind::Authorization));
    let state = console.snapshot().await;
    assert_eq!(item_ids(&state.items), vec!["ad-1", "ad-2", "ad-3"]);
    assert_eq!(state.counts, StatusCounts::new(3, 1, 0));
    let mut reauth_requested = false;
    while let Ok(event) = events.try_recv() {
        reauth_requested |= matches!(event, ConsoleEvent::AuthorizationRequired);
    }
    assert!(reauth_requested);
    assert_eq!(backend.items.lock().await.len(), 4);

    let admin = Arc::new(
        RestReviewAdapter::new(server_url, ContentKind::Advertisement)
            .with_bearer_token(ADMIN_TOKEN),
    );
    let admin_console = ReviewConsole::new(admin, ConsoleConfig::default());
    admin_console.refresh().await;
    assert_eq!(
        admin_console
            .remove(&ItemId::new("ad-3"))
            .await
            .expect("no conflict"),
        IntentOutcome::Applied
    );
    assert_eq!(
        admin_console.snapshot().await.counts,
        StatusCounts::new(2, 1, 0)
    );
    assert_eq!(backend.items.lock().await.len(), 3);
}
