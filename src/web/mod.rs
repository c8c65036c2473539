//! HTTP surface of the service
//!
//! Three routes: the French home page, the iCalendar feed, and a health
//! endpoint exposing the cache status. Handlers call the schedule cache on
//! every request and keep no state of their own.

mod home;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;
use serde::Serialize;

use crate::cache::RefreshingCache;
use crate::calendar;
use crate::data::{BridgeError, BridgeRecord, BridgeState};

/// Cache specialization holding the fetched closure schedule.
pub type ScheduleCache = RefreshingCache<Vec<BridgeRecord>, BridgeError>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The schedule cache
    pub cache: Arc<ScheduleCache>,
    /// Public base URL used to build subscription links
    pub base_url: String,
}

/// Builds the service router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/calendar.ics", get(calendar_feed))
        .route("/health", get(health))
        .with_state(state)
}

/// GET / - home page with the current state and the next closures
async fn home_page(State(state): State<AppState>) -> Response {
    match state.cache.get().await {
        Ok(records) => {
            let now = Local::now().naive_local();
            let bridge = BridgeState::compute(&records, now);
            Html(home::render_home_page(&bridge, &state.base_url, now)).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to load the schedule for the home page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(home::render_error_page()),
            )
                .into_response()
        }
    }
}

/// GET /calendar.ics - the subscription feed, served as an attachment
async fn calendar_feed(State(state): State<AppState>) -> Response {
    match state.cache.get().await {
        Ok(records) => {
            let ics = calendar::render_calendar(&records, chrono::Utc::now());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/calendar"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=pont-chaban-delmas.ics",
                    ),
                ],
                ics,
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to load the schedule for the calendar feed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erreur lors de la génération du calendrier",
            )
                .into_response()
        }
    }
}

/// Health payload reported by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub cache: CacheHealth,
}

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// A schedule is cached and being served
    Healthy,
    /// No schedule has been fetched yet; the service heals itself on the
    /// next successful fetch
    Degraded,
}

/// Cache snapshot included in the health payload.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub has_entry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
    pub refreshing: bool,
    pub last_served_from_cache: bool,
}

/// GET /health - observational cache snapshot, always 200
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.cache.status();
    let overall = if status.has_entry {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let response = HealthResponse {
        status: overall,
        cache: CacheHealth {
            has_entry: status.has_entry,
            age_seconds: status.age.map(|age| age.as_secs()),
            refreshing: status.refreshing,
            last_served_from_cache: state.cache.last_served_from_cache(),
        },
    };
    (StatusCode::OK, Json(response))
}
