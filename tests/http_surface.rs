//! End-to-end tests of the HTTP surface
//!
//! Drives the real router against scripted upstream fetchers to verify the
//! routes share one schedule cache: a single fetch feeds the home page, the
//! calendar feed, and the health report.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use pontchaban::cache::{CacheConfig, RefreshingCache, RetryPolicy};
use pontchaban::data::{BridgeError, BridgeRecord};
use pontchaban::web::{create_router, AppState};

/// Two closures far enough in the future to always count as upcoming
fn sample_records() -> Vec<BridgeRecord> {
    vec![
        BridgeRecord {
            vessel: "EUROPA 2".to_string(),
            date: "2099-09-14".parse().expect("valid test date"),
            closes_at: "05:45".to_string(),
            reopens_at: "07:15".to_string(),
            closure_kind: "Totale".to_string(),
            total_closure: "oui".to_string(),
        },
        BridgeRecord {
            vessel: "BELEM".to_string(),
            date: "2099-09-20".parse().expect("valid test date"),
            closes_at: "23:30".to_string(),
            reopens_at: "00:30".to_string(),
            closure_kind: "Partielle".to_string(),
            total_closure: "non".to_string(),
        },
    ]
}

fn router_with_state(cache: Arc<pontchaban::web::ScheduleCache>) -> Router {
    create_router(AppState {
        cache,
        base_url: "http://localhost:3000".to_string(),
    })
}

async fn get_response(app: Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.expect("request should run");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn test_single_fetch_feeds_every_route() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = Arc::new(RefreshingCache::new(CacheConfig::default(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let records = sample_records();
        async move { Ok::<_, BridgeError>(records) }
    }));
    let app = router_with_state(cache);

    // Health alone never triggers a fetch
    let (status, body) = get_response(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"degraded\""));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The first page load fetches once
    let (status, body) = get_response(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("EUROPA 2"));
    assert!(body.contains("BELEM"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The calendar reuses the cached schedule
    let (status, body) = get_response(app.clone(), "/calendar.ics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("SUMMARY:Fermeture Pont Chaban-Delmas - EUROPA 2"));
    assert_eq!(body.matches("BEGIN:VEVENT").count(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (status, body) = get_response(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"healthy\""));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_service_recovers_once_upstream_does() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let config = CacheConfig {
        retry: RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let cache = Arc::new(RefreshingCache::new(config, move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let records = sample_records();
        async move {
            if n == 0 {
                Err(BridgeError::BadStatus(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                ))
            } else {
                Ok(records)
            }
        }
    }));
    let app = router_with_state(cache);

    // Upstream down: the page reports the failure, nothing is cached
    let (status, _) = get_response(app.clone(), "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, body) = get_response(app.clone(), "/health").await;
    assert!(body.contains("\"status\":\"degraded\""));

    // Next request tries again and succeeds
    let (status, body) = get_response(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("EUROPA 2"));

    let (_, body) = get_response(app, "/health").await;
    assert!(body.contains("\"status\":\"healthy\""));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_schedule_served_while_refresh_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let config = CacheConfig {
        ttl: Duration::from_secs(1),
        ..Default::default()
    };
    let cache = Arc::new(RefreshingCache::new(config, move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let records = sample_records();
        async move {
            if n > 0 {
                // Later fetches hang so the refresh stays observable
                std::future::pending::<()>().await;
            }
            Ok::<_, BridgeError>(records)
        }
    }));
    let app = router_with_state(cache);

    let (status, _) = get_response(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::advance(Duration::from_secs(2)).await;

    // Stale entry: the page is served immediately from the cache while a
    // background refresh is started
    let (status, body) = get_response(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("EUROPA 2"));

    let (status, body) = get_response(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"refreshing\":true"));
    assert!(body.contains("\"last_served_from_cache\":true"));
}
