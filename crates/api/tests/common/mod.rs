#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use tower::ServiceExt;

use studio_api::auth::jwt::{generate_access_token, JwtConfig};
use studio_api::config::{ServerConfig, StoreConfig};
use studio_api::router::build_app_router;
use studio_api::state::AppState;
use studio_core::check_in::CheckInPolicy;
use studio_core::roles::{ROLE_ADMIN, ROLE_MEMBER, ROLE_STAFF};
use studio_core::types::{DbId, Timestamp};
use studio_db::models::class_session::{ClassSession, CreateClassSession};
use studio_db::store::{BookingStore, MemoryBookingStore, StoreBackend};
use studio_events::EventBus;

pub const TENANT: DbId = 1;
pub const OTHER_TENANT: DbId = 2;
pub const STAFF_USER: DbId = 10;

/// Build a test `ServerConfig` backed by the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-jwt-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 15,
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
        },
        check_in: CheckInPolicy::default(),
        qr_secret: "test-qr-secret".to_string(),
        notify_webhook: None,
    }
}

/// The router plus handles on its store and event bus, so tests can seed
/// data at fixed instants and observe published events.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryBookingStore>,
    pub event_bus: Arc<EventBus>,
    pub config: ServerConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryBookingStore::default());
        let event_bus = Arc::new(EventBus::default());

        let state = AppState {
            store: Arc::clone(&store) as Arc<dyn BookingStore>,
            config: Arc::new(config.clone()),
            event_bus: Arc::clone(&event_bus),
        };

        Self {
            router: build_app_router(state, &config),
            store,
            event_bus,
            config,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn staff_token(&self) -> String {
        token(&self.config, STAFF_USER, TENANT, ROLE_STAFF, None)
    }

    pub fn admin_token(&self) -> String {
        token(&self.config, STAFF_USER + 1, TENANT, ROLE_ADMIN, None)
    }

    /// Token for a member account whose member profile id is `member_id`.
    pub fn member_token(&self, member_id: DbId) -> String {
        token(&self.config, 1000 + member_id, TENANT, ROLE_MEMBER, Some(member_id))
    }

    pub fn other_tenant_staff_token(&self) -> String {
        token(&self.config, STAFF_USER + 2, OTHER_TENANT, ROLE_STAFF, None)
    }

    /// Seed a session running from `starts_at` for one hour.
    pub async fn seed_session(&self, starts_at: Timestamp, capacity: i32) -> ClassSession {
        let input = CreateClassSession {
            class_type_id: 1,
            location_id: 1,
            starts_at,
            ends_at: starts_at + Duration::hours(1),
            capacity,
        };
        self.store
            .create_session(TENANT, &input, starts_at - Duration::days(1))
            .await
            .unwrap()
    }

    /// Seed a session that starts in ten minutes, inside the check-in window.
    pub async fn seed_upcoming_session(&self, capacity: i32) -> ClassSession {
        self.seed_session(chrono::Utc::now() + Duration::minutes(10), capacity)
            .await
    }
}

fn token(
    config: &ServerConfig,
    user_id: DbId,
    tenant_id: DbId,
    role: &str,
    member_id: Option<DbId>,
) -> String {
    generate_access_token(user_id, tenant_id, role, member_id, &config.jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

/// POST with no body, for the lifecycle action endpoints.
pub async fn post_empty(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
