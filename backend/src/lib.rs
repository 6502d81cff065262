//! # BrainQuest Session Coordinator
//!
//! HTTP server behind the multiplayer parts of BrainQuest: quiz battles,
//! group study sessions, online presence and friend lists.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST handlers, bearer auth)
//!     ↓
//! Domain Layer (services, optimistic updates, expiry)
//!     ↓
//! Storage Layer (versioned key-value store: SQLite or memory)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::domain::{
    BattleService, EntityStore, ExpirySweeper, FriendService, PresenceService, StudySessionService,
};
use crate::io::rest::{auth, battle_apis, friend_apis, health_apis, presence_apis, study_session_apis};
use crate::storage::KeyValueStore;
use shared::{Clock, SystemClock};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub presence_service: PresenceService,
    pub battle_service: BattleService,
    pub study_session_service: StudySessionService,
    pub friend_service: FriendService,
    pub access_token: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, access_token: &str) -> Self {
        let entities = EntityStore::new(store);
        Self {
            presence_service: PresenceService::new(entities.clone(), clock.clone()),
            battle_service: BattleService::new(entities.clone(), clock.clone()),
            study_session_service: StudySessionService::new(entities.clone(), clock.clone()),
            friend_service: FriendService::new(entities, clock),
            access_token: Arc::from(access_token),
        }
    }

    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(
            self.battle_service.clone(),
            self.study_session_service.clone(),
            self.presence_service.clone(),
        )
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &ServerConfig) -> Result<AppState> {
    info!("Setting up key-value store");
    let store = storage::open_store(&config.database_url).await?;

    info!("Setting up domain services");
    Ok(AppState::new(store, Arc::new(SystemClock), &config.access_token))
}

fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        let value = origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", origin))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(600)))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, cors_origin: &str) -> Result<Router> {
    let protected = Router::new()
        .merge(presence_apis::router())
        .merge(study_session_apis::router())
        .merge(battle_apis::router())
        .merge(friend_apis::router())
        .route_layer(middleware::from_fn_with_state(app_state.clone(), auth::require_bearer_token));

    Ok(Router::new()
        .merge(health_apis::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin)?)
        .with_state(app_state))
}
