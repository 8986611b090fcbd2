//! # crosscast: Tweet to Farcaster cross-posting service
//!
//! `crosscast` mirrors a user's tweets onto Farcaster. Tweets are pulled from
//! the Twitter API into a review queue, grouped into threads by conversation,
//! and published as Farcaster reply chains once the user approves them. Every
//! publish passes a spend gate: free cast credits are consumed first, then the
//! user's prepaid balance, subject to an approval flag and an optional
//! spending limit.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence.
//!
//! ### Request Flow
//!
//! A sign-in collaborator creates accounts via `POST /api/v1/users` after
//! authenticating the user on both platforms. From there the client drives the
//! review loop: `POST /users/{id}/ingest` pulls recent tweets into the queue,
//! `GET /users/{id}/threads/{conversation_id}` previews a thread with its
//! fixed cost, and `POST .../approve` publishes it. Approval claims the
//! thread's pending posts atomically, publishes them in order with each cast
//! replying to the previous one, and commits the charge together with the
//! final cast. A thread that fails partway costs nothing.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the management API at `/api/v1/*` with
//! RESTful conventions, documented at `/docs`.
//!
//! The **client layer** ([`clients`]) abstracts the external platforms behind
//! three traits: tweet reading, cast writing, and handle directory lookup.
//! Each has an HTTP implementation and a dummy implementation selected from
//! configuration, so the whole pipeline runs locally without credentials.
//!
//! The **database layer** ([`db`]) uses the repository pattern. Post status
//! transitions are conditional updates keyed on the current status, which is
//! what makes the publish pipeline exactly-once under concurrent approvals.
//!
//! The **publish coordinator** ([`publish`]) ties these together: ingestion,
//! thread assembly ([`threads`]), mention rewriting ([`mentions`]), the spend
//! gate ([`spend`]) and the cast state machine.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use crosscast::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = crosscast::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     crosscast::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application requires a PostgreSQL database and automatically runs
//! migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! crosscast::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod errors;
pub mod mentions;
mod openapi;
pub mod publish;
pub mod spend;
pub mod telemetry;
pub mod threads;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::mentions::MentionResolver;
use crate::openapi::ApiDoc;
use crate::publish::PublishCoordinator;

use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, patch, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub coordinator: Arc<PublishCoordinator>,
}

/// Get the crosscast database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.cors.allow_credentials)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::PATCH])
        .allow_headers([axum::http::header::CONTENT_TYPE]))
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Account lifecycle and spending controls
        .route("/users", post(api::handlers::users::create_or_get_user))
        .route("/users/{user_id}", get(api::handlers::users::get_user))
        .route("/users/{user_id}/spending", patch(api::handlers::users::update_spending))
        .route("/users/{user_id}/promo", post(api::handlers::users::claim_promo))
        // Ingestion and per-post review actions
        .route("/users/{user_id}/ingest", post(api::handlers::posts::ingest))
        .route("/users/{user_id}/posts/restore", post(api::handlers::posts::restore_posts))
        .route("/users/{user_id}/posts/{post_id}", patch(api::handlers::posts::edit_post))
        .route("/users/{user_id}/posts/{post_id}/reject", post(api::handlers::posts::reject_post))
        // Threads
        .route("/users/{user_id}/threads/{conversation_id}", get(api::handlers::threads::get_thread))
        .route(
            "/users/{user_id}/threads/{conversation_id}/approve",
            post(api::handlers::threads::approve_thread),
        )
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Build the publish coordinator from configuration and a database pool.
///
/// This is the single place where the platform clients are instantiated; the
/// coordinator owns them for the life of the process.
pub fn build_coordinator(pool: PgPool, config: &Config) -> Arc<PublishCoordinator> {
    let source = clients::create_source(&config.source);
    let cast = clients::create_cast(&config.cast);
    let directory = clients::create_directory(&config.directory);

    Arc::new(PublishCoordinator::new(
        pool,
        config.billing.clone(),
        config.ingest.clone(),
        source,
        cast,
        MentionResolver::new(directory),
    ))
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects the database pool, runs
///    migrations and builds the router
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting crosscast with configuration: {:#?}", config);

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.pool.max_connections)
            .min_connections(config.database.pool.min_connections)
            .acquire_timeout(Duration::from_secs(config.database.pool.acquire_timeout_secs))
            .connect(&config.database.url)
            .await?;
        migrator().run(&pool).await?;

        Self::with_pool(config, pool)
    }

    /// Create an application on an existing pool (migrations assumed run)
    pub fn with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let coordinator = build_coordinator(pool.clone(), &config);

        let state = AppState::builder().db(pool.clone()).config(config.clone()).coordinator(coordinator).build();

        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Crosscast listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
