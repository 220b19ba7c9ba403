//! HTTP surface for the ticket store and classifier.
//!
//! | Method | Path                     | Access     |
//! |--------|--------------------------|------------|
//! | GET    | `/api/tickets/`          | anyone     |
//! | POST   | `/api/tickets/`          | anyone     |
//! | GET    | `/api/tickets/:id/`      | anyone     |
//! | PATCH  | `/api/tickets/:id/`      | privileged |
//! | GET    | `/api/tickets/stats/`    | privileged |
//! | POST   | `/api/tickets/classify/` | anyone     |
//!
//! Other methods on these paths answer 405.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod requests;

use anyhow::anyhow;
use axum::routing::{get, post};
use axum::Router;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::trace::TraceLayer;

use crate::classify::Classifier;
use crate::db::Database;
use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    classifier: Classifier,
    admin_tokens: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new<I>(db: Database, classifier: Classifier, admin_tokens: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let admin_tokens = admin_tokens
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            db: Arc::new(Mutex::new(db)),
            classifier,
            admin_tokens: Arc::new(admin_tokens),
        }
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow!("database lock poisoned")))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn is_admin_token(&self, token: &str) -> bool {
        self.admin_tokens.contains(token)
    }
}

pub fn router(state: AppState) -> Router {
    let tickets = Router::new()
        .route(
            "/tickets/",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route("/tickets/stats/", get(handlers::ticket_stats))
        .route("/tickets/classify/", post(handlers::classify_ticket))
        .route(
            "/tickets/:id/",
            get(handlers::retrieve_ticket).patch(handlers::update_ticket),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", tickets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
