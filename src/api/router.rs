use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, check_in, check_out, get_loan, get_title, list_my_loans, list_overdue_loans,
    list_title_loans, list_titles, register_title, remove_title, revise_title,
};

/// Creates the API router
///
/// Catalog endpoints:
/// - GET /titles - All titles ordered by name
/// - POST /titles - Register a title (admin)
/// - GET /titles/:id - Title with current stock
/// - PUT /titles/:id - Revise a title (admin)
/// - DELETE /titles/:id - Remove a title (admin)
/// - GET /titles/:id/loans - Active loans for a title (admin)
///
/// Inventory endpoints:
/// - POST /loans - Check out a copy for the caller
/// - GET /loans - The caller's loans
/// - GET /loans/overdue - Overdue loans (admin)
/// - GET /loans/:id - Loan details (owner or admin)
/// - POST /loans/:id/return - Check in a loan
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Catalog
        .route("/titles", get(list_titles).post(register_title))
        .route(
            "/titles/:id",
            get(get_title).put(revise_title).delete(remove_title),
        )
        .route("/titles/:id/loans", get(list_title_loans))
        // Inventory
        .route("/loans", post(check_out).get(list_my_loans))
        .route("/loans/overdue", get(list_overdue_loans))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/return", post(check_in))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
