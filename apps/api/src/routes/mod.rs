pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::analysis::gateway::ANALYZE_PATH;
use crate::analysis::handlers::handle_analyze_assessment;
use crate::state::AppState;
use crate::web::{attach_browser, handlers};

pub fn build_router(state: AppState) -> Router {
    // Everything a browser drives gets its per-cookie context attached.
    let browser_routes = Router::new()
        .route("/", get(handlers::handle_home))
        .route("/auth/sign-in", post(handlers::handle_sign_in))
        .route("/auth/sign-up", post(handlers::handle_sign_up))
        .route("/auth/sign-out", post(handlers::handle_sign_out))
        .route("/assessment", get(handlers::handle_assessment))
        .route("/assessment/answer", post(handlers::handle_answer))
        .route("/assessment/submit", post(handlers::handle_submit))
        .route("/assessment/reset", post(handlers::handle_reset))
        .route("/assessment/save", post(handlers::handle_save))
        .route("/results", get(handlers::handle_saved_results))
        .route(
            "/profile",
            get(handlers::handle_profile).post(handlers::handle_update_profile),
        )
        .route("/api/files", post(handlers::handle_upload))
        .route_layer(middleware::from_fn_with_state(state.clone(), attach_browser));

    Router::new()
        .route("/health", get(health::health_handler))
        .route(ANALYZE_PATH, post(handle_analyze_assessment))
        .merge(browser_routes)
        .with_state(state)
}
