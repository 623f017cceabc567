//! API Routes
//!
//! Configures the Axum router with all tracker endpoints.

use axum::{
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_tree_handler, current_user_handler, destroy_tree_handler, geojson_handler,
    health_handler, list_trees_handler, login_handler, my_stats_handler,
    partial_update_tree_handler, refresh_handler, register_handler, retrieve_tree_handler,
    update_tree_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /register/` - Create an account
/// - `POST /login/` - Obtain an access/refresh token pair
/// - `POST /token/refresh/` - Obtain a new access token
/// - `GET /users/` - Profile of the caller
/// - `GET|POST /trees/` - List or create tree entries
/// - `GET|PUT|PATCH|DELETE /trees/:id/` - One tree entry
/// - `GET /trees/my_stats/` - Planting statistics of the caller
/// - `GET /trees/geojson/` - Map export
/// - `GET /health` - Health check endpoint
///
/// Every path is served with and without the trailing slash.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new();
    let router = both(router, "/register", post(register_handler));
    let router = both(router, "/login", post(login_handler));
    let router = both(router, "/token/refresh", post(refresh_handler));
    let router = both(router, "/users", get(current_user_handler));
    let router = both(
        router,
        "/trees",
        get(list_trees_handler).post(create_tree_handler),
    );
    let router = both(router, "/trees/my_stats", get(my_stats_handler));
    let router = both(router, "/trees/geojson", get(geojson_handler));
    let router = both(
        router,
        "/trees/:id",
        get(retrieve_tree_handler)
            .put(update_tree_handler)
            .patch(partial_update_tree_handler)
            .delete(destroy_tree_handler),
    );
    let router = both(router, "/health", get(health_handler));

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes `path` and `path/` to the same handlers.
fn both(
    router: Router<AppState>,
    path: &str,
    handlers: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, handlers.clone())
        .route(&format!("{}/", path), handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        create_router(AppState::from_config(&Config::default()))
    }

    async fn status_of(app: Router, method: &str, uri: &str) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of(create_test_app(), "GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_paths_served_with_and_without_slash() {
        for uri in ["/trees", "/trees/", "/trees/geojson", "/trees/geojson/"] {
            assert_eq!(status_of(create_test_app(), "GET", uri).await, StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_named_routes_win_over_ids() {
        assert_eq!(
            status_of(create_test_app(), "GET", "/trees/my_stats/").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(create_test_app(), "GET", "/trees/42/").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_anonymous_writes_rejected() {
        assert_eq!(
            status_of(create_test_app(), "POST", "/trees/").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(create_test_app(), "DELETE", "/trees/1/").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(create_test_app(), "GET", "/users/").await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        assert_eq!(
            status_of(create_test_app(), "GET", "/nonexistent").await,
            StatusCode::NOT_FOUND
        );
    }
}
