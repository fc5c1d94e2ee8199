use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{elevated, protected, public};
use crate::middleware::identity_middleware;
use crate::state::AppState;

/// Full HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);
    let body_limit = state.config.server.max_request_size_bytes;

    Router::new()
        // Public
        .route("/", get(public::root::get))
        .route("/health", get(public::health::get))
        .route("/api/templates", get(public::templates::get))
        // Protected
        .merge(workspace_routes())
        .merge(library_routes())
        .merge(account_routes())
        .merge(ai_routes())
        // Elevated
        .route("/api/admin/usage", get(elevated::admin_usage::get))
        // Global middleware
        .layer(axum::middleware::from_fn_with_state(state.clone(), identity_middleware))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn workspace_routes() -> Router<AppState> {
    use axum::routing::post;
    use protected::{documents, folders, projects};

    Router::new()
        .route(
            "/api/projects",
            get(projects::get)
                .post(projects::post)
                .put(projects::put)
                .delete(projects::delete),
        )
        .route(
            "/api/documents",
            get(documents::get)
                .post(documents::post)
                .put(documents::put)
                .delete(documents::delete),
        )
        .route("/api/documents/versions", post(documents::post_version))
        .route(
            "/api/folders",
            get(folders::get)
                .post(folders::post)
                .put(folders::put)
                .delete(folders::delete),
        )
}

fn library_routes() -> Router<AppState> {
    use protected::{brand_voices, personas, snippets};

    Router::new()
        .route(
            "/api/personas",
            get(personas::get)
                .post(personas::post)
                .put(personas::put)
                .delete(personas::delete),
        )
        .route(
            "/api/brand-voices",
            get(brand_voices::get)
                .post(brand_voices::post)
                .put(brand_voices::put)
                .delete(brand_voices::delete),
        )
        .route(
            "/api/snippets",
            get(snippets::get)
                .post(snippets::post)
                .put(snippets::put)
                .patch(snippets::patch)
                .delete(snippets::delete),
        )
}

fn account_routes() -> Router<AppState> {
    use axum::routing::post;
    use protected::{migrate, settings, sync, usage};

    Router::new()
        .route("/api/user-settings", get(settings::get).put(settings::put))
        .route("/api/usage", get(usage::get))
        .route("/api/sync", get(sync::get))
        .route("/api/migrate", post(migrate::post))
}

fn ai_routes() -> Router<AppState> {
    use axum::routing::post;
    use protected::ai;

    Router::new()
        .route("/api/tone-shift", post(ai::tone_shift::post))
        .route("/api/shorten", post(ai::shorten::post))
        .route("/api/expand", post(ai::expand::post))
        .route("/api/rewrite-channel", post(ai::rewrite_channel::post))
        .route("/api/generate-template", post(ai::generate_template::post))
        .route("/api/brand-alignment", post(ai::brand_alignment::post))
        .route("/api/headlines", post(ai::headlines::post))
}

/// Explicit origins when configured, otherwise permissive (development).
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::database::Database;

    fn test_app(body_limit: usize) -> Router {
        let mut config = AppConfig::development();
        config.server.max_request_size_bytes = body_limit;
        app(AppState::new(config, Some(Database::memory()), None))
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        let response = test_app(1024)
            .oneshot(Request::get("/api/tenants").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected_up_front() {
        let payload = format!("{{\"name\":\"{}\"}}", "x".repeat(2048));
        let request = Request::post("/api/projects")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, payload.len())
            .body(Body::from(payload))
            .unwrap();
        let response = test_app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn configured_origins_pass_preflight() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/projects")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = test_app(1024).oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
    }

    #[test]
    fn wildcard_origin_is_permissive() {
        // Smoke check: building either variant must not panic
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["https://app.copyworx.io".to_string(), "not a header\n".to_string()]);
    }
}
