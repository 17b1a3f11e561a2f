use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::{Config, StorageDriver},
    handler::{
        admin::admin_handler, auth::auth_handler, functions::functions_handler,
        leads::lead_handler, properties::property_handler, uploads::upload_handler,
        users::users_handler,
    },
    middleware::{auth, record_server_errors},
    AppState,
};

/// CORS for the `/api` surface, restricted to the configured origins.
pub fn api_cors(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE, ACCEPT_LANGUAGE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "success",
        "message": "Service is healthy"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/properties", property_handler())
        .nest("/leads", lead_handler())
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest("/uploads", upload_handler().layer(middleware::from_fn(auth)))
        .merge(admin_handler())
        .layer(TraceLayer::new_for_http())
        .layer(api_cors(&app_state.env));

    let functions_route = functions_handler()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .nest("/functions/v1", functions_route);

    if app_state.env.storage_driver == StorageDriver::Local {
        router = router.nest_service(
            "/files",
            ServeDir::new(&app_state.env.local_storage_path),
        );
    }

    router
        .layer(middleware::from_fn(record_server_errors))
        .layer(Extension(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::db::DBClient;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        Arc::new(AppState::new(DBClient::new(pool), config).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::get("/api/users/notifications")
                    .header(header::ACCEPT_LANGUAGE, "en")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "You must sign in to continue");
    }

    #[tokio::test]
    async fn guard_without_session_redirects_to_login() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::get("/api/auth/guard?required=agent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["decision"], "redirect_to_login");
        assert_eq!(body["redirect_to"], "/auth");
    }

    #[tokio::test]
    async fn mapbox_token_is_returned() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::post("/functions/v1/mapbox-public-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["token"], "pk.test-token");
    }

    #[tokio::test]
    async fn function_errors_use_error_shape() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::post("/functions/v1/get-agent-profile")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"agentCode":"  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn account_changing_functions_require_a_session() {
        let app = create_router(test_state());
        let user_id = uuid::Uuid::new_v4();

        for (uri, body) in [
            (
                "/functions/v1/generate-agent-code",
                format!(r#"{{"userId":"{}"}}"#, user_id),
            ),
            (
                "/functions/v1/watermark-images",
                r#"{"imageUrl":"http://169.254.169.254/latest/meta-data/"}"#.to_string(),
            ),
        ] {
            let response = app
                .clone()
                .oneshot(
                    Request::post(uri)
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn functions_accept_any_origin() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/functions/v1/agent-contact")
                    .header(header::ORIGIN, "https://anywhere.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn translations_are_served_per_language() {
        let app = create_router(test_state());
        let response = app
            .clone()
            .oneshot(Request::get("/api/translations/en").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["data"]["translations"]["upload.empty"],
            "No file was selected"
        );

        let response = app
            .oneshot(Request::get("/api/translations/xx").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn client_errors_land_in_error_log() {
        let state = test_state();
        let app = create_router(state.clone());
        let response = app
            .oneshot(
                Request::post("/api/client-errors")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message":"ReferenceError: map is not defined"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let recent = state.error_log.recent(1);
        assert_eq!(recent[0].message, "ReferenceError: map is not defined");
    }
}
