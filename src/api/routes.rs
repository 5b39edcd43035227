//! Router configuration.

use axum::{Router, middleware, routing::get};

use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware};
use crate::state::AppState;

/// Build the application router.
///
/// Layers run last-added first, so the request id is assigned before the
/// access log reads it.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::mail::mail_routes())
        .nest("/health", handlers::health::health_routes())
        .route("/metrics", get(handlers::metrics::render))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::api::middleware::REQUEST_ID_HEADER;
    use crate::auth::AuthServer;
    use crate::models::DEFAULT_CHARSET;
    use crate::services::mailer::{DispatchService, MailProvider, MockProvider, ProviderRegistry};
    use crate::services::pipeline::{Method as PipelineMethod, build_pipeline};
    use crate::services::pipeline::testing::{CLIENT_ID, SECRET, auth_server};
    use crate::telemetry::ServiceMeters;

    struct Harness {
        router: Router,
        auth: Arc<AuthServer>,
        mock: Arc<MockProvider>,
        meters: Arc<ServiceMeters>,
    }

    fn harness_with(providers: Vec<Arc<MockProvider>>) -> Harness {
        let mock = providers
            .first()
            .cloned()
            .unwrap_or_else(|| Arc::new(MockProvider::new("unused", 99)));
        let registry = Arc::new(
            ProviderRegistry::from_providers(
                providers
                    .into_iter()
                    .map(|p| p as Arc<dyn MailProvider>)
                    .collect(),
            )
            .unwrap(),
        );
        let auth = auth_server();
        let dispatch = DispatchService::new(registry.clone(), auth.clone(), DEFAULT_CHARSET);
        let meters = Arc::new(ServiceMeters::new());
        let pipeline = build_pipeline(dispatch, auth.clone(), meters.clone());

        Harness {
            router: create_router(AppState::new(Arc::new(pipeline), registry)),
            auth,
            mock,
            meters,
        }
    }

    fn harness() -> Harness {
        harness_with(vec![Arc::new(MockProvider::new("mock", 1))])
    }

    fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn mail() -> Value {
        json!({
            "to": "alice@example.com",
            "cc": "bob@example.com",
            "subject": "Welcome",
            "body": "<p>Hi</p>"
        })
    }

    #[tokio::test]
    async fn test_sign_in_returns_token() {
        let h = harness();
        let response = h
            .router
            .oneshot(post("/signin", None, json!({ "clientID": CLIENT_ID, "secret": SECRET })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let claims = h.auth.validate_token(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.client_id, CLIENT_ID);
    }

    #[tokio::test]
    async fn test_sign_in_with_wrong_secret() {
        let h = harness();
        let response = h
            .router
            .oneshot(post("/signin", None, json!({ "clientID": CLIENT_ID, "secret": "guess" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_send_without_token_is_rejected() {
        let h = harness();
        let response = h.router.oneshot(post("/send", None, mail())).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "UNAUTHENTICATED");
        assert_eq!(h.mock.attempts(), 0);
    }

    #[tokio::test]
    async fn test_send_with_token_delivers() {
        let h = harness();
        let token = h.auth.authenticate(CLIENT_ID, SECRET).unwrap();
        let response = h
            .router
            .oneshot(post("/send", Some(&token), mail()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "sent" }));

        let delivered = h.mock.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].to, "alice@example.com");
        assert_eq!(delivered[0].cc.as_deref(), Some("bob@example.com"));
    }

    #[tokio::test]
    async fn test_send_with_forged_token() {
        let h = harness();
        let response = h
            .router
            .oneshot(post("/send", Some("not.a.jwt"), mail()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_send_rejects_bad_address() {
        let h = harness();
        let token = h.auth.authenticate(CLIENT_ID, SECRET).unwrap();
        let response = h
            .router
            .oneshot(post(
                "/send",
                Some(&token),
                json!({ "to": "nobody", "subject": "s", "body": "b" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["field"], "to");
        assert_eq!(h.meters.count(PipelineMethod::Send, true), 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_send_with_bad_body_is_refused_first() {
        let h = harness();
        let response = h
            .router
            .clone()
            .oneshot(post("/send", None, json!({ "to": "nope", "subject": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert!(body.get("details").is_none());
        assert_eq!(h.meters.count(PipelineMethod::Send, true), 1);

        let response = h
            .router
            .oneshot(post("/send", None, json!({ "to": "nope" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.meters.count(PipelineMethod::Send, true), 2);
        assert_eq!(h.mock.attempts(), 0);
    }

    #[tokio::test]
    async fn test_send_treats_blank_cc_as_absent() {
        let h = harness();
        let token = h.auth.authenticate(CLIENT_ID, SECRET).unwrap();
        let response = h
            .router
            .oneshot(post(
                "/send",
                Some(&token),
                json!({ "to": "alice@example.com", "cc": "", "bcc": " ", "subject": "s" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let delivered = h.mock.delivered();
        assert_eq!(delivered[0].cc, None);
        assert_eq!(delivered[0].bcc, None);
    }

    #[tokio::test]
    async fn test_send_with_empty_registry() {
        let h = harness_with(Vec::new());
        let token = h.auth.authenticate(CLIENT_ID, SECRET).unwrap();
        let response = h
            .router
            .oneshot(post("/send", Some(&token), mail()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["code"], "NO_PROVIDER_CONFIGURED");
    }

    #[tokio::test]
    async fn test_sign_out_without_token_is_unauthenticated() {
        let h = harness();
        let response = h
            .router
            .oneshot(post("/signout", None, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.meters.count(PipelineMethod::SignOut, true), 1);
    }

    #[tokio::test]
    async fn test_sign_out_is_not_implemented() {
        let h = harness();
        let token = h.auth.authenticate(CLIENT_ID, SECRET).unwrap();
        let response = h
            .router
            .oneshot(post(
                "/signout",
                Some(&token),
                json!({ "id": "6a2f41a3-c54c-fce8-32d2-0324e1c32e22" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_request_id_echoed() {
        let h = harness();
        let request = Request::builder()
            .uri("/health/live")
            .header(REQUEST_ID_HEADER, "trace-me")
            .body(Body::empty())
            .unwrap();
        let response = h.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me");
    }

    #[tokio::test]
    async fn test_readiness_follows_providers() {
        let h = harness();
        let ready = h.router.clone().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(ready.status(), StatusCode::OK);

        h.mock.set_ready(false);
        let response = h.router.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["providers"][0]["name"], "mock");
        assert_eq!(body["providers"][0]["ready"], false);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let h = harness();
        let response = h.router.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
