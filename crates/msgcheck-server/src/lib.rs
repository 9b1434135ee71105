//! MsgCheck Server - HTTP API server.
//!
//! ## Endpoints
//!
//! - `POST /classify` - Classify a message and return its label
//! - `GET /health` - Report the loaded models
//!
//! ## Example
//!
//! ```no_run
//! use msgcheck_core::MessageClassifier;
//! use msgcheck_server::{AppState, Server, ServerConfig};
//!
//! # async fn run(classifier: MessageClassifier) {
//! let server = Server::with_state(ServerConfig::default(), AppState::new(classifier)).unwrap();
//! server.run().await.unwrap();
//! # }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default server host (all interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default allowed origin (local development frontend).
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0).
    pub host: String,
    /// Port to bind to (default: 5000).
    pub port: u16,
    /// Origins allowed to make cross-origin requests. `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replaces the allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Host is not an IP address.
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// CORS origin is not a valid header value.
    #[error("invalid CORS origin: {0}")]
    InvalidOrigin(String),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the CORS layer for the configured origins.
fn cors_layer(origins: &[String]) -> std::result::Result<CorsLayer, ServerError> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|_| ServerError::InvalidOrigin(o.clone())))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

/// Builds the API router without CORS.
fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/classify", post(handlers::classify))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a server around the given application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let cors = cors_layer(&config.cors_origins)?;
        let router = api_router(state).layer(cors);

        let ip: IpAddr = config
            .host
            .parse()
            .map_err(|_| ServerError::InvalidHost(config.host.clone()))?;
        let addr = SocketAddr::new(ip, config.port);

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Runs the server until the process exits.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the server until `shutdown` resolves, then drains connections.
    pub async fn run_until<F>(self, shutdown: F) -> std::result::Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting MsgCheck API server on {}", self.addr);

        // SO_REUSEADDR lets restarts bind while old sockets linger in TIME_WAIT
        let socket = Socket::new(
            Domain::for_address(self.addr),
            Type::STREAM,
            Some(Protocol::TCP),
        )
        .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        info!("MsgCheck API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use msgcheck_core::classifier::{
        ClassifierError, SentimentPolarity, SentimentResult, SentimentScorer, ToxicityScorer,
        ToxicityScores, INSULT, SEVERE_TOXIC, THREAT, TOXIC,
    };
    use msgcheck_core::MessageClassifier;
    use serde_json::json;
    use tower::ServiceExt;

    /// Keyword-driven stand-in for the toxicity model.
    struct KeywordToxicity;

    impl ToxicityScorer for KeywordToxicity {
        fn score(&mut self, text: &str) -> msgcheck_core::classifier::Result<ToxicityScores> {
            let text = text.to_lowercase();
            let scores: &[(&str, f32)] = if text.contains("destroy") {
                &[(TOXIC, 0.95), (SEVERE_TOXIC, 0.6)]
            } else if text.contains("idiot") {
                &[(TOXIC, 0.9), (INSULT, 0.8)]
            } else if text.contains("watch your back") {
                &[(TOXIC, 0.7), (THREAT, 0.5)]
            } else {
                &[(TOXIC, 0.05)]
            };
            Ok(scores.iter().map(|(k, v)| (k.to_string(), *v)).collect())
        }

        fn name(&self) -> &str {
            "keyword-toxicity"
        }
    }

    struct KeywordSentiment;

    impl SentimentScorer for KeywordSentiment {
        fn score(&mut self, text: &str) -> msgcheck_core::classifier::Result<SentimentResult> {
            if text.to_lowercase().contains("great") {
                Ok(SentimentResult::new("NEGATIVE", SentimentPolarity::Negative, 0.8))
            } else {
                Ok(SentimentResult::new("POSITIVE", SentimentPolarity::Positive, 0.8))
            }
        }

        fn name(&self) -> &str {
            "keyword-sentiment"
        }
    }

    struct BrokenSentiment;

    impl SentimentScorer for BrokenSentiment {
        fn score(&mut self, _text: &str) -> msgcheck_core::classifier::Result<SentimentResult> {
            Err(ClassifierError::InferenceError("model crashed".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn test_state() -> AppState {
        AppState::new(MessageClassifier::new(
            Box::new(KeywordToxicity),
            Box::new(KeywordSentiment),
        ))
    }

    fn create_test_app() -> Router {
        Server::with_state(ServerConfig::default(), test_state())
            .unwrap()
            .router()
    }

    fn classify_request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/classify")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn classify_label(app: Router, text: &str) -> String {
        let response = app
            .oneshot(classify_request(json!({ "text": text }).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["label"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_classify_labels() {
        assert_eq!(classify_label(create_test_app(), "hello friend").await, "safe");
        assert_eq!(
            classify_label(create_test_app(), "I will destroy you").await,
            "dangerous"
        );
        assert_eq!(
            classify_label(create_test_app(), "you idiot").await,
            "abusive"
        );
        assert_eq!(
            classify_label(create_test_app(), "watch your back").await,
            "harassment"
        );
        assert_eq!(
            classify_label(create_test_app(), "Great, more positive words").await,
            "sarcasm"
        );
    }

    #[tokio::test]
    async fn test_classify_response_shape() {
        let app = create_test_app();

        let response = app
            .oneshot(classify_request(json!({"text": "hello"}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["label"], "safe");
        assert_eq!(json["sentiment"], "positive");
        assert!(!json["reasons"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toxic_response_has_no_sentiment() {
        let app = create_test_app();

        let response = app
            .oneshot(classify_request(json!({"text": "you idiot"}).to_string()))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["label"], "abusive");
        assert!(json.get("sentiment").is_none());
    }

    #[tokio::test]
    async fn test_missing_text_is_empty() {
        let app = create_test_app();

        let response = app.oneshot(classify_request("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["label"], "safe");
    }

    #[tokio::test]
    async fn test_non_string_text_is_empty() {
        let app = create_test_app();

        let response = app
            .oneshot(classify_request(json!({"text": 17}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["label"], "safe");
    }

    #[tokio::test]
    async fn test_text_and_message_prefers_text() {
        let app = create_test_app();

        let response = app
            .oneshot(classify_request(r#"{"text":"you idiot","message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["label"], "abusive");
    }

    #[tokio::test]
    async fn test_message_field() {
        let app = create_test_app();

        let response = app
            .oneshot(classify_request(json!({"message": "you idiot"}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["label"], "abusive");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = create_test_app();

        let response = app.oneshot(classify_request("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_non_object_body_is_bad_request() {
        let app = create_test_app();

        let response = app.oneshot(classify_request("[\"hi\"]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_scorer_failure_is_server_error() {
        let state = AppState::new(MessageClassifier::new(
            Box::new(KeywordToxicity),
            Box::new(BrokenSentiment),
        ));
        let app = Server::with_state(ServerConfig::default(), state)
            .unwrap()
            .router();

        let response = app
            .oneshot(classify_request(json!({"text": "hello"}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["code"], "classification_error");
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_test_app();

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["toxicity_model"], "keyword-toxicity");
        assert_eq!(json["sentiment_model"], "keyword-sentiment");
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let app = create_test_app();

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/classify")
            .header("origin", DEFAULT_CORS_ORIGIN)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            DEFAULT_CORS_ORIGIN
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_other_origin() {
        let app = create_test_app();

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/classify")
            .header("origin", "http://evil.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_cors_wildcard() {
        let config = ServerConfig::default().with_cors_origins(vec!["*".to_string()]);
        let app = Server::with_state(config, test_state()).unwrap().router();

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/classify")
            .header("origin", "http://anywhere.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cors_origins, vec![DEFAULT_CORS_ORIGIN.to_string()]);
    }

    #[test]
    fn test_server_config_builders() {
        let config = ServerConfig::default().with_host("127.0.0.1").with_port(9000);
        assert_eq!(config.port, 9000);

        let server = Server::with_state(config, test_state()).unwrap();
        assert_eq!(
            server.addr(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_host_rejected() {
        let config = ServerConfig::default().with_host("not a host");
        assert!(matches!(
            Server::with_state(config, test_state()),
            Err(ServerError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let config = ServerConfig::default().with_cors_origins(vec!["bad\norigin".to_string()]);
        assert!(matches!(
            Server::with_state(config, test_state()),
            Err(ServerError::InvalidOrigin(_))
        ));
    }
}
