//! Axum server setup and router configuration.

use crate::api::{self, ApiError};
use crate::config::CorsOrigins;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::State,
    http::{Method, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Plain-text body of `GET /`.
pub const LIVENESS_MESSAGE: &str = "tablecast relay is running";

/// Build the main application router.
pub fn build_router(state: AppState, cors: &CorsOrigins) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .merge(api::router())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
        .with_state(state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::from(AnyOrigin),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().cloned()),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Turns a handler panic into the same 500 body every other internal fault gets.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    subscribers: usize,
    snapshot_rows: usize,
    snapshot_version: u64,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (snapshot_version, snapshot) = state.snapshot.read_versioned().await;
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        subscribers: state.hub.subscriber_count(),
        snapshot_rows: snapshot.len(),
        snapshot_version,
    })
}

/// Run the server until SIGTERM/SIGINT.
///
/// `shutdown_tx` is flipped to `true` as soon as the signal arrives so that
/// background processors and open live connections wind down while axum
/// drains in-flight requests.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);
    serve_until(listener, router, shutdown_tx, shutdown_signal()).await
}

async fn serve_until<F>(
    listener: TcpListener,
    router: Router,
    shutdown_tx: watch::Sender<bool>,
    signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            signal.await;
            let _ = shutdown_tx.send(true);
        })
        .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tablecast_sdk::client::RelayClient;
    use tablecast_sdk::objects::{LiveMessage, Operation};
    use tower::ServiceExt;

    pub(crate) fn test_app() -> (Router, AppState, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(shutdown_rx);
        (build_router(state.clone(), &CorsOrigins::Any), state, shutdown_tx)
    }

    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub(crate) fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    pub(crate) async fn read_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for_subscribers(state: &AppState, count: usize) {
        for _ in 0..200 {
            if state.hub.subscriber_count() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} subscribers, have {}", state.hub.subscriber_count());
    }

    #[tokio::test]
    async fn test_liveness() {
        let (app, _state, _shutdown) = test_app();
        let resp = app.oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], LIVENESS_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_health_reports_snapshot() {
        let (app, state, _shutdown) = test_app();
        state.snapshot.replace(vec![json!(1), json!(2)]).await;
        let _sub = state.hub.subscribe();

        let resp = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["subscribers"], 1);
        assert_eq!(body["snapshot_rows"], 2);
        assert_eq!(body["snapshot_version"], 1);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let origins = CorsOrigins::List(vec!["http://viewer.local".parse().unwrap()]);
        let app = build_router(AppState::new(shutdown_rx), &origins);

        let req = Request::builder()
            .method("OPTIONS")
            .uri("/receive-data")
            .header("origin", "http://viewer.local")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://viewer.local"
        );
        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn test_handler_panic_is_generic_500() {
        async fn exploding() -> &'static str {
            panic!("secret detail")
        }
        let app: Router = Router::new()
            .route("/boom", axum::routing::get(exploding))
            .layer(CatchPanicLayer::custom(handle_panic));

        let resp = app.oneshot(get("/boom")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("secret detail"));
        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body, json!({"error": "something went wrong"}));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (app, _state, _shutdown) = test_app();
        let resp = app.oneshot(get("/nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_end_to_end_over_socket() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(shutdown_rx);
        let router = build_router(state.clone(), &CorsOrigins::Any);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, router, shutdown_tx, async move {
            let _ = stop_rx.await;
        }));

        let client = RelayClient::new(format!("http://{addr}").parse().unwrap());
        assert_eq!(client.liveness().await.unwrap(), LIVENESS_MESSAGE);
        assert!(client.get_data().await.unwrap().is_empty());

        let mut live = client.subscribe().await.unwrap();
        wait_for_subscribers(&state, 1).await;

        let ack = client.notify_change("orders", Operation::Update).await.unwrap();
        assert_eq!(ack.message, "change notification received");

        let rows = vec![json!({"id": 1}), json!({"id": 2})];
        let ack = client.push_results(rows.clone()).await.unwrap();
        assert_eq!(ack.message, "data received and stored");

        let signal = tokio::time::timeout(Duration::from_secs(5), live.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(signal, LiveMessage::DataChanged);
        assert_eq!(client.get_data().await.unwrap(), rows);

        // Shutdown closes the live connection instead of waiting on it.
        stop_tx.send(()).unwrap();
        let closed = tokio::time::timeout(Duration::from_secs(5), live.next())
            .await
            .unwrap();
        assert!(closed.is_none());
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_disconnected_viewer_is_unregistered() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(shutdown_rx);
        let router = build_router(state.clone(), &CorsOrigins::Any);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, router, shutdown_tx, async move {
            let _ = stop_rx.await;
        }));

        let client = RelayClient::new(format!("http://{addr}").parse().unwrap());
        let live = client.subscribe().await.unwrap();
        wait_for_subscribers(&state, 1).await;

        live.close().await.unwrap();
        wait_for_subscribers(&state, 0).await;

        // Broadcasting with nobody listening still succeeds.
        client.push_results(vec![json!("row")]).await.unwrap();

        stop_tx.send(()).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
    }
}
