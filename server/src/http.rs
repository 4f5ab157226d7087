//! HTTP front end.
//!
//! Every request to `/` must be a POST with a JSON body. The body is handed
//! to the dispatcher on the blocking pool, since data-source calls block.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use parking_lot::Mutex;
use serde_json::Value;
use sqlbook_rpc::{
    Dispatcher, ErrorObject, Response as RpcResponse, INTERNAL_ERROR, PARSE_ERROR,
    PATH_NOT_ALLOWED, SESSION_ERROR,
};
use sqlbook_source::DataSource;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Shared server state.
pub struct AppState<S: DataSource> {
    dispatcher: Arc<Mutex<Dispatcher<S>>>,
    shutdown: Arc<Notify>,
}

impl<S: DataSource> AppState<S> {
    pub fn new(dispatcher: Dispatcher<S>, shutdown: Arc<Notify>) -> Self {
        Self {
            dispatcher: Arc::new(Mutex::new(dispatcher)),
            shutdown,
        }
    }
}

impl<S: DataSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

/// Build the router: JSON-RPC on `/`, 404 everywhere else.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: DataSource + Send + 'static,
    S::Cursor: Send,
{
    Router::new()
        .route("/", any(rpc::<S>))
        .fallback(not_found)
        .with_state(state)
}

async fn rpc<S>(
    State(state): State<AppState<S>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: DataSource + Send + 'static,
    S::Cursor: Send,
{
    if method != Method::POST {
        warn!(%method, "rejecting non-POST request");
        return fault(
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorObject::new(SESSION_ERROR, "Only the POST method is allowed", "MethodNotAllowed"),
        );
    }
    if !is_json(&headers) {
        warn!("rejecting non-JSON request");
        return fault(
            StatusCode::OK,
            ErrorObject::new(PARSE_ERROR, "Parse error", "ParseError"),
        );
    }

    debug!(bytes = body.len(), "processing request");
    let dispatcher = Arc::clone(&state.dispatcher);
    let outcome = tokio::task::spawn_blocking(move || {
        let mut dispatcher = dispatcher.lock();
        let response = dispatcher.handle(&body);
        (response, dispatcher.is_finished())
    })
    .await;

    match outcome {
        Ok((bytes, finished)) => {
            if finished {
                state.shutdown.notify_one();
            }
            json(StatusCode::OK, bytes)
        }
        Err(err) => {
            error!(error = %err, "dispatcher task failed");
            fault(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorObject::new(INTERNAL_ERROR, "Internal error", "InternalError"),
            )
        }
    }
}

async fn not_found() -> Response {
    fault(
        StatusCode::NOT_FOUND,
        ErrorObject::new(PATH_NOT_ALLOWED, "Only the path / is allowed", "PathNotAllowed"),
    )
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

fn fault(status: StatusCode, error: ErrorObject) -> Response {
    json(status, RpcResponse::failure(Value::Null, error).to_bytes())
}

fn json(status: StatusCode, bytes: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], bytes).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;
    use sqlbook_core::Value as Cell;
    use sqlbook_session::QuerySession;
    use sqlbook_source::MemorySource;

    fn state() -> AppState<MemorySource> {
        let source = MemorySource::new().with_result_set(
            "SELECT 1",
            &[("one", "INTEGER")],
            vec![vec![Cell::Integer(1)]],
        );
        AppState::new(
            Dispatcher::new(QuerySession::new(source)),
            Arc::new(Notify::new()),
        )
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_is_dispatched() {
        // GIVEN
        let state = state();
        let body = Bytes::from_static(
            br#"{"jsonrpc":"2.0","method":"execute","params":["SELECT 1"],"id":1}"#,
        );

        // WHEN
        let response = rpc(State(state.clone()), Method::POST, json_headers(), body).await;

        // THEN
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["result"], Value::Bool(true));
        assert_eq!(body["id"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn test_non_post_is_rejected() {
        let response = rpc(State(state()), Method::GET, json_headers(), Bytes::new()).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], serde_json::json!(-32000));
        assert_eq!(body["error"]["message"], "Only the POST method is allowed");
    }

    #[tokio::test]
    async fn test_non_json_content_type_is_a_parse_error() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let response = rpc(State(state()), Method::POST, headers, Bytes::from_static(b"{}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], serde_json::json!(-32700));
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let response = not_found().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], serde_json::json!(-32001));
        assert_eq!(body["error"]["message"], "Only the path / is allowed");
    }

    #[tokio::test]
    async fn test_quit_marks_dispatcher_finished() {
        // GIVEN
        let state = state();
        let body = Bytes::from_static(br#"{"jsonrpc":"2.0","method":"quit","id":9}"#);

        // WHEN
        let response = rpc(State(state.clone()), Method::POST, json_headers(), body).await;

        // THEN
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.dispatcher.lock().is_finished());
    }
}
