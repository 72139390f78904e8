//! A local HTTP object store that honours `Range` requests.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct ServerState {
    objects: RwLock<HashMap<String, Bytes>>,
    requests: AtomicU64,
    stall_after: AtomicUsize,
    ignore_ranges: AtomicBool,
}

/// An HTTP server for archive objects under `/autoclaved/`.
///
/// Ranged requests get `206 Partial Content` with a `Content-Range` header;
/// ranges reaching past the end are clamped and ranges starting past the
/// end get `416`. The server stops when dropped.
pub struct RangeServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl RangeServer {
    /// Binds to an ephemeral local port and starts serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(ServerState {
            stall_after: AtomicUsize::new(usize::MAX),
            ..ServerState::default()
        });

        let app = Router::new()
            .route("/autoclaved/*path", get(serve_object))
            .with_state(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL to configure an HTTP fetcher with.
    pub fn base_url(&self) -> String {
        format!("http://{}/autoclaved/", self.addr)
    }

    /// Stores (or replaces) an object.
    pub fn insert(&self, path: &str, data: impl Into<Bytes>) {
        self.state.objects.write().insert(path.to_string(), data.into());
    }

    /// Number of requests received.
    pub fn request_count(&self) -> u64 {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Sends only the first `bytes` of every body, then hangs without
    /// closing the connection.
    pub fn stall_after(&self, bytes: usize) {
        self.state.stall_after.store(bytes, Ordering::SeqCst);
    }

    /// Answers every request with `200 OK`, the whole object and its
    /// `Content-Length`, like a store without range support.
    pub fn ignore_ranges(&self) {
        self.state.ignore_ranges.store(true, Ordering::SeqCst);
    }
}

impl Drop for RangeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_object(
    State(state): State<Arc<ServerState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let Some(data) = state.objects.read().get(&path).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let stall_after = state.stall_after.load(Ordering::SeqCst);

    if state.ignore_ranges.load(Ordering::SeqCst) {
        return (
            StatusCode::OK,
            [(CONTENT_LENGTH, data.len().to_string())],
            body(data, stall_after),
        )
            .into_response();
    }

    let Some(range) = headers.get(RANGE).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::OK, body(data, stall_after)).into_response();
    };
    let len = data.len();
    match parse_range(range, len) {
        Some((first, last)) => (
            StatusCode::PARTIAL_CONTENT,
            [(CONTENT_RANGE, format!("bytes {first}-{last}/{len}"))],
            body(data.slice(first..=last), stall_after),
        )
            .into_response(),
        None => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(CONTENT_RANGE, format!("bytes */{len}"))],
        )
            .into_response(),
    }
}

fn body(data: Bytes, stall_after: usize) -> Body {
    if stall_after >= data.len() {
        return Body::from(data);
    }
    let head = data.slice(..stall_after);
    Body::from_stream(
        futures::stream::once(async move { Ok::<_, io::Error>(head) })
            .chain(futures::stream::pending::<io::Result<Bytes>>()),
    )
}

/// Parses `bytes=<first>-[<last>]` into an inclusive, clamped range.
fn parse_range(value: &str, len: usize) -> Option<(usize, usize)> {
    let (first, last) = value.strip_prefix("bytes=")?.split_once('-')?;
    let first: usize = first.trim().parse().ok()?;
    let last = match last.trim() {
        "" => len.checked_sub(1)?,
        last => last.parse::<usize>().ok()?.min(len.checked_sub(1)?),
    };
    (first <= last).then_some((first, last))
}
