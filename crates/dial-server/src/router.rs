//! Method × path-shape dispatch (spec.md §4.4).
//!
//! Grounded on `octofhir-server::gateway::router::gateway_fallback_handler`: a single
//! fallback handler receiving the raw `Request<Body>`, inspecting `request.method()`
//! itself rather than relying on axum's per-route method routing, because the DIAL
//! matrix's "unmatched combination → 501" rule doesn't map cleanly onto axum's
//! built-in 405 behavior.

use std::net::{IpAddr, SocketAddr};

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;

use crate::error::ServerError;
use crate::handlers;
use crate::path::{classify, ParsedPath, PathShape};
use crate::server::ServerState;
use dial_registry::OriginPolicy;

pub fn build_router(state: ServerState) -> Router {
    Router::new().fallback(any(dispatch)).with_state(state)
}

async fn dispatch(
    State(state): State<ServerState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    match route(&state, addr, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn route(state: &ServerState, addr: SocketAddr, request: Request<Body>) -> Result<Response, ServerError> {
    if !matches!(addr.ip(), IpAddr::V4(_)) {
        return Err(ServerError::NotImplemented("IPv6 clients are not supported".into()));
    }

    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().map(str::to_string);
    let headers = parts.headers.clone();

    if headers.get(header::HOST).is_none() {
        return Err(ServerError::Forbidden("missing Host header".into()));
    }

    let parsed = ParsedPath::parse(&path, state.config.limits.max_uri_length)
        .map_err(|e| ServerError::NotImplemented(e.to_string()))?;
    let shape = classify(&parsed).ok_or_else(|| {
        ServerError::NotImplemented(format!("unrecognized path shape: {path}"))
    })?;
    // `/apps/system` is a fixed administrative subtree, not a registrable app: the
    // original's `soup_server_add_handler` claims the whole subtree with one callback,
    // so `/apps/system/<anything>` is routed the same as the bare path rather than
    // being classified as an instance/hide shape on an app named "system".
    let shape = if shape_app_name(&shape) == Some("system") {
        PathShape::System
    } else {
        shape
    };

    let app_name = shape_app_name(&shape);
    if let Some(app_name) = app_name {
        if !state.registry.is_registered(app_name) {
            state.events.invalid_uri(format!("unregistered app: {app_name}"));
            return Err(ServerError::NotFound(format!("app '{app_name}' is not registered")));
        }
    }

    let origin = header_str(&headers, header::ORIGIN);
    let origin_admitted = match app_name {
        Some(app_name) => OriginPolicy::is_allowed(&state.registry, origin, app_name),
        None => true,
    };

    if method == Method::OPTIONS {
        return Ok(handle_options(&shape, origin, origin_admitted));
    }

    if origin.is_some() && !origin_admitted {
        return Err(ServerError::Forbidden("origin not allowed for this app".into()));
    }

    let cors_header = admitted_cors_header(origin, origin_admitted);

    dispatch_shape(state, &shape, &method, &headers, query.as_deref(), body, addr, cors_header).await
}

fn shape_app_name(shape: &PathShape) -> Option<&str> {
    match shape {
        PathShape::App { app_name } => Some(app_name),
        PathShape::AppInstance { app_name, .. } => Some(app_name),
        PathShape::DialData { app_name } => Some(app_name),
        PathShape::Hide { app_name, .. } => Some(app_name),
        PathShape::System => None,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn admitted_cors_header(origin: Option<&str>, admitted: bool) -> Option<String> {
    if admitted {
        origin.map(str::to_string)
    } else {
        None
    }
}

fn allow_methods_for(shape: &PathShape) -> Option<&'static str> {
    match shape {
        PathShape::App { .. } => Some("GET, POST, OPTIONS"),
        PathShape::AppInstance { .. } => Some("DELETE, OPTIONS"),
        PathShape::DialData { .. } => Some("POST, OPTIONS"),
        PathShape::Hide { .. } => Some("POST, OPTIONS"),
        PathShape::System => None,
    }
}

fn handle_options(shape: &PathShape, origin: Option<&str>, admitted: bool) -> Response {
    match allow_methods_for(shape) {
        Some(methods) => {
            let mut builder = axum::http::Response::builder()
                .status(StatusCode::NO_CONTENT)
                .header("Access-Control-Allow-Methods", methods)
                .header("Access-Control-Max-Age", "86400");
            if let Some(cors) = admitted_cors_header(origin, admitted) {
                builder = builder.header(header::ACCESS_CONTROL_ALLOW_ORIGIN, cors);
            }
            builder.body(Body::empty()).unwrap()
        }
        None => ServerError::NotImplemented("OPTIONS not supported on this path".into()).into_response(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_shape(
    state: &ServerState,
    shape: &PathShape,
    method: &Method,
    headers: &HeaderMap,
    query: Option<&str>,
    body: Body,
    addr: SocketAddr,
    cors_header: Option<String>,
) -> Result<Response, ServerError> {
    match (shape, method) {
        (PathShape::App { app_name }, &Method::GET) => {
            handlers::get_app(state, app_name, query).await
        }
        (PathShape::App { app_name }, &Method::POST) => {
            let bytes = read_body(body, state.config.limits.max_payload_bytes).await?;
            let state = state.clone();
            let app_name = app_name.clone();
            let headers = headers.clone();
            let query = query.map(str::to_string);
            run_pooled(state.clone(), async move {
                handlers::launch(&state, &app_name, bytes, query.as_deref(), &headers, addr, cors_header).await
            })
            .await
        }
        (PathShape::AppInstance { .. }, &Method::POST) => {
            Err(ServerError::NotFound("POST is not defined for an instance path".into()))
        }
        (PathShape::AppInstance { app_name, instance }, &Method::DELETE) => {
            let state = state.clone();
            let app_name = app_name.clone();
            let instance = instance.clone();
            run_pooled(state.clone(), async move {
                handlers::stop(&state, &app_name, &instance, cors_header).await
            })
            .await
        }
        (PathShape::DialData { app_name }, &Method::POST) => {
            if !state.local_only {
                return Err(ServerError::NotImplemented(
                    "dial_data is only served on the loopback server".into(),
                ));
            }
            if !matches!(addr.ip(), IpAddr::V4(v4) if v4.is_loopback()) {
                return Err(ServerError::Internal("loopback check failed".into()));
            }
            let bytes = read_dial_data_body(body, state.config.limits.max_dial_data_bytes).await?;
            handlers::set_data(state, app_name, bytes).await
        }
        (PathShape::Hide { app_name, instance }, &Method::POST) => {
            let _ = read_body(body, state.config.limits.max_payload_bytes).await?;
            let state = state.clone();
            let app_name = app_name.clone();
            let instance = instance.clone();
            run_pooled(state.clone(), async move {
                handlers::hide(&state, &app_name, &instance, cors_header).await
            })
            .await
        }
        (PathShape::Hide { .. }, &Method::DELETE) => {
            Err(ServerError::NotFound("DELETE is not defined on the hide path".into()))
        }
        (PathShape::System, &Method::POST) => handlers::system(state, query).await,
        (PathShape::System, &Method::DELETE) => {
            Err(ServerError::Forbidden("DELETE on /apps/system is forbidden".into()))
        }
        _ => Err(ServerError::NotImplemented(format!(
            "{method} is not defined for this path shape"
        ))),
    }
}

/// Enqueues `task` on the worker pool and awaits its result (spec.md §4.5: LAUNCH,
/// HIDE and STOP each execute exactly one at a time, serialized behind the pool).
async fn run_pooled<F>(state: ServerState, task: F) -> Result<Response, ServerError>
where
    F: std::future::Future<Output = Response> + Send + 'static,
{
    let rx = state.worker.enqueue(task)?;
    rx.await
        .map_err(|_| ServerError::Internal("worker pool dropped the response".into()))
}

/// Launch's body cap is `length ≤ maxPayload` (spec.md §4.7 LAUNCH step 2).
async fn read_body(body: Body, max_bytes: usize) -> Result<Bytes, ServerError> {
    read_body_checked(body, max_bytes, false).await
}

/// `dial_data`'s body cap is strictly `length < maxDialData` (spec.md §4.7 SET_DATA),
/// unlike LAUNCH's `≤ maxPayload` — a body exactly at the cap is rejected here.
async fn read_dial_data_body(body: Body, max_bytes: usize) -> Result<Bytes, ServerError> {
    read_body_checked(body, max_bytes, true).await
}

async fn read_body_checked(body: Body, max_bytes: usize, strict: bool) -> Result<Bytes, ServerError> {
    // One byte over the cap still needs to be detectable, so collect with headroom
    // rather than relying on axum's limit to reject silently at the boundary.
    let collected = axum::body::to_bytes(body, max_bytes + 1)
        .await
        .map_err(|e| ServerError::Internal(format!("failed to read body: {e}")))?;
    let over_limit = if strict {
        collected.len() >= max_bytes
    } else {
        collected.len() > max_bytes
    };
    if over_limit {
        return Err(ServerError::PayloadTooLarge);
    }
    if !collected.is_empty() && !collected.iter().all(|&b| (0x20..=0x7e).contains(&b)) {
        return Err(ServerError::BadRequest("body must be ASCII-printable".into()));
    }
    Ok(collected)
}
