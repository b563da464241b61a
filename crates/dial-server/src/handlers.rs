//! The six DIAL lifecycle operations (spec.md §4.7): GET_app, LAUNCH, HIDE, STOP,
//! SET_DATA, SYSTEM.
//!
//! Grounded on `gdial_rest_server_handle_GET`/`handle_POST`/`handle_DELETE` in
//! `examples/original_source/server/gdial-rest.c`. LAUNCH/HIDE/STOP run behind the
//! worker pool (spec.md §4.5) and so return a bare `Response` with every error already
//! folded in — `router.rs` awaits the pool's oneshot directly. GET_app/SET_DATA/SYSTEM
//! run inline and return `Result<Response, ServerError>` like every other inline path.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use dial_core::{AppState, PlatformError};

use crate::encode;
use crate::error::ServerError;
use crate::instance::AppInstanceRecord;
use crate::server::ServerState;

/// GET /apps/<name> — renders the `<service>` XML document (spec.md §4.9).
pub async fn get_app(
    state: &ServerState,
    app_name: &str,
    query: Option<&str>,
) -> Result<Response, ServerError> {
    state
        .registry
        .lookup(app_name)
        .ok_or_else(|| ServerError::NotFound(format!("app '{app_name}' is not registered")))?;

    // clientDialVer is accepted and logged only; it never changes the response body
    // (SPEC_FULL.md §4.7 SUPPLEMENT).
    if let Some(client_ver) = query_param(query, "clientDialVer") {
        tracing::debug!(app = app_name, client_dial_ver = %client_ver, "GET_app request");
    }

    let current_state = state.platform.state(app_name).await;
    let additional_data = state.aux_data.get(app_name);
    let body = state.xml.render(app_name, current_state, &[], &additional_data);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        body,
    )
        .into_response())
}

/// POST /apps/<name> — launches or resumes an app instance (spec.md §4.7 LAUNCH).
pub async fn launch(
    state: &ServerState,
    app_name: &str,
    body: Bytes,
    query: Option<&str>,
    headers: &HeaderMap,
    _addr: SocketAddr,
    cors_header: Option<String>,
) -> Response {
    match launch_inner(state, app_name, body, query, headers, cors_header).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn launch_inner(
    state: &ServerState,
    app_name: &str,
    body: Bytes,
    query: Option<&str>,
    headers: &HeaderMap,
    cors_header: Option<String>,
) -> Result<Response, ServerError> {
    let registration = state
        .registry
        .lookup(app_name)
        .ok_or_else(|| ServerError::NotFound(format!("app '{app_name}' is not registered")))?;

    // spec.md §4.7 LAUNCH step 3: the port comes from the accepting socket, not the
    // configured default — an ephemeral/OS-assigned bind would otherwise produce a
    // `Location` pointing at the wrong port. A still-unknown port (bind not finished,
    // or somehow never recorded) is the spec's port-lookup failure, mapped to 500.
    let public_port = state.ports.public().ok_or_else(|| {
        ServerError::Internal("unable to determine the accepting socket's port".into())
    })?;

    let body_str = if body.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&body).into_owned())
    };
    let effective_payload = if body_str.is_none() && state.config.features.merge_url_and_body_query
    {
        query.map(str::to_string)
    } else {
        body_str.clone()
    };

    let existing = state.instances.get(app_name);
    let should_relaunch = match &existing {
        None => true,
        Some(record) => {
            let current_state = state
                .state_cache
                .get(app_name)
                .await
                .map(|s| s.state)
                .unwrap_or(AppState::Stopped);
            current_state == AppState::Stopped || record.cached_payload != effective_payload
        }
    };

    let platform_result = if should_relaunch {
        state.instances.remove(app_name);

        let is_youtube =
            state.config.features.youtube_payload_passthrough && app_name == "YouTube";
        let encoded_payload = effective_payload.as_deref().map(|p| {
            if is_youtube {
                p.to_string()
            } else {
                encode::encode_payload(p)
            }
        });

        let additional_data_url = if registration.use_additional_data {
            let local_port = state.ports.local().ok_or_else(|| {
                ServerError::Internal("unable to determine the loopback listener's port".into())
            })?;
            Some(encode::encode_additional_data_url(&build_additional_data_url(
                local_port, headers, app_name,
            )))
        } else {
            None
        };

        state
            .platform
            .start(
                app_name,
                encoded_payload.as_deref(),
                query,
                additional_data_url.as_deref(),
            )
            .await
    } else {
        // Resume without relaunch: still call start, with every optional arg empty
        // (SPEC_FULL.md §4.7 "Resume-without-relaunch still calls platform start").
        state.platform.start(app_name, None, None, None).await
    };

    if let Err(platform_err) = platform_result {
        return Err(map_launch_platform_error(platform_err));
    }

    let reached = state
        .state_cache
        .wait_for_state(app_name, AppState::Running, state.config.state_wait_timeout())
        .await;
    if !reached {
        return Err(ServerError::Internal(format!(
            "app '{app_name}' did not reach RUNNING before the deadline"
        )));
    }

    state
        .instances
        .put(app_name, AppInstanceRecord::new(effective_payload));

    let host = host_only(headers);
    let location = format!("http://{}:{}/apps/{}/run", host, public_port, app_name);

    let mut headers_out = vec![
        (header::LOCATION, location),
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
    ];
    if let Some(origin) = cors_header {
        headers_out.push((header::ACCESS_CONTROL_ALLOW_ORIGIN, origin));
    }

    Ok((StatusCode::CREATED, headers_out).into_response())
}

fn map_launch_platform_error(err: PlatformError) -> ServerError {
    match err {
        PlatformError::Forbidden => ServerError::Forbidden("platform refused to launch the app".into()),
        PlatformError::Unauth => ServerError::Unauthorized,
        PlatformError::NotImplemented | PlatformError::Internal => {
            ServerError::ServiceUnavailable("platform launcher is unavailable".into())
        }
    }
}

fn build_additional_data_url(local_port: u16, headers: &HeaderMap, app_name: &str) -> String {
    let host = host_only(headers);
    format!("http://{}:{}/apps/{}/dial_data", host, local_port, app_name)
}

/// DELETE /apps/<name>/<instance>/hide — hides a running instance (spec.md §4.7 HIDE).
pub async fn hide(
    state: &ServerState,
    app_name: &str,
    instance: &str,
    cors_header: Option<String>,
) -> Response {
    match hide_inner(state, app_name, instance, cors_header).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn hide_inner(
    state: &ServerState,
    app_name: &str,
    instance: &str,
    cors_header: Option<String>,
) -> Result<Response, ServerError> {
    if !state.instances.resolves(app_name, instance) {
        return Err(ServerError::NotFound(format!(
            "instance '{instance}' of app '{app_name}' is not found"
        )));
    }

    let current_state = state
        .state_cache
        .get(app_name)
        .await
        .map(|s| s.state)
        .unwrap_or(AppState::Stopped);
    if !matches!(current_state, AppState::Running | AppState::Hide) {
        return Err(ServerError::NotFound(format!(
            "app '{app_name}' is not running"
        )));
    }

    if let Err(platform_err) = state.platform.hide(app_name).await {
        return Err(match platform_err {
            PlatformError::NotImplemented => {
                ServerError::NotImplemented("platform does not support hide".into())
            }
            _ => ServerError::Internal("platform failed to hide the app".into()),
        });
    }

    let reached = state
        .state_cache
        .wait_for_state(app_name, AppState::Hide, state.config.state_wait_timeout())
        .await;
    if !reached {
        return Err(ServerError::Internal(format!(
            "app '{app_name}' did not reach HIDE before the deadline"
        )));
    }

    Ok(ok_with_cors(cors_header))
}

/// DELETE /apps/<name>/<instance> — stops a running or hidden instance (spec.md §4.7
/// STOP).
pub async fn stop(
    state: &ServerState,
    app_name: &str,
    instance: &str,
    cors_header: Option<String>,
) -> Response {
    match stop_inner(state, app_name, instance, cors_header).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn stop_inner(
    state: &ServerState,
    app_name: &str,
    instance: &str,
    cors_header: Option<String>,
) -> Result<Response, ServerError> {
    if app_name == "system" {
        return Err(ServerError::Forbidden("cannot stop the system pseudo-app".into()));
    }

    if !state.instances.resolves(app_name, instance) {
        return Err(ServerError::NotFound(format!(
            "instance '{instance}' of app '{app_name}' is not found"
        )));
    }

    let current_state = state
        .state_cache
        .get(app_name)
        .await
        .map(|s| s.state)
        .unwrap_or(AppState::Stopped);
    if !matches!(current_state, AppState::Running | AppState::Hide) {
        return Err(ServerError::NotFound(format!(
            "app '{app_name}' is not running"
        )));
    }

    if state.platform.stop(app_name).await.is_err() {
        // Fall back to a forced shutdown; its own failure is not separately reported,
        // the wait below is the final word either way.
        let _ = state.platform.force_shutdown(app_name).await;
    }

    let reached = state
        .state_cache
        .wait_for_state(app_name, AppState::Stopped, state.config.state_wait_timeout())
        .await;
    if !reached {
        return Err(ServerError::Internal(format!(
            "app '{app_name}' did not reach STOPPED before the deadline"
        )));
    }

    state.instances.remove(app_name);
    Ok(ok_with_cors(cors_header))
}

/// POST /apps/<name>/dial_data — sets or clears per-app auxiliary data (spec.md §4.7
/// SET_DATA), only ever reachable on the loopback listener.
pub async fn set_data(
    state: &ServerState,
    app_name: &str,
    body: Bytes,
) -> Result<Response, ServerError> {
    state
        .registry
        .lookup(app_name)
        .ok_or_else(|| ServerError::NotFound(format!("app '{app_name}' is not registered")))?;

    let data: std::collections::BTreeMap<String, String> = form_urlencoded::parse(&body)
        .into_owned()
        .collect();
    state.aux_data.set(app_name, data);

    Ok(StatusCode::OK.into_response())
}

/// POST /apps/system — the administrative hook (spec.md §4.7 SYSTEM).
pub async fn system(state: &ServerState, query: Option<&str>) -> Result<Response, ServerError> {
    let params: HashMap<String, String> = query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    match state.platform.system(&params).await {
        Ok(()) => Ok(StatusCode::OK.into_response()),
        Err(_) => Err(ServerError::Internal("platform system hook failed".into())),
    }
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Strips a `:port` suffix, if present, from the `Host` header (we append our own
/// port when building `Location`/`additionalDataUrl`).
fn host_only(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
        .unwrap_or_else(|| "localhost".to_string())
}

fn ok_with_cors(cors_header: Option<String>) -> Response {
    match cors_header {
        Some(origin) => (StatusCode::OK, [(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin)]).into_response(),
        None => StatusCode::OK.into_response(),
    }
}
