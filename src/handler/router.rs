//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use crate::config::AppState;
use crate::courseware::{self, CoursewareError, Outcome};
use crate::http::{self, QueryParams};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub content_length: Option<&'a str>,
}

impl RequestContext<'_> {
    const fn is_head(&self) -> bool {
        matches!(*self.method, Method::HEAD)
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let uri = req.uri();
    let ctx = RequestContext {
        method: req.method(),
        path: uri.path(),
        query: uri.query(),
        content_length: header_str(req.headers(), "content-length"),
    };

    let response = route(&ctx, &state);

    if state.access_log_enabled() {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            ctx.method.to_string(),
            ctx.path.to_string(),
        );
        entry.query = ctx.query.map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.location = header_str(response.headers(), "location").map(ToString::to_string);
        entry.referer = header_str(req.headers(), "referer").map(ToString::to_string);
        entry.user_agent = header_str(req.headers(), "user-agent").map(ToString::to_string);
        entry.elapsed = started.elapsed();
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route a request to its response
///
/// Order: method check, body size check, health probes, courseware redirect, 404.
pub fn route(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(ctx.method, state.config.http.enable_cors) {
        return resp;
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(ctx.content_length, state.config.http.max_body_size) {
        return resp;
    }

    let response = route_request(ctx, state);
    if ctx.is_head() {
        let len = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        return http::strip_body(response, len);
    }
    response
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(content_length: Option<&str>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size_str = content_length?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
        _ => None,
    }
}

/// Route request based on path and configuration
fn route_request(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    // 0. Health check endpoints (highest priority, always fast)
    let health = &state.config.health;
    if health.enabled && (ctx.path == health.liveness_path || ctx.path == health.readiness_path) {
        return http::build_health_response("ok");
    }

    // 1. Legacy courseware URLs
    let params = QueryParams::parse(ctx.query);
    match courseware::dispatch(&state.courseware_context(), ctx.path, &params) {
        Ok(Outcome::Redirect(target)) => {
            logger::log_debug(&format!("[Courseware] {} -> {target}", ctx.path));
            http::build_redirect_response(&target)
        }
        Ok(Outcome::Continue) => http::build_404_response(),
        Err(err) => courseware_error_response(ctx.path, &err),
    }
}

fn courseware_error_response(path: &str, err: &CoursewareError) -> Response<Full<Bytes>> {
    match err {
        CoursewareError::InvalidCourseKey(_) => {
            logger::log_warning(&format!("[Courseware] {path}: {err}"));
            http::build_404_response()
        }
        CoursewareError::Store(_) => {
            logger::log_error(&format!("[Courseware] {path}: {err}"));
            http::build_500_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
