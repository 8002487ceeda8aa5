// API module entry
// Management API for course outlines and learner positions

mod handlers;
mod response;
mod types;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::http::query::decode_path_segment;
use crate::http::QueryParams;
use crate::logger;

// Re-export public types
pub use response::*;

const COURSES_PREFIX: &str = "/v1/courses/";
const OUTLINE_SUFFIX: &str = "/outline";

/// API route handler
///
/// Reads the request body for POST requests, then dispatches to handler functions
/// based on request path and method
pub async fn handle_api_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(ToString::to_string);

    let body = if method == Method::POST {
        let limit = usize::try_from(state.config.http.max_body_size).unwrap_or(usize::MAX);
        match read_body(req.into_body(), limit).await {
            Ok(body) => body,
            Err(resp) => {
                logger::log_api_request(method.as_str(), &path, resp.status().as_u16());
                return Ok(resp);
            }
        }
    } else {
        Bytes::new()
    };

    Ok(route_api(&method, &path, query.as_deref(), &body, &state))
}

/// Collect a request body of at most `limit` bytes
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_api_error(&format!("Request body exceeds {limit} bytes"));
            Err(nack(
                StatusCode::PAYLOAD_TOO_LARGE,
                &format!("Request body exceeds {limit} bytes"),
            ))
        }
        Err(e) => {
            logger::log_api_error(&format!("Failed to read request body: {e}"));
            Err(bad_request("Failed to read request body"))
        }
    }
}

/// Dispatch an API request whose body has already been read
pub fn route_api(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
    state: &AppState,
) -> Response<Full<Bytes>> {
    let params = QueryParams::parse(query);

    // Course outline
    if method == Method::GET {
        if let Some(course_id) = outline_course_id(path) {
            return handlers::handle_outline(state, &decode_path_segment(course_id), &params);
        }
    }

    match (method, path) {
        // Learner positions
        (&Method::GET, "/v1/positions") => handlers::handle_positions_get(state, &params),
        (&Method::POST, "/v1/positions") => handlers::handle_position_post(state, body),
        (&Method::DELETE, "/v1/positions") => handlers::handle_positions_clear(state),
        // Unknown route
        _ => {
            logger::log_api_request(method.as_str(), path, 404);
            not_found()
        }
    }
}

/// Course id segment of `/v1/courses/{course_id}/outline`
fn outline_course_id(path: &str) -> Option<&str> {
    path.strip_prefix(COURSES_PREFIX)?
        .strip_suffix(OUTLINE_SUFFIX)
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::demo_state;

    #[test]
    fn test_outline_course_id() {
        assert_eq!(
            outline_course_id("/v1/courses/course-v1:edX+DemoX+2024/outline"),
            Some("course-v1:edX+DemoX+2024")
        );
        assert_eq!(
            outline_course_id("/v1/courses/edX/DemoX/2024/outline"),
            Some("edX/DemoX/2024")
        );
        assert_eq!(outline_course_id("/v1/courses//outline"), None);
        assert_eq!(outline_course_id("/v1/courses/x"), None);
    }

    #[test]
    fn test_unknown_route() {
        let state = demo_state();
        let resp = route_api(&Method::GET, "/v1/discovery", None, b"", &state);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = route_api(&Method::PUT, "/v1/positions", None, b"", &state);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        let body = read_body(Full::new(Bytes::from_static(b"{}")), 16)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{}");

        let resp = read_body(Full::new(Bytes::from(vec![b'x'; 64])), 16)
            .await
            .unwrap_err();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
