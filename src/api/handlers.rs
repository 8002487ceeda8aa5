// Management API handlers module

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::response::{bad_request, json_response, nack};
use super::types::{OutlineResponse, PositionAck, PositionRequest, PositionsResponse};
use crate::block::Actor;
use crate::config::AppState;
use crate::courseware::save_positions_recursively_up;
use crate::http::QueryParams;
use crate::keys::{CourseKey, UsageKey};
use crate::logger;
use crate::store::StoreError;

const POSITIONS_PATH: &str = "/v1/positions";

/// GET the course tree, with the positions of `?user=` when given
pub fn handle_outline(state: &AppState, course_id: &str, params: &QueryParams) -> Response<Full<Bytes>> {
    let path = format!("/v1/courses/{course_id}/outline");

    let course_key: CourseKey = match course_id.parse() {
        Ok(key) => key,
        Err(e) => {
            logger::log_api_request("GET", &path, 400);
            return bad_request(&e.to_string());
        }
    };

    let depth = match params.get("depth").map(str::parse::<usize>) {
        None => state.config.courseware.content_depth,
        Some(Ok(depth)) => depth,
        Some(Err(e)) => {
            logger::log_api_request("GET", &path, 400);
            return bad_request(&format!("Invalid depth: {e}"));
        }
    };

    let outline = match state.store.get_course(&course_key, depth) {
        Ok(Some(outline)) => outline,
        Ok(None) => {
            logger::log_api_request("GET", &path, 404);
            return nack(StatusCode::NOT_FOUND, &format!("Course not found: {course_key}"));
        }
        Err(e) => return store_failure("GET", &path, &e),
    };

    let positions = match params.get("user").filter(|u| !u.is_empty()) {
        None => None,
        Some(user) => match state.positions.for_user(user) {
            Ok(records) => {
                let course = course_key.to_v1();
                Some(
                    records
                        .into_iter()
                        .filter(|r| r.location.course_key() == &course)
                        .collect(),
                )
            }
            Err(e) => return store_failure("GET", &path, &e),
        },
    };

    let response = OutlineResponse {
        course_key: course_key.to_string(),
        depth,
        outline,
        positions,
    };

    logger::log_api_request("GET", &path, 200);
    json_response(StatusCode::OK, &response)
}

/// POST a visited block; saves positions on all its ancestors
pub fn handle_position_post(state: &AppState, body: &[u8]) -> Response<Full<Bytes>> {
    let request: PositionRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            logger::log_api_request("POST", POSITIONS_PATH, 400);
            return bad_request(&format!("Invalid JSON: {e}"));
        }
    };

    let usage_key: UsageKey = match request.usage_key.parse() {
        Ok(key) => key,
        Err(e) => {
            logger::log_api_request("POST", POSITIONS_PATH, 400);
            return bad_request(&e.to_string());
        }
    };

    let actor = Actor::from_username(request.user.as_deref());
    let updates = match save_positions_recursively_up(
        &actor,
        state.store.as_ref(),
        state.binder.as_ref(),
        &usage_key,
    ) {
        Ok(updates) => updates,
        Err(StoreError::ItemNotFound(missing)) => {
            logger::log_api_request("POST", POSITIONS_PATH, 404);
            return nack(StatusCode::NOT_FOUND, &format!("Block not found: {missing}"));
        }
        Err(e) => return store_failure("POST", POSITIONS_PATH, &e),
    };

    let changed = updates.iter().filter(|u| u.changed).count();
    logger::log_info(&format!(
        "[Position] {actor} visited {usage_key}: {changed} of {} ancestors changed",
        updates.len()
    ));
    logger::log_api_request("POST", POSITIONS_PATH, 200);

    let ack = PositionAck {
        status: "ACK",
        user: actor.username().map(ToString::to_string),
        usage_key: usage_key.to_string(),
        updates,
    };
    json_response(StatusCode::OK, &ack)
}

/// GET the persisted positions of `?user=`
pub fn handle_positions_get(state: &AppState, params: &QueryParams) -> Response<Full<Bytes>> {
    let Some(user) = params.get("user").filter(|u| !u.is_empty()) else {
        logger::log_api_request("GET", POSITIONS_PATH, 400);
        return bad_request("Missing 'user' query parameter");
    };

    match state.positions.for_user(user) {
        Ok(positions) => {
            logger::log_api_request("GET", POSITIONS_PATH, 200);
            let response = PositionsResponse {
                user: user.to_string(),
                persisted: state.positions.is_enabled(),
                positions,
            };
            json_response(StatusCode::OK, &response)
        }
        Err(e) => store_failure("GET", POSITIONS_PATH, &e),
    }
}

/// DELETE all positions and the state file
pub fn handle_positions_clear(state: &AppState) -> Response<Full<Bytes>> {
    match state.positions.clear() {
        Ok(()) => {
            logger::log_info(&format!(
                "[Position] Cleared state: {}",
                state.positions.state_path().display()
            ));
            logger::log_api_request("DELETE", POSITIONS_PATH, 200);
            json_response(
                StatusCode::OK,
                &serde_json::json!({
                    "status": "ACK",
                    "message": "Positions cleared"
                }),
            )
        }
        Err(e) => store_failure("DELETE", POSITIONS_PATH, &e),
    }
}

fn store_failure(method: &str, path: &str, err: &StoreError) -> Response<Full<Bytes>> {
    logger::log_api_error(&format!("{method} {path}: {err}"));
    logger::log_api_request(method, path, 500);
    nack(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{demo_key, demo_state};
    use http_body_util::BodyExt;

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_position_post_updates_ancestors() {
        let state = demo_state();
        let body = br#"{"user":"alice","usage_key":"block-v1:edX+DemoX+2024+type@vertical+block@lesson2_unit_c"}"#;

        let resp = handle_position_post(&state, body);
        assert_eq!(resp.status(), StatusCode::OK);
        let value = body_json(resp).await;
        assert_eq!(value["status"], "ACK");
        assert_eq!(value["updates"].as_array().unwrap().len(), 3);
        assert_eq!(value["updates"][0]["position"], 3);
        assert_eq!(value["updates"][1]["position"], 2);
        assert_eq!(value["updates"][2]["position"], 2);

        let lesson2 = demo_key("sequential", "lesson2");
        assert_eq!(state.positions.get("alice", &lesson2).unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_position_post_anonymous_is_noop() {
        let state = demo_state();
        let body = br#"{"usage_key":"block-v1:edX+DemoX+2024+type@vertical+block@lesson1_unit"}"#;

        let value = body_json(handle_position_post(&state, body)).await;
        assert_eq!(value["status"], "ACK");
        assert!(value["user"].is_null());
        assert!(value["updates"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_position_post_errors() {
        let state = demo_state();
        assert_eq!(
            handle_position_post(&state, b"not json").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            handle_position_post(&state, br#"{"user":"a","usage_key":"bogus"}"#).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            handle_position_post(
                &state,
                br#"{"user":"a","usage_key":"block-v1:edX+DemoX+2024+type@vertical+block@missing"}"#
            )
            .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_positions_get_and_clear() {
        let state = demo_state();
        state
            .positions
            .set("bob", &demo_key("chapter", "week1"), 2)
            .unwrap();

        let params = QueryParams::parse(Some("user=bob"));
        let value = body_json(handle_positions_get(&state, &params)).await;
        assert_eq!(value["user"], "bob");
        assert_eq!(value["persisted"], false);
        assert_eq!(value["positions"][0]["position"], 2);

        assert_eq!(
            handle_positions_get(&state, &QueryParams::default()).status(),
            StatusCode::BAD_REQUEST
        );

        assert_eq!(handle_positions_clear(&state).status(), StatusCode::OK);
        let value = body_json(handle_positions_get(&state, &params)).await;
        assert!(value["positions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outline() {
        let state = demo_state();
        state
            .positions
            .set("carol", &demo_key("course", "course"), 2)
            .unwrap();

        let params = QueryParams::parse(Some("user=carol&depth=1"));
        let resp = handle_outline(&state, "course-v1:edX+DemoX+2024", &params);
        assert_eq!(resp.status(), StatusCode::OK);
        let value = body_json(resp).await;
        assert_eq!(value["depth"], 1);
        assert_eq!(value["outline"]["display_name"], "Demo Course");
        let chapters = value["outline"]["loaded_children"].as_array().unwrap();
        assert_eq!(chapters.len(), 2);
        assert!(chapters[0].get("loaded_children").is_none());
        assert_eq!(value["positions"][0]["position"], 2);
    }

    #[test]
    fn test_outline_errors() {
        let state = demo_state();
        let params = QueryParams::default();
        assert_eq!(
            handle_outline(&state, "nonsense", &params).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            handle_outline(&state, "course-v1:edX+Other+2024", &params).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            handle_outline(&state, "course-v1:edX+DemoX+2024", &QueryParams::parse(Some("depth=x")))
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
