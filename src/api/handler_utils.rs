use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

pub type ApiObject = (StatusCode, Json<Value>);

pub const MISSING_COMPARE_FIELDS: &str = "Missing required fields: refUrl, testUrl";
pub const MISSING_SITEMAP_FIELDS: &str = "Missing required fields: testsitemapurl, refsitemapurl";
pub const REPORT_NOT_FOUND_MESSAGE: &str =
    "Backstop report not found. Possible causes: unreachable URL, timeout, or test crash.";

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiObject {
    (status, Json(json!({ "error": message.into() })))
}

pub fn ok_json(payload: impl Serialize) -> ApiObject {
    (StatusCode::OK, into_json(payload))
}

pub fn into_json(payload: impl Serialize) -> Json<Value> {
    Json(serde_json::to_value(payload).expect("api payload should serialize"))
}
