use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::warn;

use crate::api::handler_utils::{
    error_response, ok_json, ApiObject, MISSING_COMPARE_FIELDS, REPORT_NOT_FOUND_MESSAGE,
};
use crate::api::server::AppState;
use crate::compare::config::Viewport;
use crate::compare::report::parse_run_report;
use crate::compare::service::CompareRequest;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareInput {
    #[serde(default)]
    pub ref_url: Option<String>,
    #[serde(default)]
    pub test_url: Option<String>,
    #[serde(default)]
    pub viewport: Option<ViewportInput>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ViewportInput {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

pub async fn run_compare_handler(
    State(state): State<AppState>,
    axum::Json(input): axum::Json<CompareInput>,
) -> ApiObject {
    let (Some(ref_url), Some(test_url)) = (non_empty(input.ref_url), non_empty(input.test_url))
    else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_COMPARE_FIELDS);
    };
    let viewport_input = input.viewport.unwrap_or_default();
    let viewport = Viewport::with_defaults(viewport_input.width, viewport_input.height);

    match state
        .compare
        .run_compare(CompareRequest {
            ref_url,
            test_url,
            viewport,
        })
        .await
    {
        Ok(result) => ok_json(result),
        Err(failure) => {
            // Salvage whatever partial report the run left behind before
            // declaring total failure.
            if let Some(run_dir) = failure.run_dir.as_deref() {
                match parse_run_report(run_dir) {
                    Ok(result) => {
                        warn!(
                            error = %failure.error,
                            run_dir = %run_dir.display(),
                            "returning salvaged report for a failed run"
                        );
                        return ok_json(result);
                    }
                    Err(_) => {
                        return error_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            REPORT_NOT_FOUND_MESSAGE,
                        );
                    }
                }
            }
            error_response(StatusCode::INTERNAL_SERVER_ERROR, failure.error.to_string())
        }
    }
}

pub async fn list_tests_handler(State(state): State<AppState>) -> ApiObject {
    match state.compare.list_recent_results() {
        Ok(results) => ok_json(results),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}
