use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use crate::api::handler_utils::{error_response, ok_json, ApiObject, MISSING_SITEMAP_FIELDS};
use crate::api::server::AppState;
use crate::sitemap::{build_diff_report, parse_sitemap_urls, SitemapError, SitemapFetcher};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitemapDiffInput {
    #[serde(default)]
    pub testsitemapurl: Option<String>,
    #[serde(default)]
    pub refsitemapurl: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

fn fetch_sitemap_links(
    fetcher: &dyn SitemapFetcher,
    url: &str,
) -> Result<Vec<String>, SitemapError> {
    let xml = fetcher.fetch_text(url)?;
    parse_sitemap_urls(xml.as_str())
}

pub async fn sitemap_diff_handler(
    State(state): State<AppState>,
    axum::Json(input): axum::Json<SitemapDiffInput>,
) -> ApiObject {
    let (Some(test_url), Some(ref_url)) = (
        non_empty(input.testsitemapurl),
        non_empty(input.refsitemapurl),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_SITEMAP_FIELDS);
    };

    let fetcher = state.sitemaps.clone();
    let fetched = tokio::task::spawn_blocking(move || {
        let ref_links = fetch_sitemap_links(fetcher.as_ref(), ref_url.as_str())?;
        let test_links = fetch_sitemap_links(fetcher.as_ref(), test_url.as_str())?;
        Ok::<_, SitemapError>((ref_links, test_links))
    })
    .await;

    match fetched {
        Ok(Ok((ref_links, test_links))) => ok_json(build_diff_report(ref_links, test_links)),
        Ok(Err(error)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        Err(join_error) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, join_error.to_string())
        }
    }
}
