use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::{AppError, AppState};
use crate::category::Category;
use crate::config::OutputFormat;
use crate::feed::{apply_overrides, encode_atom, encode_rss, filter_feed, parse_feed};

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `GET /` - plain-text summary of the running configuration.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    let refresh = if config.refresh_enabled() {
        format!("{}s", config.refresh.as_secs())
    } else {
        "off".to_string()
    };

    let names: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let body = format!(
        "RSS splitter (config-driven). No per-request overrides.\n\
         Source:  {source}\n\
         Format:  {format}\n\
         Refresh: {refresh}\n\
         \n\
         Endpoints:\n  \
         /feed?type={types}\n  \
         /{aliases}\n",
        source = config.source,
        format = config.format.as_str(),
        types = names.join("|"),
        aliases = names.join("   /"),
    );

    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /feed?type=...` - unknown or missing types fall back to zavtracast.
pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, AppError> {
    render_category(&state, Category::from_query(query.kind.as_deref())).await
}

pub async fn sdz(State(state): State<AppState>) -> Result<Response, AppError> {
    render_category(&state, Category::Sdz).await
}

pub async fn kabinet_lora(State(state): State<AppState>) -> Result<Response, AppError> {
    render_category(&state, Category::KabinetLora).await
}

pub async fn photo(State(state): State<AppState>) -> Result<Response, AppError> {
    render_category(&state, Category::Photo).await
}

pub async fn zavtracast(State(state): State<AppState>) -> Result<Response, AppError> {
    render_category(&state, Category::Zavtracast).await
}

/// fetch, parse, filter, override, encode. Strictly sequential.
async fn render_category(state: &AppState, category: Category) -> Result<Response, AppError> {
    let config = &state.config;

    let bytes = state.cache.get().await.map_err(|error| AppError::Fetch {
        locator: config.source.clone(),
        error,
    })?;

    let upstream = parse_feed(&bytes)?;

    let mut out = filter_feed(&upstream, category);
    if let Some(meta) = config.meta(category) {
        apply_overrides(&mut out, meta);
    }

    let body = match config.format {
        OutputFormat::Rss => encode_rss(&out),
        OutputFormat::Atom => encode_atom(&out),
    }
    .map_err(|error| AppError::Encode {
        format: config.format.as_str(),
        error,
    })?;

    tracing::debug!(
        category = %category,
        items = out.items.len(),
        bytes = body.len(),
        "Rendered feed"
    );

    Ok(([(header::CONTENT_TYPE, config.format.content_type())], body).into_response())
}
