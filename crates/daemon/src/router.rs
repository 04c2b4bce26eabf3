//! HTTP routes.
//!
//! This module maps `GET /api/items` requests onto the [`Explorer`] and its
//! results and errors back onto JSON responses. Filesystem work runs on the
//! blocking pool so slow mounts cannot stall the async workers.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use remofs_protocol::{
    parse_flag, ErrorBody, ErrorCode, ItemsResponse, ListingOptions, ProtocolError, SortBy,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::explorer::Explorer;
use crate::files::ExplorerError;

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Path validation or listing error.
    #[error(transparent)]
    Explorer(#[from] ExplorerError),

    /// Malformed query parameter.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProtocolError> for RouterError {
    fn from(err: ProtocolError) -> Self {
        RouterError::InvalidQuery(err.to_string())
    }
}

impl RouterError {
    /// The protocol error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RouterError::Explorer(e) => e.code(),
            RouterError::InvalidQuery(_) => ErrorCode::InvalidQuery,
            RouterError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Convert the error to a response body.
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody::new(self.code(), self.to_string())
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let body = self.to_error_body();
        let status = StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Query string of `GET /api/items`.
///
/// Every field is taken as a raw string so malformed values surface as
/// `invalid_query` errors instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemsQuery {
    /// Path to list, or `/` for the device and drive summary.
    pub path: Option<String>,
    /// Case-insensitive substring filter on entry names.
    pub search: Option<String>,
    /// Sort key: `name`, `size` or `modified`.
    pub sort_by: Option<String>,
    /// Reverse the sort order.
    pub reverse: Option<String>,
    /// Include hidden entries.
    pub show_hidden: Option<String>,
    /// Count the children of each folder.
    pub count_children: Option<String>,
}

impl ItemsQuery {
    /// Split the query into the raw path and listing options.
    ///
    /// A missing path is passed on as empty and rejected by validation.
    pub fn into_request(
        self,
        count_children_default: bool,
    ) -> Result<(String, ListingOptions), ProtocolError> {
        let sort_by = match self.sort_by.as_deref() {
            Some(value) => value.parse::<SortBy>()?,
            None => SortBy::default(),
        };
        let flag = |option: &'static str, value: Option<&str>, default: bool| match value {
            Some(value) => parse_flag(option, value),
            None => Ok(default),
        };

        let options = ListingOptions {
            search: self.search.filter(|s| !s.is_empty()),
            sort_by,
            reverse: flag("reverse", self.reverse.as_deref(), false)?,
            show_hidden: flag("show_hidden", self.show_hidden.as_deref(), false)?,
            count_children: flag(
                "count_children",
                self.count_children.as_deref(),
                count_children_default,
            )?,
        };

        Ok((self.path.unwrap_or_default(), options))
    }
}

/// Shared state of the HTTP routes.
#[derive(Clone)]
pub struct AppState {
    explorer: Arc<Explorer>,
}

impl AppState {
    /// Create route state around an explorer.
    pub fn new(explorer: Arc<Explorer>) -> Self {
        Self { explorer }
    }
}

/// Build the daemon's HTTP router.
pub fn build_router(explorer: Arc<Explorer>) -> Router {
    Router::new()
        .route("/api/items", get(get_items))
        .route("/api/health", get(health))
        .with_state(AppState::new(explorer))
}

/// `GET /api/items`: list the device root or a directory.
pub async fn get_items(
    State(state): State<AppState>,
    query: Result<Query<ItemsQuery>, QueryRejection>,
) -> Result<Json<ItemsResponse>, RouterError> {
    let Query(query) = query.map_err(|e| RouterError::InvalidQuery(e.body_text()))?;
    let (path, options) = query.into_request(state.explorer.count_children_default())?;

    debug!("Items request for {:?} ({:?})", path, options);

    let explorer = Arc::clone(&state.explorer);
    let response = tokio::task::spawn_blocking(move || explorer.items(&path, &options))
        .await
        .map_err(|e| RouterError::Internal(format!("listing task failed: {}", e)))??;

    Ok(Json(response))
}

/// `GET /api/health`.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
