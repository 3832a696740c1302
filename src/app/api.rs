use anyhow::Result;
use axum::{
    body::Body,
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::AdminQuery;
use crate::config::ConfigCandidate;
use crate::monitor::{AdminResponse, FeedMonitor};
use crate::TARGET_WEB_REQUEST;

pub const ADMIN_PATH: &str = "/admin";
const XML_CONTENT_TYPE: &str = "application/xml";

/// Routes for the admin page and the settings form.
pub fn router(monitor: Arc<FeedMonitor>) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(ADMIN_PATH) }))
        .route(ADMIN_PATH, get(admin_page))
        .route("/admin/settings", post(update_settings))
        .with_state(monitor)
}

/// Serves the admin API until the process exits or `shutdown` resolves.
pub async fn app_api_loop(
    monitor: Arc<FeedMonitor>,
    addr: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        target: TARGET_WEB_REQUEST,
        "Admin API running on http://{}{}",
        listener.local_addr()?,
        ADMIN_PATH
    );

    axum::serve(listener, router(monitor).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Handles the download/view/delete actions, falling through to the status page.
async fn admin_page(
    State(monitor): State<Arc<FeedMonitor>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = AdminQuery::from_params(&params);

    match monitor.handle_admin_query(&query).await {
        Ok(AdminResponse::Feed {
            record_id,
            payload,
            attachment,
        }) => feed_response(record_id, payload, attachment),
        Ok(AdminResponse::Redirect) => Redirect::to(ADMIN_PATH).into_response(),
        Ok(AdminResponse::Page) => match monitor.status().await {
            Ok(status) => Json(status).into_response(),
            Err(e) => internal_error("load status", e),
        },
        Err(e) => internal_error("handle admin action", e),
    }
}

async fn update_settings(
    State(monitor): State<Arc<FeedMonitor>>,
    Form(candidate): Form<ConfigCandidate>,
) -> Response {
    match monitor.update_settings(&candidate).await {
        Ok(update) => {
            info!(
                target: TARGET_WEB_REQUEST,
                "app::api settings updated: url={:?} interval={} retention={}",
                update.config.feed_url, update.config.fetch_interval, update.config.retention_window
            );
            Redirect::to(ADMIN_PATH).into_response()
        }
        Err(e) => internal_error("update settings", e),
    }
}

fn feed_response(record_id: i64, payload: Vec<u8>, attachment: bool) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XML_CONTENT_TYPE);
    if attachment {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"rss_feed_{}.xml\"", record_id),
        );
    }

    builder
        .body(Body::from(payload))
        .unwrap_or_else(|e| internal_error("build feed response", e))
}

fn internal_error(action: &str, err: impl std::fmt::Display) -> Response {
    error!(target: TARGET_WEB_REQUEST, "app::api failed to {}: {}", action, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to {}", action),
    )
        .into_response()
}
