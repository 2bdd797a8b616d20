// src/status.rs
//! HTTP status page: lists the logs whose SCTs the host name selected.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::augment::LogResolver;
use crate::error::Result;
use crate::hostname::{log_tokens, strip_port};
use crate::metrics::STATUS_PAGE_RESPONSES_TOTAL;

#[derive(Clone)]
pub struct StatusState {
    pub logs: Arc<dyn LogResolver>,
    pub request_timeout: Duration,
}

/// Every path and method is answered by the status page
pub fn router(state: StatusState) -> Router {
    Router::new().fallback(status_page).with_state(state)
}

pub async fn status_page(State(state): State<StatusState>, uri: Uri, headers: HeaderMap) -> Response {
    let host = request_host(&headers, &uri);

    let response = match tokio::time::timeout(state.request_timeout, describe_logs(&*state.logs, &host)).await {
        Ok(Ok(descriptions)) => {
            debug!("Status page for {:?} lists {} logs", host, descriptions.len());
            Html(render(&descriptions)).into_response()
        }
        Ok(Err(e)) => {
            warn!("Status page for {:?} failed: {}", host, e);
            error_response(e.to_string())
        }
        Err(_) => {
            warn!("Status page for {:?} timed out", host);
            error_response("timed out resolving logs".to_string())
        }
    };

    STATUS_PAGE_RESPONSES_TOTAL
        .with_label_values(&[response.status().as_str()])
        .inc();
    response
}

/// Host header if present, else the URI authority (HTTP/2), without the port
fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .unwrap_or_default();
    strip_port(host).to_string()
}

async fn describe_logs(logs: &dyn LogResolver, host: &str) -> Result<Vec<String>> {
    let mut descriptions = Vec::new();
    for token in log_tokens(host) {
        descriptions.push(logs.resolve(token).await?.description.clone());
    }
    Ok(descriptions)
}

fn render(descriptions: &[String]) -> String {
    let mut body = String::from("<html><body>This TLS handshake includes SCTs from:<ul>");
    for description in descriptions {
        body.push_str("<li>");
        body.push_str(&escape_html(description));
        body.push_str("</li>");
    }
    body.push_str("</ul></body></html>");
    body
}

fn error_response(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
