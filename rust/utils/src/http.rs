use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{Error, Result};
use crate::slow_warn::warn_if_slow;

const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(30);

/// Sends a single request built by `req_builder` (no retries) and turns any
/// non-success status into an [`Error`].
///
/// Gateway-style statuses (502, 503, 504) count as the backend being
/// unavailable; every other failure status is a rejection carrying the
/// backend's own message when the body has one.
pub async fn request(
    client: &reqwest::Client,
    req_builder: impl FnOnce(&reqwest::Client) -> reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let request = req_builder(client).build()?;
    let method = request.method().clone();
    let url = request.url().clone();
    let resp = warn_if_slow(
        || format!("HTTP {method} {url}"),
        SLOW_REQUEST_THRESHOLD,
        client.execute(request),
    )
    .await?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let msg = error_message(status, &body);
    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        return Err(Error::unavailable_msg(format!("{status}: {msg}")));
    }
    Err(Error::rejected(status.as_u16(), msg))
}

/// Extracts the human readable part of an error body. Table and auth
/// services answer with JSON carrying one of `message`, `msg`,
/// `error_description` or `error`; anything else is returned verbatim.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(serde_json::Value::String(msg)) = fields.get(key) {
                return msg.clone();
            }
        }
    }
    body.to_string()
}
