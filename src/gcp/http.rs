//! HTTP utilities for GCP REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Truncate a response body and strip control characters before logging it
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Non-2xx answer from a GCP API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gce-agents/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError {
                status,
                message: api_error_message(status, &body),
            }
            .into());
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Build the user-facing message for a failed API call.
///
/// Google APIs report failures as `{"error": {"code": .., "message": ..}}`;
/// that message is preferred so identical upstream causes produce identical
/// text across lookups. Otherwise a generic message keyed on the status is used.
pub fn api_error_message(status: StatusCode, body: &str) -> String {
    let api_message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(|m| m.trim().to_string())
    });

    match api_message {
        Some(message) if !message.is_empty() => message,
        _ => describe_status(status),
    }
}

fn describe_status(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Invalid request. Check your parameters.".to_string(),
        401 => "Authentication failed. Check the configured credentials.".to_string(),
        403 => "Permission denied. Check your GCP IAM permissions.".to_string(),
        404 => "Resource not found.".to_string(),
        409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
        429 => "Rate limit exceeded. Please try again later.".to_string(),
        500 | 502 | 503 => "GCP service temporarily unavailable. Please try again.".to_string(),
        _ => format!("API request failed: {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_prefers_body() {
        let body = r#"{"error":{"code":403,"message":"Required 'compute.zones.list' permission"}}"#;
        assert_eq!(
            api_error_message(StatusCode::FORBIDDEN, body),
            "Required 'compute.zones.list' permission"
        );
    }

    #[test]
    fn test_api_error_message_falls_back_to_status() {
        assert_eq!(
            api_error_message(StatusCode::SERVICE_UNAVAILABLE, "<html>oops</html>"),
            "GCP service temporarily unavailable. Please try again."
        );
        assert_eq!(
            api_error_message(StatusCode::IM_A_TEAPOT, ""),
            "API request failed: 418 I'm a teapot"
        );
    }

    #[test]
    fn test_api_error_displays_message_only() {
        let error = anyhow::Error::from(ApiError {
            status: StatusCode::UNAUTHORIZED,
            message: "Request had invalid authentication credentials.".to_string(),
        });
        assert_eq!(format!("{:#}", error), "Request had invalid authentication credentials.");
        assert_eq!(
            error.downcast_ref::<ApiError>().map(|e| e.status),
            Some(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
    }
}
