//! Resource Fetcher
//!
//! Fetches Compute Engine list endpoints with pagination support.

use crate::gcp::client::GcpClient;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashSet;

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Fetch all items of a list endpoint (auto-paginate).
///
/// Stops at the first page token that was already followed.
pub async fn fetch_all(client: &GcpClient, url: &str) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens = HashSet::new();

    loop {
        let result = fetch_page(client, url, page_token.as_deref()).await?;
        all_items.extend(result.items);

        let Some(next_token) = result.next_token else {
            break;
        };
        if !seen_tokens.insert(next_token.clone()) {
            tracing::warn!("Repeated page token from {}, stopping pagination", strip_query(url));
            break;
        }
        page_token = Some(next_token);
    }

    Ok(all_items)
}

/// Fetch one page of a list endpoint
pub async fn fetch_page(
    client: &GcpClient,
    url: &str,
    page_token: Option<&str>,
) -> Result<PaginatedResult> {
    let url = match page_token {
        Some(token) => add_query_param(url, "pageToken", token),
        None => url.to_string(),
    };

    let response = client.get(&url).await?;

    if !response.is_null() && !response.is_object() {
        return Err(anyhow::anyhow!("Unexpected response from {}", strip_query(&url)));
    }

    let items = match response.get("items") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(anyhow::anyhow!(
                "Malformed 'items' in response from {}",
                strip_query(&url)
            ))
        },
    };

    let next_token = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(PaginatedResult { items, next_token })
}

fn add_query_param(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, key, urlencoding::encode(value))
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Extract short name from GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/regions/us-central1" -> "us-central1"
pub fn extract_short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Read a required string field from an API item
pub fn required_str<'a>(item: &'a Value, field: &str) -> Result<&'a str> {
    item.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Malformed API item: missing '{}'", field))
}

/// Read an optional string field, empty string when absent
pub fn optional_str<'a>(item: &'a Value, field: &str) -> &'a str {
    item.get(field).and_then(|v| v.as_str()).unwrap_or("")
}
