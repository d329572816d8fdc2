// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::ProviderConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch and decode a JSON document on behalf of `board`.
///
/// Connection failures, timeouts, truncated bodies, throttling and server
/// errors come back as [`AppError::Unreachable`]; anything else is returned
/// as is.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    board: &str,
    url: Url,
) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify(board, e))?;

    let status = response.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::unreachable(board, format!("server returned {status}")));
    }

    let bytes = response
        .error_for_status()?
        .bytes()
        .await
        .map_err(|e| classify(board, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn classify(board: &str, error: reqwest::Error) -> AppError {
    if error.is_connect()
        || error.is_timeout()
        || error.is_request()
        || error.is_body()
        || error.is_decode()
    {
        AppError::unreachable(board, error)
    } else {
        AppError::Http(error)
    }
}

/// Whether an error is a 404 from the remote side.
pub fn is_not_found(error: &AppError) -> bool {
    matches!(error, AppError::Http(e) if e.status() == Some(StatusCode::NOT_FOUND))
}
