//! HTTP transport against the configured base address.

use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use url::Url;

use crate::error::Error;

pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Url,
}

impl Transport {
    pub fn new(base_url: Url, http: reqwest::Client) -> Self {
        Self { http, base_url }
    }

    /// Request builder for `path` under the configured base address.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        self.http.request(method, url)
    }

    /// Executes the call and decodes the body as JSON regardless of status.
    /// Empty or non-JSON bodies yield `Value::Null`. Non-success statuses
    /// become [`Error::Api`] with the body's `detail` message when present.
    pub async fn send_json(&self, request: RequestBuilder) -> Result<Value, Error> {
        let response = request.send().await?;
        let status = response.status();
        let payload = response.json::<Value>().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(Error::api(status.as_u16(), &payload));
        }
        Ok(payload)
    }

    /// Same failure contract as [`send_json`](Transport::send_json), but on
    /// success returns the live response so the caller can stream the body
    /// and read headers.
    pub async fn send_binary(&self, request: RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let payload = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(Error::api(status.as_u16(), &payload));
        }
        Ok(response)
    }
}

/// Attaches the access token as a bearer header when one is held.
pub(crate) fn authorize(request: RequestBuilder, access_token: &str) -> RequestBuilder {
    if access_token.is_empty() {
        request
    } else {
        request.bearer_auth(access_token)
    }
}
