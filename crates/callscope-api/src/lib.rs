// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use callscope_app::{CallsPage, CallsQuery, CampaignSummary, FetchFailure};
use reqwest::blocking::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CALLS_PATH: &str = "calls";
pub const DEFAULT_CAMPAIGNS_PATH: &str = "campaigns";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    calls_path: String,
    campaigns_path: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("parse api.base_url {base_url:?}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            calls_path: DEFAULT_CALLS_PATH.to_owned(),
            campaigns_path: DEFAULT_CAMPAIGNS_PATH.to_owned(),
            timeout,
            http,
        })
    }

    pub fn with_paths(mut self, calls_path: &str, campaigns_path: &str) -> Result<Self> {
        let calls_path = calls_path.trim_matches('/');
        let campaigns_path = campaigns_path.trim_matches('/');
        if calls_path.is_empty() {
            bail!("api.calls_path must not be empty");
        }
        if campaigns_path.is_empty() {
            bail!("api.campaigns_path must not be empty");
        }
        self.calls_path = calls_path.to_owned();
        self.campaigns_path = campaigns_path.to_owned();
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn calls_url(&self, query: &CallsQuery) -> Result<Url, FetchFailure> {
        let mut url = self.endpoint(&self.calls_path)?;
        url.query_pairs_mut().extend_pairs(query.to_query_pairs());
        Ok(url)
    }

    /// One page of calls. The bearer token travels in the Authorization header.
    pub fn fetch_calls(&self, query: &CallsQuery, token: &str) -> Result<CallsPage, FetchFailure> {
        let url = self.calls_url(query)?;
        log::debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|error| connection_error(&self.base_url, &error))?;
        decode_response(response)
    }

    pub fn list_campaigns(&self, token: &str) -> Result<Vec<CampaignSummary>, FetchFailure> {
        let url = self.endpoint(&self.campaigns_path)?;
        log::debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|error| connection_error(&self.base_url, &error))?;
        decode_response(response)
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchFailure> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse(&raw).map_err(|error| FetchFailure::Network {
            message: format!("invalid endpoint {raw:?}: {error}"),
        })
    }
}

fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, FetchFailure> {
    let status = response.status().as_u16();
    let body = response.text().map_err(|error| FetchFailure::Network {
        message: format!("read response body: {error}"),
    })?;
    if !(200..300).contains(&status) {
        return Err(classify_response(status, &body));
    }
    serde_json::from_str(&body).map_err(|error| {
        log::debug!("undecodable {status} response: {error}");
        FetchFailure::ServerError {
            status,
            detail: Some("unexpected response from server".to_owned()),
        }
    })
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> FetchFailure {
    let message = if error.is_timeout() {
        format!("request to {base_url} timed out")
    } else {
        format!("{base_url}: {error}")
    };
    FetchFailure::Network { message }
}

/// Maps a non-success status and its body onto the failure the view shows.
pub fn classify_response(status: u16, body: &str) -> FetchFailure {
    if matches!(status, 401 | 403) {
        return FetchFailure::Unauthorized {
            status: Some(status),
        };
    }

    let detail = error_detail(body);
    if (400..500).contains(&status) {
        let trimmed = body.trim();
        let message = detail
            .or_else(|| {
                (!trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{'))
                    .then(|| trimmed.to_owned())
            })
            .unwrap_or_else(|| format!("request failed ({status})"));
        return FetchFailure::ClientError { status, message };
    }

    FetchFailure::ServerError { status, detail }
}

fn error_detail(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"].iter().find_map(|key| {
        parsed
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned)
    })
}

#[cfg(test)]
mod tests {
    use super::{Client, classify_response};
    use callscope_app::FetchFailure;
    use std::time::Duration;

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        assert_eq!(
            classify_response(401, ""),
            FetchFailure::Unauthorized { status: Some(401) }
        );
        assert_eq!(
            classify_response(403, r#"{"detail":"forbidden"}"#),
            FetchFailure::Unauthorized { status: Some(403) }
        );
    }

    #[test]
    fn client_errors_prefer_server_detail() {
        assert_eq!(
            classify_response(404, r#"{"detail":"campaign not found"}"#),
            FetchFailure::ClientError {
                status: 404,
                message: "campaign not found".to_owned(),
            }
        );
        assert_eq!(
            classify_response(422, r#"{"message":"page_size too large"}"#).message(),
            "page_size too large"
        );
    }

    #[test]
    fn short_plain_bodies_pass_through() {
        assert_eq!(
            classify_response(400, "bad date\n").message(),
            "bad date"
        );
        let long = "x".repeat(200);
        assert_eq!(classify_response(400, &long).message(), "request failed (400)");
        assert_eq!(
            classify_response(409, r#"{"detail":[{"loc":["page"]}]}"#).message(),
            "request failed (409)"
        );
    }

    #[test]
    fn server_errors_hide_bodies_without_detail() {
        assert_eq!(
            classify_response(502, "<html>Bad Gateway</html>").message(),
            "server error (502); try again later"
        );
        assert_eq!(
            classify_response(500, r#"{"detail":"database offline"}"#).message(),
            "database offline"
        );
    }

    #[test]
    fn new_rejects_unusable_base_urls() {
        let error = Client::new("", Duration::from_secs(1)).expect_err("empty base url");
        assert!(error.to_string().contains("api.base_url"));
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());

        let client = Client::new("http://localhost:8000/api/", Duration::from_secs(1))
            .expect("valid base url");
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        let error = client
            .with_paths("/", "campaigns")
            .expect_err("empty calls path");
        assert!(error.to_string().contains("api.calls_path"));
    }
}
