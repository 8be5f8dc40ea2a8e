// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the orchestration engine's bridge API.
//!
//! Requests are sent once. Retrying a signal-with-start could deliver the
//! same payload twice, so transient failures go back to the caller.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use threadline_core::ThreadlineError;
use threadline_core::types::StartOptions;
use tracing::debug;

use crate::types::{
    EngineErrorResponse, SignalRequest, SignalWithStartRequest, SignalWithStartResponse,
};

/// Thin wrapper over `reqwest` that knows the bridge's routes and error codes.
#[derive(Debug, Clone)]
pub struct EngineClient {
    client: reqwest::Client,
    base_url: Url,
}

impl EngineClient {
    /// Builds a client for `base_url`, authenticating with `api_key` when set.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ThreadlineError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ThreadlineError::Config(format!("invalid engine base URL `{base_url}`: {e}"))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                ThreadlineError::Config(format!("invalid engine API key header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ThreadlineError::Engine {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base URL, keeping any path prefix it has.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ThreadlineError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ThreadlineError::Config(format!(
                    "engine base URL `{}` cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn process_url(&self, process_id: &str, action: &str) -> Result<Url, ThreadlineError> {
        self.endpoint_url(&["v1", "processes", process_id, action])
    }

    /// Delivers `signal` to a running process.
    pub async fn signal(
        &self,
        process_id: &str,
        signal: &str,
        payload: &serde_json::Value,
    ) -> Result<(), ThreadlineError> {
        let url = self.process_url(process_id, "signal")?;
        let response = self
            .client
            .post(url)
            .json(&SignalRequest { signal, payload })
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        debug!(status = %status, process_id, signal, "signal response received");

        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ThreadlineError::ProcessNotFound {
                process_id: process_id.to_string(),
            });
        }
        Err(error_from_response(status, response).await)
    }

    /// Signals `process_id`, starting a `process_type` process under that id first if needed.
    pub async fn signal_with_start(
        &self,
        process_id: &str,
        process_type: &str,
        signal: &str,
        payload: &serde_json::Value,
        options: &StartOptions,
    ) -> Result<SignalWithStartResponse, ThreadlineError> {
        let url = self.process_url(process_id, "signal-with-start")?;
        let body = SignalWithStartRequest {
            process_type,
            signal,
            payload,
            task_queue: options.task_queue.as_deref(),
            memo: &options.memo,
        };
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        debug!(status = %status, process_id, process_type, signal, "signal-with-start response received");

        if !status.is_success() {
            return Err(error_from_response(status, response).await);
        }

        let text = response.text().await.map_err(|e| ThreadlineError::Engine {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        if text.trim().is_empty() {
            return Ok(SignalWithStartResponse::default());
        }
        serde_json::from_str(&text).map_err(|e| ThreadlineError::Engine {
            message: format!("failed to parse signal-with-start response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Probes `GET {base}/health`; returns the status code on any response.
    pub async fn health(&self) -> Result<StatusCode, ThreadlineError> {
        let url = self.endpoint_url(&["health"])?;
        let response = self.client.get(url).send().await.map_err(request_failed)?;
        Ok(response.status())
    }
}

fn request_failed(e: reqwest::Error) -> ThreadlineError {
    ThreadlineError::Engine {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn error_from_response(status: StatusCode, response: reqwest::Response) -> ThreadlineError {
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<EngineErrorResponse>(&body) {
        Ok(parsed) => format!("engine returned {status}: {}", parsed.error),
        Err(_) => format!("engine returned {status}: {body}"),
    };
    ThreadlineError::Engine {
        message,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use threadline_core::ErrorKind;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> EngineClient {
        EngineClient::new(base_url, Some("engine-key"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn signal_posts_to_process_route() {
        let server = MockServer::start().await;
        let payload = serde_json::json!({"text": "hello"});

        Mock::given(method("POST"))
            .and(path("/v1/processes/acme:support-agent:triage/signal"))
            .and(header("authorization", "Bearer engine-key"))
            .and(body_json(serde_json::json!({
                "signal": "inbound_message",
                "payload": {"text": "hello"}
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server.uri())
            .signal("acme:support-agent:triage", "inbound_message", &payload)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn signal_404_is_process_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .signal("acme:gone", "inbound_message", &serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ThreadlineError::ProcessNotFound { ref process_id } if process_id == "acme:gone"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn server_error_is_transient_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(serde_json::json!({"error": "frontend unavailable"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .signal_with_start(
                "acme:billing-agent:review",
                "billing-agent:review",
                "inbound_message",
                &serde_json::json!({}),
                &StartOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().contains("frontend unavailable"));
    }

    #[tokio::test]
    async fn signal_with_start_sends_start_options() {
        let server = MockServer::start().await;
        let mut memo = BTreeMap::new();
        memo.insert("tenant_id".to_string(), "acme".to_string());

        Mock::given(method("POST"))
            .and(path("/v1/processes/acme:billing-agent:review/signal-with-start"))
            .and(body_json(serde_json::json!({
                "process_type": "billing-agent:review",
                "signal": "inbound_message",
                "payload": {"n": 1},
                "task_queue": "agents",
                "memo": {"tenant_id": "acme"}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"run_id": "r-1", "started": true})),
            )
            .mount(&server)
            .await;

        let response = test_client(&server.uri())
            .signal_with_start(
                "acme:billing-agent:review",
                "billing-agent:review",
                "inbound_message",
                &serde_json::json!({"n": 1}),
                &StartOptions {
                    task_queue: Some("agents".into()),
                    memo,
                },
            )
            .await
            .unwrap();
        assert!(response.started);
        assert_eq!(response.run_id.as_deref(), Some("r-1"));
    }

    #[test]
    fn process_ids_are_path_encoded() {
        let client = test_client("http://engine.local/bridge/");
        let url = client.process_url("acme:a b/c", "signal").unwrap();
        assert_eq!(
            url.as_str(),
            "http://engine.local/bridge/v1/processes/acme:a%20b%2Fc/signal"
        );
    }

    #[tokio::test]
    async fn health_keeps_base_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bridge/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let status = test_client(&format!("{}/bridge", server.uri()))
            .health()
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = EngineClient::new("not a url", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ThreadlineError::Config(_)));
    }
}
