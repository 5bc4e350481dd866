// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Direct HTTP delivery to the ingest API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bugwatch_core::Event;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::Transport;
use crate::error::TransportError;

/// Header carrying the API key, as `Bearer {key}`.
pub const API_KEY_HEADER: &str = "Authorization";
/// Header carrying the producing SDK's name.
pub const SDK_NAME_HEADER: &str = "X-Bugwatch-Sdk-Name";
/// Header carrying the producing SDK's version.
pub const SDK_VERSION_HEADER: &str = "X-Bugwatch-Sdk-Version";

/// Posts each event as a JSON body to the ingest API.
///
/// Non-2xx responses are returned as errors and never retried. A 429 carries
/// the `Retry-After` hint in the error; no backoff is scheduled. Failures are
/// logged by the caller, not here.
#[derive(Clone)]
pub struct HttpTransport {
	client: Client,
	url: String,
	api_key: String,
}

impl HttpTransport {
	/// Creates a transport posting to `url`, the full events URL.
	pub fn new(
		url: impl Into<String>,
		api_key: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, TransportError> {
		let client = Client::builder()
			.user_agent(user_agent())
			.timeout(timeout)
			.build()?;

		Ok(Self {
			client,
			url: url.into(),
			api_key: api_key.into(),
		})
	}

	/// The URL events are posted to.
	pub fn url(&self) -> &str {
		&self.url
	}
}

impl fmt::Debug for HttpTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HttpTransport")
			.field("url", &self.url)
			.field("api_key", &"[REDACTED]")
			.finish()
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, event: Event) -> Result<(), TransportError> {
		let body = serde_json::to_vec(&event)?;

		let response = self
			.client
			.post(&self.url)
			.header(CONTENT_TYPE, "application/json")
			.header(API_KEY_HEADER, format!("Bearer {}", self.api_key))
			.header(SDK_NAME_HEADER, &event.sdk.name)
			.header(SDK_VERSION_HEADER, &event.sdk.version)
			.body(body)
			.send()
			.await?;

		let status = response.status();

		if status == StatusCode::TOO_MANY_REQUESTS {
			let retry_after_secs = response
				.headers()
				.get(RETRY_AFTER)
				.and_then(|v| v.to_str().ok())
				.and_then(|s| s.trim().parse().ok());
			return Err(TransportError::RateLimited { retry_after_secs });
		}

		if !status.is_success() {
			return Err(TransportError::Status {
				status: status.as_u16(),
			});
		}

		debug!(event_id = %event.event_id, status = status.as_u16(), "Event delivered");
		Ok(())
	}

	fn name(&self) -> &'static str {
		"http"
	}
}

fn user_agent() -> String {
	format!("{}/{}", crate::SDK_NAME, crate::SDK_VERSION)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::testing::event;
	use wiremock::matchers::{body_partial_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn transport(server: &MockServer) -> HttpTransport {
		HttpTransport::new(
			format!("{}/api/v1/events", server.uri()),
			"key_123",
			Duration::from_secs(5),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn posts_event_with_headers() {
		let server = MockServer::start().await;
		let event = event("boom");

		Mock::given(method("POST"))
			.and(path("/api/v1/events"))
			.and(header("authorization", "Bearer key_123"))
			.and(header("content-type", "application/json"))
			.and(header(SDK_NAME_HEADER, "bugwatch-rust"))
			.and(header(SDK_VERSION_HEADER, "test"))
			.and(body_partial_json(serde_json::json!({
				"event_id": event.event_id.to_string(),
				"level": "error",
				"message": "boom",
			})))
			.respond_with(ResponseTemplate::new(202))
			.expect(1)
			.mount(&server)
			.await;

		transport(&server).send(event).await.unwrap();
	}

	#[tokio::test]
	async fn non_success_status_is_an_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(500))
			.expect(1)
			.mount(&server)
			.await;

		let result = transport(&server).send(event("boom")).await;
		assert!(matches!(result, Err(TransportError::Status { status: 500 })));
	}

	#[tokio::test]
	async fn rate_limit_reads_retry_after_without_retrying() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
			.expect(1)
			.mount(&server)
			.await;

		let result = transport(&server).send(event("boom")).await;
		assert!(matches!(
			result,
			Err(TransportError::RateLimited {
				retry_after_secs: Some(30)
			})
		));
	}

	#[tokio::test]
	async fn rate_limit_without_hint() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(429))
			.mount(&server)
			.await;

		let result = transport(&server).send(event("boom")).await;
		assert!(matches!(
			result,
			Err(TransportError::RateLimited {
				retry_after_secs: None
			})
		));
	}

	#[tokio::test]
	async fn connection_failure_is_an_error() {
		let transport = HttpTransport::new(
			"http://127.0.0.1:1/api/v1/events",
			"key",
			Duration::from_millis(500),
		)
		.unwrap();

		let result = transport.send(event("boom")).await;
		assert!(matches!(result, Err(TransportError::Request(_))));
	}

	#[test]
	fn debug_redacts_api_key() {
		let transport =
			HttpTransport::new("http://localhost/x", "secret_key", Duration::from_secs(1))
				.unwrap();
		assert!(!format!("{transport:?}").contains("secret_key"));
	}

	#[test]
	fn user_agent_names_sdk() {
		assert!(user_agent().starts_with("bugwatch-rust/"));
	}
}
