//! Shared HTTP plumbing for provider adapters
//!
//! Every outbound call is raced against a caller-side timeout: provider-side
//! timeout behavior is never trusted, and a timed-out request is aborted and
//! surfaced as a distinguishable error. The client itself additionally
//! carries a total-request deadline, so a provider that returns headers and
//! then trickles the body cannot stall a call past the configured bound.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::warn;

use rateshop_types::{ProviderError, ProviderResult};

/// Build an HTTP client with shared default headers plus adapter extras.
///
/// `timeout_ms` is set as the client's total-request deadline, covering the
/// body read as well as the initial send. Falls back to a bare client if the
/// builder fails, which only happens on broken local TLS setups.
pub(crate) fn build_client(adapter_headers: HeaderMap, timeout_ms: u64) -> Client {
	let mut headers = HeaderMap::new();
	headers.insert("Content-Type", HeaderValue::from_static("application/json"));
	headers.insert("Accept", HeaderValue::from_static("application/json"));
	headers.insert("User-Agent", HeaderValue::from_static("Rateshop/0.1"));
	headers.extend(adapter_headers);

	Client::builder()
		.default_headers(headers)
		.timeout(Duration::from_millis(timeout_ms))
		.build()
		.unwrap_or_else(|e| {
			warn!(
				"HTTP client build failed ({}), falling back to a default client \
				 without shared headers or a total-request deadline",
				e
			);
			Client::default()
		})
}

/// Send a request under a bounded timeout.
///
/// The timeout cancels the in-flight request; elapsing maps to
/// [`ProviderError::Timeout`] so fan-out callers can tell timeouts apart
/// from other transport faults.
pub(crate) async fn send_bounded(
	request: RequestBuilder,
	timeout_ms: u64,
) -> ProviderResult<Response> {
	let send = request.send();
	match tokio::time::timeout(Duration::from_millis(timeout_ms), send).await {
		Ok(result) => result.map_err(ProviderError::Http),
		Err(_) => Err(ProviderError::Timeout { timeout_ms }),
	}
}

/// Read a JSON body, mapping parse faults to an invalid-response error.
/// A body read cut off by the client deadline stays a transport fault.
pub(crate) async fn json_body<T: serde::de::DeserializeOwned>(
	response: Response,
) -> ProviderResult<T> {
	response.json::<T>().await.map_err(|e| {
		if e.is_timeout() {
			ProviderError::Http(e)
		} else {
			ProviderError::invalid_response(format!("failed to parse body: {}", e))
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Instant;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;

	#[tokio::test]
	async fn test_stalled_body_read_is_bounded() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut buf = [0u8; 1024];
			let _ = socket.read(&mut buf).await;
			// Headers and a sliver of body, then the connection goes quiet
			let _ = socket
				.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 4096\r\n\r\n{\"tr")
				.await;
			tokio::time::sleep(Duration::from_secs(30)).await;
		});

		let client = build_client(HeaderMap::new(), 200);
		let started = Instant::now();
		// Headers arrive promptly, so the send itself succeeds
		let response = send_bounded(client.get(format!("http://{}/estimate", addr)), 200)
			.await
			.unwrap();
		let result: ProviderResult<serde_json::Value> = json_body(response).await;

		assert!(result.is_err());
		assert!(started.elapsed() < Duration::from_secs(5));
	}
}
