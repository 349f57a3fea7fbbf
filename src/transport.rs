use std::fmt::Debug;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;

use crate::{
	agent::{Agent, AgentOptions},
	body::BodyStream,
	error::SlamError,
};

/// Status line and headers of a response, with its body still on the wire.
pub struct TransportResponse {
	pub status: u16,
	/// Header pairs in the order the transport delivered them, duplicates kept.
	///
	/// `ReqwestTransport` goes through `HeaderMap`, which keeps names in
	/// first-seen order but lists every value of a name together, so
	/// interleaved duplicates come out grouped.
	pub headers: Vec<(String, String)>,
	pub body: BodyStream,
}

impl TransportResponse {
	pub fn new(status: u16, headers: Vec<(String, String)>, body: BodyStream) -> Self {
		Self {
			status,
			headers,
			body,
		}
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

impl Debug for TransportResponse {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransportResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.finish_non_exhaustive()
	}
}

/// Sends a single GET as a given user agent.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn get(&self, url: &Url, user_agent: &str) -> Result<TransportResponse, SlamError>;
}

/// The real thing: a fresh reqwest client per call.
///
/// No deadline is set on the client; [`execute`](crate::execute) owns the
/// per-request budget.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Transport for ReqwestTransport {
	async fn get(&self, url: &Url, user_agent: &str) -> Result<TransportResponse, SlamError> {
		let agent = Agent::with_options(AgentOptions {
			user_agent: Some(user_agent.to_owned()),
		})?;

		let response = agent.client.get(url.clone()).send().await?;

		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.map(|(name, value)| {
				(
					name.to_string(),
					String::from_utf8_lossy(value.as_bytes()).into_owned(),
				)
			})
			.collect();

		// the stream owns the response, which owns the connection; `agent`
		// drops here but the pooled connection lives until the body is done
		let body: BodyStream = Box::pin(
			response
				.bytes_stream()
				.map(|chunk| chunk.map_err(SlamError::from)),
		);

		Ok(TransportResponse::new(status, headers, body))
	}
}

#[cfg(test)]
pub(crate) fn canned(status: u16, headers: &[(&str, &str)], text: &str) -> TransportResponse {
	TransportResponse::new(
		status,
		headers
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect(),
		crate::body::once(text.to_owned()),
	)
}
