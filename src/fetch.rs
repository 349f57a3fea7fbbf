use std::time::Duration;

use reqwest::Url;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{
	body,
	error::{SlamError, SlamErrorKind},
	response::{RequestOutcome, parse_cookies},
	transport::Transport,
};

/// Parse a dispatch target, accepting only absolute http(s) URLs.
pub(crate) fn parse_target(target: &str) -> Result<Url, SlamError> {
	let target = target.trim();
	if target.is_empty() {
		return Err(SlamError::invalid_input("missing target URL"));
	}

	let url = Url::parse(target)
		.map_err(|err| SlamError::invalid_input(format!("invalid target URL {target:?}: {err}")))?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		scheme => Err(SlamError::invalid_input(format!(
			"unsupported URL scheme {scheme:?}"
		))),
	}
}

/// Send one GET to `target` as `identity` and fold whatever happens into an
/// outcome. Never fails: errors land in [`RequestOutcome::error`].
pub async fn execute(
	transport: &dyn Transport,
	target: &str,
	identity: &str,
	timeout: Option<Duration>,
) -> RequestOutcome {
	if identity.is_empty() {
		return RequestOutcome::failed(
			identity,
			target,
			SlamError::invalid_input("missing user agent"),
		);
	}
	let url = match parse_target(target) {
		Ok(url) => url,
		Err(err) => return RequestOutcome::failed(identity, target, err),
	};

	debug!(agent = identity, %url, "sending request");
	let deadline = timeout.map(|limit| Deadline {
		at: Instant::now() + limit,
		limit,
	});
	let outcome = fetch(transport, &url, target, identity, deadline).await;

	trace!(agent = identity, status = ?outcome.status, error = ?outcome.error, "request done");
	outcome
}

/// One budget shared by the send and the body read.
#[derive(Clone, Copy)]
struct Deadline {
	at: Instant,
	limit: Duration,
}

async fn within<T>(
	deadline: Option<Deadline>,
	work: impl Future<Output = Result<T, SlamError>>,
) -> Result<T, SlamError> {
	let Some(deadline) = deadline else {
		return work.await;
	};
	tokio::time::timeout_at(deadline.at, work)
		.await
		.unwrap_or_else(|_| {
			Err(SlamError::new(
				SlamErrorKind::TransportFailure,
				Some(format!("timed out after {}ms", deadline.limit.as_millis())),
			))
		})
}

async fn fetch(
	transport: &dyn Transport,
	url: &Url,
	target: &str,
	identity: &str,
	deadline: Option<Deadline>,
) -> RequestOutcome {
	let mut outcome = RequestOutcome::new(identity, target);

	let response = match within(deadline, transport.get(url, identity)).await {
		Ok(response) => response,
		Err(err) => {
			outcome.error = Some(err);
			return outcome;
		}
	};

	let content_type = response.header("content-type").map(ToOwned::to_owned);
	outcome.status = Some(response.status);
	outcome.cookies = parse_cookies(&response.headers);
	outcome.headers = response.headers;

	// status and headers stay on the record even if the body goes bad or slow
	match within(deadline, body::gather(response.body))
		.await
		.and_then(|bytes| body::decode_text(&bytes, content_type.as_deref()))
	{
		Ok(text) => outcome.text = Some(text),
		Err(err) => outcome.error = Some(err),
	}

	outcome
}
