use serde::Serialize;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum SlamErrorKind {
	InvalidInput,
	TransportFailure,
	DecodeFailure,
	Cancelled,
	AgentList,
	Report,
}

impl SlamErrorKind {
	fn default_message(self) -> &'static str {
		match self {
			Self::InvalidInput => "invalid input",
			Self::TransportFailure => "network error",
			Self::DecodeFailure => "response body is not decodable text",
			Self::Cancelled => "cancelled",
			Self::AgentList => "invalid agent list",
			Self::Report => "could not write report",
		}
	}
}

impl From<SlamErrorKind> for SlamError {
	fn from(kind: SlamErrorKind) -> Self {
		Self {
			kind,
			message: kind.default_message().to_owned(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SlamError {
	pub kind: SlamErrorKind,
	pub message: String,
}

impl SlamError {
	pub fn new(kind: SlamErrorKind, message: Option<impl Into<String>>) -> Self {
		Self {
			kind,
			message: message
				.map(Into::into)
				.unwrap_or_else(|| kind.default_message().to_owned()),
		}
	}

	pub fn invalid_input(message: impl Into<String>) -> Self {
		Self::new(SlamErrorKind::InvalidInput, Some(message))
	}
}

impl From<reqwest::Error> for SlamError {
	fn from(err: reqwest::Error) -> Self {
		// reqwest's Display stops at the outermost layer; walk the chain so the
		// report says "connection refused" rather than "error sending request".
		let mut message = err.to_string();
		let mut source = std::error::Error::source(&err);
		while let Some(inner) = source {
			message.push_str(": ");
			message.push_str(&inner.to_string());
			source = inner.source();
		}

		if err.is_timeout() {
			SlamError::new(SlamErrorKind::TransportFailure, Some(format!("timed out: {message}")))
		} else if err.is_builder() {
			SlamError::new(SlamErrorKind::InvalidInput, Some(message))
		} else {
			SlamError::new(SlamErrorKind::TransportFailure, Some(message))
		}
	}
}
