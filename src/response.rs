use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{SlamError, SlamErrorKind};

/// What happened to one request, good or bad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
	pub agent: String,
	pub url: String,
	#[serde(rename = "status code")]
	pub status: Option<u16>,
	#[serde(rename = "response headers")]
	pub headers: Vec<(String, String)>,
	pub cookies: BTreeMap<String, String>,
	#[serde(rename = "response text")]
	pub text: Option<String>,
	pub error: Option<SlamError>,
}

impl RequestOutcome {
	pub(crate) fn new(agent: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			agent: agent.into(),
			url: url.into(),
			status: None,
			headers: Vec::new(),
			cookies: BTreeMap::new(),
			text: None,
			error: None,
		}
	}

	pub fn failed(agent: impl Into<String>, url: impl Into<String>, error: SlamError) -> Self {
		Self {
			error: Some(error),
			..Self::new(agent, url)
		}
	}

	pub fn is_ok(&self) -> bool {
		self.error.is_none()
	}

	pub fn error_kind(&self) -> Option<SlamErrorKind> {
		self.error.as_ref().map(|err| err.kind)
	}
}

/// Read the leading `name=value` pair of each `Set-Cookie` header. Later
/// cookies with the same name replace earlier ones.
pub(crate) fn parse_cookies(headers: &[(String, String)]) -> BTreeMap<String, String> {
	headers
		.iter()
		.filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
		.filter_map(|(_, value)| {
			let pair = value.split(';').next()?;
			let (name, value) = pair.split_once('=')?;
			let name = name.trim();
			if name.is_empty() {
				return None;
			}
			Some((name.to_owned(), value.trim().trim_matches('"').to_owned()))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
		raw.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn cookies_from_every_set_cookie() {
		let cookies = parse_cookies(&pairs(&[
			("set-cookie", "session=abc; Path=/; HttpOnly"),
			("content-type", "text/html"),
			("Set-Cookie", "theme=\"dark\""),
			("set-cookie", "garbage"),
			("set-cookie", "=nameless"),
		]));
		assert_eq!(cookies.len(), 2);
		assert_eq!(cookies["session"], "abc");
		assert_eq!(cookies["theme"], "dark");
	}

	#[test]
	fn later_cookie_wins() {
		let cookies = parse_cookies(&pairs(&[("set-cookie", "a=1"), ("set-cookie", "a=2")]));
		assert_eq!(cookies["a"], "2");
	}

	#[test]
	fn failed_outcome_has_no_response_data() {
		let outcome = RequestOutcome::failed(
			"ua",
			"http://x/",
			SlamError::from(SlamErrorKind::TransportFailure),
		);
		assert!(!outcome.is_ok());
		assert_eq!(outcome.status, None);
		assert_eq!(outcome.text, None);
		assert!(outcome.headers.is_empty());
		assert_eq!(outcome.error_kind(), Some(SlamErrorKind::TransportFailure));
	}

	#[test]
	fn serializes_with_report_field_names() {
		let outcome = RequestOutcome {
			status: Some(200),
			text: Some("ok".into()),
			..RequestOutcome::new("ua", "http://x/")
		};
		let json = serde_json::to_value(&outcome).unwrap();
		assert_eq!(json["status code"], 200);
		assert_eq!(json["response text"], "ok");
		assert!(json["error"].is_null());
	}
}
