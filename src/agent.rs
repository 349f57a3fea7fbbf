use std::{fs, path::Path};

use reqwest::{Client, header::HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{SlamError, SlamErrorKind};

pub const USER_AGENT: &str = concat!("Slammer/", env!("CARGO_PKG_VERSION"));

const BUILTIN_AGENTS: &str = include_str!("../data/agents.json");

/// One entry of an agent list document.
///
/// Only `ua` matters to a dispatch; `pct` is the usage share the list was
/// ranked by and is carried along for whoever produced the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
	pub ua: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pct: Option<f64>,
}

pub fn parse_agents(json: &str) -> Result<Vec<AgentEntry>, SlamError> {
	serde_json::from_str(json)
		.map_err(|err| SlamError::new(SlamErrorKind::AgentList, Some(err.to_string())))
}

pub fn load_agents(path: &Path) -> Result<Vec<AgentEntry>, SlamError> {
	let json = fs::read_to_string(path).map_err(|err| {
		SlamError::new(
			SlamErrorKind::AgentList,
			Some(format!("{}: {err}", path.display())),
		)
	})?;
	parse_agents(&json)
}

/// Most common desktop user agents followed by the most common mobile ones.
pub fn default_agents() -> Result<Vec<AgentEntry>, SlamError> {
	parse_agents(BUILTIN_AGENTS)
}

pub fn identities(agents: &[AgentEntry]) -> Vec<String> {
	agents.iter().map(|agent| agent.ua.clone()).collect()
}

#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
	pub user_agent: Option<String>,
}

/// An HTTP client that presents as one user agent.
///
/// Each request gets its own `Agent`, so connections are never shared between
/// identities and are closed when the agent is dropped.
#[derive(Debug, Clone)]
pub struct Agent {
	pub(crate) client: Client,
}

impl Agent {
	pub fn with_options(options: AgentOptions) -> Result<Self, SlamError> {
		let user_agent = options.user_agent.as_deref().unwrap_or(USER_AGENT);
		let user_agent = HeaderValue::from_str(user_agent).map_err(|_| {
			SlamError::invalid_input(format!("invalid user agent: {user_agent:?}"))
		})?;

		// straight to the target; an HTTP_PROXY in the environment would
		// otherwise see every identity instead of the target
		let client = Client::builder().user_agent(user_agent).no_proxy().build()?;

		Ok(Self { client })
	}
}
