//! Logging setup.
//!
//! A [`LogConfig`] describes how verbose to be and in what shape. It can be
//! turned into a standalone [`Dispatch`] that a [`Dispatcher`](crate::Dispatcher)
//! scopes onto its own work, or installed process-wide for the CLI.
//!
//! `RUST_LOG`, when set, overrides the configured level.

use tracing::{Dispatch, Level};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_VERBOSITY: u8 = 2;
pub const MAX_VERBOSITY: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
	/// 0 = errors only, 4 = everything.
	pub verbosity: u8,
	/// Emit JSON-formatted log lines.
	pub json: bool,
}

impl Default for LogConfig {
	fn default() -> Self {
		Self {
			verbosity: DEFAULT_VERBOSITY,
			json: false,
		}
	}
}

impl LogConfig {
	pub fn new(verbosity: u8, json: bool) -> Self {
		Self {
			verbosity: verbosity.min(MAX_VERBOSITY),
			json,
		}
	}

	pub fn level(&self) -> Level {
		match self.verbosity {
			0 => Level::ERROR,
			1 => Level::WARN,
			2 => Level::INFO,
			3 => Level::DEBUG,
			_ => Level::TRACE,
		}
	}

	fn env_filter(&self) -> EnvFilter {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level().as_str()))
	}

	/// Build a subscriber without installing it anywhere.
	pub fn subscriber(&self) -> Dispatch {
		let registry = tracing_subscriber::registry().with(self.env_filter());
		let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
		if self.json {
			Dispatch::new(registry.with(layer.json()))
		} else {
			Dispatch::new(registry.with(layer))
		}
	}

	/// Install as the global default. Only the first call takes effect.
	pub fn init(&self) {
		let registry = tracing_subscriber::registry().with(self.env_filter());
		let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
		if self.json {
			registry.with(layer.json()).try_init().ok();
		} else {
			registry.with(layer).try_init().ok();
		}
	}
}
