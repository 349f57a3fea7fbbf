use std::time::Duration;

use crate::error::SlamError;

pub const DEFAULT_CONCURRENCY: usize = 32;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for one [`Dispatcher`](crate::Dispatcher).
#[derive(Clone, Debug)]
pub struct DispatchOptions {
	/// Upper bound on requests in flight at once.
	pub concurrency: usize,
	/// Deadline for each request, covering send and body. `None` waits forever.
	pub timeout: Option<Duration>,
}

impl Default for DispatchOptions {
	fn default() -> Self {
		Self {
			concurrency: DEFAULT_CONCURRENCY,
			timeout: Some(DEFAULT_TIMEOUT),
		}
	}
}

impl DispatchOptions {
	pub fn with_concurrency(mut self, concurrency: usize) -> Self {
		self.concurrency = concurrency;
		self
	}

	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn validate(&self) -> Result<(), SlamError> {
		if self.concurrency == 0 {
			return Err(SlamError::invalid_input("concurrency must be at least 1"));
		}
		if self.timeout == Some(Duration::ZERO) {
			return Err(SlamError::invalid_input("timeout must be non-zero"));
		}
		Ok(())
	}
}
