use std::{
	any::Any,
	fmt::Debug,
	panic::AssertUnwindSafe,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};

use futures::{FutureExt, StreamExt, stream};
use reqwest::header::HeaderValue;
use tokio_util::sync::CancellationToken;
use tracing::{Dispatch, debug, info, instrument::WithSubscriber, warn};

use crate::{
	error::{SlamError, SlamErrorKind},
	fetch::{execute, parse_target},
	options::DispatchOptions,
	response::RequestOutcome,
	telemetry::LogConfig,
	transport::{ReqwestTransport, Transport},
};

#[derive(Debug, Default)]
pub struct DispatchStats {
	pub(crate) requests_sent: AtomicUsize,
	pub(crate) responses_received: AtomicUsize,
}

impl DispatchStats {
	/// Requests handed to the transport, across every dispatch so far.
	pub fn requests_sent(&self) -> usize {
		self.requests_sent.load(Ordering::Relaxed)
	}

	/// Requests that got as far as a status line.
	pub fn responses_received(&self) -> usize {
		self.responses_received.load(Ordering::Relaxed)
	}
}

/// How far a dispatch has got: `done` of `total` requests have an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
	pub done: usize,
	pub total: usize,
}

type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Fans one target out across many user agents.
///
/// At most `options.concurrency` requests are in flight at a time. Results
/// come back in the order the identities were given, one per identity, no
/// matter which requests fail or finish first.
pub struct Dispatcher {
	transport: Arc<dyn Transport>,
	options: DispatchOptions,
	logging: Option<Dispatch>,
	progress: Option<ProgressFn>,
	cancel: CancellationToken,
	stats: Arc<DispatchStats>,
}

impl Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("options", &self.options)
			.field("cancelled", &self.cancel.is_cancelled())
			.field("stats", &self.stats)
			.finish_non_exhaustive()
	}
}

impl Dispatcher {
	pub fn new(options: DispatchOptions) -> Result<Self, SlamError> {
		let transport = Arc::new(ReqwestTransport::new());
		Self::with_transport(transport, options)
	}

	pub fn with_transport(
		transport: Arc<dyn Transport>,
		options: DispatchOptions,
	) -> Result<Self, SlamError> {
		options.validate()?;
		Ok(Self {
			transport,
			options,
			logging: None,
			progress: None,
			cancel: CancellationToken::new(),
			stats: Default::default(),
		})
	}

	/// Log through a subscriber built from `config` instead of the global one.
	pub fn with_logging(mut self, config: LogConfig) -> Self {
		self.logging = Some(config.subscriber());
		self
	}

	/// Call `report` each time a request finishes, in completion order.
	pub fn on_progress(mut self, report: impl Fn(Progress) + Send + Sync + 'static) -> Self {
		self.progress = Some(Arc::new(report));
		self
	}

	pub fn stats(&self) -> &DispatchStats {
		&self.stats
	}

	/// Token that, once cancelled, turns every unfinished request into a
	/// `Cancelled` outcome. Cancellation is permanent for this dispatcher.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Send one GET to `target` per identity and collect the outcomes.
	///
	/// Fails only on bad input, before anything is sent. Per-request problems
	/// come back as outcomes with `error` set.
	pub async fn dispatch<S>(
		&self,
		target: &str,
		identities: &[S],
	) -> Result<Vec<RequestOutcome>, SlamError>
	where
		S: AsRef<str> + Sync,
	{
		match &self.logging {
			Some(logging) => {
				self.run(target, identities)
					.with_subscriber(logging.clone())
					.await
			}
			None => self.run(target, identities).await,
		}
	}

	async fn run<S>(&self, target: &str, identities: &[S]) -> Result<Vec<RequestOutcome>, SlamError>
	where
		S: AsRef<str> + Sync,
	{
		let validated = parse_target(target).and_then(|_| validate_identities(identities));
		if let Err(err) = validated {
			warn!(%err, "refusing to dispatch");
			return Err(err);
		}

		let target = target.trim();
		info!(
			url = target,
			agents = identities.len(),
			concurrency = self.options.concurrency,
			"dispatching"
		);

		let mut slots: Vec<Option<RequestOutcome>> = identities.iter().map(|_| None).collect();
		let mut in_flight = stream::iter(identities.iter().enumerate())
			.map(|(index, identity)| async move {
				(index, self.attempt(target, identity.as_ref()).await)
			})
			.buffer_unordered(self.options.concurrency);

		let total = identities.len();
		let mut done = 0;
		while let Some((index, outcome)) = in_flight.next().await {
			slots[index] = Some(outcome);
			done += 1;
			if let Some(report) = &self.progress {
				report(Progress { done, total });
			}
		}

		let outcomes: Vec<RequestOutcome> = slots
			.into_iter()
			.zip(identities)
			.map(|(slot, identity)| {
				slot.unwrap_or_else(|| {
					RequestOutcome::failed(
						identity.as_ref(),
						target,
						SlamError::new(SlamErrorKind::Cancelled, Some("request never completed")),
					)
				})
			})
			.collect();

		let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
		info!(
			url = target,
			succeeded = outcomes.len() - failed,
			failed,
			"dispatch complete"
		);
		Ok(outcomes)
	}

	async fn attempt(&self, target: &str, identity: &str) -> RequestOutcome {
		if self.cancel.is_cancelled() {
			return RequestOutcome::failed(identity, target, SlamErrorKind::Cancelled.into());
		}

		self.stats.requests_sent.fetch_add(1, Ordering::Relaxed);
		let request = AssertUnwindSafe(execute(
			self.transport.as_ref(),
			target,
			identity,
			self.options.timeout,
		))
		.catch_unwind();

		let outcome = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => {
				RequestOutcome::failed(identity, target, SlamErrorKind::Cancelled.into())
			}
			result = request => result.unwrap_or_else(|panic| {
				RequestOutcome::failed(
					identity,
					target,
					SlamError::new(
						SlamErrorKind::TransportFailure,
						Some(format!("request panicked: {}", panic_message(panic.as_ref()))),
					),
				)
			}),
		};

		if outcome.status.is_some() {
			self.stats
				.responses_received
				.fetch_add(1, Ordering::Relaxed);
		}
		match &outcome.error {
			Some(err) => warn!(agent = identity, %err, "request failed"),
			None => debug!(agent = identity, status = ?outcome.status, "request succeeded"),
		}
		outcome
	}
}

fn validate_identities<S: AsRef<str>>(identities: &[S]) -> Result<(), SlamError> {
	if identities.is_empty() {
		return Err(SlamError::invalid_input("no user agents to send"));
	}

	for (index, identity) in identities.iter().enumerate() {
		let identity = identity.as_ref();
		if identity.is_empty() {
			return Err(SlamError::invalid_input(format!(
				"user agent #{index} is empty"
			)));
		}
		if HeaderValue::from_str(identity).is_err() {
			return Err(SlamError::invalid_input(format!(
				"user agent #{index} is not a valid header value: {identity:?}"
			)));
		}
	}

	Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
	panic
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| panic.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("unknown panic")
}
