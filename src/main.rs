//! `slammer`: hit one URL once per user agent and write down what came back.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use slammer::{
	DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, DispatchOptions, Dispatcher, LogConfig, Progress,
	ReportFormat, ReportMode, default_agents, identities, load_agents, telemetry, write_report,
};

#[derive(Parser)]
#[command(name = "slammer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send the same GET once per user agent and tabulate the responses", long_about = None)]
struct Cli {
	/// Target URL
	#[arg(long)]
	url: String,

	/// Report output path
	#[arg(long)]
	report: PathBuf,

	/// JSON agent list (array of {"ua": ..., "pct": ...}); defaults to the built-in list
	#[arg(long)]
	agents: Option<PathBuf>,

	/// Log verbosity, repeat for more (-v through -vvvv)
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,

	/// Emit JSON-formatted log lines
	#[arg(long)]
	json_logs: bool,

	/// Requests in flight at once
	#[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "SLAMMER_CONCURRENCY")]
	concurrency: usize,

	/// Per-request timeout in seconds, 0 to wait forever
	#[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs(), env = "SLAMMER_TIMEOUT")]
	timeout: u64,

	/// Report format: csv or json
	#[arg(long, default_value_t = ReportFormat::Csv)]
	format: ReportFormat,

	/// Truncate the report instead of appending to it
	#[arg(long)]
	overwrite: bool,
}

impl Cli {
	fn log_config(&self) -> Result<LogConfig> {
		let verbosity = match self.verbose {
			0 => telemetry::DEFAULT_VERBOSITY,
			v if v > telemetry::MAX_VERBOSITY => {
				bail!("at most -{} is supported", "v".repeat(telemetry::MAX_VERBOSITY.into()))
			}
			v => v,
		};
		Ok(LogConfig::new(verbosity, self.json_logs))
	}

	fn dispatch_options(&self) -> DispatchOptions {
		let timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
		DispatchOptions::default()
			.with_concurrency(self.concurrency)
			.with_timeout(timeout)
	}

	fn report_mode(&self) -> ReportMode {
		if self.overwrite {
			ReportMode::Overwrite
		} else {
			ReportMode::Append
		}
	}
}

/// Whether this completion is worth a log line: roughly every tenth of the
/// run, and always the last one.
fn is_milestone(Progress { done, total }: Progress) -> bool {
	let step = (total / 10).max(1);
	done == total || done % step == 0
}

fn log_progress(progress: Progress) {
	if is_milestone(progress) {
		info!(done = progress.done, total = progress.total, "progress");
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let logging = cli.log_config()?;
	logging.init();

	let agents = match &cli.agents {
		Some(path) => load_agents(path)?,
		None => default_agents()?,
	};
	let identities = identities(&agents);

	let dispatcher = Dispatcher::new(cli.dispatch_options())
		.context("invalid options")?
		.with_logging(logging)
		.on_progress(log_progress);

	let cancel = dispatcher.cancellation_token();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("interrupted, cancelling outstanding requests");
			cancel.cancel();
		}
	});

	let outcomes = dispatcher
		.dispatch(&cli.url, &identities)
		.await
		.context("could not start dispatch")?;

	write_report(&cli.report, &outcomes, cli.format, cli.report_mode())
		.with_context(|| format!("writing {}", cli.report.display()))?;

	let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
	info!(
		report = %cli.report.display(),
		requests = dispatcher.stats().requests_sent(),
		responses = dispatcher.stats().responses_received(),
		failed,
		"done"
	);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_the_library() {
		let cli = Cli::parse_from(["slammer", "--url", "http://x/", "--report", "r.csv"]);
		assert_eq!(cli.log_config().unwrap().verbosity, telemetry::DEFAULT_VERBOSITY);
		assert_eq!(cli.report_mode(), ReportMode::Append);
		assert_eq!(cli.format, ReportFormat::Csv);
		let options = cli.dispatch_options();
		assert_eq!(options.concurrency, DEFAULT_CONCURRENCY);
		assert_eq!(options.timeout, Some(DEFAULT_TIMEOUT));
	}

	#[test]
	fn flags_are_honoured() {
		let cli = Cli::parse_from([
			"slammer",
			"--url",
			"http://x/",
			"--report",
			"r.json",
			"-vvv",
			"--timeout",
			"0",
			"--concurrency",
			"4",
			"--format",
			"json",
			"--overwrite",
		]);
		assert_eq!(cli.log_config().unwrap().verbosity, 3);
		assert_eq!(cli.report_mode(), ReportMode::Overwrite);
		assert_eq!(cli.format, ReportFormat::Json);
		let options = cli.dispatch_options();
		assert_eq!(options.concurrency, 4);
		assert_eq!(options.timeout, None);
	}

	#[test]
	fn too_much_verbosity_is_refused() {
		let args = |flag| ["slammer", "--url", "http://x/", "--report", "r.csv", flag];
		let cli = Cli::parse_from(args("-vvvv"));
		assert_eq!(cli.log_config().unwrap().verbosity, telemetry::MAX_VERBOSITY);
		let cli = Cli::parse_from(args("-vvvvv"));
		assert!(cli.log_config().is_err());
	}

	#[test]
	fn progress_is_logged_about_ten_times() {
		let logged = (1..=95)
			.filter(|&done| is_milestone(Progress { done, total: 95 }))
			.count();
		assert_eq!(logged, 11);
		assert!(is_milestone(Progress { done: 95, total: 95 }));
		assert!((1..=3).all(|done| is_milestone(Progress { done, total: 3 })));
	}

	#[test]
	fn url_and_report_are_required() {
		assert!(Cli::try_parse_from(["slammer", "--url", "http://x/"]).is_err());
		assert!(Cli::try_parse_from(["slammer", "--report", "r.csv"]).is_err());
	}
}
