use std::{
	fs::{File, OpenOptions},
	io::{BufWriter, Write},
	path::Path,
};

use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::response::RequestOutcome;

pub const COLUMNS: [&str; 7] = [
	"agent",
	"url",
	"status code",
	"response headers",
	"cookies",
	"response text",
	"error",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportFormat {
	#[default]
	Csv,
	Json,
}

/// What to do when the report file already exists.
///
/// `Append` writes a fresh header row before each run's rows, so a file
/// appended to N times has N header rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportMode {
	#[default]
	Append,
	Overwrite,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
	#[error("could not open report {path}: {source}")]
	Open {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("could not write report: {0}")]
	Io(#[from] std::io::Error),

	#[error("could not write csv row: {0}")]
	Csv(#[from] csv::Error),

	#[error("could not encode report field: {0}")]
	Json(#[from] serde_json::Error),
}

/// One report line, with the structured fields flattened to strings.
#[derive(Debug, Serialize)]
struct Row<'a> {
	agent: &'a str,
	url: &'a str,
	#[serde(rename = "status code")]
	status: Option<u16>,
	#[serde(rename = "response headers")]
	headers: String,
	cookies: String,
	#[serde(rename = "response text")]
	text: &'a str,
	error: String,
}

impl<'a> Row<'a> {
	fn from_outcome(outcome: &'a RequestOutcome) -> Result<Self, ReportError> {
		Ok(Self {
			agent: &outcome.agent,
			url: &outcome.url,
			status: outcome.status,
			headers: serde_json::to_string(&outcome.headers)?,
			cookies: serde_json::to_string(&outcome.cookies)?,
			text: outcome.text.as_deref().unwrap_or_default(),
			error: outcome
				.error
				.as_ref()
				.map(ToString::to_string)
				.unwrap_or_default(),
		})
	}
}

fn open(path: &Path, mode: ReportMode) -> Result<File, ReportError> {
	let mut options = OpenOptions::new();
	match mode {
		ReportMode::Append => options.create(true).append(true),
		ReportMode::Overwrite => options.create(true).write(true).truncate(true),
	};
	options.open(path).map_err(|source| ReportError::Open {
		path: path.display().to_string(),
		source,
	})
}

/// Write outcomes to `path`. An empty outcome list leaves the file untouched.
pub fn write_report(
	path: &Path,
	outcomes: &[RequestOutcome],
	format: ReportFormat,
	mode: ReportMode,
) -> Result<(), ReportError> {
	if outcomes.is_empty() {
		warn!(path = %path.display(), "nothing to report");
		return Ok(());
	}

	let file = open(path, mode)?;
	match format {
		ReportFormat::Csv => write_csv(file, outcomes)?,
		ReportFormat::Json => write_json_lines(file, outcomes)?,
	}

	debug!(path = %path.display(), rows = outcomes.len(), %format, %mode, "report written");
	Ok(())
}

pub fn write_csv<W: Write>(writer: W, outcomes: &[RequestOutcome]) -> Result<(), ReportError> {
	let mut csv = csv::WriterBuilder::new()
		.has_headers(false)
		.from_writer(writer);
	csv.write_record(COLUMNS)?;
	for outcome in outcomes {
		csv.serialize(Row::from_outcome(outcome)?)?;
	}
	csv.flush()?;
	Ok(())
}

pub fn write_json_lines<W: Write>(writer: W, outcomes: &[RequestOutcome]) -> Result<(), ReportError> {
	let mut writer = BufWriter::new(writer);
	for outcome in outcomes {
		serde_json::to_writer(&mut writer, outcome)?;
		writer.write_all(b"\n")?;
	}
	writer.flush()?;
	Ok(())
}
