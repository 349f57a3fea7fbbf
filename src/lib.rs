mod agent;
pub mod body;
mod dispatch;
mod error;
mod fetch;
mod options;
pub mod report;
mod response;
pub mod telemetry;
pub mod transport;

pub use agent::*;
pub use dispatch::{DispatchStats, Dispatcher, Progress};
pub use error::{SlamError, SlamErrorKind};
pub use fetch::execute;
pub use options::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, DispatchOptions};
pub use report::{ReportError, ReportFormat, ReportMode, write_report};
pub use response::RequestOutcome;
pub use telemetry::LogConfig;
pub use transport::{ReqwestTransport, Transport, TransportResponse};
