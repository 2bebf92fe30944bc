//! Batch options.

use url::Url;

use crate::error::Error;
use crate::protocol::types::FormatCode;

/// How a submitted batch is sent and read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// One extended-protocol exchange per statement, each ending in Sync.
    /// A failing statement does not abort the ones after it.
    #[default]
    Pipeline,
    /// All statements followed by a single Sync.
    /// The server runs them as one implicit transaction.
    Simple,
}

/// Options for batch execution on a connection.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Result retrieval strategy.
    ///
    /// Default: `BatchMode::Pipeline`
    pub batch_mode: BatchMode,

    /// Format requested for result columns.
    ///
    /// Default: `FormatCode::Binary`
    pub result_format: FormatCode,

    /// Attach a [`LogBatchTracer`](crate::LogBatchTracer) to new connections.
    ///
    /// Default: `false`
    pub log_batches: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            batch_mode: BatchMode::Pipeline,
            result_format: FormatCode::Binary,
            log_batches: false,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "True" | "1" | "yes" | "on" => Ok(true),
        "false" | "False" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidUsage(format!("Invalid {}: {}", key, value))),
    }
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Read batch options from a PostgreSQL connection URL.
    ///
    /// Format: `postgres://[user[:password]@]host[:port][/database][?param1=value1&..]`
    ///
    /// Supported query parameters:
    /// - `batch_mode`: pipeline, simple
    /// - `result_format`: binary, text
    /// - `log_batches`: true/True/1/yes/on or false/False/0/no/off
    ///
    /// Other parameters concern connection establishment and are ignored.
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !["postgres", "postgresql", "pg"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'postgres://' or 'pg://', got '{}://'",
                url.scheme()
            )));
        }

        let mut opts = Opts::default();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "batch_mode" => {
                    opts.batch_mode = match value.as_ref() {
                        "pipeline" => BatchMode::Pipeline,
                        "simple" => BatchMode::Simple,
                        _ => {
                            return Err(Error::InvalidUsage(format!(
                                "Invalid batch_mode: expected one of ['pipeline', 'simple'], got {}",
                                value
                            )));
                        }
                    };
                }
                "result_format" => {
                    opts.result_format = match value.as_ref() {
                        "binary" => FormatCode::Binary,
                        "text" => FormatCode::Text,
                        _ => {
                            return Err(Error::InvalidUsage(format!(
                                "Invalid result_format: expected one of ['binary', 'text'], got {}",
                                value
                            )));
                        }
                    };
                }
                "log_batches" => {
                    opts.log_batches = parse_bool("log_batches", &value)?;
                }
                _ => {}
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}
