use crate::logging::LogFormat;
use crate::transport::TransportKind;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Largest single read the embedded server may request (1 MiB).
pub const DEFAULT_MAX_READ_LEN: usize = 1024 * 1024;

/// Buffer size used by the host pump when draining its input source.
pub const DEFAULT_INPUT_CHUNK_SIZE: usize = 4096;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default transport backend.
#[must_use]
pub const fn default_transport() -> TransportKind {
    TransportKind::Queue
}

/// Default read ceiling applied to every transport read.
#[must_use]
pub const fn default_max_read_len() -> usize {
    DEFAULT_MAX_READ_LEN
}

/// Default pump buffer size.
#[must_use]
pub const fn default_input_chunk_size() -> usize {
    DEFAULT_INPUT_CHUNK_SIZE
}
