//! Error types for page fetching, sink writes and the ingest loop

/// Error from fetching one page from a record source.
#[derive(Debug)]
pub enum FetchError {
    /// Connection refused, timeout, or any failure before a status arrived
    Transport(String),
    /// Non-2xx HTTP status
    Status { code: u16, body: String },
    /// Body is not JSON, or a field has an unexpected shape
    Decode(String),
    /// Well-formed envelope carrying a non-zero API error code
    Api { code: i64, message: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status { code, body } if body.is_empty() => write!(f, "HTTP {code}"),
            Self::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Api { code, message } => write!(f, "API error {code}: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// HTTP status, if the server answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            // 429 = rate limited, 5xx = server side
            Self::Status { code, .. } => matches!(code, 429 | 500..=599),
            Self::Decode(_) | Self::Api { .. } => false,
        }
    }
}

/// Error from writing one batch to a sink.
#[derive(Debug)]
pub enum SinkError {
    /// Network failure or transient server status
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// The warehouse refused the batch
    Rejected(String),
    /// Local I/O failure (file sinks)
    Io(std::io::Error),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Transport {
                status: None,
                message,
            } => write!(f, "transport error: {message}"),
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl SinkError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Rejected(_) => false,
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
        }
    }
}

/// Fatal error of an ingest run.
///
/// Carries enough context (page index, unflushed row count) to reproduce
/// the failing request or account for the rows still buffered.
#[derive(Debug)]
pub enum IngestError {
    Fetch { page: u32, source: FetchError },
    Flush { rows: usize, source: SinkError },
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch { page, source } => write!(f, "fetching page {page} failed: {source}"),
            Self::Flush { rows, source } => {
                write!(f, "flush failed with {rows} rows unflushed: {source}")
            }
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            Self::Flush { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            code,
            body: String::new(),
        }
    }

    #[test]
    fn fetch_status_retryability() {
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
    }

    #[test]
    fn fetch_transport_retryable_decode_not() {
        assert!(FetchError::Transport("connection refused".into()).is_retryable());
        assert!(!FetchError::Decode("expected value".into()).is_retryable());
        let api = FetchError::Api {
            code: 10004,
            message: "invalid key".into(),
        };
        assert!(!api.is_retryable());
    }

    #[test]
    fn fetch_status_accessor() {
        assert_eq!(status(502).status(), Some(502));
        assert_eq!(FetchError::Decode("x".into()).status(), None);
    }

    #[test]
    fn display_status_with_and_without_body() {
        assert_eq!(format!("{}", status(404)), "HTTP 404");
        let err = FetchError::Status {
            code: 500,
            body: "oops".into(),
        };
        assert_eq!(format!("{err}"), "HTTP 500: oops");
    }

    #[test]
    fn sink_error_retryability() {
        let transient = SinkError::Transport {
            status: Some(503),
            message: "backend error".into(),
        };
        assert!(transient.is_retryable());
        assert!(!SinkError::Rejected("no such field: foo".into()).is_retryable());
        let full = SinkError::Io(std::io::Error::new(ErrorKind::StorageFull, "disk full"));
        assert!(!full.is_retryable());
    }

    #[test]
    fn ingest_error_names_page() {
        let err = IngestError::Fetch {
            page: 42,
            source: status(502),
        };
        let msg = err.to_string();
        assert!(msg.contains("page 42"));
        assert!(msg.contains("HTTP 502"));
    }

    #[test]
    fn ingest_error_names_pending_rows() {
        let err = IngestError::Flush {
            rows: 7,
            source: SinkError::Rejected("schema mismatch".into()),
        };
        assert_eq!(
            err.to_string(),
            "flush failed with 7 rows unflushed: rejected: schema mismatch"
        );
    }
}
