use std::fmt;
use thiserror::Error;

/// The error type for credential resolution operations.
#[derive(Error, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<String>,
    retryable: bool,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration is present but unusable: malformed profile file,
    /// invalid option value, role/trust misconfiguration.
    Configuration,

    /// The instance metadata service could not be reached or returned an
    /// unexpected status or body.
    ImdsUnavailable,

    /// The container credentials endpoint could not be reached or returned
    /// an unexpected status.
    HttpEndpointUnavailable,

    /// A credential response body was not valid JSON.
    Malformed,

    /// A required field of the credential envelope is absent or empty.
    MissingField,

    /// The expiration timestamp of a credential response did not parse.
    BadExpiration,

    /// STS rejected the request; the message carries the error code
    /// returned by the service.
    StsRejected,

    /// The operation was cancelled by the host.
    Cancelled,

    /// The per-request deadline elapsed.
    Timeout,

    /// Every source in the chain declined to produce a credential.
    NoCredentialsAvailable,

    /// Unexpected errors (I/O, impossible states, ...).
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            retryable: false,
            source: None,
        }
    }

    /// Add a source error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Append a `key: value` context string shown alongside the message.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Mark whether retrying the overall operation may succeed.
    pub fn set_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether retrying the overall operation may succeed.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

// Convenience constructors, one per kind.
impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an IMDS unavailable error.
    pub fn imds_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImdsUnavailable, message)
    }

    /// Create an HTTP endpoint unavailable error.
    pub fn http_endpoint_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HttpEndpointUnavailable, message)
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorKind::MissingField,
            format!("required credential field `{field}` is absent or empty"),
        )
    }

    /// Create a bad expiration error.
    pub fn bad_expiration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadExpiration, message)
    }

    /// Create an STS rejected error carrying the service error code.
    pub fn sts_rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self::new(
            ErrorKind::StsRejected,
            format!("[{code}] {}", message.into()),
        )
        .with_context(format!("error_code: {code}"))
    }

    /// Create a cancelled error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a timeout error. Timeouts are retryable.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message).set_retryable(true)
    }

    /// Create a no-credentials-available error. Callers must treat their
    /// overall operation as retryable unless the agent is shutting down.
    pub fn no_credentials_available(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoCredentialsAvailable, message).set_retryable(true)
    }

    /// Create an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for ctx in &self.context {
            write!(f, ", {ctx}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "invalid configuration"),
            ErrorKind::ImdsUnavailable => write!(f, "instance metadata service unavailable"),
            ErrorKind::HttpEndpointUnavailable => {
                write!(f, "credentials endpoint unavailable")
            }
            ErrorKind::Malformed => write!(f, "malformed credential response"),
            ErrorKind::MissingField => write!(f, "credential response missing field"),
            ErrorKind::BadExpiration => write!(f, "invalid credential expiration"),
            ErrorKind::StsRejected => write!(f, "request rejected by STS"),
            ErrorKind::Cancelled => write!(f, "operation cancelled"),
            ErrorKind::Timeout => write!(f, "operation timed out"),
            ErrorKind::NoCredentialsAvailable => write!(f, "no credentials available"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
