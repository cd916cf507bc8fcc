//! Error handling for the sensor exporter.

use std::fmt;

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// The specific way an hddtemp response violated the wire grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// Empty response, or one that does not begin with `'|'`
    MalformedResponse,
    /// A record that does not split into exactly four fields
    WrongFieldCount,
    /// A Celsius record whose temperature is not a float literal
    BadTemperatureLiteral,
    /// A unit other than `C` or `*`
    UnsupportedUnit,
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::MalformedResponse => "malformed response",
            Self::WrongFieldCount => "wrong field count",
            Self::BadTemperatureLiteral => "bad temperature literal",
            Self::UnsupportedUnit => "unsupported unit",
        };
        f.write_str(msg)
    }
}

/// The main error type for the sensor exporter.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// A backend could not be reached
    #[error("Cannot connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while draining a backend response
    #[error("Error reading from {address}: {source}")]
    Read {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed wire data from the hddtemp daemon
    #[error("hddtemp protocol error ({kind}): {fragment:?}")]
    Protocol {
        kind: ProtocolErrorKind,
        fragment: String,
    },

    /// A single numeric field could not be parsed
    #[error("Failed to parse {field}: {value:?}")]
    Parse { field: String, value: String },

    /// A native data-source call failed
    #[error("Query failed for {source_name}: {message}")]
    Query {
        source_name: String,
        message: String,
    },

    /// A sample's label values do not match its descriptor
    #[error("Metric {metric} expects {expected} label values, got {actual}")]
    LabelMismatch {
        metric: String,
        expected: usize,
        actual: usize,
    },

    /// Encoding the exposition format failed
    #[error("Exposition encoding error: {0}")]
    Encoding(String),

    /// A collector failure that its policy escalates to process-fatal
    #[error("Fatal failure in {collector} collector: {source}")]
    Fatal {
        collector: String,
        #[source]
        source: Box<ExporterError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl ExporterError {
    /// Create a new protocol error for the given offending fragment
    pub fn protocol_error(kind: ProtocolErrorKind, fragment: impl Into<String>) -> Self {
        Self::Protocol {
            kind,
            fragment: fragment.into(),
        }
    }

    /// Create a new field parse error
    pub fn parse_error(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Parse {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a new query error
    pub fn query_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a new encoding error
    pub fn encoding_error(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Protocol error kind, if this is an hddtemp protocol failure.
    pub fn protocol_kind(&self) -> Option<ProtocolErrorKind> {
        match self {
            Self::Protocol { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this error was escalated to process-fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}
