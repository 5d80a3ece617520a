use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `EpiError` and maps to other errors to
/// convert to an `EpiError`
///
/// Every variant is fatal for the run that produced it. Engine divergence is
/// not an error; see [`crate::consistency::Agreement`].
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpiError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    EncodeError(bincode::error::EncodeError),
    DecodeError(bincode::error::DecodeError),
    /// Bad run configuration, detected before any tick runs.
    Config(String),
    /// A malformed input record. `line` is 1-based within the input file.
    Data { line: usize, message: String },
    /// The partitioned engine's workers could not complete an exchange.
    Coordination(String),
}

impl EpiError {
    pub fn data(line: usize, message: impl Into<String>) -> Self {
        EpiError::Data {
            line,
            message: message.into(),
        }
    }
}

impl From<io::Error> for EpiError {
    fn from(error: io::Error) -> Self {
        EpiError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(error: serde_json::Error) -> Self {
        EpiError::JsonError(error)
    }
}

impl From<csv::Error> for EpiError {
    fn from(error: csv::Error) -> Self {
        EpiError::CSVError(error)
    }
}

impl From<bincode::error::EncodeError> for EpiError {
    fn from(error: bincode::error::EncodeError) -> Self {
        EpiError::EncodeError(error)
    }
}

impl From<bincode::error::DecodeError> for EpiError {
    fn from(error: bincode::error::DecodeError) -> Self {
        EpiError::DecodeError(error)
    }
}

impl From<String> for EpiError {
    fn from(error: String) -> Self {
        EpiError::Config(error)
    }
}

impl From<&str> for EpiError {
    fn from(error: &str) -> Self {
        EpiError::Config(error.to_string())
    }
}

impl std::error::Error for EpiError {}

impl Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiError::IoError(error) => write!(f, "I/O error: {error}"),
            EpiError::JsonError(error) => write!(f, "invalid parameters file: {error}"),
            EpiError::CSVError(error) => write!(f, "CSV error: {error}"),
            EpiError::EncodeError(error) => write!(f, "failed to encode records: {error}"),
            EpiError::DecodeError(error) => write!(f, "failed to decode records: {error}"),
            EpiError::Config(message) => write!(f, "configuration error: {message}"),
            EpiError::Data { line, message } => {
                write!(f, "error parsing person data at line {line}: {message}")
            }
            EpiError::Coordination(message) => write!(f, "coordination error: {message}"),
        }
    }
}
