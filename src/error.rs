//! Error types for the stored-procedure data access layer.
//!
//! Every failure is classified into one of a small set of variants so the
//! calling layer can decide how to surface it. Absence of rows is never an
//! error here; it is modeled as `None`, an empty `Vec`, or an empty tuple.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DalError {
    /// The connection could not be opened or was lost mid-call.
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    /// The server rejected the call.
    #[error("Execution of '{procedure}' failed: {message}")]
    Execution {
        procedure: String,
        message: String,
        /// e.g., "42000" for syntax error or access violation
        sql_state: Option<String>,
        suggestion: String,
    },

    /// A returned row or scalar could not be converted into the requested type.
    #[error("Decode failed for '{procedure}' (result set {slot}): {message}")]
    Decode {
        procedure: String,
        slot: usize,
        message: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DalError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an execution error with optional SQL state.
    pub fn execution(
        procedure: impl Into<String>,
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Execution {
            procedure: procedure.into(),
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a decode error for the result set at `slot`.
    pub fn decode(procedure: impl Into<String>, slot: usize, message: impl Into<String>) -> Self {
        Self::Decode {
            procedure: procedure.into(),
            slot,
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach the procedure name to errors that carry one.
    ///
    /// Driver errors are converted before the executor knows which call they
    /// belong to, so they start out with an empty procedure name.
    pub fn with_procedure(mut self, name: &str) -> Self {
        match &mut self {
            Self::Execution { procedure, .. } | Self::Decode { procedure, .. }
                if procedure.is_empty() =>
            {
                *procedure = name.to_string();
            }
            _ => {}
        }
        self
    }

    /// Attach the result-set position to a decode error.
    pub fn at_slot(mut self, index: usize) -> Self {
        if let Self::Decode { slot, .. } = &mut self {
            *slot = index;
        }
        self
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Execution { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error came from the connection rather than the call.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Check if this error is a row/scalar decoding failure.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Convert sqlx errors to DalError.
impl From<sqlx::Error> for DalError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DalError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DalError::execution(
                    "",
                    db_err.message(),
                    code,
                    "Check the procedure name, its parameters and the caller's permissions",
                )
            }
            sqlx::Error::Io(io_err) => DalError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DalError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DalError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DalError::connection(
                "Connection unavailable",
                "Reconnect to the database",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DalError::decode("", 0, format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DalError::decode(
                "",
                0,
                format!("Column index {} out of bounds (len: {})", index, len),
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DalError::decode("", 0, format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DalError::decode("", 0, source.to_string()),
            sqlx::Error::WorkerCrashed => DalError::internal("Database worker crashed"),
            _ => DalError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for data access operations.
pub type DalResult<T> = Result<T, DalError>;
