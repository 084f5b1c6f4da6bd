use thiserror::Error;

/// Main error type for BTaps operations
#[derive(Error, Debug)]
pub enum BtapsError {
    /// No transport channel was found for the device address
    #[error("Discovery error: no serial channel found for address {0}")]
    Discovery(String),

    /// The transport rejected opening the channel
    #[error("Connect error: {0}")]
    Connect(String),

    /// The transport write failed; the message is passed through unchanged
    #[error("Write error: {0}")]
    Write(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Malformed inbound frame
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Invalid command arguments (out-of-range id, oversized name)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Channel closed before the state response terminator arrived
    #[error("Incomplete state: channel closed before the terminator frame")]
    IncompleteState,

    /// Channel closed while an exchange was outstanding
    #[error("Connection lost")]
    ConnectionLost,

    /// Operation not allowed in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BtapsError {
    /// Whether a caller-level retry is appropriate for this failure
    ///
    /// Timeouts and write failures are transient. Decoding failures signal a
    /// protocol mismatch and will not go away by sending the command again.
    pub fn is_transient(&self) -> bool {
        matches!(self, BtapsError::Timeout(_) | BtapsError::Write(_))
    }
}

/// Result type alias for BTaps operations
pub type BtapsResult<T> = Result<T, BtapsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BtapsError::Timeout(1000).is_transient());
        assert!(BtapsError::Write("broken pipe".to_string()).is_transient());
        assert!(!BtapsError::Decoding("short frame".to_string()).is_transient());
        assert!(!BtapsError::ConnectionLost.is_transient());
    }

    #[test]
    fn test_write_message_passthrough() {
        let err = BtapsError::Write("device busy".to_string());
        assert_eq!(err.to_string(), "Write error: device busy");
    }

    #[test]
    fn test_io_error_conversion() {
        fn inspect() -> BtapsResult<()> {
            Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied))?;
            Ok(())
        }
        let err = inspect().unwrap_err();
        assert!(matches!(err, BtapsError::Io(ref e) if e.kind() == std::io::ErrorKind::PermissionDenied));
        assert!(!err.is_transient());
    }
}
