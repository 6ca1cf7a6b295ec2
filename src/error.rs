//! Error types for rtacl.
//!
//! Only recoverable input problems (rule files, CLI arguments, tree
//! parameters) are reported through [`Error`]. Handing a malformed range to
//! the index is a caller bug and panics instead; a lookup or removal that
//! finds nothing is a normal return value.

use thiserror::Error;

/// Error type for rtacl operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Address, CIDR or address range that could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Port or port range that could not be parsed
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// Protocol name or number that could not be parsed
    #[error("invalid protocol: {0}")]
    InvalidProtocol(String),

    /// DSCP value or range that could not be parsed
    #[error("invalid DSCP: {0}")]
    InvalidDscp(String),

    /// Lower bound above upper bound in some field
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Address of the wrong family for the index it is meant for
    #[error("address family mismatch: expected {expected}, got {actual}")]
    AddressFamilyMismatch {
        expected: &'static str,
        actual: String,
    },

    /// Tree fan-out parameters out of bounds
    #[error("invalid tree parameters: max_entries={max_entries}, min_entries={min_entries}")]
    InvalidParams {
        max_entries: usize,
        min_entries: usize,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for rtacl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_mismatch_display() {
        let err = Error::AddressFamilyMismatch {
            expected: "IPv4",
            actual: "2001:db8::1".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("IPv4"), "got: {}", display);
        assert!(display.contains("2001:db8::1"), "got: {}", display);
    }

    #[test]
    fn test_invalid_params_is_matchable() {
        let err = Error::InvalidParams {
            max_entries: 2,
            min_entries: 1,
        };
        match err {
            Error::InvalidParams { max_entries, .. } => assert_eq!(max_entries, 2),
            _ => panic!("expected InvalidParams"),
        }
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/rtacl/rules.yaml")?)
        }
        assert!(matches!(open_missing(), Err(Error::Io(_))));
    }
}
