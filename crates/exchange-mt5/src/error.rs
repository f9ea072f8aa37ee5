//! Error types for the terminal bridge.

use thiserror::Error;

/// Errors that can occur when talking to the terminal.
#[derive(Debug, Error)]
pub enum Mt5Error {
    /// The terminal refused or failed a call; carries its last error.
    #[error("{operation} failed{}: ({code}, \"{message}\")", target_suffix(.target))]
    Terminal {
        /// Terminal function or step that failed.
        operation: String,
        /// Symbol the call was about, if any.
        target: Option<String>,
        /// Terminal error code.
        code: i64,
        /// Terminal error description.
        message: String,
    },

    /// A hidden symbol could not be added to the market watch.
    #[error("Failed to select symbol {symbol}: ({code}, \"{message}\")")]
    SymbolSelect {
        symbol: String,
        code: i64,
        message: String,
    },

    /// The bridge answered with a non-success HTTP status.
    #[error("bridge error: {status_code} - {message}")]
    Bridge {
        status_code: u16,
        message: String,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// A value from the terminal could not be represented.
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Mt5Error {
    /// Creates a terminal error from the failing operation and the terminal's last error.
    pub fn terminal(operation: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Terminal {
            operation: operation.into(),
            target: None,
            code,
            message: message.into(),
        }
    }

    /// Names the symbol a terminal error was about.
    #[must_use]
    pub fn for_target(self, target: &str) -> Self {
        match self {
            Self::Terminal {
                operation,
                code,
                message,
                ..
            } => Self::Terminal {
                operation,
                target: Some(target.to_string()),
                code,
                message,
            },
            other => other,
        }
    }

    /// Creates a bridge HTTP error.
    pub fn bridge(status_code: u16, message: impl Into<String>) -> Self {
        Self::Bridge {
            status_code,
            message: message.into(),
        }
    }

    /// Terminal error code, when the terminal reported one.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Terminal { code, .. } | Self::SymbolSelect { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Mt5Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Mt5Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

fn target_suffix(target: &Option<String>) -> String {
    target
        .as_ref()
        .map_or_else(String::new, |t| format!(" for {t}"))
}

/// Result type alias for terminal operations.
pub type Result<T> = std::result::Result<T, Mt5Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_error_display() {
        let err = Mt5Error::terminal("MT5 login", -6, "Authorization failed");
        assert_eq!(
            err.to_string(),
            "MT5 login failed: (-6, \"Authorization failed\")"
        );
        assert_eq!(err.code(), Some(-6));
    }

    #[test]
    fn test_target_named_after_failed() {
        let err = Mt5Error::terminal("copy_rates_range", 1, "no data").for_target("GBPUSD");
        assert_eq!(
            err.to_string(),
            "copy_rates_range failed for GBPUSD: (1, \"no data\")"
        );

        let bridge = Mt5Error::bridge(500, "boom").for_target("GBPUSD");
        assert!(!bridge.to_string().contains("GBPUSD"));
    }

    #[test]
    fn test_symbol_select_display() {
        let err = Mt5Error::SymbolSelect {
            symbol: "XAUUSD".to_string(),
            code: 4301,
            message: "Unknown symbol".to_string(),
        };
        assert!(err.to_string().starts_with("Failed to select symbol XAUUSD"));
    }

    #[test]
    fn test_bridge_error_has_no_terminal_code() {
        let err = Mt5Error::bridge(502, "bad gateway");
        assert!(err.to_string().contains("502"));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("\"x\"");
        let err: Mt5Error = parse.unwrap_err().into();
        assert!(matches!(err, Mt5Error::Serialization(_)));
    }
}
