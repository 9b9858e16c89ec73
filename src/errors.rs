use std::fmt;

/// Error taxonomy for the analysis pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum AdvisorError {
    /// Empty, blank or non-text input
    InvalidInput(String),
    /// Unknown side selector
    InvalidColor(String),
    /// Game record could not be parsed or has no moves
    MalformedRecord(String),
    /// Game is too short to be analyzed
    InsufficientLength { half_moves: usize, required: usize },
    /// Board tracker refused a move
    IllegalMove(String),
    /// An extractor could not produce a value for a well-formed position
    Extraction(String),
    /// Unknown play-style name
    InvalidStyle { given: String, options: Vec<String> },
    /// Model or vector shape mismatch, unusable artifact
    Configuration(String),
    /// Classifier failed while running
    Model(String),
    /// File I/O or serialization failed
    Io(String),
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisorError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AdvisorError::InvalidColor(given) => {
                write!(f, "Invalid color '{}'. Options: white, black", given)
            }
            AdvisorError::MalformedRecord(msg) => write!(f, "Malformed game record: {}", msg),
            AdvisorError::InsufficientLength { half_moves, required } => write!(
                f,
                "Insufficient length: the PGN must contain at least {} moves (got {} half-moves, need {})",
                required / 2,
                half_moves,
                required
            ),
            AdvisorError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
            AdvisorError::Extraction(msg) => write!(f, "Feature extraction error: {}", msg),
            AdvisorError::InvalidStyle { given, options } => write!(
                f,
                "Invalid style '{}'. Options: {}",
                given,
                options.join(", ")
            ),
            AdvisorError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AdvisorError::Model(msg) => write!(f, "Model error: {}", msg),
            AdvisorError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for AdvisorError {}

impl AdvisorError {
    /// Message shown to callers at the pipeline boundary.
    ///
    /// Internal failures are collapsed into a generic message; their details
    /// only go to the log.
    pub fn user_message(&self) -> String {
        match self {
            AdvisorError::InvalidInput(_) => "No valid PGN was submitted".to_string(),
            AdvisorError::MalformedRecord(_) => {
                "The PGN could not be read as a chess game".to_string()
            }
            AdvisorError::InsufficientLength { required, .. } => format!(
                "Insufficient length: the PGN must contain at least {} moves",
                required / 2
            ),
            AdvisorError::IllegalMove(_) | AdvisorError::Extraction(_) => {
                "Features could not be extracted from the PGN".to_string()
            }
            AdvisorError::InvalidColor(_) | AdvisorError::InvalidStyle { .. } => self.to_string(),
            AdvisorError::Configuration(_) | AdvisorError::Model(_) | AdvisorError::Io(_) => {
                "Unexpected error while analyzing the game".to_string()
            }
        }
    }

    /// Whether the error stems from the request itself rather than from the setup
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            AdvisorError::InvalidInput(_)
                | AdvisorError::InvalidColor(_)
                | AdvisorError::MalformedRecord(_)
                | AdvisorError::InsufficientLength { .. }
                | AdvisorError::InvalidStyle { .. }
        )
    }
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, AdvisorError>;

impl From<std::io::Error> for AdvisorError {
    fn from(error: std::io::Error) -> Self {
        AdvisorError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AdvisorError {
    fn from(error: serde_json::Error) -> Self {
        AdvisorError::Io(format!("JSON serialization error: {}", error))
    }
}

impl From<csv::Error> for AdvisorError {
    fn from(error: csv::Error) -> Self {
        AdvisorError::Io(format!("CSV error: {}", error))
    }
}

impl From<candle_core::Error> for AdvisorError {
    fn from(error: candle_core::Error) -> Self {
        AdvisorError::Model(error.to_string())
    }
}

impl From<chess::Error> for AdvisorError {
    fn from(error: chess::Error) -> Self {
        AdvisorError::MalformedRecord(error.to_string())
    }
}

// Helper macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::errors::AdvisorError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AdvisorError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! extraction_error {
    ($msg:expr) => {
        $crate::errors::AdvisorError::Extraction($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AdvisorError::Extraction(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! malformed_record {
    ($msg:expr) => {
        $crate::errors::AdvisorError::MalformedRecord($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AdvisorError::MalformedRecord(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AdvisorError::InvalidInput("blank text".to_string());
        assert_eq!(error.to_string(), "Invalid input: blank text");
    }

    #[test]
    fn test_input_guards_have_distinct_messages() {
        let blank = AdvisorError::InvalidInput("blank text".to_string());
        let malformed = AdvisorError::MalformedRecord("game has no moves".to_string());
        let color = AdvisorError::InvalidColor("green".to_string());

        assert_ne!(blank.user_message(), malformed.user_message());
        assert_eq!(color.user_message(), "Invalid color 'green'. Options: white, black");
        assert!(color.is_request_error());
    }

    #[test]
    fn test_insufficient_length_message() {
        let error = AdvisorError::InsufficientLength {
            half_moves: 58,
            required: 60,
        };
        assert!(error.to_string().contains("at least 30 moves"));
        assert!(error.user_message().contains("Insufficient length"));
        assert!(error.is_request_error());
    }

    #[test]
    fn test_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: AdvisorError = io_error.into();

        match error {
            AdvisorError::Io(msg) => assert!(msg.contains("file not found")),
            _ => panic!("Expected Io"),
        }
    }

    #[test]
    fn test_error_macros() {
        let error = config_error!("expected {} inputs, got {}", 360, 393);
        match error {
            AdvisorError::Configuration(msg) => assert_eq!(msg, "expected 360 inputs, got 393"),
            _ => panic!("Expected Configuration"),
        }

        let error = extraction_error!("non-finite value");
        assert!(!error.is_request_error());
        assert_eq!(
            error.user_message(),
            "Features could not be extracted from the PGN"
        );
    }

    #[test]
    fn test_invalid_style_lists_options() {
        let error = AdvisorError::InvalidStyle {
            given: "aggressive".to_string(),
            options: vec!["posicional".to_string(), "combinativo".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Invalid style 'aggressive'. Options: posicional, combinativo"
        );
    }
}
