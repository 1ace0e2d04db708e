use thiserror::Error;

/// Fallback hint for provider error codes that are absent or not in the table.
const UNKNOWN_HINT: &str = "The world is on fire, something really bad happened. I have no idea.";

const KNOWN_HINTS: &[(i64, &str)] = &[(
    14,
    "This means Google cannot access image URL. Try using a different one.",
)];

pub fn provider_hint(code: Option<i64>) -> &'static str {
    code.and_then(|code| {
        KNOWN_HINTS
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, hint)| *hint)
    })
    .unwrap_or(UNKNOWN_HINT)
}

#[derive(Debug, Error)]
pub enum TrocrError {
    #[error("OCR queue full ({capacity}), try again later")]
    QueueFull { capacity: usize },

    #[error("**ProviderError**[{}]: {message}\n\nHint: {}", format_code(.code), hint_for(.code))]
    Provider { code: Option<i64>, message: String },

    #[error("no text detected")]
    NoTextDetected,

    #[error("expected {expected} translated lines, got {actual}")]
    LineCountMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    NothingDrawable(String),

    #[error("recognition worker is not running")]
    GatewayClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrocrError {
    /// Benign errors that are shown to the user as-is rather than reported as failures.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            TrocrError::QueueFull { .. }
                | TrocrError::NoTextDetected
                | TrocrError::NothingDrawable(_)
        )
    }
}

fn format_code(code: &Option<i64>) -> String {
    code.map(|code| code.to_string())
        .unwrap_or_else(|| "None".to_string())
}

fn hint_for(code: &Option<i64>) -> &'static str {
    provider_hint(*code)
}

pub type Result<T, E = TrocrError> = std::result::Result<T, E>;
