use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("invalid intent category: {0}")]
    InvalidCategory(String),

    #[error("pattern rules cannot target UNSUPPORTED; it is reachable only as the fallback")]
    FallbackRule,

    #[error("invalid pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to load pattern rules from {path}: {message}")]
    RuleFile { path: String, message: String },
}
