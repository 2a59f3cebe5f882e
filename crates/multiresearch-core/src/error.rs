use thiserror::Error;

/// Core error type for MultiResearch.
///
/// Every failure is either a pre-check (input validation) or a fatal abort
/// of the current run; there are no retries.
#[derive(Debug, Error)]
pub enum ResearcherError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("research query must not be empty")]
    EmptyQuery,
    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },
    #[error("search error: {0}")]
    Search(String),
    #[error("synthesis produced no usable report")]
    NoReport,
    #[error("report export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResearcherError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
