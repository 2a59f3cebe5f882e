use std::env;

use crate::{ResearcherError, SecretValue};

pub const GEMINI_PRIMARY_ENV: &str = "GEMINI_API_KEY_1";
pub const GEMINI_SECONDARY_ENV: &str = "GEMINI_API_KEY_2";
pub const GROQ_ENV: &str = "GROQ_API_KEY";

/// Provider credentials captured once at process start.
///
/// Capture never fails: a variable that is unset at startup surfaces as
/// [`ResearcherError::MissingSecret`] the first time the credential is used,
/// not before.
#[derive(Debug, Clone)]
pub struct Credentials {
    gemini_primary: Option<SecretValue>,
    gemini_secondary: Option<SecretValue>,
    groq: Option<SecretValue>,
}

impl Credentials {
    /// Capture credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Capture credentials through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let capture = |var: &str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .map(SecretValue::new)
        };

        Self {
            gemini_primary: capture(GEMINI_PRIMARY_ENV),
            gemini_secondary: capture(GEMINI_SECONDARY_ENV),
            groq: capture(GROQ_ENV),
        }
    }

    pub fn gemini_primary(&self) -> Result<SecretValue, ResearcherError> {
        Self::resolve(&self.gemini_primary, GEMINI_PRIMARY_ENV)
    }

    pub fn gemini_secondary(&self) -> Result<SecretValue, ResearcherError> {
        Self::resolve(&self.gemini_secondary, GEMINI_SECONDARY_ENV)
    }

    pub fn groq(&self) -> Result<SecretValue, ResearcherError> {
        Self::resolve(&self.groq, GROQ_ENV)
    }

    fn resolve(
        value: &Option<SecretValue>,
        var: &str,
    ) -> Result<SecretValue, ResearcherError> {
        value
            .clone()
            .ok_or_else(|| ResearcherError::MissingSecret(var.to_string()))
    }
}

/// Tunables for one research run.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Model served to every research agent.
    pub research_model: String,
    /// Model used by the synthesis stage.
    pub synthesis_model: String,
    /// Number of concurrently dispatched research agents.
    pub research_agents: usize,
    /// Upper bound on the worker pool, independent of task count.
    pub max_workers: usize,
    /// Search results returned to each agent per query.
    pub max_results: usize,
    /// Sampling temperature for both stages.
    pub temperature: f32,
    /// Cap on provider round-trips within one agent invocation.
    pub max_turns: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            research_model: "gemini-2.0-flash".to_string(),
            synthesis_model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            research_agents: 2,
            max_workers: 5,
            max_results: 5,
            temperature: 0.1,
            max_turns: 12,
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Result<(), ResearcherError> {
        if self.research_agents == 0 {
            return Err(ResearcherError::InvalidConfiguration(
                "research_agents must be at least 1".into(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ResearcherError::InvalidConfiguration(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(ResearcherError::InvalidConfiguration(
                "max_results must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
