//! LLM provider abstraction and implementations.
//!
//! Supports Google Gemini, Anthropic Claude, and `OpenAI`-compatible chat
//! completions via a common trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::str::FromStr;
use std::time::Duration;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::AiError;

/// Upper bound on one completion request, connect through body.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client every provider sends through.
pub(crate) fn http_client() -> Result<reqwest::Client, AiError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, for logging.
    fn name(&self) -> &str;

    /// Generates a single reply to `message` under `system_prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider returns no
    /// text.
    async fn generate(&self, system_prompt: &str, message: &str) -> Result<String, AiError>;
}

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum ProviderKind {
    /// Google Gemini `generateContent`.
    #[strum(to_string = "gemini", serialize = "google")]
    Gemini,
    /// Anthropic Messages API.
    #[strum(to_string = "anthropic", serialize = "claude")]
    Anthropic,
    /// `OpenAI` chat completions, or a compatible server.
    #[strum(to_string = "openai", serialize = "gpt")]
    OpenAi,
}

impl ProviderKind {
    /// Default model for the provider.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-flash-latest",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o",
        }
    }
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `GOOGLE_GEMINI_API_KEY` set -> Gemini
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 3. `OPENAI_API_KEY` or `AI_BASE_URL` set -> `OpenAI`-compatible
///
/// `AI_MODEL` overrides the provider's default model.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    create_provider(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

/// Creates an LLM provider from configuration values looked up by name.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// requested provider is unknown or not configured.
pub fn create_provider(
    env: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn LlmProvider>, AiError> {
    let kind = match env("AI_PROVIDER") {
        Some(name) => ProviderKind::from_str(&name).map_err(|_| AiError::Config {
            message: format!(
                "Unknown AI provider: {name}. Use 'gemini', 'anthropic', or 'openai'."
            ),
        })?,
        None => detect_provider(&env)?,
    };

    let model = env("AI_MODEL").unwrap_or_else(|| kind.default_model().to_string());
    let missing = |var: &str| AiError::Config {
        message: format!("{var} environment variable not set"),
    };

    log::info!("Using AI provider {kind} with model {model}");

    let provider: Box<dyn LlmProvider> = match kind {
        ProviderKind::Gemini => {
            let api_key =
                env("GOOGLE_GEMINI_API_KEY").ok_or_else(|| missing("GOOGLE_GEMINI_API_KEY"))?;
            Box::new(gemini::GeminiProvider::new(api_key, model)?)
        }
        ProviderKind::Anthropic => {
            let api_key =
                env("ANTHROPIC_API_KEY").ok_or_else(|| missing("ANTHROPIC_API_KEY"))?;
            Box::new(anthropic::AnthropicProvider::new(api_key, model)?)
        }
        ProviderKind::OpenAi => {
            let base_url = env("AI_BASE_URL");
            let api_key = match (env("OPENAI_API_KEY"), &base_url) {
                (Some(key), _) => Some(key),
                // Local servers usually need no key.
                (None, Some(_)) => None,
                (None, None) => return Err(missing("OPENAI_API_KEY")),
            };
            Box::new(openai::OpenAiProvider::new(api_key, model, base_url)?)
        }
    };
    Ok(provider)
}

/// Picks a provider from the credentials that are present.
fn detect_provider(env: &impl Fn(&str) -> Option<String>) -> Result<ProviderKind, AiError> {
    if env("GOOGLE_GEMINI_API_KEY").is_some() {
        log::info!("Auto-detected AI provider: Gemini (GOOGLE_GEMINI_API_KEY found)");
        return Ok(ProviderKind::Gemini);
    }

    if env("ANTHROPIC_API_KEY").is_some() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return Ok(ProviderKind::Anthropic);
    }

    if env("OPENAI_API_KEY").is_some() || env("AI_BASE_URL").is_some() {
        log::info!("Auto-detected AI provider: OpenAI-compatible");
        return Ok(ProviderKind::OpenAi);
    }

    Err(AiError::Config {
        message: "No AI credentials detected. Set one of GOOGLE_GEMINI_API_KEY, \
                  ANTHROPIC_API_KEY, OPENAI_API_KEY, or AI_BASE_URL."
            .to_string(),
    })
}

/// Extracts a provider's error message from a JSON error body of the form
/// `{"error": {"message": "..."}}`, falling back to the raw body.
pub(crate) fn provider_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| format!("HTTP {status}: {body}"));
    AiError::Provider { message }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn parses_provider_aliases() {
        assert_eq!(ProviderKind::from_str("Claude").unwrap(), ProviderKind::Anthropic);
        assert_eq!(ProviderKind::from_str("google").unwrap(), ProviderKind::Gemini);
        assert_eq!(ProviderKind::from_str("GPT").unwrap(), ProviderKind::OpenAi);
        assert!(ProviderKind::from_str("bard").is_err());
    }

    #[test]
    fn detects_gemini_first() {
        let provider = create_provider(env_of(&[
            ("ANTHROPIC_API_KEY", "a"),
            ("GOOGLE_GEMINI_API_KEY", "g"),
        ]))
        .unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn explicit_provider_wins_over_detection() {
        let provider = create_provider(env_of(&[
            ("AI_PROVIDER", "anthropic"),
            ("GOOGLE_GEMINI_API_KEY", "g"),
            ("ANTHROPIC_API_KEY", "a"),
        ]))
        .unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn explicit_provider_without_key_is_a_config_error() {
        let err = create_provider(env_of(&[("AI_PROVIDER", "openai")])).err().unwrap();
        assert!(matches!(err, AiError::Config { .. }));
    }

    #[test]
    fn local_openai_server_needs_no_key() {
        let provider =
            create_provider(env_of(&[("AI_BASE_URL", "http://localhost:11434/v1")])).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn no_credentials_is_a_config_error() {
        assert!(matches!(create_provider(env_of(&[])).err().unwrap(), AiError::Config { .. }));
    }

    #[test]
    fn provider_requests_are_bounded() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(30));
        assert!(http_client().is_ok());
    }

    #[test]
    fn extracts_provider_error_message() {
        let err = provider_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "invalid x-api-key"}}"#,
        );
        assert_eq!(err.to_string(), "Provider error: invalid x-api-key");

        let raw = provider_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(raw.to_string(), "Provider error: HTTP 502 Bad Gateway: upstream down");
    }
}
