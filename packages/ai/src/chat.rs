//! Stateless quiet-spaces chat turns.

use std::fmt::Write as _;

use crate::AiError;
use crate::providers::LlmProvider;

/// Fixed instructions for the assistant.
pub const SYSTEM_PROMPT: &str = "\
You are the assistant for NYC Quiet Spaces, an app that helps people find calm places in \
New York City to study, work, or unwind.

You help users by:
1. Answering questions about finding quiet spots in NYC
2. Suggesting specific places from the user's nearby list when it is relevant
3. Sharing practical tips for studying, remote work, or finding peace in the city

Guidelines:
- Keep answers short, usually two to four sentences
- When suggesting places, name them from the provided list if one is given
- For places outside the list, give general NYC advice
- Stay friendly and encouraging";

/// A place the user can currently see, passed along as context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceContext {
    /// Place name.
    pub name: String,
    /// Address, if known.
    pub address: Option<String>,
    /// Category label, if known.
    pub category: Option<String>,
    /// Average rating, if known.
    pub rating: Option<f64>,
}

/// One context line: `- <name> (<type>): <address>, Rating: <rating>`.
#[must_use]
pub fn context_line(place: &PlaceContext) -> String {
    let category = place
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or("unknown type");
    let address = place
        .address
        .as_deref()
        .filter(|a| !a.is_empty())
        .unwrap_or("address unknown");
    let rating = place
        .rating
        .map_or_else(|| "N/A".to_string(), |r| format!("{r:?}"));

    format!("- {} ({category}): {address}, Rating: {rating}", place.name)
}

/// The system prompt, extended with `places` when any are given.
#[must_use]
pub fn build_system_prompt(places: &[PlaceContext]) -> String {
    let mut prompt = SYSTEM_PROMPT.to_string();
    if places.is_empty() {
        return prompt;
    }

    prompt.push_str("\n\nNearby quiet places the user can see:");
    for place in places {
        let _ = write!(prompt, "\n{}", context_line(place));
    }
    prompt
}

/// Answers one user message.
///
/// # Errors
///
/// Returns [`AiError`] if the provider call fails.
pub async fn answer(
    provider: &dyn LlmProvider,
    message: &str,
    places: &[PlaceContext],
) -> Result<String, AiError> {
    log::debug!(
        "Chat via {} with {} places of context",
        provider.name(),
        places.len()
    );
    let system_prompt = build_system_prompt(places);
    provider.generate(&system_prompt, message).await.inspect_err(|e| {
        log::error!("Chat generation failed via {}: {e}", provider.name());
    })
}
