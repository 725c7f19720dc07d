//! Actor identity normalization.

/// Actor recorded when the caller supplies none.
pub const DEFAULT_ACTOR: &str = "system";

/// Trims the actor and substitutes [`DEFAULT_ACTOR`] when nothing is left.
#[must_use]
pub fn normalize_actor(actor: &str) -> String {
    let trimmed = actor.trim();
    if trimmed.is_empty() {
        DEFAULT_ACTOR.to_string()
    } else {
        trimmed.to_string()
    }
}
