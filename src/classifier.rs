//! C6: Failure Classifier — inspects combined error/output text to tag a
//! provider failure as transient, permanent, or not a provider failure at
//! all (§4.6).

/// Retry disposition associated with a recognized tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Transient,
    Permanent,
}

/// A recognized provider-failure family, in first-match-wins priority order.
const FAMILIES: &[(&str, Disposition, &[&str])] = &[
    (
        "rate_limit",
        Disposition::Transient,
        &["rate limit", "rate-limited", "too many requests", "429"],
    ),
    (
        "quota",
        Disposition::Permanent,
        &["usage limit", "quota", "daily limit", "weekly limit", "monthly limit"],
    ),
    (
        "billing",
        Disposition::Permanent,
        &["billing", "payment", "insufficient credits"],
    ),
    (
        "model_unavailable",
        Disposition::Permanent,
        &["model", "not exist", "not have access", "unknown model"],
    ),
    (
        "provider_unavailable",
        Disposition::Transient,
        &["temporarily unavailable", "service unavailable", "overloaded"],
    ),
    (
        "auth",
        Disposition::Permanent,
        &["auth", "unauthorized", "forbidden", "login required"],
    ),
];

/// Classifies the concatenation of `error` and `output`, returning the empty
/// string when nothing recognizable matched (treated as a plain task
/// failure, not a provider failure).
pub fn classify(error: &str, output: &str) -> String {
    let haystack = format!("{error} {output}").to_lowercase();
    for (tag, _, keywords) in FAMILIES {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return tag.to_string();
        }
    }
    String::new()
}

/// Whether `tag` (as produced by [`classify`]) should be retried in-loop
/// without burning an attempt.
pub fn is_transient(tag: &str) -> bool {
    FAMILIES
        .iter()
        .find(|(name, _, _)| *name == tag)
        .map(|(_, disposition, _)| *disposition == Disposition::Transient)
        .unwrap_or(false)
}
