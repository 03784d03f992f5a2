//! C4: Model Router — maps a free-form model hint to a `(provider, model)`
//! pair and computes the one-shot fallback pair (§4.4).

/// Case-insensitive, trimmed-hint routing table.
pub fn route(hint: &str) -> (String, String) {
    let trimmed = hint.trim();
    let lower = trimmed.to_lowercase();

    if trimmed.is_empty() {
        return ("codex".to_string(), String::new());
    }
    if lower.contains("opus") {
        return ("claude".to_string(), "opus".to_string());
    }
    if lower.contains("sonnet") {
        return ("claude".to_string(), "sonnet".to_string());
    }
    if lower.contains("haiku") {
        return ("claude".to_string(), "haiku".to_string());
    }
    if let Some(rest) = lower.strip_prefix("claude:") {
        return ("claude".to_string(), normalize_claude_model(rest));
    }
    if lower.starts_with("claude") {
        return ("claude".to_string(), normalize_claude_model(&lower));
    }
    if lower.starts_with("codex") {
        let model = if lower == "codex" { String::new() } else { trimmed.to_string() };
        return ("codex".to_string(), model);
    }
    if lower.starts_with("gpt") || lower.starts_with('o') {
        return ("codex".to_string(), trimmed.to_string());
    }
    ("codex".to_string(), String::new())
}

/// Strips a leading `claude-` from a model name, e.g. `claude-3-5-sonnet` →
/// `3-5-sonnet`.
fn normalize_claude_model(model: &str) -> String {
    model.strip_prefix("claude-").unwrap_or(model).to_string()
}

/// One-shot fallback selection, applying a cost guardrail that never routes
/// a fallback to `opus`.
pub fn select_fallback(provider: &str, _model: &str) -> Option<(String, String)> {
    match provider {
        "codex" => Some(("claude".to_string(), "sonnet".to_string())),
        "claude" => Some(("codex".to_string(), String::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hint_routes_to_codex() {
        assert_eq!(route(""), ("codex".to_string(), String::new()));
        assert_eq!(route("   "), ("codex".to_string(), String::new()));
    }

    #[test]
    fn opus_sonnet_haiku_route_to_claude() {
        assert_eq!(route("OPUS"), ("claude".to_string(), "opus".to_string()));
        assert_eq!(route("use sonnet please"), ("claude".to_string(), "sonnet".to_string()));
        assert_eq!(route("Haiku"), ("claude".to_string(), "haiku".to_string()));
    }

    #[test]
    fn claude_colon_prefix_normalizes() {
        assert_eq!(
            route("claude:claude-3-5-sonnet"),
            ("claude".to_string(), "3-5-sonnet".to_string())
        );
    }

    #[test]
    fn claude_prefix_without_colon_normalizes() {
        assert_eq!(
            route("claude-3-opus-20240229"),
            ("claude".to_string(), "3-opus-20240229".to_string())
        );
    }

    #[test]
    fn bare_codex_has_no_model() {
        assert_eq!(route("codex"), ("codex".to_string(), String::new()));
        assert_eq!(route("CODEX"), ("codex".to_string(), String::new()));
    }

    #[test]
    fn codex_with_suffix_keeps_hint_as_model() {
        assert_eq!(route("codex-mini"), ("codex".to_string(), "codex-mini".to_string()));
    }

    #[test]
    fn gpt_and_o_prefixes_route_to_codex() {
        assert_eq!(route("gpt-4o"), ("codex".to_string(), "gpt-4o".to_string()));
        assert_eq!(route("o3-mini"), ("codex".to_string(), "o3-mini".to_string()));
    }

    #[test]
    fn unrecognized_hint_falls_back_to_codex_default() {
        assert_eq!(route("mystery-model"), ("codex".to_string(), String::new()));
    }

    #[test]
    fn fallback_from_codex_is_claude_sonnet_never_opus() {
        assert_eq!(select_fallback("codex", ""), Some(("claude".to_string(), "sonnet".to_string())));
    }

    #[test]
    fn fallback_from_claude_is_codex_default() {
        assert_eq!(select_fallback("claude", "opus"), Some(("codex".to_string(), String::new())));
    }

    #[test]
    fn fallback_from_unknown_provider_is_none() {
        assert_eq!(select_fallback("bespoke", ""), None);
    }
}
