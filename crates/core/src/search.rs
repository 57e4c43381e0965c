//! Search-text handling.

/// Split free-form search text into name tokens.
///
/// - Splits on whitespace and commas.
/// - Trims surrounding punctuation other than `-`, `_` and `.`.
/// - Drops empty tokens and repeated tokens, keeping first-seen order.
///
/// An empty result means the caller should not filter at all.
///
/// ```
/// use catalog_core::search::tokenize;
/// assert_eq!(tokenize("Widget, Gadget"), vec!["Widget", "Gadget"]);
/// assert!(tokenize("  , ").is_empty());
/// ```
pub fn tokenize(search_text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for raw in search_text.split(|c: char| c.is_whitespace() || c == ',') {
        let token = raw.trim_matches(|c: char| !c.is_alphanumeric() && !"-_.".contains(c));
        if token.is_empty() || tokens.iter().any(|t| t == token) {
            continue;
        }
        tokens.push(token.to_string());
    }
    tokens
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
