/// Token classification: literal words, parameter placeholders, regex fragments.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Plain word, compared textually.
    Literal,
    /// `{name}` placeholder, alone or embedded in a word.
    Parameter,
    /// Contains regex metacharacters.
    Fuzzy,
}

/// Characters and escapes that may appear in a word without making it a
/// regex fragment. Order matters: escaped forms go before their bare forms.
const REGULAR_NOISE: &[&str] = &[
    "/", "\"", "\\^", "'", "-", "^", "_", ":", ",", "\\.", "\\|", "(", ")",
];

/// Classify a single whitespace-free piece of text.
///
/// Ambiguous input falls back to [`TokenKind::Fuzzy`].
pub fn classify(token: &str) -> TokenKind {
    if is_placeholder(token) {
        return TokenKind::Parameter;
    }
    if token == "*" || is_regular(token) {
        TokenKind::Literal
    } else {
        TokenKind::Fuzzy
    }
}

/// True when the token carries no regex syntax.
pub fn is_regular(token: &str) -> bool {
    if is_alphanumeric(token) {
        return true;
    }
    let candidate = REGULAR_NOISE
        .iter()
        .fold(token.to_string(), |acc, noise| acc.replace(noise, ""));
    candidate.is_empty() || is_alphanumeric(&candidate)
}

fn is_alphanumeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(char::is_alphanumeric)
}

fn is_placeholder(token: &str) -> bool {
    match (token.find('{'), token.rfind('}')) {
        (Some(open), Some(close)) => open < close,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_are_literal() {
        assert_eq!(classify("show"), TokenKind::Literal);
        assert_eq!(classify("GigabitEthernet1/0/1"), TokenKind::Literal);
        assert_eq!(classify("advertised-routes"), TokenKind::Literal);
        assert_eq!(classify("\"quoted\""), TokenKind::Literal);
        assert_eq!(classify("*"), TokenKind::Literal);
    }

    #[test]
    fn placeholders_are_parameters() {
        assert_eq!(classify("{vrf}"), TokenKind::Parameter);
        assert_eq!(classify("/api/v1/interface/{interface}"), TokenKind::Parameter);
        assert_eq!(classify("}x{"), TokenKind::Fuzzy);
    }

    #[test]
    fn regex_syntax_is_fuzzy() {
        assert_eq!(classify(".*"), TokenKind::Fuzzy);
        assert_eq!(classify("int(erface)?"), TokenKind::Fuzzy);
        assert_eq!(classify("a|b"), TokenKind::Fuzzy);
        assert_eq!(classify("10.1.1.1"), TokenKind::Fuzzy);
    }

    #[test]
    fn escaped_metacharacters_stay_regular() {
        assert!(is_regular("a\\|b"));
        assert!(is_regular("snapshot\\.get"));
        assert!(is_regular("\\^start"));
        assert!(!is_regular("a.b"));
    }
}
