use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

static CODE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn code_pattern() -> &'static Regex {
    CODE_PATTERN.get_or_init(|| Regex::new(r"\b\d{6}\b").expect("code pattern is valid"))
}

/// Scan a message body for a standalone 6-digit token. Returns the first
/// match; longer digit runs do not qualify.
pub fn extract_code(body: &str) -> Option<&str> {
    code_pattern().find(body).map(|found| found.as_str())
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("two-factor code lookup failed: {0}")]
pub struct CodeLookupError(pub String);

/// Supplies one-time codes recovered from intercepted messages.
///
/// `consume_latest_code` must select and mark the message it used as a
/// single atomic unit: two in-flight checkouts may never receive the same
/// code.
#[async_trait]
pub trait CodeSource: Send + Sync {
    async fn consume_latest_code(&self) -> Result<Option<String>, CodeLookupError>;
}

/// Human-in-the-loop fallback when no intercepted code is available. The
/// checkout flow must never deadlock on missing SMS delivery, so this
/// collaborator stays injectable rather than a hardwired console read.
#[async_trait]
pub trait ManualCodePrompt: Send + Sync {
    async fn prompt_code(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use crate::twofa::extract_code;

    #[test]
    fn finds_embedded_six_digit_code() {
        assert_eq!(extract_code("Your Woolworths one-time code is 481923."), Some("481923"));
    }

    #[test]
    fn code_at_message_start_is_found() {
        assert_eq!(extract_code("123456 is your verification code"), Some("123456"));
    }

    #[test]
    fn first_of_multiple_codes_wins() {
        assert_eq!(extract_code("code 111111 or maybe 222222"), Some("111111"));
    }

    #[test]
    fn shorter_and_longer_digit_runs_are_ignored() {
        assert_eq!(extract_code("code 12345"), None);
        assert_eq!(extract_code("ref 1234567 is not a code"), None);
        assert_eq!(extract_code("no digits here"), None);
    }

    #[test]
    fn digits_embedded_in_words_are_ignored() {
        assert_eq!(extract_code("order#123456x shipped"), None);
    }
}
