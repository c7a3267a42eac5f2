//! Capability types
//!
//! A capability constrains a token to a single HTTP action. The `action`
//! string has the form `METHOD:/path`: an uppercase method, a single `:`
//! delimiter, and a literal path. The path may itself contain `:` characters;
//! only the first colon delimits. `limit` bounds how many times the token may
//! be consumed, and `subcap` is an opaque list carried verbatim for
//! downstream consumers — the verifier never interprets it.

use crate::error::{EkeyError, Result};
use serde::{Deserialize, Serialize};

/// Default number of admissible consumptions of a token
pub const DEFAULT_LIMIT: u32 = 1;

/// Capability governing what a token authorizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Action in `METHOD:/path` form
    pub action: String,

    /// Optional human-readable label, opaque to the verifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Number of admissible consumptions (1..=10)
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Opaque sub-capability strings, carried verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcap: Option<Vec<String>>,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Capability {
    /// Create a capability for a single action with the default limit
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            scope: None,
            limit: DEFAULT_LIMIT,
            subcap: None,
        }
    }

    /// Set the human-readable scope label
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the consumption limit
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Attach sub-capability strings
    pub fn with_subcap(mut self, subcap: Vec<String>) -> Self {
        self.subcap = Some(subcap);
        self
    }

    /// Parse `action` into `(method, path)`
    ///
    /// The first `:` is the delimiter. The method must be non-empty uppercase
    /// ASCII letters; the path must begin with `/` and contain no whitespace.
    pub fn parse_action(&self) -> Result<(&str, &str)> {
        parse_action(&self.action)
    }
}

/// Parse an action string into `(method, path)`, validating its shape
pub fn parse_action(action: &str) -> Result<(&str, &str)> {
    let (method, path) = action
        .split_once(':')
        .ok_or_else(|| EkeyError::Malformed(format!("action '{}' has no ':' delimiter", action)))?;

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(EkeyError::Malformed(format!(
            "action method '{}' must be non-empty uppercase ASCII letters",
            method
        )));
    }

    if !path.starts_with('/') {
        return Err(EkeyError::Malformed(format!(
            "action path '{}' must begin with '/'",
            path
        )));
    }

    if path.contains(char::is_whitespace) {
        return Err(EkeyError::Malformed(
            "action path must not contain whitespace".into(),
        ));
    }

    Ok((method, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_valid() {
        let cap = Capability::new("POST:/payments");
        let (method, path) = cap.parse_action().unwrap();
        assert_eq!(method, "POST");
        assert_eq!(path, "/payments");
    }

    #[test]
    fn test_parse_action_path_may_contain_colons() {
        // Only the first ':' delimits
        let cap = Capability::new("GET:/objects/ns:item:42");
        let (method, path) = cap.parse_action().unwrap();
        assert_eq!(method, "GET");
        assert_eq!(path, "/objects/ns:item:42");
    }

    #[test]
    fn test_parse_action_rejects_missing_delimiter() {
        assert!(parse_action("POST/payments").is_err());
    }

    #[test]
    fn test_parse_action_rejects_empty_method() {
        assert!(parse_action(":/payments").is_err());
    }

    #[test]
    fn test_parse_action_rejects_lowercase_method() {
        assert!(parse_action("post:/payments").is_err());
        assert!(parse_action("Post:/payments").is_err());
    }

    #[test]
    fn test_parse_action_rejects_non_letter_method() {
        assert!(parse_action("P0ST:/payments").is_err());
    }

    #[test]
    fn test_parse_action_rejects_relative_path() {
        assert!(parse_action("GET:payments").is_err());
        assert!(parse_action("GET:").is_err());
    }

    #[test]
    fn test_parse_action_rejects_whitespace_in_path() {
        assert!(parse_action("GET:/pay ments").is_err());
        assert!(parse_action("GET:/payments\t").is_err());
    }

    #[test]
    fn test_default_limit_on_deserialize() {
        let cap: Capability = serde_json::from_str(r#"{"action":"GET:/a"}"#).unwrap();
        assert_eq!(cap.limit, DEFAULT_LIMIT);
        assert!(cap.scope.is_none());
        assert!(cap.subcap.is_none());
    }

    #[test]
    fn test_subcap_round_trip_verbatim() {
        let cap = Capability::new("POST:/payments")
            .with_limit(3)
            .with_subcap(vec!["refund".into(), "void".into()]);

        let json = serde_json::to_string(&cap).unwrap();
        let restored: Capability = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, cap);
        assert_eq!(restored.subcap.unwrap(), vec!["refund", "void"]);
    }
}
