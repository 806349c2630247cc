//! Authentication capability consumed by the console and media gateway.
//!
//! The session subsystem proper lives outside this service; what the
//! console needs is "who is calling, and are they staff". Callers present
//! a bearer token which is looked up in a static token table loaded from
//! the environment. Everything downstream works against [`Viewer`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;

/// The authenticated (or anonymous) caller of a request.
#[derive(Debug, Clone, Serialize)]
pub struct Viewer {
    pub id: String,
    pub username: String,
    pub is_authenticated: bool,
    pub is_staff: bool,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self {
            id: String::new(),
            username: "anonymous".to_string(),
            is_authenticated: false,
            is_staff: false,
        }
    }

    pub fn user(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            is_authenticated: true,
            is_staff: false,
        }
    }

    pub fn staff(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            is_authenticated: true,
            is_staff: true,
        }
    }
}

/// Token table mapping bearer tokens to viewers.
///
/// Loaded from `OPSCONSOLE_API_TOKENS`, a comma-separated list of
/// `token=username` or `token=username:staff` entries. An empty table
/// means every caller is anonymous.
#[derive(Clone, Default)]
pub struct AuthConfig {
    tokens: Arc<HashMap<String, Viewer>>,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let mut tokens = HashMap::new();
        if let Ok(raw) = std::env::var("OPSCONSOLE_API_TOKENS") {
            for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
                match parse_token_entry(entry.trim()) {
                    Some((token, viewer)) => {
                        tokens.insert(token, viewer);
                    }
                    None => {
                        tracing::warn!("Ignoring malformed token entry: {}", entry);
                    }
                }
            }
        }
        Self {
            tokens: Arc::new(tokens),
        }
    }

    /// No tokens configured; every caller resolves to anonymous.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build a table from explicit token/viewer pairs (for testing).
    pub fn with_viewers(pairs: Vec<(String, Viewer)>) -> Self {
        Self {
            tokens: Arc::new(pairs.into_iter().collect()),
        }
    }

    /// Resolve the caller from request headers. Never fails: unknown or
    /// missing tokens fall back to the anonymous viewer.
    pub fn authenticate(&self, headers: &HeaderMap) -> Viewer {
        let token = headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        match token {
            Some(token) => match self.tokens.get(token) {
                Some(viewer) => viewer.clone(),
                None => {
                    tracing::warn!("Unknown bearer token presented");
                    Viewer::anonymous()
                }
            },
            None => Viewer::anonymous(),
        }
    }
}

fn parse_token_entry(entry: &str) -> Option<(String, Viewer)> {
    let (token, user_spec) = entry.split_once('=')?;
    if token.is_empty() || user_spec.is_empty() {
        return None;
    }
    let (username, is_staff) = match user_spec.split_once(':') {
        Some((name, "staff")) => (name, true),
        Some(_) => return None,
        None => (user_spec, false),
    };
    let viewer = Viewer {
        id: username.to_string(),
        username: username.to_string(),
        is_authenticated: true,
        is_staff,
    };
    Some((token.to_string(), viewer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn missing_token_resolves_to_anonymous() {
        let auth = AuthConfig::disabled();
        let viewer = auth.authenticate(&HeaderMap::new());
        assert!(!viewer.is_authenticated);
        assert!(!viewer.is_staff);
    }

    #[test]
    fn known_token_resolves_to_its_viewer() {
        let auth =
            AuthConfig::with_viewers(vec![("tok-1".to_string(), Viewer::staff("1", "alice"))]);
        let viewer = auth.authenticate(&headers_with_token("tok-1"));
        assert!(viewer.is_authenticated);
        assert!(viewer.is_staff);
        assert_eq!(viewer.username, "alice");
    }

    #[test]
    fn unknown_token_resolves_to_anonymous() {
        let auth =
            AuthConfig::with_viewers(vec![("tok-1".to_string(), Viewer::user("1", "alice"))]);
        let viewer = auth.authenticate(&headers_with_token("wrong"));
        assert!(!viewer.is_authenticated);
    }

    #[test]
    fn parses_staff_marker_from_env_format() {
        let (token, viewer) = parse_token_entry("abc=carol:staff").unwrap();
        assert_eq!(token, "abc");
        assert_eq!(viewer.username, "carol");
        assert!(viewer.is_staff);

        let (_, viewer) = parse_token_entry("def=dave").unwrap();
        assert!(!viewer.is_staff);

        assert!(parse_token_entry("garbage").is_none());
        assert!(parse_token_entry("a=b:admin").is_none());
    }
}
