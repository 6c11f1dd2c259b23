//! Explicit API credentials.
//!
//! The credential is injected where it is used instead of being read from
//! ambient global storage; nothing in the engine reaches for a global token.

use std::fmt;

/// Bearer token for the catalog service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// The token never appears in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let credentials = Credentials::bearer("secret-token");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("secret-token"));
        assert_eq!(credentials.token(), "secret-token");
    }
}
