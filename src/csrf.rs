//! Double-submit CSRF tokens.
//!
//! A fresh token is minted for every page render and embedded in the markup.
//! The client echoes it back in the `X-CSRF-Token` header and in the
//! `csrfToken` form field; a request is accepted when both are present and
//! equal. Tokens are not bound to a session and never expire, so anyone able
//! to read the page can forge a valid pair.

use std::fmt;
use subtle::ConstantTimeEq;

/// Header carrying the token on upload requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Multipart form field carrying the token on upload requests.
pub const CSRF_FORM_FIELD: &str = "csrfToken";

/// Name of the `<meta>` tag the token is rendered into.
pub const CSRF_META_NAME: &str = "csrf-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Mint a new random token (UUID v4).
    pub fn issue() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the token back out of rendered page markup.
    pub fn from_page(html: &str) -> Option<Self> {
        let needle = format!("name=\"{CSRF_META_NAME}\"");
        let tag_start = html.find(&needle)?;
        let tag_open = html[..tag_start].rfind('<')?;
        let tag_end = tag_start + html[tag_start..].find('>')?;
        let tag = &html[tag_open..tag_end];

        let content_start = tag.find("content=\"")? + "content=\"".len();
        let content_len = tag[content_start..].find('"')?;
        let value = &tag[content_start..content_start + content_len];

        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }
}

impl From<String> for CsrfToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accept only when both copies are present, non-empty and identical.
pub fn tokens_match(header: Option<&str>, form: Option<&str>) -> bool {
    match (header, form) {
        (Some(h), Some(f)) => !h.is_empty() && secure_compare(h, f),
        _ => false,
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
