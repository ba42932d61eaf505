//! Origin allow-list for cross-frame messaging
//!
//! The browser original posted to `*` and accepted messages from anywhere.
//! Here both the send and the receive path validate against an explicit
//! policy; the wildcard behavior still exists but only as an opt-in
//! constructor, never as a default.

use std::collections::HashSet;

/// Set of origins an endpoint is willing to exchange messages with.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: HashSet<String>,
    allow_any: bool,
}

impl OriginPolicy {
    /// Policy trusting exactly the given origins.
    pub fn allow_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: origins.into_iter().map(Into::into).collect(),
            allow_any: false,
        }
    }

    /// Accept every origin. Demo-only; matches the original `'*'` target.
    pub fn any() -> Self {
        Self {
            allowed: HashSet::new(),
            allow_any: true,
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allow_any || self.allowed.contains(origin)
    }

    pub fn is_wildcard(&self) -> bool {
        self.allow_any
    }
}
