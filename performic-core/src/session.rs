//! Session Tokens
//!
//! Every orchestrated run and every GPU session gets an opaque token. Listeners
//! compare their token against the current one before acting, so notifications
//! from a superseded session can never be attributed to a newer one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Allocate a token that has never been handed out before in this process
    pub fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logs and reports
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_increasing() {
        let a = SessionToken::next();
        let b = SessionToken::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_display() {
        let token = SessionToken(7);
        assert_eq!(token.to_string(), "session-7");
    }
}
