// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

/// Credential store the view controller reads from; it never manages
/// sign-in itself.
pub trait SessionContext {
    fn token(&self) -> Option<String>;
    fn role(&self) -> Option<String>;
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySession {
    token: Option<String>,
    role: Option<String>,
}

impl MemorySession {
    pub fn new(token: impl Into<String>, role: Option<&str>) -> Self {
        Self {
            token: Some(token.into()),
            role: role.map(ToOwned::to_owned),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl SessionContext for MemorySession {
    fn token(&self) -> Option<String> {
        self.token.clone().filter(|token| !token.trim().is_empty())
    }

    fn role(&self) -> Option<String> {
        self.role.clone()
    }

    fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.role = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySession, SessionContext};

    #[test]
    fn blank_token_counts_as_missing() {
        assert_eq!(MemorySession::new("  ", None).token(), None);
        assert_eq!(MemorySession::signed_out().token(), None);
    }

    #[test]
    fn clear_drops_token_and_role() -> anyhow::Result<()> {
        let mut session = MemorySession::new("abc", Some("admin"));
        assert_eq!(session.role().as_deref(), Some("admin"));
        session.clear()?;
        assert_eq!(session, MemorySession::signed_out());
        Ok(())
    }
}
