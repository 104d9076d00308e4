use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};

/// Short-lived OAuth bearer token used against the backup admin service.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    /// Creates a token that never expires locally.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    /// Creates a token that expires `expires_in` after `issued_at`.
    #[must_use]
    pub fn expiring(secret: impl Into<String>, issued_at: Instant, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_at: issued_at.checked_add(expires_in),
        }
    }

    /// Returns the raw bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }

    /// Returns whether the token is still usable at `now` with `leeway` to spare.
    #[must_use]
    pub fn is_fresh_at(&self, now: Instant, leeway: Duration) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => now
                .checked_add(leeway)
                .is_some_and(|deadline| deadline < expires_at),
        }
    }
}

impl Debug for AccessToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
