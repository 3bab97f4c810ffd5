/// Identity as reported by the sign-in provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub display_name: Option<String>,
}

/// An authorized user. Handlers receive this explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    email: String,
    display_name: String,
}

impl Session {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Owner key for per-user collections such as time entries.
    pub fn user_id(&self) -> &str {
        &self.email
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not signed in: no user email configured")]
    SignedOut,

    #[error("Access denied: email not authorized.")]
    NotAllowed { email: String },
}

/// Exact-match allow-list of email addresses.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    allowed: Vec<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AccessPolicy { allowed: allowed.into_iter().map(Into::into).collect() }
    }

    /// Grants a session only to a listed identity. Anyone else is signed out.
    pub fn authorize(&self, identity: Option<Identity>) -> Result<Session, AuthError> {
        let identity = identity.ok_or(AuthError::SignedOut)?;
        if !self.allowed.iter().any(|a| *a == identity.email) {
            tracing::warn!(email = %identity.email, "Rejected sign-in from non-listed identity");
            return Err(AuthError::NotAllowed { email: identity.email });
        }
        let display_name = identity
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| identity.email.clone());
        tracing::debug!(email = %identity.email, "Session granted");
        Ok(Session { email: identity.email, display_name })
    }
}
