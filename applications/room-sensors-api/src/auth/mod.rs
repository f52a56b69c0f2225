pub mod session;

pub use session::SessionIdentity;

use axum::http::HeaderMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Header oauth2-proxy uses to forward the signed-in user's email.
pub const FORWARDED_EMAIL_HEADER: &str = "x-auth-request-email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

/// Who is making a request, if anyone.
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Email forwarded by oauth2-proxy once its login completed.
pub fn forwarded_email(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(FORWARDED_EMAIL_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|e| !e.is_empty())
}

/// Emails allowed to see the data, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    emails: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .filter_map(|e| normalize(e.as_ref()))
            .collect();
        Self { emails }
    }

    pub fn is_allowed(&self, identity: Option<&str>) -> bool {
        identity
            .and_then(normalize)
            .is_some_and(|email| self.emails.contains(&email))
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

fn normalize(email: &str) -> Option<String> {
    let email = email.trim();
    (!email.is_empty()).then(|| email.to_lowercase())
}

/// Binary authorization decision for a request.
#[derive(Clone)]
pub struct AuthGate {
    allow_list: AllowList,
    identity: Arc<dyn IdentityProvider>,
}

impl AuthGate {
    pub fn new(allow_list: AllowList, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            allow_list,
            identity,
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// The caller's identity if it is on the allow-list.
    pub fn authorize(&self, headers: &HeaderMap) -> Option<Identity> {
        let identity = self.identity.authenticate(headers);
        if self
            .allow_list
            .is_allowed(identity.as_ref().map(|i| i.email.as_str()))
        {
            identity
        } else {
            debug!(email = ?identity.map(|i| i.email), "request not authorized");
            None
        }
    }
}
