//! Session lookup.
//!
//! Full authentication is out of scope. A request is signed in when it
//! carries a bearer token that a [`SessionResolver`] maps to an owner.

use crate::config::ConfigError;
use crate::types::OwnerId;
use std::collections::HashMap;
use std::fmt;

/// Source of the current user's identity
pub trait SessionProvider: Send + Sync {
    /// The signed-in owner, or `None` if nobody is signed in
    fn current_owner_id(&self) -> Option<OwnerId>;
}

/// Maps a bearer token to the owner it belongs to
pub trait SessionResolver: Send + Sync {
    /// The owner for `token`, or `None` if the token is unknown
    fn resolve(&self, token: &str) -> Option<OwnerId>;
}

/// Session with a fixed owner, for in-process callers
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSession {
    owner: Option<OwnerId>,
}

impl FixedSession {
    /// Signed in as `owner`
    #[must_use]
    pub const fn signed_in(owner: OwnerId) -> Self {
        Self { owner: Some(owner) }
    }

    /// Nobody signed in
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { owner: None }
    }
}

impl SessionProvider for FixedSession {
    fn current_owner_id(&self) -> Option<OwnerId> {
        self.owner
    }
}

/// The session of one HTTP request, resolved from its bearer token
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSession {
    owner: Option<OwnerId>,
}

impl RequestSession {
    /// Resolve an optional bearer token
    #[must_use]
    pub fn from_token(token: Option<&str>, resolver: &dyn SessionResolver) -> Self {
        Self {
            owner: token.and_then(|token| resolver.resolve(token)),
        }
    }
}

impl SessionProvider for RequestSession {
    fn current_owner_id(&self) -> Option<OwnerId> {
        self.owner
    }
}

/// Token table loaded from configuration
///
/// Parsed from `token=owner-uuid` pairs separated by commas.
#[derive(Clone, Default)]
pub struct StaticSessionResolver {
    tokens: HashMap<String, OwnerId>,
}

impl StaticSessionResolver {
    /// Resolver over the given token/owner pairs
    #[must_use]
    pub fn new(pairs: impl IntoIterator<Item = (String, OwnerId)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }

    /// Parse `token=owner-uuid[,token=owner-uuid...]`
    ///
    /// Blank entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an entry without `=`, with an empty token,
    /// or with an owner that is not a UUID.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut tokens = HashMap::new();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, owner) = entry.split_once('=').ok_or_else(|| {
                ConfigError::invalid("HELPDESK_SESSIONS", format!("expected token=owner, got {entry:?}"))
            })?;

            let token = token.trim();
            if token.is_empty() {
                return Err(ConfigError::invalid("HELPDESK_SESSIONS", "empty token"));
            }

            let owner: OwnerId = owner
                .parse()
                .map_err(|e| ConfigError::invalid("HELPDESK_SESSIONS", format!("{e}")))?;
            tokens.insert(token.to_string(), owner);
        }

        Ok(Self { tokens })
    }

    /// Number of configured tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl SessionResolver for StaticSessionResolver {
    fn resolve(&self, token: &str) -> Option<OwnerId> {
        self.tokens.get(token).copied()
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for StaticSessionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSessionResolver")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}
