//! # Session persistence: identity and credential token in durable storage
//!
//! The client remembers who is signed in across restarts by writing two keys
//! into a [`SessionStorage`] backend:
//!
//! | Key | Value |
//! |-----|-------|
//! | [`USER_KEY`] (`"user"`) | JSON-serialised [`Identity`] |
//! | [`TOKEN_KEY`] (`"access_token"`) | the raw bearer token |
//!
//! The two keys form one unit. [`save`] writes both or neither, [`clear`]
//! removes both, and readers ([`load`], [`load_token`]) treat a lone key (or an
//! identity that no longer parses) as "no session" instead of failing.
//!
//! ## [`SessionStorage`] trait
//!
//! A synchronous string key-value interface (`get`/`set`/`remove`), the shape
//! of browser local storage. Implementations live in sibling modules
//! ([`crate::memory`], [`crate::file_store`]).
//!
//! ## Ownership
//!
//! Only the session store in the `ui` crate writes through this module. The
//! HTTP client reads the token with [`load_token`] on every request.

use std::fmt;

use tracing::warn;

use crate::error::StoreError;
use crate::models::Identity;

/// Storage key holding the serialised identity.
pub const USER_KEY: &str = "user";
/// Storage key holding the raw bearer token.
pub const TOKEN_KEY: &str = "access_token";

/// Durable string key-value storage.
pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// An opaque bearer token. `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// The persisted identity and token pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedSession {
    pub identity: Identity,
    pub token: Token,
}

/// Load the persisted session. Returns `None` unless both keys are present
/// and the identity parses.
pub fn load<S: SessionStorage + ?Sized>(storage: &S) -> Option<PersistedSession> {
    let user = storage.get(USER_KEY);
    let token = storage.get(TOKEN_KEY);
    match (user, token) {
        (Some(user), Some(token)) if !token.is_empty() => {
            match serde_json::from_str::<Identity>(&user) {
                Ok(identity) => Some(PersistedSession {
                    identity,
                    token: Token(token),
                }),
                Err(e) => {
                    warn!("Discarding unreadable stored identity: {}", e);
                    None
                }
            }
        }
        (None, None) => None,
        _ => {
            warn!("Stored session is incomplete, treating as signed out");
            None
        }
    }
}

/// The bearer token, but only if it belongs to a complete stored session.
pub fn load_token<S: SessionStorage + ?Sized>(storage: &S) -> Option<Token> {
    storage.get(USER_KEY)?;
    storage
        .get(TOKEN_KEY)
        .filter(|token| !token.is_empty())
        .map(Token)
}

/// Write both keys. If the second write fails the first is rolled back so
/// storage never holds half a session.
pub fn save<S: SessionStorage + ?Sized>(
    storage: &S,
    session: &PersistedSession,
) -> Result<(), StoreError> {
    let user = serde_json::to_string(&session.identity)?;
    storage.set(TOKEN_KEY, session.token.expose())?;
    if let Err(e) = storage.set(USER_KEY, &user) {
        clear(storage);
        return Err(e);
    }
    Ok(())
}

/// Remove both keys. Failures are logged; a key that cannot be removed is
/// still ignored by [`load`] once its partner is gone.
pub fn clear<S: SessionStorage + ?Sized>(storage: &S) {
    for key in [USER_KEY, TOKEN_KEY] {
        if let Err(e) = storage.remove(key) {
            warn!("Failed to remove stored {}: {}", key, e);
        }
    }
}
