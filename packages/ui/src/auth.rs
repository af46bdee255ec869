//! Session store: who is signed in, and what happens when that stops being
//! true.
//!
//! A [`Session`] is constructed once at start-up with [`Session::restore`]
//! and handed to every controller and to the [`Router`]. It owns the durable
//! session keys; nothing else writes them.
//!
//! API calls made through [`SessionClient`] report failures to
//! [`Session::handle_failure`], which signs the user out and redirects to the
//! login page when the server rejects the credential token.

use std::cell::RefCell;
use std::rc::Rc;

use api::{ApiError, ContentApi, PostQuery};
use store::session::{self, SessionStorage};
use store::{
    AccessToken, Category, FileUpload, Identity, NewPost, PersistedSession, Post, PostPatch,
    RegisteredUser, Registration, StoreError, Token, UploadedFile,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::guard::{Route, Router};

/// Authentication state. Authenticated exactly when an identity is present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub identity: Option<Identity>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Why a sign-in or registration did not complete.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not persist session: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Api(ApiError::Unauthorized) => "Incorrect username or password.".to_string(),
            AuthError::Api(e) => e.user_message(),
            AuthError::Storage(_) => "Signed in, but the session could not be saved.".to_string(),
        }
    }
}

struct Inner<S> {
    storage: S,
    state: Rc<RefCell<AuthState>>,
    router: Router,
}

/// Handle to the signed-in session. Clones share state.
pub struct Session<S> {
    inner: Rc<Inner<S>>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: SessionStorage> Session<S> {
    /// Load whatever session durable storage holds. The token is not
    /// validated here; the first rejected call will end the session.
    pub fn restore(storage: S) -> Self {
        let identity = match session::load(&storage) {
            Some(persisted) => {
                info!(user = %persisted.identity.username, "Restored session");
                Some(persisted.identity)
            }
            None => {
                // Drop any half-written leftovers
                session::clear(&storage);
                None
            }
        };
        let state = Rc::new(RefCell::new(AuthState { identity }));
        let router = Router::new(Rc::clone(&state));
        Self {
            inner: Rc::new(Inner {
                storage,
                state,
                router,
            }),
        }
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Exchange credentials for a token and sign in. The server does not
    /// return profile data here, so the identity carries only the username.
    pub async fn login<A: ContentApi>(
        &self,
        api: &A,
        username: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let token = api.login(username, password).await?;
        let identity = Identity::from_username(username);
        self.establish(identity.clone(), token)?;
        Ok(identity)
    }

    /// Create an account, then sign in with the same credentials. A failed
    /// registration never attempts the sign-in.
    pub async fn register<A: ContentApi>(
        &self,
        api: &A,
        registration: &Registration,
    ) -> Result<Identity, AuthError> {
        let created: RegisteredUser = api.register(registration).await?;
        info!(user = %created.username, "Registered account");
        let token = api
            .login(&registration.username, &registration.password)
            .await?;
        let identity = Identity {
            username: registration.username.clone(),
            nickname: created.nickname.or_else(|| registration.nickname.clone()),
            avatar: created.avatar.or_else(|| registration.avatar.clone()),
        };
        self.establish(identity.clone(), token)?;
        Ok(identity)
    }

    fn establish(&self, identity: Identity, token: AccessToken) -> Result<(), StoreError> {
        let persisted = PersistedSession {
            identity: identity.clone(),
            token: Token::new(token.access_token),
        };
        session::save(&self.inner.storage, &persisted)?;
        info!(user = %identity.username, "Signed in");
        self.inner.state.borrow_mut().identity = Some(identity);
        Ok(())
    }

    /// Sign out. Always succeeds from the caller's point of view.
    pub fn logout(&self) {
        session::clear(&self.inner.storage);
        let previous = self.inner.state.borrow_mut().identity.take();
        if let Some(identity) = previous {
            info!(user = %identity.username, "Signed out");
        }
    }

    /// React to a failed API call. A rejected token ends the session and
    /// sends the user to the login page; every other failure is left to the
    /// caller. Returns whether the session reacted.
    pub fn handle_failure(&self, err: &ApiError) -> bool {
        if !err.is_unauthorized() {
            return false;
        }
        warn!("Credential token rejected, signing out");
        self.logout();
        self.inner.router.replace(Route::Login);
        true
    }
}

/// A [`ContentApi`] that reports every failure to the session first.
///
/// Controllers are built over this wrapper so that a 401 from any call ends
/// the session in one place. `login` and `register` pass straight through:
/// a 401 there means bad credentials, not an expired session.
pub struct SessionClient<A, S> {
    api: A,
    session: Session<S>,
}

impl<A: Clone, S> Clone for SessionClient<A, S> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            session: self.session.clone(),
        }
    }
}

impl<A: ContentApi, S: SessionStorage> SessionClient<A, S> {
    pub fn new(api: A, session: Session<S>) -> Self {
        Self { api, session }
    }

    fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(e) = &result {
            self.session.handle_failure(e);
        }
        result
    }
}

impl<A: ContentApi, S: SessionStorage> ContentApi for SessionClient<A, S> {
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, ApiError> {
        let result = self.api.list_posts(query).await;
        self.observe(result)
    }

    async fn get_post(&self, id: i64) -> Result<Post, ApiError> {
        let result = self.api.get_post(id).await;
        self.observe(result)
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, ApiError> {
        let result = self.api.create_post(post).await;
        self.observe(result)
    }

    async fn update_post(&self, id: i64, patch: &PostPatch) -> Result<Post, ApiError> {
        let result = self.api.update_post(id, patch).await;
        self.observe(result)
    }

    async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        let result = self.api.delete_post(id).await;
        self.observe(result)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let result = self.api.list_categories().await;
        self.observe(result)
    }

    async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let result = self.api.create_category(name).await;
        self.observe(result)
    }

    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, ApiError> {
        self.api.login(username, password).await
    }

    async fn register(&self, registration: &Registration) -> Result<RegisteredUser, ApiError> {
        self.api.register(registration).await
    }

    async fn upload_file(&self, file: &FileUpload) -> Result<UploadedFile, ApiError> {
        let result = self.api.upload_file(file).await;
        self.observe(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use store::session::{TOKEN_KEY, USER_KEY};
    use store::MemoryStorage;

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: "hunter2".to_string(),
            nickname: Some("Ada L.".to_string()),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_login_then_logout_clears_both_keys() {
        let storage = MemoryStorage::new();
        let session = Session::restore(storage.clone());
        let api = FakeApi::new();

        let identity = session.login(&api, "ada", "pw").await.unwrap();
        assert_eq!(identity.username, "ada");
        assert!(session.is_authenticated());
        assert!(storage.get(USER_KEY).is_some());
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("token-ada"));

        session.logout();
        assert!(!session.is_authenticated());
        assert!(storage.get(USER_KEY).is_none());
        assert!(storage.get(TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_failed_login_stays_anonymous() {
        let storage = MemoryStorage::new();
        let session = Session::restore(storage.clone());
        let api = FakeApi::new();
        api.fail_next("login", ApiError::Unauthorized);

        let err = session.login(&api, "ada", "wrong").await.unwrap_err();
        assert_eq!(err.user_message(), "Incorrect username or password.");
        assert!(!session.is_authenticated());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let session = Session::restore(MemoryStorage::new());
        let api = FakeApi::new();

        let identity = session.register(&api, &registration("ada")).await.unwrap();
        assert_eq!(identity.nickname.as_deref(), Some("Ada L."));
        assert_eq!(api.calls(), vec!["register(ada)", "login(ada)"]);
        assert_eq!(session.identity(), Some(identity));
    }

    #[tokio::test]
    async fn test_failed_registration_skips_login() {
        let storage = MemoryStorage::new();
        let session = Session::restore(storage.clone());
        let api = FakeApi::new();
        api.fail_next(
            "register",
            ApiError::Rejected {
                status: 400,
                detail: "Username already registered".to_string(),
            },
        );

        let err = session.register(&api, &registration("ada")).await.unwrap_err();
        assert_eq!(err.user_message(), "Username already registered");
        assert_eq!(api.calls(), vec!["register(ada)"]);
        assert!(!session.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_restore_complete_session() {
        let storage = MemoryStorage::new();
        session::save(
            &storage,
            &PersistedSession {
                identity: Identity::from_username("ada"),
                token: Token::new("t"),
            },
        )
        .unwrap();

        let session = Session::restore(storage);
        assert_eq!(session.identity().unwrap().username, "ada");
    }

    #[test]
    fn test_restore_lone_key_is_anonymous_and_cleared() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "orphan").unwrap();

        let session = Session::restore(storage.clone());
        assert!(!session.is_authenticated());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_ends_session_and_redirects() {
        let storage = MemoryStorage::new();
        let session = Session::restore(storage.clone());
        let fake = FakeApi::new();
        session.login(&fake, "ada", "pw").await.unwrap();
        session.router().navigate(Route::MyPosts);

        let client = SessionClient::new(fake.clone(), session.clone());
        fake.fail_next("list_posts", ApiError::Unauthorized);
        let err = client.list_posts(&PostQuery::default()).await.unwrap_err();

        assert_eq!(err, ApiError::Unauthorized);
        assert!(!session.is_authenticated());
        assert!(storage.is_empty());
        assert_eq!(session.router().current(), Route::Login);
    }

    #[tokio::test]
    async fn test_other_failures_keep_session() {
        let session = Session::restore(MemoryStorage::new());
        let fake = FakeApi::new();
        session.login(&fake, "ada", "pw").await.unwrap();

        let client = SessionClient::new(fake.clone(), session.clone());
        fake.fail_next("get_post", ApiError::Server { status: 500 });
        assert!(client.get_post(1).await.is_err());
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_handle_failure_ignores_other_errors() {
        let session = Session::restore(MemoryStorage::new());
        assert!(!session.handle_failure(&ApiError::NotFound));
        assert!(session.handle_failure(&ApiError::Unauthorized));
    }
}
