//! The shared application state: authentication and list membership.
//!
//! Everything a page reads or mutates goes through [`AppState`]: an
//! explicitly constructed context object, built once at startup and handed by
//! reference to every consumer. It is the single place that talks to the
//! remote service for state-changing calls. Remote failures never escape as
//! errors; they land in one user-facing error string.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::models::{Account, Movie, UserIdentity};
use crate::store::{SessionStore, ACCOUNT_ID_KEY, SESSION_ID_KEY, USER_KEY};
use crate::tmdb::TmdbApi;

/// Authentication lifecycle. `Restoring` only appears while a persisted
/// session is being loaded at startup; a 401 during any authenticated call
/// drops `Authenticated` back to `Anonymous`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Uninitialized,
    Restoring,
    Anonymous,
    Authenticated(Session),
}

/// An established remote session. The account arrives one step after the
/// session id (hydration resolves it), so it is optional here; membership
/// mutations require it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub account: Option<Account>,
}

pub struct AppState {
    tmdb: Arc<dyn TmdbApi>,
    store: Arc<dyn SessionStore>,
    auth: AuthState,
    favorites: Vec<Movie>,
    watchlist: Vec<Movie>,
    loading: bool,
    error: Option<String>,
}

impl AppState {
    pub fn new(tmdb: Arc<dyn TmdbApi>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            tmdb,
            store,
            auth: AuthState::Uninitialized,
            favorites: Vec::new(),
            watchlist: Vec::new(),
            loading: false,
            error: None,
        }
    }

    /// Restore a persisted session at startup. Runs to completion (success
    /// or failure) before contingent UI should render; `is_loading` covers
    /// the whole pass.
    pub async fn restore(&mut self) {
        self.auth = AuthState::Restoring;
        self.loading = true;

        match self.store.get(SESSION_ID_KEY) {
            Some(session_id) => {
                let account = self.restore_account();
                info!("Restored persisted session, hydrating lists");
                self.auth = AuthState::Authenticated(Session {
                    session_id: session_id.clone(),
                    account,
                });
                self.fetch_user_lists(&session_id).await;
            }
            None => {
                debug!("No persisted session found");
                self.auth = AuthState::Anonymous;
                self.loading = false;
            }
        }
    }

    fn restore_account(&self) -> Option<Account> {
        let id = self
            .store
            .get(ACCOUNT_ID_KEY)
            .and_then(|v| v.parse::<i32>().ok())?;
        let identity: UserIdentity = self
            .store
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())?;
        Some(Account {
            id,
            username: identity.username,
            name: identity.name,
        })
    }

    /// Run the login handshake: request a token, validate it against the
    /// credentials, exchange it for a session, persist, then hydrate. Each
    /// step feeds the next; the first failure aborts with its user-facing
    /// cause, and nothing is persisted before session creation.
    pub async fn login(&mut self, username: &str, password: &str) {
        self.loading = true;
        self.error = None;

        let session_id = match self.login_handshake(username, password).await {
            Ok(id) => id,
            Err(message) => {
                self.error = Some(message);
                self.loading = false;
                return;
            }
        };

        self.store.set(SESSION_ID_KEY, &session_id);
        self.auth = AuthState::Authenticated(Session {
            session_id: session_id.clone(),
            account: None,
        });
        info!("Session established, fetching user lists");
        self.fetch_user_lists(&session_id).await;
        self.loading = false;
    }

    async fn login_handshake(&self, username: &str, password: &str) -> Result<String, String> {
        debug!("Creating request token");
        let request_token = self.tmdb.create_request_token().await.map_err(|err| {
            warn!("Request token creation error: {}", err);
            err.remote_message().map(str::to_string).unwrap_or_else(|| {
                "Failed to create request token. Please check your internet connection and try again."
                    .to_string()
            })
        })?;

        debug!("Validating token with credentials");
        let validated = self
            .tmdb
            .validate_with_login(username, password, &request_token)
            .await
            .map_err(|err| {
                warn!("Login validation error: {}", err);
                err.remote_message().map(str::to_string).unwrap_or_else(|| {
                    if err.is_unauthorized() {
                        "Authentication failed. Please check your username and password."
                            .to_string()
                    } else {
                        "Invalid username or password".to_string()
                    }
                })
            })?;

        debug!("Creating session with validated token");
        self.tmdb.create_session(&validated).await.map_err(|err| {
            warn!("Session creation error: {}", err);
            err.remote_message().map(str::to_string).unwrap_or_else(|| {
                "Failed to create session. Your login session may have expired.".to_string()
            })
        })
    }

    /// Hydrate account identity and both lists for an authenticated session.
    /// A 401 here means the session is invalid and forces a logout; other
    /// failures are reported but leave the session standing.
    pub async fn fetch_user_lists(&mut self, session_id: &str) {
        self.loading = true;
        match self.hydrate(session_id).await {
            Ok(()) => self.error = None,
            Err(err) => {
                warn!("Error fetching user data: {}", err);
                if err.is_unauthorized() {
                    self.logout().await;
                    self.error =
                        Some("Your session has expired. Please login again.".to_string());
                } else {
                    self.error = Some(match err {
                        ApiError::Timeout => {
                            "Connection timed out while fetching your data. Please check your internet connection."
                                .to_string()
                        }
                        ApiError::Offline => {
                            "You appear to be offline. Please check your internet connection."
                                .to_string()
                        }
                        other => other.to_string(),
                    });
                }
            }
        }
        self.loading = false;
    }

    async fn hydrate(&mut self, session_id: &str) -> Result<(), ApiError> {
        let account = self.tmdb.fetch_account(session_id).await?;
        info!("Resolved account {} ({})", account.id, account.username);

        self.store.set(ACCOUNT_ID_KEY, &account.id.to_string());
        let identity = UserIdentity {
            username: account.username.clone(),
            name: account.display_name().to_string(),
        };
        if let Ok(raw) = serde_json::to_string(&identity) {
            self.store.set(USER_KEY, &raw);
        }

        let account_id = account.id;
        if let AuthState::Authenticated(session) = &mut self.auth {
            session.account = Some(account);
        }

        let (favorites, watchlist) = tokio::join!(
            self.tmdb.fetch_favorite_movies(account_id, session_id),
            self.tmdb.fetch_watchlist_movies(account_id, session_id),
        );
        self.favorites = favorites?;
        self.watchlist = watchlist?;
        Ok(())
    }

    /// Best-effort remote teardown, then unconditionally drop local state
    /// and the persisted record.
    pub async fn logout(&mut self) {
        if let AuthState::Authenticated(session) = &self.auth {
            if let Err(err) = self.tmdb.delete_session(&session.session_id).await {
                warn!("Error deleting session: {}", err);
            }
        }
        self.auth = AuthState::Anonymous;
        self.favorites.clear();
        self.watchlist.clear();
        self.store.remove(SESSION_ID_KEY);
        self.store.remove(ACCOUNT_ID_KEY);
        self.store.remove(USER_KEY);
        info!("Logged out");
    }

    fn authenticated_account(&self) -> Option<(String, i32)> {
        match &self.auth {
            AuthState::Authenticated(session) => session
                .account
                .as_ref()
                .map(|a| (session.session_id.clone(), a.id)),
            _ => None,
        }
    }

    /// Membership toggles confirm the remote write before touching local
    /// state, and never let a duplicate id into a collection.
    pub async fn add_to_favorites(&mut self, movie: &Movie) {
        let Some((session_id, account_id)) = self.authenticated_account() else {
            self.error = Some("You must be logged in to add favorites".to_string());
            return;
        };
        match self
            .tmdb
            .set_favorite(account_id, &session_id, movie.id, true)
            .await
        {
            Ok(()) => {
                if !self.is_favorite(movie.id) {
                    self.favorites.push(movie.clone());
                }
            }
            Err(err) => {
                warn!("Error adding to favorites: {}", err);
                self.error = Some(err.to_string());
            }
        }
    }

    pub async fn remove_from_favorites(&mut self, movie: &Movie) {
        let Some((session_id, account_id)) = self.authenticated_account() else {
            self.error = Some("You must be logged in to remove favorites".to_string());
            return;
        };
        match self
            .tmdb
            .set_favorite(account_id, &session_id, movie.id, false)
            .await
        {
            Ok(()) => self.favorites.retain(|m| m.id != movie.id),
            Err(err) => {
                warn!("Error removing from favorites: {}", err);
                self.error = Some(err.to_string());
            }
        }
    }

    pub async fn add_to_watchlist(&mut self, movie: &Movie) {
        let Some((session_id, account_id)) = self.authenticated_account() else {
            self.error = Some("You must be logged in to add to watchlist".to_string());
            return;
        };
        match self
            .tmdb
            .set_watchlist(account_id, &session_id, movie.id, true)
            .await
        {
            Ok(()) => {
                if !self.is_in_watchlist(movie.id) {
                    self.watchlist.push(movie.clone());
                }
            }
            Err(err) => {
                warn!("Error adding to watchlist: {}", err);
                self.error = Some(err.to_string());
            }
        }
    }

    pub async fn remove_from_watchlist(&mut self, movie: &Movie) {
        let Some((session_id, account_id)) = self.authenticated_account() else {
            self.error = Some("You must be logged in to remove from watchlist".to_string());
            return;
        };
        match self
            .tmdb
            .set_watchlist(account_id, &session_id, movie.id, false)
            .await
        {
            Ok(()) => self.watchlist.retain(|m| m.id != movie.id),
            Err(err) => {
                warn!("Error removing from watchlist: {}", err);
                self.error = Some(err.to_string());
            }
        }
    }

    /// Ratings only require a session; they leave the lists untouched.
    pub async fn rate_movie(&mut self, movie_id: i32, rating: f32) {
        let Some(session_id) = self.session_id().map(str::to_string) else {
            self.error = Some("You must be logged in to rate movies".to_string());
            return;
        };
        if let Err(err) = self.tmdb.rate_movie(movie_id, &session_id, rating).await {
            warn!("Error rating movie: {}", err);
            self.error = Some(err.to_string());
        }
    }

    pub async fn delete_rating(&mut self, movie_id: i32) {
        let Some(session_id) = self.session_id().map(str::to_string) else {
            self.error = Some("You must be logged in to delete ratings".to_string());
            return;
        };
        if let Err(err) = self.tmdb.delete_rating(movie_id, &session_id).await {
            warn!("Error deleting rating: {}", err);
            self.error = Some(err.to_string());
        }
    }

    pub fn is_favorite(&self, movie_id: i32) -> bool {
        self.favorites.iter().any(|m| m.id == movie_id)
    }

    pub fn is_in_watchlist(&self, movie_id: i32) -> bool {
        self.watchlist.iter().any(|m| m.id == movie_id)
    }

    pub fn favorites(&self) -> &[Movie] {
        &self.favorites
    }

    pub fn watchlist(&self) -> &[Movie] {
        &self.watchlist
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.auth {
            AuthState::Authenticated(session) => Some(&session.session_id),
            _ => None,
        }
    }

    pub fn account(&self) -> Option<&Account> {
        match &self.auth {
            AuthState::Authenticated(session) => session.account.as_ref(),
            _ => None,
        }
    }

    pub fn account_id(&self) -> Option<i32> {
        self.account().map(|a| a.id)
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.account().map(|a| UserIdentity {
            username: a.username.clone(),
            name: a.display_name().to_string(),
        })
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
