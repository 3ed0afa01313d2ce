use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{Account, Movie, MovieDetail};

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// The slice of the TMDB API this client consumes: the login handshake,
/// per-account list reads and writes, rating writes, and catalog reads.
/// Object-safe so state holders and tests can substitute implementations.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn create_request_token(&self) -> Result<String, ApiError>;
    async fn validate_with_login(
        &self,
        username: &str,
        password: &str,
        request_token: &str,
    ) -> Result<String, ApiError>;
    async fn create_session(&self, request_token: &str) -> Result<String, ApiError>;
    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;
    async fn fetch_account(&self, session_id: &str) -> Result<Account, ApiError>;
    async fn fetch_favorite_movies(
        &self,
        account_id: i32,
        session_id: &str,
    ) -> Result<Vec<Movie>, ApiError>;
    async fn fetch_watchlist_movies(
        &self,
        account_id: i32,
        session_id: &str,
    ) -> Result<Vec<Movie>, ApiError>;
    async fn set_favorite(
        &self,
        account_id: i32,
        session_id: &str,
        movie_id: i32,
        favorite: bool,
    ) -> Result<(), ApiError>;
    async fn set_watchlist(
        &self,
        account_id: i32,
        session_id: &str,
        movie_id: i32,
        watchlist: bool,
    ) -> Result<(), ApiError>;
    async fn rate_movie(&self, movie_id: i32, session_id: &str, value: f32)
        -> Result<(), ApiError>;
    async fn delete_rating(&self, movie_id: i32, session_id: &str) -> Result<(), ApiError>;
    async fn fetch_now_playing(&self, page: u32) -> Result<Vec<Movie>, ApiError>;
    async fn fetch_top_rated(&self, page: u32) -> Result<Vec<Movie>, ApiError>;
    async fn fetch_movie_detail(&self, movie_id: i32) -> Result<MovieDetail, ApiError>;
    async fn fetch_recommendations(&self, movie_id: i32) -> Result<Vec<Movie>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
}

impl TmdbClient {
    pub fn new(access_token: &str) -> Result<Self> {
        Self::with_base_url(access_token, TMDB_BASE)
    }

    /// Build a client against a custom base URL (for tests and proxies).
    pub fn with_base_url(access_token: &str, base_url: impl Into<String>) -> Result<Self> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .context("Access token contains invalid header characters")?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=utf-8"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("cineshelf/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build TMDB HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let token = env::var("TMDB_ACCESS_TOKEN").context("TMDB_ACCESS_TOKEN not set")?;
        Self::new(&token)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = &body {
            req = req.json(body);
        }

        let res = match req.send().await {
            Ok(res) => res,
            Err(e) => return Err(classify_transport(path, e)),
        };

        let status = res.status();
        let bytes = match res.bytes().await {
            Ok(b) => b,
            Err(e) => return Err(classify_transport(path, e)),
        };

        if !status.is_success() {
            return Err(classify_status(path, status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Unexpected TMDB payload for {}: {}", path, e);
            ApiError::Decode(e)
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, query, None).await
    }
}

fn classify_transport(path: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        warn!("Request timeout for {}: {}", path, err);
        ApiError::Timeout
    } else {
        warn!("No response received for {}: {}", path, err);
        ApiError::Offline
    }
}

fn classify_status(path: &str, status: StatusCode, body: &[u8]) -> ApiError {
    let remote_message = serde_json::from_slice::<StatusBody>(body)
        .ok()
        .and_then(|b| b.status_message);
    match status.as_u16() {
        401 => warn!("Authentication error (401) for {}", path),
        404 => warn!("Resource not found (404) for {}", path),
        429 => warn!("Rate limit exceeded (429) for {}", path),
        s if s >= 500 => warn!("Server error ({}) for {}", s, path),
        s => warn!("API error ({}) for {}", s, path),
    }
    ApiError::Http {
        status: status.as_u16(),
        remote_message,
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn create_request_token(&self) -> Result<String, ApiError> {
        debug!("Requesting new authentication token");
        let res: TokenResponse = self.get("/authentication/token/new", &[]).await?;
        if !res.success {
            return Err(ApiError::Protocol(
                "TMDB returned an unsuccessful response for token creation".to_string(),
            ));
        }
        Ok(res.request_token)
    }

    async fn validate_with_login(
        &self,
        username: &str,
        password: &str,
        request_token: &str,
    ) -> Result<String, ApiError> {
        let body = json!({
            "username": username,
            "password": password,
            "request_token": request_token,
        });
        let res: TokenResponse = self
            .request(
                Method::POST,
                "/authentication/token/validate_with_login",
                &[],
                Some(body),
            )
            .await?;
        Ok(res.request_token)
    }

    async fn create_session(&self, request_token: &str) -> Result<String, ApiError> {
        let body = json!({ "request_token": request_token });
        let res: SessionResponse = self
            .request(Method::POST, "/authentication/session/new", &[], Some(body))
            .await?;
        Ok(res.session_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let body = json!({ "session_id": session_id });
        let _: serde_json::Value = self
            .request(Method::DELETE, "/authentication/session", &[], Some(body))
            .await?;
        Ok(())
    }

    async fn fetch_account(&self, session_id: &str) -> Result<Account, ApiError> {
        self.get("/account", &[("session_id", session_id.to_string())])
            .await
    }

    async fn fetch_favorite_movies(
        &self,
        account_id: i32,
        session_id: &str,
    ) -> Result<Vec<Movie>, ApiError> {
        let page: MovieListPage = self
            .get(
                &format!("/account/{account_id}/favorite/movies"),
                &[("session_id", session_id.to_string())],
            )
            .await?;
        Ok(page.results)
    }

    async fn fetch_watchlist_movies(
        &self,
        account_id: i32,
        session_id: &str,
    ) -> Result<Vec<Movie>, ApiError> {
        let page: MovieListPage = self
            .get(
                &format!("/account/{account_id}/watchlist/movies"),
                &[("session_id", session_id.to_string())],
            )
            .await?;
        Ok(page.results)
    }

    async fn set_favorite(
        &self,
        account_id: i32,
        session_id: &str,
        movie_id: i32,
        favorite: bool,
    ) -> Result<(), ApiError> {
        let body = json!({
            "media_type": "movie",
            "media_id": movie_id,
            "favorite": favorite,
        });
        let _: serde_json::Value = self
            .request(
                Method::POST,
                &format!("/account/{account_id}/favorite"),
                &[("session_id", session_id.to_string())],
                Some(body),
            )
            .await?;
        Ok(())
    }

    async fn set_watchlist(
        &self,
        account_id: i32,
        session_id: &str,
        movie_id: i32,
        watchlist: bool,
    ) -> Result<(), ApiError> {
        let body = json!({
            "media_type": "movie",
            "media_id": movie_id,
            "watchlist": watchlist,
        });
        let _: serde_json::Value = self
            .request(
                Method::POST,
                &format!("/account/{account_id}/watchlist"),
                &[("session_id", session_id.to_string())],
                Some(body),
            )
            .await?;
        Ok(())
    }

    async fn rate_movie(
        &self,
        movie_id: i32,
        session_id: &str,
        value: f32,
    ) -> Result<(), ApiError> {
        let body = json!({ "value": value });
        let _: serde_json::Value = self
            .request(
                Method::POST,
                &format!("/movie/{movie_id}/rating"),
                &[("session_id", session_id.to_string())],
                Some(body),
            )
            .await?;
        Ok(())
    }

    async fn delete_rating(&self, movie_id: i32, session_id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .request(
                Method::DELETE,
                &format!("/movie/{movie_id}/rating"),
                &[("session_id", session_id.to_string())],
                None,
            )
            .await?;
        Ok(())
    }

    async fn fetch_now_playing(&self, page: u32) -> Result<Vec<Movie>, ApiError> {
        let res: MovieListPage = self
            .get("/movie/now_playing", &[("page", page.to_string())])
            .await?;
        Ok(res.results)
    }

    async fn fetch_top_rated(&self, page: u32) -> Result<Vec<Movie>, ApiError> {
        let res: MovieListPage = self
            .get("/movie/top_rated", &[("page", page.to_string())])
            .await?;
        Ok(res.results)
    }

    async fn fetch_movie_detail(&self, movie_id: i32) -> Result<MovieDetail, ApiError> {
        self.get(&format!("/movie/{movie_id}"), &[]).await
    }

    async fn fetch_recommendations(&self, movie_id: i32) -> Result<Vec<Movie>, ApiError> {
        let res: MovieListPage = self
            .get(&format!("/movie/{movie_id}/recommendations"), &[])
            .await?;
        Ok(res.results)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    success: bool,
    request_token: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct MovieListPage {
    #[serde(default)]
    results: Vec<Movie>,
}

/// TMDB error bodies carry `status_code` / `status_message`.
#[derive(Debug, Deserialize)]
struct StatusBody {
    status_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_parses_the_envelope() {
        let raw = r#"{"success": true, "expires_at": "2026-01-01", "request_token": "tok1"}"#;
        let res: TokenResponse = serde_json::from_str(raw).expect("token envelope");
        assert!(res.success);
        assert_eq!(res.request_token, "tok1");
    }

    #[test]
    fn list_page_defaults_to_empty_results() {
        let page: MovieListPage = serde_json::from_str(r#"{"page": 1}"#).expect("bare page");
        assert!(page.results.is_empty());
    }

    #[test]
    fn status_body_extracts_the_remote_message() {
        let raw = r#"{"status_code": 7, "status_message": "Invalid API key", "success": false}"#;
        let body: StatusBody = serde_json::from_str(raw).expect("status body");
        assert_eq!(body.status_message.as_deref(), Some("Invalid API key"));
    }
}
