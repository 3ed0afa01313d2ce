use std::sync::Arc;

use async_trait::async_trait;
use cineshelf::detail::DetailLoader;
use cineshelf::error::ApiError;
use cineshelf::models::{Account, Movie, MovieDetail};
use cineshelf::tmdb::TmdbApi;
use tokio::sync::Notify;

/// Catalog-only fake: detail fetches for `blocked_id` park on a Notify so a
/// test can hold one request in flight while issuing another.
struct FakeCatalog {
    blocked_id: Option<i32>,
    release: Arc<Notify>,
    fail_detail: bool,
    fail_recommendations: bool,
}

impl FakeCatalog {
    fn new() -> Self {
        Self {
            blocked_id: None,
            release: Arc::new(Notify::new()),
            fail_detail: false,
            fail_recommendations: false,
        }
    }
}

#[async_trait]
impl TmdbApi for FakeCatalog {
    async fn create_request_token(&self) -> Result<String, ApiError> {
        unreachable!()
    }

    async fn validate_with_login(
        &self,
        _username: &str,
        _password: &str,
        _request_token: &str,
    ) -> Result<String, ApiError> {
        unreachable!()
    }

    async fn create_session(&self, _request_token: &str) -> Result<String, ApiError> {
        unreachable!()
    }

    async fn delete_session(&self, _session_id: &str) -> Result<(), ApiError> {
        unreachable!()
    }

    async fn fetch_account(&self, _session_id: &str) -> Result<Account, ApiError> {
        unreachable!()
    }

    async fn fetch_favorite_movies(
        &self,
        _account_id: i32,
        _session_id: &str,
    ) -> Result<Vec<Movie>, ApiError> {
        unreachable!()
    }

    async fn fetch_watchlist_movies(
        &self,
        _account_id: i32,
        _session_id: &str,
    ) -> Result<Vec<Movie>, ApiError> {
        unreachable!()
    }

    async fn set_favorite(
        &self,
        _account_id: i32,
        _session_id: &str,
        _movie_id: i32,
        _favorite: bool,
    ) -> Result<(), ApiError> {
        unreachable!()
    }

    async fn set_watchlist(
        &self,
        _account_id: i32,
        _session_id: &str,
        _movie_id: i32,
        _watchlist: bool,
    ) -> Result<(), ApiError> {
        unreachable!()
    }

    async fn rate_movie(
        &self,
        _movie_id: i32,
        _session_id: &str,
        _value: f32,
    ) -> Result<(), ApiError> {
        unreachable!()
    }

    async fn delete_rating(&self, _movie_id: i32, _session_id: &str) -> Result<(), ApiError> {
        unreachable!()
    }

    async fn fetch_now_playing(&self, _page: u32) -> Result<Vec<Movie>, ApiError> {
        unreachable!()
    }

    async fn fetch_top_rated(&self, _page: u32) -> Result<Vec<Movie>, ApiError> {
        unreachable!()
    }

    async fn fetch_movie_detail(&self, movie_id: i32) -> Result<MovieDetail, ApiError> {
        if self.blocked_id == Some(movie_id) {
            self.release.notified().await;
        }
        if self.fail_detail {
            return Err(ApiError::Http {
                status: 404,
                remote_message: None,
            });
        }
        Ok(detail(movie_id))
    }

    async fn fetch_recommendations(&self, movie_id: i32) -> Result<Vec<Movie>, ApiError> {
        if self.fail_recommendations {
            return Err(ApiError::Offline);
        }
        Ok(vec![summary(movie_id + 1000)])
    }
}

fn detail(id: i32) -> MovieDetail {
    MovieDetail {
        id,
        title: format!("Movie {id}"),
        overview: String::new(),
        poster_path: None,
        backdrop_path: None,
        release_date: None,
        runtime: Some(120),
        genres: Vec::new(),
        tagline: None,
        status: None,
        homepage: None,
        popularity: 0.0,
        vote_average: 0.0,
        vote_count: 0,
        original_language: "en".to_string(),
        adult: false,
    }
}

fn summary(id: i32) -> Movie {
    Movie {
        id,
        title: format!("Movie {id}"),
        overview: String::new(),
        poster_path: None,
        backdrop_path: None,
        release_date: None,
        popularity: 0.0,
        vote_average: 0.0,
        vote_count: 0,
        original_language: "en".to_string(),
        adult: false,
        genre_ids: Vec::new(),
    }
}

#[tokio::test]
async fn sequential_loads_both_complete() {
    let loader = DetailLoader::new(Arc::new(FakeCatalog::new()));

    let first = loader.load(1).await.expect("load").expect("current");
    assert_eq!(first.movie.id, 1);
    assert_eq!(first.recommendations.len(), 1);

    let second = loader.load(2).await.expect("load").expect("current");
    assert_eq!(second.movie.id, 2);
}

#[tokio::test]
async fn stale_detail_response_is_discarded() {
    let mut fake = FakeCatalog::new();
    fake.blocked_id = Some(1);
    let release = fake.release.clone();
    let loader = Arc::new(DetailLoader::new(Arc::new(fake)));

    // Navigate to movie 1; its detail fetch parks in flight.
    let superseded = tokio::spawn({
        let loader = loader.clone();
        async move { loader.load(1).await }
    });
    tokio::task::yield_now().await;

    // Navigate to movie 2 before movie 1 resolves.
    let current = loader.load(2).await.expect("load").expect("current");
    assert_eq!(current.movie.id, 2);

    // The late response for movie 1 must not be rendered.
    release.notify_one();
    let stale = superseded.await.expect("join").expect("load");
    assert!(stale.is_none());
}

#[tokio::test]
async fn recommendations_failure_degrades_to_empty_list() {
    let mut fake = FakeCatalog::new();
    fake.fail_recommendations = true;
    let loader = DetailLoader::new(Arc::new(fake));

    let page = loader.load(5).await.expect("load").expect("current");
    assert_eq!(page.movie.id, 5);
    assert!(page.recommendations.is_empty());
}

#[tokio::test]
async fn detail_failure_is_the_operation_error() {
    let mut fake = FakeCatalog::new();
    fake.fail_detail = true;
    let loader = DetailLoader::new(Arc::new(fake));

    let err = loader.load(5).await.expect_err("detail fetch fails");
    assert_eq!(err.status(), Some(404));
}
