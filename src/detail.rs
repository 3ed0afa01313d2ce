//! Movie detail loading with a stale-response guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{Movie, MovieDetail};
use crate::tmdb::TmdbApi;

/// Payload for the detail view: the full record plus its recommendations.
#[derive(Debug, Clone)]
pub struct DetailPage {
    pub movie: MovieDetail,
    pub recommendations: Vec<Movie>,
}

/// Loads detail pages and discards responses superseded by a newer request.
///
/// Rapid navigation between movies would otherwise let a late-arriving
/// response overwrite newer state; each `load` takes a generation ticket and
/// a completion whose ticket is no longer current resolves to `Ok(None)`
/// (last request wins).
pub struct DetailLoader {
    tmdb: Arc<dyn TmdbApi>,
    generation: AtomicU64,
}

impl DetailLoader {
    pub fn new(tmdb: Arc<dyn TmdbApi>) -> Self {
        Self {
            tmdb,
            generation: AtomicU64::new(0),
        }
    }

    /// Fetch detail and recommendations for `movie_id`, concurrently.
    /// Returns `Ok(None)` when a newer `load` started while this one was in
    /// flight; the stale payload must not be rendered. A recommendations
    /// failure degrades to an empty list rather than failing the page.
    pub async fn load(&self, movie_id: i32) -> Result<Option<DetailPage>, ApiError> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (detail, recommendations) = tokio::join!(
            self.tmdb.fetch_movie_detail(movie_id),
            self.tmdb.fetch_recommendations(movie_id),
        );

        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!("Discarding stale detail response for movie {}", movie_id);
            return Ok(None);
        }

        let movie = detail?;
        let recommendations = recommendations.unwrap_or_else(|err| {
            warn!(
                "Failed to fetch recommendations for movie {}: {}",
                movie_id, err
            );
            Vec::new()
        });

        Ok(Some(DetailPage {
            movie,
            recommendations,
        }))
    }
}
