//! Client core for a TMDB-backed movie catalog.
//!
//! A presentation layer embeds this crate for everything stateful: the typed
//! API client ([`tmdb::TmdbClient`]), image URL resolution ([`images`]),
//! durable session storage ([`store`]), the session/list state controller
//! ([`app::AppState`]), and the stale-safe detail loader
//! ([`detail::DetailLoader`]).

pub mod app;
pub mod detail;
pub mod error;
pub mod images;
pub mod models;
pub mod store;
pub mod tmdb;

pub use app::{AppState, AuthState, Session};
pub use detail::{DetailLoader, DetailPage};
pub use error::ApiError;
pub use models::{Account, Genre, Movie, MovieDetail, UserIdentity};
pub use store::{FileStore, MemoryStore, SessionStore};
pub use tmdb::{TmdbApi, TmdbClient};
