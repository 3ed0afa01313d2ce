//! Image URL resolution for TMDB artwork paths.

pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-image.png";

/// Named size presets on the TMDB image host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Poster,
    Backdrop,
    Profile,
}

impl ImageSize {
    fn as_segment(self) -> &'static str {
        match self {
            ImageSize::Poster => "w500",
            ImageSize::Backdrop => "original",
            ImageSize::Profile => "w185",
        }
    }
}

/// Resolve a relative artwork path to a full URL. A missing or empty path
/// maps to the bundled placeholder image.
pub fn image_url(path: Option<&str>, size: ImageSize) -> String {
    match path {
        Some(p) if !p.is_empty() => format!("{IMAGE_BASE}{}{p}", size.as_segment()),
        _ => PLACEHOLDER_IMAGE.to_string(),
    }
}

pub fn poster_url(path: Option<&str>) -> String {
    image_url(path, ImageSize::Poster)
}

pub fn backdrop_url(path: Option<&str>) -> String {
    image_url(path, ImageSize::Backdrop)
}

pub fn profile_url(path: Option<&str>) -> String {
    image_url(path, ImageSize::Profile)
}
