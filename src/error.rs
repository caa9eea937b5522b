use thiserror::Error;

/// Errors raised by the tracker and its I/O helpers.
///
/// Missing features, matches or inliers are never errors; they show up as an
/// empty (or shorter) tracking result.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("invalid rect ({x0}, {y0}, {x1}, {y1}): expected x0 < x1 and y0 < y1")]
    InvalidRect { x0: f32, y0: f32, x1: f32, y1: f32 },

    #[error("homography needs at least 4 correspondences, got {0}")]
    NotEnoughCorrespondences(usize),

    #[error("correspondence sets differ in length: {p0} vs {p1}")]
    MismatchedCorrespondences { p0: usize, p1: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("bad glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
