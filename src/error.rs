use thiserror::Error;

/// Errors surfaced by map parsing, the codecs and path queries.
///
/// "No path between two valid coordinates" is deliberately not represented
/// here; that is an ordinary result reported through
/// [`PathFinderState::NoPathFound`](crate::find::PathFinderState).
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed signature, header, geometry or record. The failing call
    /// returns no partial data.
    #[error("invalid map data: {0}")]
    InvalidFormat(String),

    /// The binary stream ended in the middle of a vertex record.
    #[error("map stream ended mid-record")]
    Truncated,

    /// A query coordinate lies outside the grid.
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
