//! Grid graphs derived from pixel maps, a compact on-disk codec for them and
//! a Dijkstra path tracer on top.
//!
//! A source image becomes a [`GridGraph`]: every pixel that does not match
//! the forbidden color is a vertex, connected to its up-to-8 grid neighbors
//! with weights derived from the color difference. The graph can be saved to
//! and reloaded from the binary `.map` format (or the text `.hmap` variant)
//! instead of re-deriving it from the image, and queried for shortest paths
//! between grid coordinates.

pub mod codec;
pub mod error;
pub mod find;
pub mod grid;
pub mod util;

pub use codec::{MapDecoder, MapFormat};
pub use error::{Error, Result};
pub use find::{shortest_path, PathFinder, PathFinderState, PathResult};
pub use grid::{neighbors_of, GridGraph, PixelGrid, Point, Vertex};
