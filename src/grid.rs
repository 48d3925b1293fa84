use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Candidate neighbor offsets in wire order:
/// Left, Right, Up, Down, Up-Left, Up-Right, Down-Left, Down-Right.
/// Offsets from index 4 on are diagonal and get the sqrt(2) weight scaling.
const OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// A grid coordinate. Maps to the linear vertex index `y * width + x`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A flat buffer of RGB or RGBA pixel bytes plus geometry, as handed over by
/// the image decoding collaborator. Alpha bytes are carried along but never
/// enter the color filter or the weight computation.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl PixelGrid {
    pub fn new(data: Vec<u8>, width: usize, height: usize, has_alpha: bool) -> Result<Self> {
        let channels = if has_alpha { 4 } else { 3 };
        if width == 0 || height == 0 {
            return Err(Error::InvalidFormat(format!(
                "grid dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if data.len() != width * height * channels {
            return Err(Error::InvalidFormat(format!(
                "pixel buffer holds {} bytes, expected {} for {}x{} with {} channels",
                data.len(),
                width * height * channels,
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixel positions in the grid.
    pub fn size(&self) -> usize {
        self.width * self.height
    }

    /// Sum of the red, green and blue channel values at `position`.
    pub fn color_sum(&self, position: usize) -> i32 {
        let p = position * self.channels;
        self.data[p] as i32 + self.data[p + 1] as i32 + self.data[p + 2] as i32
    }

    /// The RGB triple at `position`, alpha dropped.
    pub fn rgb(&self, position: usize) -> [u8; 3] {
        let p = position * self.channels;
        [self.data[p], self.data[p + 1], self.data[p + 2]]
    }
}

/// Filters the candidate neighbors of `position`: directions leaving the grid
/// fall away first (border and corner positions), then candidates whose color
/// matches `forbidden`. Survivors come back in the fixed direction order
/// together with their edge weight.
///
/// A position whose own color matches `forbidden` has no neighbors at all.
///
/// The weight towards a neighbor is `|colorSum(neighbor) - colorSum(self) + 1|`
/// for the four orthogonal directions and sqrt(2) times that for the
/// diagonals.
pub fn neighbors_of(grid: &PixelGrid, position: usize, forbidden: [u8; 3]) -> Vec<(usize, f32)> {
    let mut found = Vec::with_capacity(OFFSETS.len());

    if grid.rgb(position) == forbidden {
        return found;
    }

    let x = (position % grid.width()) as isize;
    let y = (position / grid.width()) as isize;
    let own_sum = grid.color_sum(position);

    for (i, (dx, dy)) in OFFSETS.iter().enumerate() {
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 || nx >= grid.width() as isize || ny >= grid.height() as isize {
            continue;
        }
        let neighbor = ny as usize * grid.width() + nx as usize;
        if grid.rgb(neighbor) == forbidden {
            continue;
        }

        let diff = (grid.color_sum(neighbor) - own_sum + 1).abs() as f32;
        let weight = if i < 4 {
            diff
        } else {
            std::f32::consts::SQRT_2 * diff
        };
        found.push((neighbor, weight));
    }

    found
}

/// Adjacency of a single grid position: neighbor indices in direction order,
/// with the parallel edge weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub neighbors: Vec<usize>,
    pub weights: Vec<f32>,
}

impl Vertex {
    pub(crate) fn empty() -> Self {
        Self {
            neighbors: Vec::with_capacity(OFFSETS.len()),
            weights: Vec::with_capacity(OFFSETS.len()),
        }
    }
}

/// The adjacency-list graph over a pixel grid.
///
/// Vertices live in a dense arena indexed by linear position; `None` marks a
/// forbidden pixel or one with no surviving neighbors. The graph is read-only
/// once built — queries keep their search state on the side, so a shared
/// reference is all a path query needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGraph {
    width: usize,
    height: usize,
    vertices: Vec<Option<Vertex>>,
}

impl GridGraph {
    /// Derive the graph from a pixel grid, excluding pixels of the
    /// `forbidden` color entirely.
    ///
    /// A pixel left with zero surviving neighbors yields no vertex either, so
    /// an isolated speck is invisible to queries just like a forbidden pixel.
    pub fn from_pixels(grid: &PixelGrid, forbidden: [u8; 3]) -> Self {
        let mut vertices = vec![None; grid.size()];

        for position in 0..grid.size() {
            let found = neighbors_of(grid, position, forbidden);
            if found.is_empty() {
                continue;
            }
            let (neighbors, weights) = found.into_iter().unzip();
            vertices[position] = Some(Vertex { neighbors, weights });
        }

        let graph = Self {
            width: grid.width(),
            height: grid.height(),
            vertices,
        };
        log::debug!(
            "built {}x{} grid graph with {} vertices",
            graph.width,
            graph.height,
            graph.vertex_count()
        );
        graph
    }

    pub(crate) fn from_parts(width: usize, height: usize, vertices: Vec<Option<Vertex>>) -> Self {
        Self {
            width,
            height,
            vertices,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of positions in the grid, counting non-vertex positions.
    pub fn size(&self) -> usize {
        self.width * self.height
    }

    /// Number of actual vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_some()).count()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.width && point.y < self.height
    }

    pub fn index_of(&self, point: Point) -> usize {
        point.y * self.width + point.x
    }

    pub fn point_of(&self, index: usize) -> Point {
        Point {
            x: index % self.width,
            y: index / self.width,
        }
    }

    /// The vertex at the given linear index, if the position has one.
    pub fn vertex(&self, index: usize) -> Option<&Vertex> {
        self.vertices.get(index).and_then(|v| v.as_ref())
    }

    /// Iterate the existing vertices in increasing index order.
    pub fn vertices(&self) -> impl Iterator<Item = (usize, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i, v)))
    }
}
