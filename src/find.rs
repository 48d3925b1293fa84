use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{GridGraph, Point};

/// The objects stored in the priority queue: a position to visit and the
/// cost accumulated on the way there.
#[derive(Debug)]
struct ToVisit {
    cost: f32,
    position: usize,
    from: Option<usize>,
}

impl Ord for ToVisit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost.total_cmp(&other.cost).reverse() // reverse for BinaryHeap to be a min-heap
    }
}

impl PartialOrd for ToVisit {
    fn partial_cmp(&self, other: &ToVisit) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ToVisit {
    fn eq(&self, other: &ToVisit) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ToVisit {}

#[derive(Clone, Copy, Debug)]
struct VisitedItem {
    cost: f32,
    from: Option<usize>,
}

/// Settled search state for one grid position. `None` means the position has
/// not been extracted from the queue yet, i.e. its distance is still
/// tentative or infinite.
#[derive(Clone, Copy, Debug, Default)]
struct Visited(Option<VisitedItem>);

/// A completed trace: the visited coordinates from start to goal inclusive,
/// and the summed edge weights along them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub path: Vec<Point>,
    pub start: Point,
    pub goal: Point,
    pub total_cost: f32,
}

/// Where a query stands. `NoPathFound` is an ordinary outcome — a walled-off
/// goal or a non-vertex endpoint — not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PathFinderState {
    Computing,
    NoPathFound,
    PathFound(PathResult),
}

impl PathFinderState {
    fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }
}

/// Dijkstra driver over a [`GridGraph`].
///
/// All search state lives in the finder and is allocated fresh per query; the
/// graph is only ever read. Improved tentative distances re-enter the queue
/// as new entries, and entries for already-settled positions are skipped when
/// popped.
#[derive(Debug)]
pub struct PathFinder<'a> {
    graph: &'a GridGraph,
    start: Point,
    goal: Point,
    goal_index: usize,
    visited: Vec<Visited>,
    visit_list: BinaryHeap<ToVisit>,
    state: PathFinderState,
}

impl<'a> PathFinder<'a> {
    /// Set up a query between two grid coordinates.
    ///
    /// Fails with [`Error::OutOfBounds`] when either coordinate leaves the
    /// grid, before any search state is touched. Endpoints that exist on the
    /// grid but have no vertex are not an error; the finder settles on
    /// [`PathFinderState::NoPathFound`].
    pub fn new(graph: &'a GridGraph, start: Point, goal: Point) -> Result<Self> {
        for point in [start, goal] {
            if !graph.contains(point) {
                return Err(Error::OutOfBounds {
                    x: point.x,
                    y: point.y,
                    width: graph.width(),
                    height: graph.height(),
                });
            }
        }

        let mut visit_list = BinaryHeap::new();
        let state = if graph.vertex(graph.index_of(start)).is_none()
            || graph.vertex(graph.index_of(goal)).is_none()
        {
            PathFinderState::NoPathFound
        } else {
            visit_list.push(ToVisit {
                cost: 0.0,
                position: graph.index_of(start),
                from: None,
            });
            PathFinderState::Computing
        };

        Ok(Self {
            graph,
            start,
            goal,
            goal_index: graph.index_of(goal),
            visited: vec![Visited::default(); graph.size()],
            visit_list,
            state,
        })
    }

    /// Run the query to completion.
    pub fn finish(mut self) -> PathFinderState {
        loop {
            match self.step() {
                PathFinderState::Computing => {}
                state => return state,
            }
        }
    }

    /// Settle at most one position and return the state afterwards.
    pub fn step(&mut self) -> PathFinderState {
        if self.state.is_done() {
            return self.state.clone();
        }

        if let Some(visit) = self.visit_list.pop() {
            if self.visited[visit.position].0.is_some() {
                // a cheaper entry already settled this position
                return self.state.clone();
            }

            self.visited[visit.position] = Visited(Some(VisitedItem {
                cost: visit.cost,
                from: visit.from,
            }));

            if visit.position == self.goal_index {
                log::debug!("goal {} reached with cost {}", self.goal, visit.cost);
                self.state = PathFinderState::PathFound(self.backtrack(visit.cost));
                return self.state.clone();
            }

            if let Some(vertex) = self.graph.vertex(visit.position) {
                for (&neighbor, &weight) in vertex.neighbors.iter().zip(&vertex.weights) {
                    // a partially decoded map may reference records that
                    // never arrived; those positions are dead ends
                    if self.graph.vertex(neighbor).is_none() {
                        continue;
                    }
                    if self.visited[neighbor].0.is_none() {
                        self.visit_list.push(ToVisit {
                            cost: visit.cost + weight,
                            position: neighbor,
                            from: Some(visit.position),
                        });
                    }
                }
            }
        } else {
            self.state = PathFinderState::NoPathFound;
        }

        self.state.clone()
    }

    pub fn state(&self) -> &PathFinderState {
        &self.state
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn goal(&self) -> Point {
        self.goal
    }

    fn backtrack(&self, total_cost: f32) -> PathResult {
        let mut path = vec![self.goal];
        let mut position = self.goal_index;

        while let Visited(Some(VisitedItem {
            from: Some(from), ..
        })) = self.visited[position]
        {
            path.push(self.graph.point_of(from));
            position = from;
        }

        path.reverse();
        PathResult {
            path,
            start: self.start,
            goal: self.goal,
            total_cost,
        }
    }
}

/// Run a full shortest-path query between two coordinates.
pub fn shortest_path(graph: &GridGraph, from: Point, to: Point) -> Result<PathFinderState> {
    Ok(PathFinder::new(graph, from, to)?.finish())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::PixelGrid;

    const BLACK: [u8; 3] = [0, 0, 0];
    const SQRT_2: f32 = std::f32::consts::SQRT_2;

    fn graph_from_rows(rows: &[&[[u8; 3]]]) -> GridGraph {
        let height = rows.len();
        let width = rows[0].len();
        let mut data = Vec::with_capacity(width * height * 3);
        for row in rows {
            for px in *row {
                data.extend_from_slice(px);
            }
        }
        let grid = PixelGrid::new(data, width, height, false).unwrap();
        GridGraph::from_pixels(&grid, BLACK)
    }

    fn uniform_graph(side: usize) -> GridGraph {
        let data = vec![128u8; side * side * 3];
        let grid = PixelGrid::new(data, side, side, false).unwrap();
        GridGraph::from_pixels(&grid, BLACK)
    }

    fn expect_found(state: PathFinderState) -> PathResult {
        match state {
            PathFinderState::PathFound(result) => result,
            other => panic!("expected a path, got {:?}", other),
        }
    }

    #[test]
    fn test_diagonal_route_across_uniform_grid() {
        let graph = uniform_graph(3);
        let start = Point { x: 0, y: 0 };
        let goal = Point { x: 2, y: 2 };

        let result = expect_found(shortest_path(&graph, start, goal).unwrap());

        assert!((result.total_cost - 2.0 * SQRT_2).abs() < 1e-4);
        assert_eq!(result.path.first(), Some(&start));
        assert_eq!(result.path.last(), Some(&goal));
        assert_eq!(result.path.len(), 3);
    }

    #[test]
    fn test_start_equals_goal() {
        let graph = uniform_graph(3);
        let point = Point { x: 1, y: 1 };

        let result = expect_found(shortest_path(&graph, point, point).unwrap());
        assert_eq!(result.path, vec![point]);
        assert_eq!(result.total_cost, 0.0);
    }

    #[test]
    fn test_walled_off_goal() {
        let white = [255, 255, 255];
        // a forbidden column splits the grid in two
        let graph = graph_from_rows(&[
            &[white, BLACK, white],
            &[white, BLACK, white],
            &[white, BLACK, white],
        ]);

        let state = shortest_path(&graph, Point { x: 0, y: 0 }, Point { x: 2, y: 2 }).unwrap();
        assert_eq!(state, PathFinderState::NoPathFound);
    }

    #[test]
    fn test_forbidden_endpoint_is_no_path() {
        let white = [255, 255, 255];
        let graph = graph_from_rows(&[
            &[white, white],
            &[white, BLACK],
        ]);

        let state = shortest_path(&graph, Point { x: 0, y: 0 }, Point { x: 1, y: 1 }).unwrap();
        assert_eq!(state, PathFinderState::NoPathFound);
    }

    #[test]
    fn test_out_of_bounds_query() {
        let graph = uniform_graph(3);

        let result = shortest_path(&graph, Point { x: 0, y: 0 }, Point { x: 3, y: 0 });
        assert!(matches!(
            result,
            Err(Error::OutOfBounds {
                x: 3,
                y: 0,
                width: 3,
                height: 3
            })
        ));

        let result = shortest_path(&graph, Point { x: 0, y: 5 }, Point { x: 1, y: 1 });
        assert!(matches!(result, Err(Error::OutOfBounds { y: 5, .. })));
    }

    #[test]
    fn test_repeated_queries_are_idempotent() {
        let white = [255, 255, 255];
        let gray = [60, 60, 60];
        let graph = graph_from_rows(&[
            &[white, gray, white, white],
            &[white, BLACK, BLACK, white],
            &[white, gray, white, white],
        ]);
        let start = Point { x: 0, y: 0 };
        let goal = Point { x: 3, y: 2 };

        let first = expect_found(shortest_path(&graph, start, goal).unwrap());
        let second = expect_found(shortest_path(&graph, start, goal).unwrap());

        assert_eq!(first.total_cost, second.total_cost);
        assert_eq!(first.path.len(), second.path.len());
    }

    #[test]
    fn test_path_steps_are_grid_adjacent() {
        let graph = uniform_graph(5);
        let result = expect_found(
            shortest_path(&graph, Point { x: 0, y: 2 }, Point { x: 4, y: 1 }).unwrap(),
        );

        for pair in result.path.windows(2) {
            let dx = pair[0].x.abs_diff(pair[1].x);
            let dy = pair[0].y.abs_diff(pair[1].y);
            assert!(dx <= 1 && dy <= 1 && dx + dy > 0);
        }
    }

    #[test]
    fn test_cheaper_detour_wins() {
        // the direct middle row is bright, the detour row barely differs
        // from its surroundings, so the detour accumulates less weight
        let base = [100, 100, 100];
        let bright = [250, 250, 250];
        let graph = graph_from_rows(&[
            &[base, base, base],
            &[base, bright, base],
            &[base, base, base],
        ]);

        let result = expect_found(
            shortest_path(&graph, Point { x: 0, y: 1 }, Point { x: 2, y: 1 }).unwrap(),
        );

        // going straight through the bright pixel costs two big color jumps;
        // any route around it is cheaper
        assert!(!result.path.contains(&Point { x: 1, y: 1 }));
    }

    #[test]
    fn test_stepping_matches_finish() {
        let graph = uniform_graph(4);
        let start = Point { x: 0, y: 0 };
        let goal = Point { x: 3, y: 3 };

        let finished = expect_found(shortest_path(&graph, start, goal).unwrap());

        let mut finder = PathFinder::new(&graph, start, goal).unwrap();
        let stepped = loop {
            match finder.step() {
                PathFinderState::Computing => {}
                state => break expect_found(state),
            }
        };

        assert_eq!(stepped.total_cost, finished.total_cost);
    }
}
