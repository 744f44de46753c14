use std::ops::{ControlFlow, Deref, DerefMut};
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, info, trace, warn};
use ndarray::Array2;
use petgraph::visit::{Bfs, NodeFiltered};
use serde::{Deserialize, Serialize};

use crate::cell::Clue;
use crate::error::{AmbiguousPuzzleError, SearchTimeoutError, Segment, SolveError, UnsolvablePuzzleError};
use crate::grid::Grid;
use crate::location::Location;
use crate::path::Path;

/// Limits and policy for one [`Solver`].
///
/// Passed explicitly so that puzzles with different settings can be solved side by side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Give up after expanding this many search nodes.
    pub node_budget: Option<u64>,
    /// Give up after roughly this many milliseconds.
    pub time_limit_ms: Option<u64>,
    /// Keep searching after the first solution and fail with [`AmbiguousPuzzleError`] if there is a second.
    pub check_uniqueness: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_budget: Some(50_000_000),
            time_limit_ms: Some(10_000),
            check_uniqueness: false,
        }
    }
}

impl SolverConfig {
    /// The default limits with the uniqueness check enabled.
    pub fn strict() -> Self {
        Self { check_uniqueness: true, ..Self::default() }
    }

    fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Depth-first backtracking search for the [`Path`] of a [`Grid`].
///
/// # Algorithm
/// The path is extended one step at a time from its start. Clues act as anchors splitting the path into segments:
/// when step `k` carries a clue, the only candidate for step `k` is that clue's cell, and no other clue cell is ever
/// entered early. Before a cell is entered we check that the next anchor is still reachable in exactly the number of
/// steps left until it (distance, and parity on the orthogonal grid). After entering it the branch is abandoned if
/// - the unvisited cells reachable from the head are fewer than the steps remaining, or
/// - some unvisited cell has fewer than two ways in or out and cannot be the end of the path, or there are two such
///   cells.
///
/// Without a clue `1` the start is free and every eligible cell is tried in row-major order.
///
/// # Determinism
/// Neighbors are always visited in the order of [`AdjacencyRule::steps`](crate::AdjacencyRule::steps): up, right,
/// down, left, then up-right, down-right, down-left and up-left. Under-constrained puzzles therefore always yield the
/// same first solution.
#[derive(Clone, Copy, Debug, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    /// Create a solver with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// The configuration this solver was built with.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve `grid`.
    ///
    /// Fails with [`SolveError::Unsolvable`] naming the earliest segment that could not be completed,
    /// [`SolveError::Ambiguous`] if uniqueness checking is on and a second solution exists, or
    /// [`SolveError::Timeout`] if the budget runs out first.
    pub fn solve(&self, grid: &Grid) -> Result<Path, SolveError> {
        debug!(
            "solving {}x{} grid with {} clue(s), {} adjacency",
            grid.width(), grid.height(), grid.clues().count(), grid.rule()
        );
        check_segments(grid)?;

        let mut search = Search::new(grid, &self.config);
        let starts = search.start_candidates();
        debug!("{} start candidate(s)", starts.len());
        for start in starts {
            if search.begin(start)?.is_break() {
                break;
            }
        }

        info!(
            "search finished after {} nodes in {:?} with {} solution(s)",
            search.nodes, search.started.elapsed(), search.solutions.len()
        );

        let segment = search.failed_segment();
        let mut solutions = search.solutions.into_iter();
        match (solutions.next(), solutions.next()) {
            (None, _) => Err(UnsolvablePuzzleError { segment }.into()),
            (Some(first), Some(second)) => {
                let divergence = first.iter().zip(&second).position(|(a, b)| a != b).unwrap_or(first.len());
                Err(AmbiguousPuzzleError { divergence }.into())
            }
            (Some(first), None) => Path::new(grid, first).map_err(SolveError::Inconsistent),
        }
    }
}

/// Reject consecutive clues that are too far apart for the number of steps between them.
fn check_segments(grid: &Grid) -> Result<(), UnsolvablePuzzleError> {
    for ((from, a), (to, b)) in grid.clues().tuple_windows() {
        if !grid.rule().can_reach_in(a, b, to.get() - from.get()) {
            debug!("clue {from} at {a} cannot reach clue {to} at {b}");
            return Err(UnsolvablePuzzleError { segment: Segment { from: Some(from), to: Some(to) } });
        }
    }
    Ok(())
}

/// Mutable state of one search. Owned exclusively by a single [`Solver::solve`] call.
struct Search<'g> {
    grid: &'g Grid,
    visited: Array2<bool>,
    // trail[k] is the cell at path index k
    trail: Vec<Location>,
    solutions: Vec<Vec<Location>>,
    wanted: usize,
    node_budget: Option<u64>,
    time_limit: Option<Duration>,
    started: Instant,
    nodes: u64,
    deepest_clue: Option<Clue>,
}

/// A cell entered by the search. Leaves the cell again when dropped, whichever way the branch is exited.
struct Claim<'s, 'g> {
    search: &'s mut Search<'g>,
}

impl<'g> Deref for Claim<'_, 'g> {
    type Target = Search<'g>;

    fn deref(&self) -> &Search<'g> {
        self.search
    }
}

impl<'g> DerefMut for Claim<'_, 'g> {
    fn deref_mut(&mut self) -> &mut Search<'g> {
        self.search
    }
}

impl Drop for Claim<'_, '_> {
    fn drop(&mut self) {
        if let Some(location) = self.search.trail.pop() {
            self.search.visited[location.as_index()] = false;
        }
    }
}

impl<'g> Search<'g> {
    fn new(grid: &'g Grid, config: &SolverConfig) -> Self {
        Self {
            grid,
            visited: Array2::from_elem((grid.height(), grid.width()), false),
            trail: Vec::with_capacity(grid.cell_count()),
            solutions: Vec::new(),
            wanted: if config.check_uniqueness { 2 } else { 1 },
            node_budget: config.node_budget,
            time_limit: config.time_limit(),
            started: Instant::now(),
            nodes: 0,
            deepest_clue: None,
        }
    }

    /// Cells the path may start on: clue `1` if present, otherwise every blank cell that can still reach the first
    /// clue in time.
    fn start_candidates(&self) -> Vec<Location> {
        let grid = self.grid;
        if let Some(start) = grid.location_of(1) {
            return vec![start];
        }

        let first = grid.next_clue_from(1);
        grid.locations()
            .filter(|location| grid.clue_at(*location).is_none())
            .filter(|location| first.map_or(true, |(clue, anchor)| {
                grid.rule().can_reach_in(*location, anchor, clue.get() - 1)
            }))
            .collect_vec()
    }

    fn claim(&mut self, location: Location) -> Claim<'_, 'g> {
        self.visited[location.as_index()] = true;
        self.trail.push(location);
        if let Some(clue) = self.grid.clue_at(location) {
            self.deepest_clue = self.deepest_clue.max(Some(clue));
        }
        Claim { search: self }
    }

    fn begin(&mut self, start: Location) -> Result<ControlFlow<()>, SearchTimeoutError> {
        let mut claim = self.claim(start);
        if claim.is_dead_end() {
            return Ok(ControlFlow::Continue(()));
        }
        claim.extend()
    }

    /// Extend the trail from its current head. Breaks once enough solutions are collected.
    fn extend(&mut self) -> Result<ControlFlow<()>, SearchTimeoutError> {
        let grid = self.grid;
        let step = self.trail.len();
        if step == grid.cell_count() {
            debug!("solution found after {} nodes", self.nodes);
            self.solutions.push(self.trail.clone());
            return Ok(match self.solutions.len() >= self.wanted {
                true => ControlFlow::Break(()),
                false => ControlFlow::Continue(()),
            });
        }
        self.tick()?;

        let Some(&head) = self.trail.last() else {
            return Ok(ControlFlow::Continue(()));
        };

        let candidates = match grid.location_of(step + 1) {
            // the next step is pinned by a clue
            Some(anchor) => match grid.are_adjacent(head, anchor) && !self.visited[anchor.as_index()] {
                true => vec![anchor],
                false => vec![],
            },
            None => grid.neighbors(head)
                .filter(|next| !self.visited[next.as_index()] && grid.clue_at(*next).is_none())
                .collect_vec(),
        };

        let next_anchor = grid.next_clue_from(step + 2);
        for next in candidates {
            if let Some((clue, anchor)) = next_anchor {
                if !grid.rule().can_reach_in(next, anchor, clue.get() - (step + 1)) {
                    continue;
                }
            }

            let mut claim = self.claim(next);
            if claim.is_dead_end() {
                continue;
            }
            if claim.extend()?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Whether the trail as it stands can no longer be completed.
    fn is_dead_end(&self) -> bool {
        let grid = self.grid;
        let total = grid.cell_count();
        let remaining = total - self.trail.len();
        let Some(&head) = self.trail.last() else {
            return false;
        };
        if remaining == 0 {
            return false;
        }

        // every unvisited cell has to be reachable from the head through unvisited cells
        let free = NodeFiltered::from_fn(grid.graph(), |location: Location| {
            location == head || !self.visited[location.as_index()]
        });
        let mut bfs = Bfs::new(&free, head);
        let reachable = std::iter::from_fn(|| bfs.next(&free)).count() - 1;
        if reachable < remaining {
            return true;
        }

        // a cell with fewer than two ways in or out can only be the last one
        let mut ends = 0;
        for location in grid.locations().filter(|location| !self.visited[location.as_index()]) {
            let exits = grid.neighbors(location)
                .filter(|neighbor| *neighbor == head || !self.visited[neighbor.as_index()])
                .count();
            if exits >= 2 {
                continue;
            }

            let can_end = match grid.clue_at(location) {
                Some(clue) => clue.get() == total,
                None => grid.location_of(total).is_none(),
            };
            ends += 1;
            if !can_end || ends > 1 {
                return true;
            }
        }

        false
    }

    fn tick(&mut self) -> Result<(), SearchTimeoutError> {
        self.nodes += 1;
        if self.nodes % (1 << 20) == 0 {
            trace!("{} nodes expanded, trail at {}", self.nodes, self.trail.len());
        }

        // a single node can cost a scan of the whole grid, so the clock is read every time
        let over_budget = self.node_budget.is_some_and(|budget| self.nodes > budget);
        let over_time = self.time_limit.is_some_and(|limit| self.started.elapsed() > limit);
        if over_budget || over_time {
            warn!("search budget exhausted after {} nodes", self.nodes);
            return Err(SearchTimeoutError {
                nodes: self.nodes,
                elapsed: self.started.elapsed(),
                solutions: self.solutions.len(),
            });
        }
        Ok(())
    }

    /// The segment following the furthest clue the search ever reached.
    fn failed_segment(&self) -> Segment {
        let from = self.deepest_clue;
        let to = self.grid.next_clue_from(from.map_or(1, |clue| clue.get() + 1)).map(|(clue, _)| clue);
        Segment { from, to }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use super::{Solver, SolverConfig};
    use crate::builder::GridBuilder;
    use crate::error::{Segment, SolveError};
    use crate::location::Location;
    use crate::step::AdjacencyRule;

    fn solve(text: &str, config: SolverConfig) -> Result<crate::Path, SolveError> {
        let grid = GridBuilder::parse(text).unwrap().build().unwrap();
        Solver::new(config).solve(&grid)
    }

    #[test]
    fn follows_every_clue() {
        let path = solve("
            1 . . 4
            . . . .
            . . . 12
        ", SolverConfig::strict()).unwrap();
        assert_eq!(format!("{}", path), " 1  2  3  4
 8  7  6  5
 9 10 11 12
");
    }

    #[test]
    fn free_start_is_tried_in_row_major_order() {
        let path = solve("
            . . .
            . . 6
        ", SolverConfig::default()).unwrap();
        assert_eq!(path[0], Location(0, 0));
        assert_eq!(path[5], Location(1, 2));
    }

    #[test]
    fn free_ends_are_ambiguous() {
        let error = solve("
            . .
            . .
        ", SolverConfig::strict()).unwrap_err();
        assert!(error.is_ambiguous());
    }

    #[test]
    fn reports_earliest_failed_segment() {
        // every clue pair is close enough, but from 5 the path cannot sweep the right-hand columns and be back by 8
        let error = solve("
            8 . . .
            5 . . .
            4 . . .
        ", SolverConfig::default()).unwrap_err();
        assert_eq!(error, SolveError::Unsolvable(crate::UnsolvablePuzzleError {
            segment: Segment { from: NonZero::new(5), to: NonZero::new(8) },
        }));
    }

    #[test]
    fn parity_is_checked_before_search() {
        let error = solve("
            1 2 .
            . . .
            . . 4
        ", SolverConfig::default()).unwrap_err();
        assert_eq!(error, SolveError::Unsolvable(crate::UnsolvablePuzzleError {
            segment: Segment { from: NonZero::new(2), to: NonZero::new(4) },
        }));
    }

    #[test]
    fn diagonal_moves_open_new_solutions() {
        let text = "
            1 .
            . 2
        ";
        assert!(solve(text, SolverConfig::default()).unwrap_err().is_unsolvable());

        let grid = GridBuilder::parse(text).unwrap().adjacency(AdjacencyRule::Diagonal).build().unwrap();
        let path = Solver::default().solve(&grid).unwrap();
        assert_eq!(path.cells(), &[Location(0, 0), Location(1, 1), Location(0, 1), Location(1, 0)]);
    }

    #[test]
    fn node_budget_is_enforced() {
        let config = SolverConfig { node_budget: Some(3), time_limit_ms: None, check_uniqueness: false };
        let error = solve("
            . . . . .
            . . . . .
            . . . . .
            . . . . .
            . . . . 25
        ", config).unwrap_err();
        match error {
            SolveError::Timeout(timeout) => {
                assert_eq!(timeout.nodes, 4);
                assert_eq!(timeout.solutions, 0);
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[test]
    fn uniqueness_check_can_run_out_of_budget() {
        // the first solution is found within ten nodes, the second one is not
        let config = SolverConfig { node_budget: Some(10), time_limit_ms: None, check_uniqueness: true };
        let error = solve("
            1 . .
            . . .
            . . 9
        ", config).unwrap_err();
        match error {
            SolveError::Timeout(timeout) => {
                assert_eq!(timeout.nodes, 11);
                assert_eq!(timeout.solutions, 1);
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[test]
    fn time_limit_is_checked_on_every_node() {
        let config = SolverConfig { node_budget: None, time_limit_ms: Some(0), check_uniqueness: false };
        let error = solve("
            . . . . .
            . . . . .
            . . . . .
            . . . . .
            . . . . 25
        ", config).unwrap_err();
        match error {
            SolveError::Timeout(timeout) => assert_eq!(timeout.nodes, 1),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[test]
    fn large_grid_times_out_promptly() {
        let mut builder = GridBuilder::with_dims((NonZero::new(120).unwrap(), NonZero::new(120).unwrap()));
        builder.add_clue(1, Location(0, 0)).add_clue(120 * 120, Location(119, 0));
        let grid = builder.build().unwrap();
        let config = SolverConfig { node_budget: None, time_limit_ms: Some(200), check_uniqueness: false };
        let started = std::time::Instant::now();
        let error = Solver::new(config).solve(&grid).unwrap_err();
        assert!(error.is_timeout());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn odd_start_cannot_cover_board() {
        // a 3x3 board has five cells of one color and four of the other; paths must start on the majority color
        let error = solve("
            . 1 .
            . . .
            . . .
        ", SolverConfig::strict()).unwrap_err();
        assert_eq!(error, SolveError::Unsolvable(crate::UnsolvablePuzzleError {
            segment: Segment { from: NonZero::new(1), to: None },
        }));
    }

    #[test]
    fn solves_concurrently() {
        let grids = ["1 . .\n. . .\n. . 9", ". . 6\n. . ."]
            .map(|text| GridBuilder::parse(text).unwrap().build().unwrap());
        let solver = Solver::default();
        let paths = std::thread::scope(|scope| {
            let handles = grids.iter().map(|grid| scope.spawn(move || solver.solve(grid))).collect::<Vec<_>>();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
        });
        assert!(paths.iter().all(Result::is_ok));
    }
}
