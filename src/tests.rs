#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use proptest::prelude::*;

    use crate::builder::GridBuilder;
    use crate::error::{Error, MalformedGridError, Segment, SolveError, UnsolvablePuzzleError};
    use crate::gcode::GcodeConfig;
    use crate::location::Location;
    use crate::path::Path;
    use crate::solver::{Solver, SolverConfig};
    use crate::step::AdjacencyRule;
    use crate::transform::{Point, Transform};

    fn corners_3x3() -> GridBuilder {
        let mut builder = GridBuilder::with_dims((NonZero::new(3).unwrap(), NonZero::new(3).unwrap()));
        builder.add_clue(1, Location(0, 0)).add_clue(9, Location(2, 2));
        builder
    }

    #[test]
    fn corner_to_corner_snakes_along_rows() {
        let grid = corners_3x3().build().unwrap();
        let path = Solver::default().solve(&grid).unwrap();
        assert_eq!(format!("{}", path), "1 2 3
6 5 4
7 8 9
");
    }

    #[test]
    fn corner_to_corner_is_not_unique() {
        // the column snake satisfies both clues as well
        let grid = corners_3x3().build().unwrap();
        let error = Solver::new(SolverConfig::strict()).solve(&grid).unwrap_err();
        assert!(matches!(error, SolveError::Ambiguous(ambiguous) if ambiguous.divergence == 1));
    }

    #[test]
    fn diagonal_clue_pair_is_unsolvable() {
        let grid = GridBuilder::with_dims((NonZero::new(2).unwrap(), NonZero::new(2).unwrap()))
            .add_clue(1, Location(0, 0))
            .add_clue(2, Location(1, 1))
            .build()
            .unwrap();
        let error = Solver::default().solve(&grid).unwrap_err();
        assert_eq!(error, SolveError::Unsolvable(UnsolvablePuzzleError {
            segment: Segment { from: NonZero::new(1), to: NonZero::new(2) },
        }));
        assert_eq!(error.to_string(), "no path completes segment 1..2");
    }

    #[test]
    fn duplicate_clue_fails_before_search() {
        let error = GridBuilder::parse("
            . 3 .
            . . .
            . 3 .
        ").unwrap_err();
        assert_eq!(error, MalformedGridError::DuplicateClue { value: 3, first: Location(0, 1), second: Location(2, 1) });
    }

    #[test]
    fn solves_and_emits_gcode() {
        let grid = GridBuilder::parse("
            1 2
            . .
        ").unwrap().build().unwrap();
        let transform = Transform::pitch(Point::new(55., 131.), 6.5).unwrap();
        let toolpath = crate::solve_and_emit(&grid, &SolverConfig::strict(), &transform).unwrap();
        assert_eq!(toolpath.to_gcode(&GcodeConfig::default()), "G21
G90
F2000
G0 X55.000 Y131.000
M5
G1 X61.500 Y131.000
G1 X61.500 Y124.500
G1 X55.000 Y124.500
M3S30
G0 X0.000 Y0.000
");
    }

    #[test]
    fn emit_stops_at_first_error() {
        let grid = GridBuilder::parse("
            1 .
            . 2
        ").unwrap().build().unwrap();
        let transform = Transform::pitch(Point::new(0., 0.), 1.).unwrap();
        let error = crate::solve_and_emit(&grid, &SolverConfig::default(), &transform).unwrap_err();
        assert!(error.is_unsolvable());

        let error: Error = Transform::pitch(Point::new(0., 0.), 0.).unwrap_err().into();
        assert!(error.is_invalid_transform());
    }

    #[test]
    fn json_grid_matches_text_grid() {
        let spec: crate::GridSpec = serde_json::from_str(r#"{
            "width": 3,
            "height": 3,
            "adjacency": "diagonal",
            "clues": [{ "row": 0, "col": 0, "value": 1 }, { "row": 2, "col": 2, "value": 9 }]
        }"#).unwrap();
        let from_json = crate::Grid::try_from(&spec).unwrap();
        let from_text = corners_3x3().adjacency(AdjacencyRule::Diagonal).build().unwrap();
        assert_eq!(format!("{}", from_json), format!("{}", from_text));
        assert_eq!(from_json.rule(), AdjacencyRule::Diagonal);
        assert_eq!(from_json.graph().edge_count(), from_text.graph().edge_count());
    }

    #[test]
    fn sub_resolution_pitch_draws_nothing() {
        let grid = GridBuilder::parse("
            1 2
            . .
        ").unwrap().build().unwrap();
        let transform = Transform::pitch(Point::new(0., 0.), 0.0001).unwrap();
        let toolpath = crate::solve_and_emit(&grid, &SolverConfig::default(), &transform).unwrap();
        let gcode = toolpath.to_gcode(&GcodeConfig::default());
        assert!(gcode.lines().all(|line| !line.starts_with("G1 ")));
        assert!(!gcode.contains("M5"));
    }

    /// Whether any path fits `grid`, by trying every one of them.
    fn has_solution(grid: &crate::Grid) -> bool {
        fn walk(grid: &crate::Grid, visited: &mut [bool], head: Location, step: usize) -> bool {
            if step == grid.cell_count() {
                return true;
            }
            for next in grid.neighbors(head).collect::<Vec<_>>() {
                let index = next.row() * grid.width() + next.col();
                if visited[index] || grid.clue_at(next).is_some_and(|clue| clue.get() != step + 1) {
                    continue;
                }
                visited[index] = true;
                let found = walk(grid, visited, next, step + 1);
                visited[index] = false;
                if found {
                    return true;
                }
            }
            false
        }

        grid.locations()
            .filter(|start| grid.clue_at(*start).map_or(true, |clue| clue.get() == 1))
            .any(|start| {
                let mut visited = vec![false; grid.cell_count()];
                visited[start.row() * grid.width() + start.col()] = true;
                walk(grid, &mut visited, start, 1)
            })
    }

    /// A grid whose row-by-row serpentine is a solution, with the clues chosen by `keep` taken from it.
    fn serpentine_puzzle(width: usize, height: usize, keep: &[bool]) -> GridBuilder {
        let mut builder = GridBuilder::with_dims((NonZero::new(width).unwrap(), NonZero::new(height).unwrap()));
        for row in 0..height {
            for offset in 0..width {
                let col = if row % 2 == 0 { offset } else { width - 1 - offset };
                let step = row * width + offset + 1;
                if keep[step - 1] {
                    builder.add_clue(step as i64, Location(row, col));
                }
            }
        }
        builder
    }

    fn puzzle() -> impl Strategy<Value = (usize, usize, Vec<bool>)> {
        (1usize..=5, 1usize..=5)
            .prop_filter("grids have at least two cells", |(width, height)| width * height >= 2)
            .prop_flat_map(|(width, height)| {
                (Just(width), Just(height), proptest::collection::vec(any::<bool>(), width * height))
            })
    }

    /// Small grids with clues scattered at random. Many of them have no solution.
    fn scattered_clues() -> impl Strategy<Value = (usize, usize, Vec<usize>, Vec<bool>)> {
        (2usize..=4, 2usize..=3).prop_flat_map(|(width, height)| {
            let cells = width * height;
            (
                Just(width),
                Just(height),
                Just((1..=cells).collect::<Vec<_>>()).prop_shuffle(),
                proptest::collection::vec(proptest::bool::weighted(0.3), cells),
            )
        })
    }

    proptest! {
        #[test]
        fn solutions_are_valid_and_stable((width, height, keep) in puzzle()) {
            let grid = serpentine_puzzle(width, height, &keep).build().unwrap();
            let solver = Solver::default();
            let first = solver.solve(&grid).unwrap();
            let second = solver.solve(&grid).unwrap();

            prop_assert_eq!(first.len(), width * height);
            prop_assert!(Path::new(&grid, first.cells().to_vec()).is_ok());
            for (clue, location) in grid.clues() {
                prop_assert_eq!(first[clue.get() - 1], location);
            }
            prop_assert_eq!(first, second);
        }

        #[test]
        fn diagonal_solutions_are_valid((width, height, keep) in puzzle()) {
            let grid = serpentine_puzzle(width, height, &keep).adjacency(AdjacencyRule::Diagonal).build().unwrap();
            let path = Solver::default().solve(&grid).unwrap();
            prop_assert!(Path::new(&grid, path.cells().to_vec()).is_ok());
            prop_assert_eq!(path, Solver::default().solve(&grid).unwrap());
        }

        #[test]
        fn agrees_with_exhaustive_search((width, height, values, keep) in scattered_clues()) {
            let mut builder = GridBuilder::with_dims((NonZero::new(width).unwrap(), NonZero::new(height).unwrap()));
            for (index, value) in values.iter().enumerate() {
                if keep[index] {
                    builder.add_clue(*value as i64, Location(index / width, index % width));
                }
            }
            let grid = builder.build().unwrap();

            match Solver::default().solve(&grid) {
                Ok(path) => {
                    prop_assert!(has_solution(&grid));
                    prop_assert!(Path::new(&grid, path.cells().to_vec()).is_ok());
                }
                Err(error) => {
                    prop_assert!(error.is_unsolvable(), "unexpected {:?}", error);
                    prop_assert!(!has_solution(&grid));
                }
            }
        }

        #[test]
        fn one_pen_run_per_solution((width, height, keep) in puzzle()) {
            let grid = serpentine_puzzle(width, height, &keep).build().unwrap();
            let transform = Transform::pitch(Point::new(55., 131.), 6.5).unwrap();
            let toolpath = crate::solve_and_emit(&grid, &SolverConfig::default(), &transform).unwrap();
            prop_assert_eq!(toolpath.pen_runs(), 1);
            prop_assert_eq!(toolpath.draw_moves(), width * height - 1);

            let config = GcodeConfig::default();
            let gcode = toolpath.to_gcode(&config);
            prop_assert_eq!(gcode.lines().filter(|line| *line == config.pen_down).count(), 1);
            prop_assert_eq!(gcode.lines().filter(|line| *line == config.pen_up).count(), 1);
            prop_assert_eq!(gcode.lines().filter(|line| line.starts_with("G1 ")).count(), width * height - 1);
        }

        #[test]
        fn transform_round_trips(
            x in -500f64..500.,
            y in -500f64..500.,
            rotation in -std::f64::consts::PI..std::f64::consts::PI,
            sx in 0.1f64..50.,
            sy in 0.1f64..50.,
            row in 0usize..40,
            col in 0usize..40,
        ) {
            let transform = Transform::affine(Point::new(x, y), rotation, (sx, -sy)).unwrap();
            let (r, c) = transform.invert(transform.apply(Location(row, col)));
            prop_assert!((r - row as f64).abs() < 1e-6);
            prop_assert!((c - col as f64).abs() < 1e-6);
        }
    }
}
