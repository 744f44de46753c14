use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use suriza::{AdjacencyRule, Grid, GridBuilder, GridSpec, PlotterConfig, Solver, Toolpath};

#[derive(Parser)]
#[command(name = "plotter", version, about = "Solve a numbered grid puzzle and print G-code drawing its solution")]
struct Cli {
    /// Puzzle file: a JSON grid spec if it ends in `.json`, the text format otherwise. `-` reads the text format
    /// from stdin.
    puzzle: PathBuf,
    /// JSON configuration file; every section is optional.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the adjacency rule (`orthogonal` or `diagonal`).
    #[arg(long)]
    adjacency: Option<AdjacencyRule>,
    /// Fail if the puzzle has more than one solution.
    #[arg(long)]
    strict: bool,
    /// Give up after expanding this many search nodes.
    #[arg(long)]
    node_budget: Option<u64>,
    /// Give up after roughly this many milliseconds of searching.
    #[arg(long)]
    time_limit_ms: Option<u64>,
    /// Print the solved grid to stderr.
    #[arg(long)]
    show_solution: bool,
    /// Write G-code here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("plotter: {e}");
            ExitCode::from(exit_code(e.as_ref()))
        }
    }
}

/// Distinct codes let a calling pipeline tell bad recognition apart from a bad rig setup.
fn exit_code(e: &(dyn Error + 'static)) -> u8 {
    match e.downcast_ref::<suriza::Error>() {
        Some(suriza::Error::MalformedGrid(_)) => 2,
        Some(suriza::Error::Unsolvable(_)) => 3,
        Some(suriza::Error::Ambiguous(_)) => 4,
        Some(suriza::Error::SearchTimeout(_)) => 5,
        Some(suriza::Error::InvalidTransform(_)) => 6,
        Some(suriza::Error::Inconsistent(_)) => 70,
        None => 1,
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => serde_json::from_str::<PlotterConfig>(&read_input(path)?)?,
        None => PlotterConfig::default(),
    };
    if cli.strict {
        config.solver.check_uniqueness = true;
    }
    if cli.node_budget.is_some() {
        config.solver.node_budget = cli.node_budget;
    }
    if cli.time_limit_ms.is_some() {
        config.solver.time_limit_ms = cli.time_limit_ms;
    }

    let grid = load_grid(&cli.puzzle, cli.adjacency)?;
    info!("loaded {}x{} puzzle:\n{grid}", grid.width(), grid.height());

    let transform = config.transform.resolve(&grid).map_err(suriza::Error::from)?;
    let path = Solver::new(config.solver).solve(&grid).map_err(suriza::Error::from)?;
    if cli.show_solution {
        eprint!("{path}");
    }
    let waypoints = suriza::normalize(&path, &transform).map_err(suriza::Error::from)?;
    let gcode = Toolpath::from_waypoints(&waypoints).to_gcode(&config.gcode);

    match &cli.output {
        Some(output) => {
            std::fs::write(output, gcode)?;
            info!("wrote {}", output.display());
        }
        None => print!("{gcode}"),
    }
    Ok(())
}

fn load_grid(path: &Path, adjacency: Option<AdjacencyRule>) -> Result<Grid, Box<dyn Error>> {
    let input = read_input(path)?;
    let grid = if path.extension().is_some_and(|extension| extension == "json") {
        let mut spec: GridSpec = serde_json::from_str(&input)?;
        if let Some(rule) = adjacency {
            spec.adjacency = rule;
        }
        Grid::try_from(&spec)
    } else {
        GridBuilder::parse(&input).and_then(|mut builder| {
            if let Some(rule) = adjacency {
                builder.adjacency(rule);
            }
            builder.build()
        })
    };
    Ok(grid.map_err(suriza::Error::from)?)
}

fn read_input(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path)
}
