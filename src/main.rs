use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waterworld::{export::export_csv, maps, Agent, EnvError, Flavor, Grid, Movement};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    Random,
    Human,
}

#[derive(Parser, Debug)]
#[command(name = "waterworld")]
#[command(about = "Grid world with a precomputed transition model", long_about = None)]
struct Args {
    /// Registered map to play
    #[arg(short, long, default_value = maps::DEFAULT_MAP)]
    map: String,

    /// Explicit map as comma separated rows, e.g. SWWR,WWRL,RWRL,LRWG
    #[arg(short, long, conflicts_with = "map")]
    desc: Option<String>,

    /// Reward table used with --desc
    #[arg(short, long, default_value = "standard", value_parser = ["standard", "extrahard"])]
    flavor: String,

    #[arg(short, long, default_value_t = 1)]
    episodes: usize,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Random episodes are cut off after this many steps
    #[arg(long, default_value_t = 100)]
    max_steps: usize,

    #[arg(long, value_enum, default_value_t = Mode::Random)]
    mode: Mode,

    /// Write the transition table as CSV to this path and exit
    #[arg(long)]
    export: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let args = Args::parse();

    let (grid, flavor) = match &args.desc {
        Some(desc) => {
            let rows: Vec<&str> = desc.split(',').map(str::trim).collect();
            let flavor = Flavor::by_name(&args.flavor)
                .ok_or_else(|| EnvError::UnknownMap(format!("flavor {}", args.flavor)))?;
            (Grid::new(&rows)?, flavor)
        }
        None => maps::lookup(&args.map)?,
    };
    let model = Arc::new(flavor.build(&grid)?);
    info!(states = model.n_states(), actions = model.n_actions(), "map setup");

    if let Some(path) = &args.export {
        export_csv(&model, File::create(path)?)?;
        info!(path = %path, "transition table written");
        return Ok(());
    }

    let mut agent = Agent::new(model, args.seed);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for episode in 0..args.episodes {
        agent.reset();
        let result = match args.mode {
            Mode::Random => solve_random(&mut agent, &grid, &mut rng, args.max_steps),
            Mode::Human => solve_human(&mut agent, &grid)?,
        };
        println!("Episode {} finished with return {}", episode, result);
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Plays uniformly random moves until the episode ends or `max_steps` is
/// reached, and returns the return collected so far.
fn solve_random<R: Rng + ?Sized>(
    agent: &mut Agent,
    grid: &Grid,
    rng: &mut R,
    max_steps: usize,
) -> f64 {
    for _ in 0..max_steps {
        if agent.is_done() {
            break;
        }
        let movement: Movement = rng.gen();
        let step = agent.step(movement);
        println!("{:?} => {:?}", movement, step);
    }
    print!("{}", agent.render(grid));
    agent.reward
}

fn solve_human(agent: &mut Agent, grid: &Grid) -> Result<f64, Box<dyn Error>> {
    print!("{}", agent.render(grid));
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let movement = match line?.trim() {
            "w" => Movement::Up,
            "s" => Movement::Down,
            "a" => Movement::Left,
            "d" => Movement::Right,
            other => {
                warn!(input = other, "use w/a/s/d to move");
                continue;
            }
        };
        let step = agent.step(movement);
        print!("{}", agent.render(grid));
        if step.done {
            return Ok(agent.reward);
        }
    }
    Err("input finished before the agent reached a final state".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(rows: &[&str], seed: u64) -> (Grid, Agent) {
        let grid = Grid::new(rows).unwrap();
        let model = Arc::new(Flavor::standard().build(&grid).unwrap());
        (grid, Agent::new(model, Some(seed)))
    }

    #[test]
    fn random_episode_stops_at_the_step_limit() {
        let (grid, mut agent) = agent(&["SW"], 1);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(solve_random(&mut agent, &grid, &mut rng, 25), 0.0);
        assert!(!agent.is_done());
        assert!(agent.last_action.is_some());
    }

    #[test]
    fn random_episode_ends_on_a_terminal_cell() {
        let (grid, mut agent) = agent(&["SG"], 1);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(solve_random(&mut agent, &grid, &mut rng, 10_000), 10.0);
        assert!(agent.is_done());
    }

    #[test]
    fn same_seed_plays_the_same_random_episode() {
        let play = |seed: u64| {
            let (grid, mut agent) = agent(&["SWWR", "WWRL", "RWRL", "LRWG"], seed);
            let mut rng = StdRng::seed_from_u64(seed);
            let result = solve_random(&mut agent, &grid, &mut rng, 100);
            (result, agent.state, agent.last_action)
        };
        assert_eq!(play(5), play(5));
    }
}
