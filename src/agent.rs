use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};
use tracing::trace;

use crate::environment::{Grid, Movement, State, TransitionModel};

const HIGHLIGHT: &str = "\x1b[41m";
const RESET: &str = "\x1b[0m";

/// What a single step reports back to the caller.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Step {
    pub state: State,
    pub reward: f64,
    pub done: bool,
}

/// Drives one episode at a time over a shared transition model.
pub struct Agent {
    model: Arc<TransitionModel>,
    rng: StdRng,
    pub state: State,
    pub reward: f64,
    pub last_action: Option<Movement>,
}

impl Agent {
    /// A fixed `seed` makes every episode reproducible; `None` seeds from the OS.
    pub fn new(model: Arc<TransitionModel>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut agent = Self {
            model,
            rng,
            state: 0,
            reward: 0.0,
            last_action: None,
        };
        agent.reset();
        agent
    }

    pub fn reset(&mut self) -> State {
        self.state = self.model.sample_initial(&mut self.rng);
        self.reward = 0.0;
        self.last_action = None;
        self.state
    }

    pub fn step(&mut self, movement: Movement) -> Step {
        let outcome = *self.model.sample(self.state, movement, &mut self.rng);
        trace!(from = self.state, to = outcome.next_state, action = movement.name(), "step");

        self.state = outcome.next_state;
        self.reward += outcome.reward;
        self.last_action = Some(movement);

        Step {
            state: outcome.next_state,
            reward: outcome.reward,
            done: outcome.done,
        }
    }

    pub fn is_done(&self) -> bool {
        self.model.is_terminal(self.state)
    }

    /// Text frame of `grid` with the agent's cell highlighted.
    pub fn render(&self, grid: &Grid) -> String {
        self.frame(grid, true)
    }

    pub fn render_plain(&self, grid: &Grid) -> String {
        self.frame(grid, false)
    }

    fn frame(&self, grid: &Grid, color: bool) -> String {
        let pos = grid.to_pos(self.state);
        let mut out = match self.last_action {
            Some(movement) => format!("  ({})\n", movement.name()),
            None => "\n".to_string(),
        };
        for (row, line) in grid.lines().iter().enumerate() {
            for (col, tag) in line.chars().enumerate() {
                if color && row == pos.row && col == pos.col {
                    out.push_str(HIGHLIGHT);
                    out.push(tag);
                    out.push_str(RESET);
                } else {
                    out.push(tag);
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps;

    fn agent(name: &str) -> (Grid, Agent) {
        let (grid, flavor) = maps::lookup(name).unwrap();
        let model = Arc::new(flavor.build(&grid).unwrap());
        (grid, Agent::new(model, Some(42)))
    }

    #[test]
    fn reset_lands_on_the_start_cell() {
        let (_, mut agent) = agent("4x4:1");
        assert_eq!(agent.reset(), 0);
        assert_eq!(agent.last_action, None);
        assert_eq!(agent.reward, 0.0);
    }

    #[test]
    fn step_follows_the_table_and_accumulates_reward() {
        let (_, mut agent) = agent("4x4:1");
        // S W W R: two steps right over water, third onto a rock
        assert_eq!(agent.step(Movement::Right), Step { state: 1, reward: 0.0, done: false });
        assert_eq!(agent.step(Movement::Right), Step { state: 2, reward: 0.0, done: false });
        assert_eq!(agent.step(Movement::Right), Step { state: 3, reward: -1.0, done: false });
        // below the rock is land
        assert_eq!(agent.step(Movement::Down), Step { state: 7, reward: -5.0, done: true });
        assert_eq!(agent.reward, -6.0);
        assert!(agent.is_done());
    }

    #[test]
    fn terminal_state_stays_put() {
        let (_, mut agent) = agent("4x4:1");
        // S, W, R, L down the first column
        agent.step(Movement::Down);
        agent.step(Movement::Down);
        let landed = agent.step(Movement::Down);
        assert_eq!(landed, Step { state: 12, reward: -5.0, done: true });
        for movement in Movement::ALL.iter() {
            assert_eq!(agent.step(*movement), Step { state: 12, reward: 0.0, done: true });
        }
        assert_eq!(agent.reward, -6.0);
    }

    #[test]
    fn render_marks_last_action_and_position() {
        let (grid, mut agent) = agent("4x4:1");
        assert_eq!(agent.render_plain(&grid), "\nSWWR\nWWRL\nRWRL\nLRWG\n");
        agent.step(Movement::Right);
        let frame = agent.render(&grid);
        assert!(frame.starts_with("  (Right)\n"));
        assert!(frame.contains("S\x1b[41mW\x1b[0mWR"));
    }

    #[test]
    fn same_seed_same_episode() {
        let (_, mut a) = agent("8x8:extrahard");
        let (_, mut b) = agent("8x8:extrahard");
        for i in 0..30 {
            let movement = Movement::ALL[i % 4];
            assert_eq!(a.step(movement), b.step(movement));
        }
    }
}
