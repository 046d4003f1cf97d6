//! Grid world for reinforcement learning experiments: a boat crosses a small
//! map of water, rocks and land towards a goal, and every move is looked up in
//! a transition table compiled once from the map.

pub mod agent;
pub mod environment;
pub mod error;
pub mod export;
pub mod maps;

pub use agent::{Agent, Step};
pub use environment::{Cell, Grid, Movement, Outcome, Pos, State, Tag, TagTable, TransitionModel};
pub use error::{EnvError, Result};
pub use maps::Flavor;
