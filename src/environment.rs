use std::collections::HashMap;
use std::fmt;

use ndarray::{Array1, Array2};
use ordered_float::NotNan;
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use tracing::debug;

use crate::error::{EnvError, Result};

/// Flat index of a grid cell, `row * cols + col`.
pub type State = usize;

/// Label of a single grid cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Start,
    Water,
    Rock,
    Land,
    Goal,
    Buoy,
}

impl Tag {
    pub fn from_char(c: char) -> Option<Tag> {
        match c {
            'S' => Some(Tag::Start),
            'W' => Some(Tag::Water),
            'R' => Some(Tag::Rock),
            'L' => Some(Tag::Land),
            'G' => Some(Tag::Goal),
            'B' => Some(Tag::Buoy),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Tag::Start => 'S',
            Tag::Water => 'W',
            Tag::Rock => 'R',
            Tag::Land => 'L',
            Tag::Goal => 'G',
            Tag::Buoy => 'B',
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// What entering a cell means: the reward collected and whether the episode ends there.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Cell {
    Open(f64),
    Final(f64),
}

impl Cell {
    pub fn reward(&self) -> f64 {
        match self {
            Cell::Open(reward) => *reward,
            Cell::Final(reward) => *reward,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Cell::Final(_))
    }
}

/// Reward and terminal lookup for each tag of one map flavor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagTable {
    cells: HashMap<Tag, Cell>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: Tag, cell: Cell) -> Self {
        self.insert(tag, cell);
        self
    }

    pub fn insert(&mut self, tag: Tag, cell: Cell) {
        self.cells.insert(tag, cell);
    }

    pub fn lookup(&self, tag: Tag) -> Result<Cell> {
        self.cells
            .get(&tag)
            .copied()
            .ok_or_else(|| EnvError::UnknownTag(tag.as_char()))
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.cells.contains_key(&tag)
    }

    /// Smallest and largest reward any cell can hand out, `(0, 0)` for an empty table.
    pub fn reward_range(&self) -> (f64, f64) {
        let rewards = || {
            self.cells
                .values()
                .filter_map(|cell| NotNan::new(cell.reward()).ok())
        };
        match (rewards().min(), rewards().max()) {
            (Some(min), Some(max)) => (min.into_inner(), max.into_inner()),
            _ => (0.0, 0.0),
        }
    }
}

// Action
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Movement {
    Left,
    Down,
    Right,
    Up,
}

impl Movement {
    pub const ALL: [Movement; 4] = [Movement::Left, Movement::Down, Movement::Right, Movement::Up];

    pub fn into_vector(self) -> (isize, isize) {
        match self {
            Movement::Up    => (-1, 0),
            Movement::Down  => ( 1, 0),
            Movement::Left  => ( 0,-1),
            Movement::Right => ( 0, 1),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Movement::Left => 0,
            Movement::Down => 1,
            Movement::Right => 2,
            Movement::Up => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Movement> {
        Movement::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Movement::Left => "Left",
            Movement::Down => "Down",
            Movement::Right => "Right",
            Movement::Up => "Up",
        }
    }
}

impl Distribution<Movement> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Movement {
        Movement::ALL[rng.gen_range(0..Movement::ALL.len())]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

/// Immutable rectangular map of cell tags, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    desc: Array2<Tag>,
}

impl Grid {
    /// Parses a map from equal-length rows of tag characters.
    ///
    /// Fails with `EnvError::InvalidMap` when the grid is empty, ragged,
    /// contains a character outside the tag alphabet or has no start cell.
    pub fn new<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let ncol = match rows.first() {
            Some(first) => first.as_ref().chars().count(),
            None => return Err(EnvError::InvalidMap("grid has no rows".to_string())),
        };
        if ncol == 0 {
            return Err(EnvError::InvalidMap("grid has empty rows".to_string()));
        }

        let mut tags = Vec::with_capacity(rows.len() * ncol);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let len = row.chars().count();
            if len != ncol {
                return Err(EnvError::InvalidMap(format!(
                    "row {} has length {}, expected {}", i, len, ncol
                )));
            }
            for c in row.chars() {
                let tag = Tag::from_char(c).ok_or_else(|| {
                    EnvError::InvalidMap(format!("unrecognized tag '{}' in row {}", c, i))
                })?;
                tags.push(tag);
            }
        }

        if !tags.contains(&Tag::Start) {
            return Err(EnvError::InvalidMap("no start cell".to_string()));
        }

        let desc = Array2::from_shape_vec((rows.len(), ncol), tags)
            .map_err(|e| EnvError::InvalidMap(e.to_string()))?;
        Ok(Self { desc })
    }

    pub fn rows(&self) -> usize {
        self.desc.nrows()
    }

    pub fn cols(&self) -> usize {
        self.desc.ncols()
    }

    pub fn size(&self) -> Pos {
        Pos { row: self.rows(), col: self.cols() }
    }

    /// Panics if `(row, col)` lies outside the grid.
    pub fn tag_at(&self, row: usize, col: usize) -> Tag {
        self.desc[[row, col]]
    }

    pub fn to_state(&self, pos: Pos) -> State {
        pos.row * self.cols() + pos.col
    }

    pub fn to_pos(&self, state: State) -> Pos {
        Pos { row: state / self.cols(), col: state % self.cols() }
    }

    /// Cell reached by `movement` from `pos`; walking into a wall leaves the
    /// blocked coordinate where it was.
    pub fn check_movement(&self, pos: Pos, movement: Movement) -> Pos {
        let (d_row, d_col) = movement.into_vector();
        let boundaries = (self.rows() as isize, self.cols() as isize);
        let new_row = (pos.row as isize + d_row).max(0).min(boundaries.0 - 1);
        let new_col = (pos.col as isize + d_col).max(0).min(boundaries.1 - 1);

        Pos { row: new_row as usize, col: new_col as usize }
    }

    pub fn iter_all_coordinates(&self) -> EnvIter {
        EnvIter::new(self.size())
    }

    pub fn lines(&self) -> Vec<String> {
        self.desc
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|tag| tag.to_string()).collect())
            .collect()
    }
}

/// Row-major walk over every coordinate of a grid.
pub struct EnvIter {
    row: usize,
    col: usize,
    first: bool,
    size: Pos,
}

impl EnvIter {
    fn new(size: Pos) -> EnvIter {
        EnvIter {
            size,
            row: 0,
            col: 0,
            first: true,
        }
    }
}

impl Iterator for EnvIter {
    type Item = Pos;

    fn next(&mut self) -> Option<Pos> {
        if self.row >= self.size.row || self.size.col == 0 {
            return None;
        }
        if self.first {
            self.first = false;
            return Some(Pos { row: 0, col: 0 });
        }
        self.col += 1;
        if self.col == self.size.col {
            self.col = 0;
            self.row += 1;
            if self.row == self.size.row {
                return None;
            }
        }
        Some(Pos { row: self.row, col: self.col })
    }
}

/// One possible result of taking an action.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Outcome {
    pub probability: f64,
    pub next_state: State,
    pub reward: f64,
    pub done: bool,
}

/// Precomputed outcomes for every `(state, action)` pair of a grid, together
/// with the distribution episodes start from.
///
/// Built once and never mutated afterwards, so it can be shared between any
/// number of episode drivers.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionModel {
    transition: Vec<[Vec<Outcome>; 4]>,
    terminal: Vec<bool>,
    isd: Array1<f64>,
    reward_range: (f64, f64),
}

impl TransitionModel {
    /// Compiles `grid` into a transition table using `table` for rewards and
    /// terminal flags.
    ///
    /// Terminal cells are absorbing: every action loops back with reward 0,
    /// `done` set and probability `self_loop_weight`.
    pub fn build(grid: &Grid, table: &TagTable, self_loop_weight: f64) -> Result<Self> {
        let n_states = grid.rows() * grid.cols();
        let mut transition = Vec::with_capacity(n_states);
        let mut terminal = Vec::with_capacity(n_states);

        for pos in grid.iter_all_coordinates() {
            let state = grid.to_state(pos);
            let cell = table.lookup(grid.tag_at(pos.row, pos.col))?;
            terminal.push(cell.is_terminal());

            let mut options: [Vec<Outcome>; 4] = Default::default();
            for movement in Movement::ALL.iter() {
                let outcome = if cell.is_terminal() {
                    Outcome {
                        probability: self_loop_weight,
                        next_state: state,
                        reward: 0.0,
                        done: true,
                    }
                } else {
                    let new_pos = grid.check_movement(pos, *movement);
                    let target = table.lookup(grid.tag_at(new_pos.row, new_pos.col))?;
                    Outcome {
                        probability: 1.0,
                        next_state: grid.to_state(new_pos),
                        reward: target.reward(),
                        done: target.is_terminal(),
                    }
                };
                options[movement.index()].push(outcome);
            }
            transition.push(options);
        }

        let mut isd: Array1<f64> = grid
            .iter_all_coordinates()
            .map(|pos| if grid.tag_at(pos.row, pos.col) == Tag::Start { 1.0 } else { 0.0 })
            .collect();
        let starts = isd.sum();
        isd.mapv_inplace(|p| p / starts);

        debug!(rows = grid.rows(), cols = grid.cols(), starts, "transition model built");

        Ok(Self {
            transition,
            terminal,
            isd,
            reward_range: table.reward_range(),
        })
    }

    pub fn n_states(&self) -> usize {
        self.transition.len()
    }

    pub fn n_actions(&self) -> usize {
        Movement::ALL.len()
    }

    /// Panics if `state` is not below `n_states()`.
    pub fn outcomes(&self, state: State, movement: Movement) -> &[Outcome] {
        &self.transition[state][movement.index()]
    }

    pub fn initial_distribution(&self) -> &Array1<f64> {
        &self.isd
    }

    pub fn is_terminal(&self, state: State) -> bool {
        self.terminal[state]
    }

    pub fn reward_range(&self) -> (f64, f64) {
        self.reward_range
    }

    /// Every entry of the table as `(state, action, outcome)`, in state then action order.
    pub fn iter(&self) -> impl Iterator<Item = (State, Movement, &Outcome)> + '_ {
        self.transition.iter().enumerate().flat_map(|(state, options)| {
            Movement::ALL.iter().flat_map(move |movement| {
                options[movement.index()]
                    .iter()
                    .map(move |outcome| (state, *movement, outcome))
            })
        })
    }

    /// Picks the outcome of `movement` from `state`. A single entry is returned
    /// as is, several entries are drawn in proportion to their weights.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        state: State,
        movement: Movement,
        rng: &mut R,
    ) -> &Outcome {
        let options = self.outcomes(state, movement);
        if options.len() == 1 {
            return &options[0];
        }
        let weights: Vec<f64> = options.iter().map(|o| o.probability).collect();
        let index = pick_weighted(&weights, rng);
        &options[index]
    }

    pub fn sample_initial<R: Rng + ?Sized>(&self, rng: &mut R) -> State {
        pick_weighted(&self.isd.to_vec(), rng)
    }
}

fn pick_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    let r = rng.gen::<f64>() * total;
    let mut tot_p = 0.0;
    let mut last = 0;
    for (i, &p) in weights.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        tot_p += p;
        last = i;
        if tot_p > r {
            return i;
        }
    }
    last
}
