use crate::environment::{Cell, Grid, Tag, TagTable, TransitionModel};
use crate::error::{EnvError, Result};

pub const DEFAULT_MAP: &str = "4x4:1";

const MAPS: [(&str, &[&str]); 6] = [
    ("4x4:1", &[
        "SWWR",
        "WWRL",
        "RWRL",
        "LRWG",
    ]),
    ("4x4:2", &[
        "SWRL",
        "RWWR",
        "LRWW",
        "LRWG",
    ]),
    ("4x4:3", &[
        "SRLL",
        "WWRR",
        "RWWW",
        "LRWG",
    ]),
    ("4x4:4", &[
        "SWWR",
        "WLWL",
        "WWRL",
        "LRWG",
    ]),
    ("4x4:5", &[
        "SWWL",
        "LRWW",
        "RWRW",
        "WRLG",
    ]),
    ("8x8:extrahard", &[
        "SWBBWWWW",
        "WBBBBLLL",
        "LLBWBWWW",
        "WWWWWWLL",
        "LLLWWWWW",
        "WWWWBBWB",
        "LWLWWWWW",
        "WWWWWWWG",
    ]),
];

/// Reward table plus the probability attached to terminal self-loops.
#[derive(Debug, Clone, PartialEq)]
pub struct Flavor {
    pub table: TagTable,
    pub self_loop_weight: f64,
}

impl Flavor {
    /// Rocks cost 1, running aground ends the episode at -5, the goal pays 10.
    pub fn standard() -> Self {
        Self {
            table: TagTable::new()
                .with(Tag::Start, Cell::Open(0.0))
                .with(Tag::Water, Cell::Open(0.0))
                .with(Tag::Rock, Cell::Open(-1.0))
                .with(Tag::Land, Cell::Final(-5.0))
                .with(Tag::Goal, Cell::Final(10.0)),
            self_loop_weight: 1.0,
        }
    }

    /// Buoys pay 5 on every visit, the goal pays 50. Land is terminal here as
    /// well and ends the episode at -10.
    pub fn extrahard() -> Self {
        Self {
            table: TagTable::new()
                .with(Tag::Start, Cell::Open(0.0))
                .with(Tag::Water, Cell::Open(0.0))
                .with(Tag::Buoy, Cell::Open(5.0))
                .with(Tag::Land, Cell::Final(-10.0))
                .with(Tag::Goal, Cell::Final(50.0)),
            self_loop_weight: 1.0,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "extrahard" => Some(Self::extrahard()),
            _ => None,
        }
    }

    pub fn build(&self, grid: &Grid) -> Result<TransitionModel> {
        TransitionModel::build(grid, &self.table, self.self_loop_weight)
    }
}

pub fn names() -> impl Iterator<Item = &'static str> {
    MAPS.iter().map(|(name, _)| *name)
}

/// Resolves a registered map name to its grid and the flavor it is played with.
pub fn lookup(name: &str) -> Result<(Grid, Flavor)> {
    let rows = MAPS
        .iter()
        .find(|(map_name, _)| *map_name == name)
        .map(|(_, rows)| *rows)
        .ok_or_else(|| EnvError::UnknownMap(name.to_string()))?;
    let flavor = if name.starts_with("8x8") {
        Flavor::extrahard()
    } else {
        Flavor::standard()
    };
    Ok((Grid::new(rows)?, flavor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Movement;

    #[test]
    fn every_registered_map_builds() {
        for name in names() {
            let (grid, flavor) = lookup(name).unwrap();
            let model = flavor.build(&grid).unwrap();
            assert_eq!(model.n_states(), grid.rows() * grid.cols());
        }
    }

    #[test]
    fn unknown_map_name_is_rejected() {
        assert_eq!(lookup("4x4:9").err(), Some(EnvError::UnknownMap("4x4:9".to_string())));
    }

    #[test]
    fn flavors_resolve_by_name() {
        assert_eq!(Flavor::by_name("standard"), Some(Flavor::standard()));
        assert_eq!(Flavor::by_name("extrahard"), Some(Flavor::extrahard()));
        assert_eq!(Flavor::by_name("frozen"), None);
    }

    #[test]
    fn extrahard_map_uses_its_own_rewards() {
        let (grid, flavor) = lookup("8x8:extrahard").unwrap();
        assert_eq!((grid.rows(), grid.cols()), (8, 8));
        assert!(!flavor.table.contains(Tag::Rock));
        assert_eq!(flavor.table.lookup(Tag::Land), Ok(Cell::Final(-10.0)));
        let model = flavor.build(&grid).unwrap();
        assert_eq!(model.reward_range(), (-10.0, 50.0));

        // (0,1) is water, (0,2) a buoy
        let outcome = model.outcomes(1, Movement::Right)[0];
        assert_eq!((outcome.next_state, outcome.reward, outcome.done), (2, 5.0, false));
        // (1,0) is water, (2,0) land
        let outcome = model.outcomes(8, Movement::Down)[0];
        assert_eq!((outcome.next_state, outcome.reward, outcome.done), (16, -10.0, true));
        // (7,6) next to the goal in the corner
        let outcome = model.outcomes(62, Movement::Right)[0];
        assert_eq!((outcome.next_state, outcome.reward, outcome.done), (63, 50.0, true));
    }

    #[test]
    fn standard_map_starts_top_left() {
        let (grid, flavor) = lookup(DEFAULT_MAP).unwrap();
        let model = flavor.build(&grid).unwrap();
        assert_eq!(model.initial_distribution()[0], 1.0);
        assert_eq!(model.initial_distribution().sum(), 1.0);
        assert_eq!(model.reward_range(), (-5.0, 10.0));
    }
}
