use thiserror::Error;

/// Failures raised while constructing an environment.
///
/// Once a `TransitionModel` exists it is total over its states and actions,
/// so none of these can surface from `reset` or `step`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("invalid map: {0}")]
    InvalidMap(String),
    #[error("tag '{0}' has no entry in the reward table")]
    UnknownTag(char),
    #[error("unknown map: {0}")]
    UnknownMap(String),
}

pub type Result<T> = std::result::Result<T, EnvError>;
