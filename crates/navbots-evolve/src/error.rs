use navbots_brain::PolicyError;
use navbots_core::WorldError;
use thiserror::Error;

/// Errors raised while configuring an evolution run.
#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("invalid evolution configuration: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}
