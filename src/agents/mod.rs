mod configs;
mod ddpg;

pub use configs::{
    ActorCriticConfig,
    AlgorithmConfig,
    DDPGConfig,
    OffPolicyConfig,
};
pub use ddpg::DDPG;


use {
    crate::components::ReplayBuffer,
    candle_core::{
        Device,
        Result,
        Tensor,
    },
    std::{
        fmt::Display,
        ops::RangeInclusive,
    },
};


/// The execution mode of an agent is either training or testing.
///
/// In training mode, exploration noise is added to the actions.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Test,
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Train => write!(f, "Train"),
            RunMode::Test => write!(f, "Test"),
        }
    }
}

pub trait Algorithm {
    type Config;

    fn config(&self) -> &Self::Config;
    fn from_config(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
        action_domain: &[RangeInclusive<f64>],
    ) -> Result<Box<Self>>;

    fn actions(
        &mut self,
        state: &Tensor,
    ) -> Result<Tensor>;

    fn train(&mut self) -> Result<()>;

    /// Reset any per-episode state, e.g. the exploration noise process.
    fn reset(&mut self) -> Result<()>;

    fn run_mode(&self) -> RunMode;
    fn set_run_mode(&mut self, mode: RunMode);
}

pub trait OffPolicyAlgorithm: Algorithm {
    #[allow(clippy::too_many_arguments)]
    fn remember(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: bool,
        truncated: bool,
    ) -> Result<()>;

    fn replay_buffer(&self) -> &ReplayBuffer;
}
