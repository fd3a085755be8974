use {
    clap::{
        Parser,
        ValueEnum,
    },
    tracing::Level,
};


#[derive(ValueEnum, Debug, Clone)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::Warn)]
    pub log: Loglevel,

    /// Override the number of episodes to run.
    #[arg(long)]
    pub episodes: Option<usize>,

    /// Override the seed for the noise process, sampling, and resets.
    #[arg(long)]
    pub seed: Option<u64>,

    /// The number of independent training runs.
    #[arg(long, default_value_t = 1)]
    pub runs: usize,

    /// Directory name to write the results to (under data/).
    #[arg(long)]
    pub output: Option<String>,

    /// Directory to save a checkpoint to after training.
    #[arg(long)]
    pub save_checkpoint: Option<String>,

    /// Directory to load a checkpoint from before running.
    #[arg(long)]
    pub load_checkpoint: Option<String>,

    /// Run the policy without exploration noise or learning.
    #[arg(long)]
    pub eval: bool,
}
