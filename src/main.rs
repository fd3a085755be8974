use {
    anyhow::Result,
    candle_core::Device,
    clap::Parser,
    ddpg_rl::{
        agents::{
            Algorithm,
            AlgorithmConfig,
            DDPGConfig,
            RunMode,
            DDPG,
        },
        cli::Args,
        engine::{
            run_n,
            train,
        },
        envs::{
            Environment,
            PendulumEnv,
        },
        logging::setup_logging,
    },
    rand::{
        rngs::StdRng,
        SeedableRng,
    },
    tracing::warn,
};

fn main() -> Result<()> {
    let args = Args::parse();
    if args.log.level().is_some() {
        setup_logging(
            &"debug.log",
            args.log.level(),
            args.log.level(),
        )?;
    }

    let device = Device::Cpu;
    let mut env = *PendulumEnv::new(Default::default())?;

    let mut config = DDPGConfig::pendulum();
    if let Some(episodes) = args.episodes {
        config.set_max_episodes(episodes);
    }
    if let Some(seed) = args.seed {
        config.set_seed(seed);
    }

    if let Some(output) = &args.output {
        run_n::<DDPG, _, _, _>(
            output,
            args.runs,
            &mut env,
            config,
            &device,
        )?;
        return Ok(());
    }

    let mut agent = *DDPG::from_config(
        &device,
        &config,
        env.observation_space().iter().product::<usize>(),
        env.action_space().iter().product::<usize>(),
        &env.action_domain(),
    )?;

    if let Some(dir) = &args.load_checkpoint {
        agent.load_checkpoint(dir)?;
    }
    if args.eval {
        agent.set_run_mode(RunMode::Test);
    }

    let mut rng = StdRng::seed_from_u64(config.seed());
    let (mc_returns, _) = train(
        &mut env,
        &mut agent,
        config,
        &device,
        &mut rng,
    )?;

    let window = &mc_returns[mc_returns.len().saturating_sub(100)..];
    warn!(
        "finished {} episodes with an average return of {:.1} over the last {}",
        mc_returns.len(),
        window.iter().sum::<f64>() / window.len() as f64,
        window.len(),
    );

    if let Some(dir) = &args.save_checkpoint {
        agent.save_checkpoint(dir)?;
    }
    Ok(())
}
