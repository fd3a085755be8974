use {
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    ddpg_rl::{
        agents::{
            Algorithm,
            DDPGConfig,
            RunMode,
            DDPG,
        },
        engine::train,
        envs::{
            Environment,
            PendulumConfig,
            PendulumEnv,
        },
    },
    rand::{
        rngs::StdRng,
        SeedableRng,
    },
};

fn small_config() -> DDPGConfig {
    DDPGConfig {
        hidden_1_size: 16,
        hidden_2_size: 16,
        replay_buffer_capacity: 1_000,
        training_batch_size: 16,
        max_episodes: 2,
        ..DDPGConfig::pendulum()
    }
}

fn small_env() -> Result<PendulumEnv> {
    Ok(*PendulumEnv::new(PendulumConfig {
        timelimit: 20,
        ..Default::default()
    })?)
}

fn agent(
    config: &DDPGConfig,
    env: &PendulumEnv,
    device: &Device,
) -> Result<DDPG<'static>> {
    Ok(*DDPG::from_config(
        device,
        config,
        env.observation_space().iter().product::<usize>(),
        env.action_space().iter().product::<usize>(),
        &env.action_domain(),
    )?)
}

#[test]
fn a_short_training_run_completes() -> Result<()> {
    let device = Device::Cpu;
    let mut env = small_env()?;
    let config = small_config();
    let mut agent = agent(&config, &env, &device)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let (mc_returns, successes) = train(
        &mut env,
        &mut agent,
        config.clone(),
        &device,
        &mut rng,
    )?;

    assert_eq!(mc_returns.len(), config.max_episodes);
    assert_eq!(successes.len(), config.max_episodes);
    for total_reward in mc_returns {
        assert!(total_reward.is_finite());
        assert!(total_reward <= 0.0);
    }
    Ok(())
}

#[test]
fn checkpoints_restore_the_policy_exactly() -> Result<()> {
    let device = Device::Cpu;
    let mut env = small_env()?;
    let config = small_config();
    let mut trained = agent(&config, &env, &device)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    train(
        &mut env,
        &mut trained,
        config.clone(),
        &device,
        &mut rng,
    )?;

    let dir = std::env::temp_dir().join(format!("ddpg_rl_checkpoint_{}", std::process::id()));
    trained.save_checkpoint(&dir)?;

    let mut restored = agent(&config, &env, &device)?;
    restored.load_checkpoint(&dir)?;
    std::fs::remove_dir_all(&dir)?;

    trained.set_run_mode(RunMode::Test);
    restored.set_run_mode(RunMode::Test);

    let state = Tensor::new(vec![1.0, 0.0, 0.5], &device)?;
    assert_eq!(
        trained.actions(&state)?.to_vec1::<f64>()?,
        restored.actions(&state)?.to_vec1::<f64>()?,
    );
    Ok(())
}
