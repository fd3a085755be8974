use {
    crate::{
        agents::{
            Algorithm,
            AlgorithmConfig,
            OffPolicyAlgorithm,
            OffPolicyConfig,
            RunMode,
        },
        envs::{
            Environment,
            Sampleable,
            TensorConvertible,
        },
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::Serialize,
    std::{
        fmt::Debug,
        fs::{
            create_dir_all,
            File,
        },
        io::Write,
        path::Path,
    },
    tracing::warn,
};


/// Train an agent for `config.max_episodes()` episodes and return the
/// per-episode returns along with the per-episode success flags.
///
/// Every episode starts with a seeded environment reset and a reset of the
/// agent's exploration state. Each step is a strict sequence: select an
/// action, step the environment, store the transition, learn. Early on the
/// learn steps are no-ops until the replay buffer holds a full batch.
pub fn train<Alg, Env, Obs, Act>(
    env: &mut Env,
    agent: &mut Alg,
    config: Alg::Config,
    device: &Device,
    rng: &mut StdRng,
) -> Result<(Vec<f64>, Vec<bool>)>
where
    Alg: Algorithm + OffPolicyAlgorithm,
    Alg::Config: AlgorithmConfig + OffPolicyConfig,
    Env: Environment<Action = Act, Observation = Obs>,
    Obs: Debug + Clone + TensorConvertible,
    Act: Clone + TensorConvertible + Sampleable,
{
    warn!("action space: {:?}", env.action_space());
    warn!("observation space: {:?}", env.observation_space());

    let mut steps_taken = 0;
    let mut mc_returns = Vec::new();
    let mut successes = Vec::new();

    for episode in 0..config.max_episodes() {
        let mut total_reward = 0.0;
        env.reset(rng.gen::<u64>())?;
        agent.reset()?;

        loop {
            let observation = env.current_observation();
            let state = &<Obs>::to_tensor(observation, device)?;

            // select an action, or randomly sample one
            let action = if steps_taken < config.initial_random_actions() {
                <Act>::to_vec(<Act>::sample(rng, &env.action_domain()))
            } else {
                agent.actions(state)?.to_vec1::<f64>()?
            };

            let step = env.step(<Act>::from_vec(action.clone()))?;
            total_reward += step.reward;
            steps_taken += 1;

            if let RunMode::Train = agent.run_mode() {
                agent.remember(
                    state,
                    &Tensor::new(action, device)?,
                    &Tensor::new(vec![step.reward], device)?,
                    &<Obs>::to_tensor(step.observation, device)?,
                    step.terminated,
                    step.truncated,
                )?;
                for _ in 0..config.training_iterations() {
                    agent.train()?;
                }
            }

            if step.terminated || step.truncated {
                successes.push(step.terminated);
                break;
            }
        }

        mc_returns.push(total_reward);
        let window = &mc_returns[mc_returns.len().saturating_sub(100)..];
        let average = window.iter().sum::<f64>() / window.len() as f64;
        warn!(
            "episode {episode} with total reward of {total_reward:.1} \
             (average of last {}: {average:.1})",
            window.len(),
        );
    }
    Ok((mc_returns, successes))
}

/// Perform `n_runs` independent training runs, writing the algorithm and
/// environment configs plus the per-run returns as pretty RON under
/// `data/<path>/`.
///
/// Each run gets a fresh agent built from the config, with the seed offset
/// by the run index so the runs are reproducible but not identical.
pub fn run_n<Alg, Env, Obs, Act>(
    path: &dyn AsRef<Path>,
    n_runs: usize,
    env: &mut Env,
    config: Alg::Config,
    device: &Device,
) -> Result<()>
where
    Alg: Algorithm + OffPolicyAlgorithm,
    Alg::Config: Clone + Serialize + AlgorithmConfig + OffPolicyConfig,
    Env: Environment<Action = Act, Observation = Obs>,
    Env::Config: Serialize,
    Obs: Debug + Clone + TensorConvertible,
    Act: Clone + TensorConvertible + Sampleable,
{
    let path = Path::new("data/").join(path);

    if path.join("config_algorithm.ron").try_exists()? {
        Err(anyhow!(concat!(
            "Algorithm config already exists in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )))?
    }

    create_dir_all(path.as_path())?;

    File::create(path.join("config_algorithm.ron"))?.write_all(
        ron::ser::to_string_pretty(
            &config,
            ron::ser::PrettyConfig::default(),
        )?.as_bytes()
    )?;

    File::create(path.join("config_environment.ron"))?.write_all(
        ron::ser::to_string_pretty(
            &env.config(),
            ron::ser::PrettyConfig::default(),
        )?.as_bytes()
    )?;

    for n in 0..n_runs {
        warn!("Collecting data, run {n}/{n_runs}");
        let mut run_config = config.clone();
        run_config.set_seed(config.seed().wrapping_add(n as u64));

        let mut rng = StdRng::seed_from_u64(run_config.seed());
        let mut agent = *Alg::from_config(
            device,
            &run_config,
            env.observation_space().iter().product::<usize>(),
            env.action_space().iter().product::<usize>(),
            &env.action_domain(),
        )?;
        let (mc_returns, successes) = train(
            env,
            &mut agent,
            run_config,
            device,
            &mut rng,
        )?;

        File::create(path.join(format!("run_{n}_returns.ron")))?.write_all(
            ron::ser::to_string_pretty(
                &(mc_returns, successes),
                ron::ser::PrettyConfig::default(),
            )?.as_bytes()
        )?;
    }
    Ok(())
}
