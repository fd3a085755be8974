use {
    super::{
        configs::DDPGConfig,
        Algorithm,
        OffPolicyAlgorithm,
        RunMode,
    },
    crate::components::{
        OuNoise,
        ReplayBuffer,
    },
    candle_core::{
        DType,
        Device,
        Module,
        Result,
        Tensor,
        Var,
    },
    candle_nn::{
        init::Init,
        layer_norm,
        AdamW,
        LayerNorm,
        LayerNormConfig,
        Linear,
        Optimizer,
        ParamsAdamW,
        VarBuilder,
        VarMap,
    },
    rand::{
        rngs::StdRng,
        SeedableRng,
    },
    std::{
        fs::create_dir_all,
        ops::RangeInclusive,
        path::Path,
    },
    tracing::info,
};

/// The initialization bound for the output layers of both networks, chosen
/// small so that initial actions and value estimates stay near zero.
const FINAL_LAYER_BOUND: f64 = 3e-3;

fn bounded_uniform_linear(
    in_dim: usize,
    out_dim: usize,
    bound: f64,
    vb: VarBuilder,
) -> Result<Linear> {
    let init = Init::Uniform {
        lo: -bound,
        up: bound,
    };
    let weight = vb.get_with_hints((out_dim, in_dim), "weight", init)?;
    let bias = vb.get_with_hints(out_dim, "bias", init)?;
    Ok(Linear::new(weight, Some(bias)))
}

/// A linear layer initialized uniformly in the inverse square root of its
/// fan-in, the usual stabilizing convention for the hidden layers.
fn fan_in_linear(
    in_dim: usize,
    out_dim: usize,
    vb: VarBuilder,
) -> Result<Linear> {
    bounded_uniform_linear(in_dim, out_dim, 1.0 / (in_dim as f64).sqrt(), vb)
}

/// Soft-update every `target_prefix` parameter in the varmap towards its
/// `network_prefix` counterpart: `target <- tau * network + (1 - tau) * target`.
///
/// With `tau = 1.0` this copies the live network into the target exactly,
/// with `tau = 0.0` it leaves the target untouched.
fn track(
    varmap: &mut VarMap,
    target_prefix: &str,
    network_prefix: &str,
    tau: f64,
) -> Result<()> {
    let updates = {
        let data = varmap.data().lock().unwrap();
        data.iter()
            .filter(|(name, _)| name.starts_with(target_prefix))
            .map(|(name, target)| {
                let network_name = name.replacen(target_prefix, network_prefix, 1);
                let network = data.get(&network_name).ok_or_else(|| {
                    candle_core::Error::CannotFindTensor { path: network_name }.bt()
                })?;
                Ok((
                    name.clone(),
                    ((tau * network.as_tensor())? + ((1.0 - tau) * target.as_tensor())?)?,
                ))
            })
            .collect::<Result<Vec<(String, Tensor)>>>()?
    };

    for (name, tensor) in updates {
        varmap.set_one(name, tensor)?;
    }
    Ok(())
}

/// One copy of the policy network.
///
/// `state -> fc1 -> layer-norm -> relu -> fc2 -> layer-norm -> relu -> mu -> tanh`
struct ActorNetwork {
    fc1: Linear,
    ln1: LayerNorm,
    fc2: Linear,
    ln2: LayerNorm,
    mu: Linear,
}
impl ActorNetwork {
    fn new(
        vb: &VarBuilder,
        prefix: &str,
        size_state: usize,
        hidden_1_size: usize,
        hidden_2_size: usize,
        size_action: usize,
    ) -> Result<Self> {
        Ok(Self {
            fc1: fan_in_linear(size_state, hidden_1_size, vb.pp(format!("{prefix}-fc1")))?,
            ln1: layer_norm(
                hidden_1_size,
                LayerNormConfig::default(),
                vb.pp(format!("{prefix}-ln1")),
            )?,
            fc2: fan_in_linear(hidden_1_size, hidden_2_size, vb.pp(format!("{prefix}-fc2")))?,
            ln2: layer_norm(
                hidden_2_size,
                LayerNormConfig::default(),
                vb.pp(format!("{prefix}-ln2")),
            )?,
            mu: bounded_uniform_linear(
                hidden_2_size,
                size_action,
                FINAL_LAYER_BOUND,
                vb.pp(format!("{prefix}-mu")),
            )?,
        })
    }

    fn forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        let xs = self.fc1.forward(state)?;
        let xs = self.ln1.forward(&xs)?.relu()?;
        let xs = self.fc2.forward(&xs)?;
        let xs = self.ln2.forward(&xs)?.relu()?;
        self.mu.forward(&xs)?.tanh()
    }
}

#[allow(dead_code)]
struct Actor<'a> {
    varmap: VarMap,
    vb: VarBuilder<'a>,
    network: ActorNetwork,
    target_network: ActorNetwork,
    action_scale: Tensor,
    action_bias: Tensor,
}

impl Actor<'_> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        device: &Device,
        dtype: DType,
        size_state: usize,
        hidden_1_size: usize,
        hidden_2_size: usize,
        size_action: usize,
        action_scale: Tensor,
        action_bias: Tensor,
    ) -> Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let network = ActorNetwork::new(
            &vb,
            "actor",
            size_state,
            hidden_1_size,
            hidden_2_size,
            size_action,
        )?;
        let target_network = ActorNetwork::new(
            &vb,
            "target-actor",
            size_state,
            hidden_1_size,
            hidden_2_size,
            size_action,
        )?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&mut varmap, "target-actor", "actor", 1.0)?;

        Ok(Self {
            varmap,
            vb,
            network,
            target_network,
            action_scale,
            action_bias,
        })
    }

    /// The deterministic policy, squashed and rescaled to the action bounds.
    fn forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        self.network
            .forward(state)?
            .broadcast_mul(&self.action_scale)?
            .broadcast_add(&self.action_bias)
    }

    fn target_forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        self.target_network
            .forward(state)?
            .broadcast_mul(&self.action_scale)?
            .broadcast_add(&self.action_bias)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        track(&mut self.varmap, "target-actor", "actor", tau)
    }
}

/// One copy of the value network.
///
/// The state passes through two normalized hidden layers, the action is
/// projected separately and added to the state representation before the
/// final linear layer produces the scalar estimate.
struct CriticNetwork {
    fc1: Linear,
    ln1: LayerNorm,
    fc2: Linear,
    ln2: LayerNorm,
    action_value: Linear,
    q: Linear,
}
impl CriticNetwork {
    fn new(
        vb: &VarBuilder,
        prefix: &str,
        size_state: usize,
        hidden_1_size: usize,
        hidden_2_size: usize,
        size_action: usize,
    ) -> Result<Self> {
        Ok(Self {
            fc1: fan_in_linear(size_state, hidden_1_size, vb.pp(format!("{prefix}-fc1")))?,
            ln1: layer_norm(
                hidden_1_size,
                LayerNormConfig::default(),
                vb.pp(format!("{prefix}-ln1")),
            )?,
            fc2: fan_in_linear(hidden_1_size, hidden_2_size, vb.pp(format!("{prefix}-fc2")))?,
            ln2: layer_norm(
                hidden_2_size,
                LayerNormConfig::default(),
                vb.pp(format!("{prefix}-ln2")),
            )?,
            action_value: fan_in_linear(
                size_action,
                hidden_2_size,
                vb.pp(format!("{prefix}-action-value")),
            )?,
            q: bounded_uniform_linear(
                hidden_2_size,
                1,
                FINAL_LAYER_BOUND,
                vb.pp(format!("{prefix}-q")),
            )?,
        })
    }

    fn forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        let state_value = self.fc1.forward(state)?;
        let state_value = self.ln1.forward(&state_value)?.relu()?;
        let state_value = self.fc2.forward(&state_value)?;
        let state_value = self.ln2.forward(&state_value)?;
        let action_value = self.action_value.forward(action)?.relu()?;
        let state_action_value = (state_value + action_value)?.relu()?;
        self.q.forward(&state_action_value)
    }
}

#[allow(dead_code)]
struct Critic<'a> {
    varmap: VarMap,
    vb: VarBuilder<'a>,
    network: CriticNetwork,
    target_network: CriticNetwork,
}

impl Critic<'_> {
    fn new(
        device: &Device,
        dtype: DType,
        size_state: usize,
        hidden_1_size: usize,
        hidden_2_size: usize,
        size_action: usize,
    ) -> Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let network = CriticNetwork::new(
            &vb,
            "critic",
            size_state,
            hidden_1_size,
            hidden_2_size,
            size_action,
        )?;
        let target_network = CriticNetwork::new(
            &vb,
            "target-critic",
            size_state,
            hidden_1_size,
            hidden_2_size,
            size_action,
        )?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&mut varmap, "target-critic", "critic", 1.0)?;

        Ok(Self {
            varmap,
            vb,
            network,
            target_network,
        })
    }

    fn forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        self.network.forward(state, action)
    }

    fn target_forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        self.target_network.forward(state, action)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        track(&mut self.varmap, "target-critic", "critic", tau)
    }
}

#[allow(dead_code)]
#[allow(clippy::upper_case_acronyms)]
pub struct DDPG<'a> {
    config: DDPGConfig,
    actor: Actor<'a>,
    actor_optim: AdamW,
    critic: Critic<'a>,
    critic_optim: AdamW,
    gamma: f64,
    tau: f64,
    replay_buffer: ReplayBuffer,
    batch_size: usize,
    ou_noise: OuNoise,
    sampler_rng: StdRng,
    action_low: Tensor,
    action_high: Tensor,

    size_state: usize,
    size_action: usize,
    run_mode: RunMode,
}

impl DDPG<'_> {
    /// Serialize the actor and critic parameter sets (live and target) into
    /// `actor.safetensors` and `critic.safetensors` under the directory.
    pub fn save_checkpoint(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<()> {
        let dir = dir.as_ref();
        create_dir_all(dir)?;
        self.actor.varmap.save(dir.join("actor.safetensors"))?;
        self.critic.varmap.save(dir.join("critic.safetensors"))?;
        info!("saved checkpoint to {}", dir.display());
        Ok(())
    }

    /// Load parameters previously written by
    /// [`save_checkpoint`](DDPG::save_checkpoint). The network sizes must
    /// match the ones this agent was built with.
    pub fn load_checkpoint(
        &mut self,
        dir: impl AsRef<Path>,
    ) -> Result<()> {
        let dir = dir.as_ref();
        self.actor.varmap.load(dir.join("actor.safetensors"))?;
        self.critic.varmap.load(dir.join("critic.safetensors"))?;
        info!("loaded checkpoint from {}", dir.display());
        Ok(())
    }
}

impl Algorithm for DDPG<'_> {
    type Config = DDPGConfig;

    fn config(&self) -> &DDPGConfig {
        &self.config
    }

    fn from_config(
        device: &Device,
        config: &DDPGConfig,
        size_state: usize,
        size_action: usize,
        action_domain: &[RangeInclusive<f64>],
    ) -> Result<Box<Self>> {
        let filter_by_prefix = |varmap: &VarMap, prefix: &str| {
            varmap
                .data()
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(name, var)| name.starts_with(prefix).then_some(var.clone()))
                .collect::<Vec<Var>>()
        };

        let action_low = Tensor::new(
            action_domain.iter().map(|r| *r.start()).collect::<Vec<f64>>(),
            device,
        )?;
        let action_high = Tensor::new(
            action_domain.iter().map(|r| *r.end()).collect::<Vec<f64>>(),
            device,
        )?;
        let action_scale = ((&action_high - &action_low)? * 0.5)?;
        let action_bias = ((&action_high + &action_low)? * 0.5)?;

        let actor = Actor::new(
            device,
            DType::F64,
            size_state,
            config.hidden_1_size,
            config.hidden_2_size,
            size_action,
            action_scale,
            action_bias,
        )?;
        let actor_optim = AdamW::new(
            filter_by_prefix(&actor.varmap, "actor"),
            ParamsAdamW {
                lr: config.actor_learning_rate,
                ..Default::default()
            },
        )?;

        let critic = Critic::new(
            device,
            DType::F64,
            size_state,
            config.hidden_1_size,
            config.hidden_2_size,
            size_action,
        )?;
        let critic_optim = AdamW::new(
            filter_by_prefix(&critic.varmap, "critic"),
            ParamsAdamW {
                lr: config.critic_learning_rate,
                ..Default::default()
            },
        )?;

        let ou_noise = OuNoise::new(
            config.ou_mu,
            config.ou_theta,
            config.ou_sigma,
            config.ou_dt,
            None,
            size_action,
            device,
            config.seed,
        )?;

        Ok(Box::new(Self {
            config: config.clone(),
            actor,
            actor_optim,
            critic,
            critic_optim,
            gamma: config.gamma,
            tau: config.tau,
            replay_buffer: ReplayBuffer::new(config.replay_buffer_capacity),
            batch_size: config.training_batch_size,
            ou_noise,
            sampler_rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            action_low,
            action_high,
            size_state,
            size_action,
            run_mode: RunMode::Train,
        }))
    }

    fn actions(
        &mut self,
        state: &Tensor,
    ) -> Result<Tensor> {
        // Candle assumes a batch dimension, so when we don't have one we need
        // to pretend we do by un- and resqueezing the state tensor.
        let actions = self.actor.forward(&state.detach().unsqueeze(0)?)?.squeeze(0)?;
        let actions = if let RunMode::Train = self.run_mode {
            (actions + self.ou_noise.sample()?)?
        } else {
            actions
        };
        actions
            .broadcast_minimum(&self.action_high)?
            .broadcast_maximum(&self.action_low)
    }

    fn train(&mut self) -> Result<()> {
        let (states, actions, rewards, next_states, non_terminals) =
            match self
                .replay_buffer
                .random_batch(&mut self.sampler_rng, self.batch_size)?
            {
                Some(v) => v,
                // Not enough transitions yet, which is expected early on.
                _ => return Ok(()),
            };

        let target_actions = self.actor.target_forward(&next_states)?;
        let q_next = self.critic.target_forward(&next_states, &target_actions)?;
        let q_target = (rewards + ((self.gamma * q_next)? * non_terminals)?.detach())?;

        let q = self.critic.forward(&states, &actions)?;
        let diff = (q_target - q)?;

        let critic_loss = diff.sqr()?.mean_all()?;
        self.critic_optim.backward_step(&critic_loss)?;

        let actor_loss = self
            .critic
            .forward(&states, &self.actor.forward(&states)?)?
            .mean_all()?
            .neg()?;
        self.actor_optim.backward_step(&actor_loss)?;

        self.critic.track(self.tau)?;
        self.actor.track(self.tau)?;

        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.ou_noise.reset()
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    fn set_run_mode(&mut self, mode: RunMode) {
        self.run_mode = mode;
    }
}

impl OffPolicyAlgorithm for DDPG<'_> {
    fn remember(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: bool,
        truncated: bool,
    ) -> Result<()> {
        info!(
            concat!(
                "\nPushing to replay buffer:",
                "\n{state:?}",
                "\n{action:?}",
                "\n{reward:?}",
                "\n{next_state:?}",
            ),
            state = state,
            action = action,
            reward = reward,
            next_state = next_state,
        );
        let done = terminated || truncated;
        let non_terminal = Tensor::new(vec![if done { 0.0 } else { 1.0 }], state.device())?;
        self.replay_buffer
            .push(state, action, reward, next_state, &non_terminal);
        Ok(())
    }

    fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn test_config() -> DDPGConfig {
        DDPGConfig {
            hidden_1_size: 16,
            hidden_2_size: 16,
            replay_buffer_capacity: 100,
            training_batch_size: 10,
            ..DDPGConfig::pendulum()
        }
    }

    fn test_agent() -> DDPG<'static> {
        *DDPG::from_config(
            &Device::Cpu,
            &test_config(),
            3,
            1,
            &[-2.0..=2.0],
        )
        .unwrap()
    }

    fn snapshot(
        varmap: &VarMap,
        prefix: &str,
    ) -> Vec<(String, Vec<f64>)> {
        let data = varmap.data().lock().unwrap();
        let mut entries: Vec<(String, Vec<f64>)> = data
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, var)| {
                (
                    name.clone(),
                    var.as_tensor()
                        .flatten_all()
                        .unwrap()
                        .to_vec1::<f64>()
                        .unwrap(),
                )
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn remember_random_transitions(
        agent: &mut DDPG,
        n: usize,
    ) {
        let device = Device::Cpu;
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..n {
            let state =
                Tensor::new((0..3).map(|_| rng.gen_range(-1.0..1.0)).collect::<Vec<f64>>(), &device)
                    .unwrap();
            let action = Tensor::new(vec![rng.gen_range(-2.0..2.0)], &device).unwrap();
            let reward = Tensor::new(vec![rng.gen_range(-16.0..0.0)], &device).unwrap();
            let next_state =
                Tensor::new((0..3).map(|_| rng.gen_range(-1.0..1.0)).collect::<Vec<f64>>(), &device)
                    .unwrap();
            agent
                .remember(&state, &action, &reward, &next_state, false, false)
                .unwrap();
        }
    }

    #[test]
    fn targets_start_equal_to_live_networks() {
        let agent = test_agent();
        for (varmap, target_prefix, prefix) in [
            (&agent.actor.varmap, "target-actor", "actor"),
            (&agent.critic.varmap, "target-critic", "critic"),
        ] {
            let live = snapshot(varmap, prefix);
            for (name, values) in snapshot(varmap, target_prefix) {
                let live_name = name.replacen("target-", "", 1);
                let (_, live_values) =
                    live.iter().find(|(n, _)| *n == live_name).unwrap();
                assert_eq!(&values, live_values);
            }
        }
    }

    #[test]
    fn track_with_tau_zero_is_a_no_op() {
        let mut agent = test_agent();
        remember_random_transitions(&mut agent, 20);
        agent.train().unwrap();

        let before = snapshot(&agent.critic.varmap, "target-critic");
        agent.critic.track(0.0).unwrap();
        assert_eq!(before, snapshot(&agent.critic.varmap, "target-critic"));
    }

    #[test]
    fn track_with_tau_one_copies_the_live_network() {
        let mut agent = test_agent();
        remember_random_transitions(&mut agent, 20);
        // Training diverges live and target parameters.
        agent.train().unwrap();
        let live = snapshot(&agent.critic.varmap, "critic");
        assert_ne!(
            live,
            snapshot(&agent.critic.varmap, "target-critic")
                .into_iter()
                .map(|(name, values)| (name.replacen("target-", "", 1), values))
                .collect::<Vec<(String, Vec<f64>)>>(),
        );

        agent.critic.track(1.0).unwrap();
        assert_eq!(
            live,
            snapshot(&agent.critic.varmap, "target-critic")
                .into_iter()
                .map(|(name, values)| (name.replacen("target-", "", 1), values))
                .collect::<Vec<(String, Vec<f64>)>>(),
        );
    }

    #[test]
    fn training_waits_for_a_full_batch() {
        let mut agent = test_agent();
        remember_random_transitions(&mut agent, 5);

        let before = snapshot(&agent.critic.varmap, "critic");
        agent.train().unwrap();
        assert_eq!(before, snapshot(&agent.critic.varmap, "critic"));

        remember_random_transitions(&mut agent, 10);
        agent.train().unwrap();
        assert_ne!(before, snapshot(&agent.critic.varmap, "critic"));
    }

    #[test]
    fn actions_respect_the_bounds() {
        let mut agent = test_agent();
        let state = Tensor::new(vec![1.0, 0.0, 0.5], &Device::Cpu).unwrap();
        for _ in 0..50 {
            let action = agent.actions(&state).unwrap().to_vec1::<f64>().unwrap();
            assert!(action[0] >= -2.0 && action[0] <= 2.0);
        }
    }

    #[test]
    fn evaluation_mode_is_deterministic() {
        let mut agent = test_agent();
        agent.set_run_mode(RunMode::Test);
        let state = Tensor::new(vec![1.0, 0.0, 0.5], &Device::Cpu).unwrap();
        let a = agent.actions(&state).unwrap().to_vec1::<f64>().unwrap();
        let b = agent.actions(&state).unwrap().to_vec1::<f64>().unwrap();
        assert_eq!(a, b);
    }
}
