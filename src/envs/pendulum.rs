use {
    super::{
        Environment,
        Sampleable,
        Step,
        TensorConvertible,
        VectorConvertible,
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        distributions::{
            Distribution,
            Uniform,
        },
        rngs::StdRng,
        RngCore,
        SeedableRng,
    },
    serde::Serialize,
    std::{
        f64::consts::PI,
        ops::RangeInclusive,
    },
};

/// Wrap an angle into `[-PI, PI)`.
fn angle_normalize(x: f64) -> f64 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

#[derive(Clone, Serialize)]
pub struct PendulumConfig {
    pub gravity: f64,
    pub mass: f64,
    pub length: f64,
    pub dt: f64,
    pub max_torque: f64,
    pub max_speed: f64,
    pub timelimit: usize,
}
impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            gravity: 10.0,
            mass: 1.0,
            length: 1.0,
            dt: 0.05,
            max_torque: 2.0,
            max_speed: 8.0,
            timelimit: 200,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PendulumAction {
    // Torque applied to the free end of the pendulum
    tau: f64,
}
// Convert Vec<f64> into PendulumAction
impl VectorConvertible for PendulumAction {
    fn from_vec(value: Vec<f64>) -> Self {
        Self { tau: value[0] }
    }
    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.tau]
    }
}
// Convert Tensor into PendulumAction
impl TensorConvertible for PendulumAction {
    fn from_tensor(value: Tensor) -> Self {
        Self::from_vec(value.to_vec1::<f64>().unwrap())
    }
    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        Tensor::new(Self::to_vec(value), device)
    }
}
impl Sampleable for PendulumAction {
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self {
        Self {
            tau: Uniform::from(domain[0].clone()).sample(rng),
        }
    }
}

/// The pendulum observation avoids the discontinuity of the raw angle by
/// exposing `(cos(theta), sin(theta), theta_dot)`.
#[derive(Clone, Debug)]
pub struct PendulumObservation {
    // The (x, y) coordinates of the free end of the pendulum
    x: f64,
    y: f64,
    // The angular velocity of the pendulum
    theta_dot: f64,
}
// Convert Vec<f64> into PendulumObservation
impl VectorConvertible for PendulumObservation {
    fn from_vec(value: Vec<f64>) -> Self {
        Self {
            x: value[0],
            y: value[1],
            theta_dot: value[2],
        }
    }
    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.x, value.y, value.theta_dot]
    }
}
// Convert Tensor into PendulumObservation
impl TensorConvertible for PendulumObservation {
    fn from_tensor(value: Tensor) -> Self {
        Self::from_vec(value.to_vec1::<f64>().unwrap())
    }
    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        Tensor::new(Self::to_vec(value), device)
    }
}

/// The classic pendulum swing-up task with a continuous action space.
///
/// The pendulum starts at a random angle and the goal is to swing it up and
/// balance it by applying torque at the pivot. The per-step reward is
/// `-(theta^2 + 0.1 * theta_dot^2 + 0.001 * torque^2)`, where `theta` is the
/// angle measured from upright. Episodes never terminate, they are truncated
/// at the timelimit.
pub struct PendulumEnv {
    config: PendulumConfig,
    theta: f64,
    theta_dot: f64,
    steps: usize,
}

impl Environment for PendulumEnv {
    type Config = PendulumConfig;
    type Action = PendulumAction;
    type Observation = PendulumObservation;

    fn new(config: Self::Config) -> Result<Box<Self>> {
        Ok(Box::new(Self {
            config,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
        }))
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Self::Observation> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.theta = Uniform::from(-PI..PI).sample(&mut rng);
        self.theta_dot = Uniform::from(-1.0..1.0).sample(&mut rng);
        self.steps = 0;
        Ok(self.current_observation())
    }

    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>> {
        let PendulumConfig {
            gravity: g,
            mass: m,
            length: l,
            dt,
            max_torque,
            max_speed,
            timelimit,
        } = self.config.clone();

        let torque = action.tau.clamp(-max_torque, max_torque);
        let cost = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2);

        let theta_acc = 3.0 * g / (2.0 * l) * self.theta.sin() + 3.0 / (m * l * l) * torque;
        self.theta_dot = (self.theta_dot + theta_acc * dt).clamp(-max_speed, max_speed);
        self.theta += self.theta_dot * dt;
        self.steps += 1;

        Ok(Step {
            observation: self.current_observation(),
            action,
            reward: -cost,
            terminated: false,
            truncated: self.steps >= timelimit,
        })
    }

    fn timelimit(&self) -> usize {
        self.config.timelimit
    }

    fn action_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn action_domain(&self) -> Vec<RangeInclusive<f64>> {
        vec![-self.config.max_torque..=self.config.max_torque]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![3]
    }

    fn observation_domain(&self) -> Vec<RangeInclusive<f64>> {
        vec![
            -1.0..=1.0,
            -1.0..=1.0,
            -self.config.max_speed..=self.config.max_speed,
        ]
    }

    fn current_observation(&self) -> Self::Observation {
        PendulumObservation {
            x: self.theta.cos(),
            y: self.theta.sin(),
            theta_dot: self.theta_dot,
        }
    }

    fn value_range(&self) -> (f64, f64) {
        let worst_step = PI.powi(2)
            + 0.1 * self.config.max_speed.powi(2)
            + 0.001 * self.config.max_torque.powi(2);
        (-worst_step * self.config.timelimit as f64, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_stay_in_their_domain() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        env.reset(42).unwrap();

        for i in 0..50 {
            let obs = env
                .step(PendulumAction {
                    tau: if i % 2 == 0 { 100.0 } else { -100.0 },
                })
                .unwrap()
                .observation;
            assert!(obs.x.abs() <= 1.0);
            assert!(obs.y.abs() <= 1.0);
            assert!(obs.theta_dot.abs() <= env.config.max_speed);
        }
    }

    #[test]
    fn upright_beats_hanging() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();

        env.theta = 0.0;
        env.theta_dot = 0.0;
        let upright = env.step(PendulumAction { tau: 0.0 }).unwrap().reward;

        env.theta = PI;
        env.theta_dot = 0.0;
        let hanging = env.step(PendulumAction { tau: 0.0 }).unwrap().reward;

        assert!(upright > -1e-6);
        assert!(hanging < upright);
    }

    #[test]
    fn episodes_truncate_at_the_timelimit() {
        let mut env = *PendulumEnv::new(PendulumConfig {
            timelimit: 5,
            ..Default::default()
        })
        .unwrap();
        env.reset(0).unwrap();

        for i in 1..=5 {
            let step = env.step(PendulumAction { tau: 0.0 }).unwrap();
            assert!(!step.terminated);
            assert_eq!(step.truncated, i == 5);
        }
    }

    #[test]
    fn reset_is_reproducible() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        let a = env.reset(7).unwrap();
        let b = env.reset(7).unwrap();
        assert_eq!(PendulumObservation::to_vec(a), PendulumObservation::to_vec(b));
    }
}
