use {
    candle_core::{
        Device,
        Result,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    rand_distr::StandardNormal,
};

/// An Ornstein-Uhlenbeck process for temporally correlated exploration noise.
///
/// Each call to [`OuNoise::sample`] advances the process by one Euler step:
///
/// `x <- x + theta * (mu - x) * dt + sigma * sqrt(dt) * N(0, 1)`
///
/// The process must be [`reset`](OuNoise::reset) at every episode boundary,
/// otherwise the accumulated drift carries over into the next episode.
pub struct OuNoise {
    mu: Tensor,
    theta: f64,
    sigma: f64,
    dt: f64,
    x0: Option<Tensor>,
    state: Tensor,
    rng: StdRng,
}
impl OuNoise {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mu: f64,
        theta: f64,
        sigma: f64,
        dt: f64,
        x0: Option<Tensor>,
        size_action: usize,
        device: &Device,
        seed: u64,
    ) -> Result<Self> {
        let mu = Tensor::full(mu, size_action, device)?;
        let state = match &x0 {
            Some(x0) => x0.clone(),
            None => mu.zeros_like()?,
        };
        Ok(Self {
            mu,
            theta,
            sigma,
            dt,
            x0,
            state,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Advance the process by one step and return the new value.
    pub fn sample(&mut self) -> Result<Tensor> {
        let size_action = self.mu.dims1()?;
        let eps = (0..size_action)
            .map(|_| self.rng.sample(StandardNormal))
            .collect::<Vec<f64>>();
        let eps = Tensor::from_vec(eps, size_action, self.mu.device())?;

        let drift = ((self.theta * (&self.mu - &self.state)?)? * self.dt)?;
        let diffusion = ((self.sigma * self.dt.sqrt()) * eps)?;
        self.state = ((&self.state + drift)? + diffusion)?;
        Ok(self.state.clone())
    }

    /// Reset the process to its initial value, or to zero if none was given.
    pub fn reset(&mut self) -> Result<()> {
        self.state = match &self.x0 {
            Some(x0) => x0.clone(),
            None => self.mu.zeros_like()?,
        };
        Ok(())
    }
}
