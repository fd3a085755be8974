use {
    candle_core::{
        Result,
        Tensor,
    },
    rand::{
        distributions::{
            Distribution,
            Uniform,
        },
        RngCore,
    },
    unzip_n::unzip_n,
};

unzip_n!(5);

/// A transition in the replay buffer.
///
/// The terminal flag is stored as `1 - done` so that it can be multiplied
/// directly into the Bellman target (zero when the episode ended).
#[derive(Clone)]
pub struct Transition {
    state: Tensor,
    action: Tensor,
    reward: Tensor,
    next_state: Tensor,
    non_terminal: Tensor,
}
impl Transition {
    fn new(
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        non_terminal: &Tensor,
    ) -> Self {
        Self {
            state: state.clone(),
            action: action.clone(),
            reward: reward.clone(),
            next_state: next_state.clone(),
            non_terminal: non_terminal.clone(),
        }
    }
}

/// A fixed-capacity replay buffer for off-policy algorithms.
///
/// The buffer is a preallocated arena with a monotonically increasing write
/// counter: writes go to `counter % capacity`, overwriting the oldest
/// transition in place once the buffer wraps. The logical size is
/// `min(counter, capacity)`.
#[derive(Clone)]
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    counter: usize,
}
impl ReplayBuffer {
    /// Create a new replay buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            counter: 0,
        }
    }

    /// The number of transitions currently stored.
    pub fn len(&self) -> usize {
        self.counter.min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.counter == 0
    }

    /// Check if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.counter >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a transition into the buffer.
    ///
    /// If the buffer is full, the oldest transition is overwritten in place.
    pub fn push(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        non_terminal: &Tensor,
    ) {
        let transition = Transition::new(state, action, reward, next_state, non_terminal);
        let index = self.counter % self.capacity;
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[index] = transition;
        }
        self.counter += 1;
    }

    /// Sample a random batch of transitions, uniformly and with replacement.
    ///
    /// When fewer than `batch_size` transitions are stored, `None` is
    /// returned. Otherwise the batch is returned as five column-aligned
    /// tensors: states, actions, rewards, next states and non-terminal masks.
    #[allow(clippy::type_complexity)]
    pub fn random_batch(
        &self,
        rng: &mut dyn RngCore,
        batch_size: usize,
    ) -> Result<Option<(Tensor, Tensor, Tensor, Tensor, Tensor)>> {
        if self.len() < batch_size {
            Ok(None)
        } else {
            let transition_to_tuple =
                |t: &Transition| -> Result<(Tensor, Tensor, Tensor, Tensor, Tensor)> {
                    Ok((
                        t.state.unsqueeze(0)?,
                        t.action.unsqueeze(0)?,
                        t.reward.unsqueeze(0)?,
                        t.next_state.unsqueeze(0)?,
                        t.non_terminal.unsqueeze(0)?,
                    ))
                };

            let indices = Uniform::from(0..self.len());
            let transitions: Vec<&Transition> = (0..batch_size)
                .map(|_| &self.buffer[indices.sample(rng)])
                .collect();

            let (states, actions, rewards, next_states, non_terminals) = transitions
                .into_iter()
                .map(transition_to_tuple)
                .collect::<Result<Vec<(Tensor, Tensor, Tensor, Tensor, Tensor)>>>()?
                .into_iter()
                .unzip_n_vec();

            Ok(Some((
                Tensor::cat(&states, 0)?,
                Tensor::cat(&actions, 0)?,
                Tensor::cat(&rewards, 0)?,
                Tensor::cat(&next_states, 0)?,
                Tensor::cat(&non_terminals, 0)?,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use rand::{rngs::StdRng, SeedableRng};

    fn push_numbered(buffer: &mut ReplayBuffer, value: f64) {
        let device = Device::Cpu;
        let state = Tensor::new(vec![value], &device).unwrap();
        let mask = Tensor::new(vec![1.0], &device).unwrap();
        buffer.push(&state, &state, &state, &state, &mask);
    }

    #[test]
    fn empty_buffer_yields_no_batch() {
        let buffer = ReplayBuffer::new(10);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(buffer.random_batch(&mut rng, 1).unwrap().is_none());
    }

    #[test]
    fn batch_waits_for_enough_transitions() {
        let mut buffer = ReplayBuffer::new(100);
        let mut rng = StdRng::seed_from_u64(0);
        for i in 0..5 {
            push_numbered(&mut buffer, i as f64);
        }
        assert!(buffer.random_batch(&mut rng, 10).unwrap().is_none());
        for i in 5..10 {
            push_numbered(&mut buffer, i as f64);
        }
        let (states, ..) = buffer.random_batch(&mut rng, 10).unwrap().unwrap();
        assert_eq!(states.dims(), &[10, 1]);
    }

    #[test]
    fn samples_come_from_stored_transitions() {
        let mut buffer = ReplayBuffer::new(8);
        let mut rng = StdRng::seed_from_u64(0);
        for i in 0..3 {
            push_numbered(&mut buffer, i as f64);
        }
        // Only slots 0..3 are valid, so every sampled state must be in 0..3.
        for _ in 0..20 {
            let (states, ..) = buffer.random_batch(&mut rng, 3).unwrap().unwrap();
            for value in states.flatten_all().unwrap().to_vec1::<f64>().unwrap() {
                assert!(value >= 0.0 && value < 3.0);
            }
        }
    }

    #[test]
    fn wrapping_overwrites_the_oldest_transitions() {
        let capacity = 6;
        let extra = 4;
        let mut buffer = ReplayBuffer::new(capacity);
        for i in 0..capacity + extra {
            push_numbered(&mut buffer, i as f64);
        }
        assert_eq!(buffer.len(), capacity);
        assert!(buffer.is_full());

        // The logical content is exactly the last `capacity` insertions.
        let mut stored: Vec<f64> = buffer
            .buffer
            .iter()
            .map(|t| t.state.to_vec1::<f64>().unwrap()[0])
            .collect();
        stored.sort_by(f64::total_cmp);
        let expected: Vec<f64> = (extra..capacity + extra).map(|i| i as f64).collect();
        assert_eq!(stored, expected);
    }
}
