//! # Components
//!
//! This module contains the components that can be used to build an agent.
//!
//! ## Noise
//!
//! The [`OuNoise`] struct implements the Ornstein-Uhlenbeck process, which
//! adds temporally correlated noise to the actions of an agent during
//! training, for example in the [`crate::agents::DDPG`] algorithm.
//!
//! ## Replay Buffer
//!
//! The [`ReplayBuffer`] struct implements a fixed-capacity replay buffer,
//! which is typically used in off-policy algorithms such as
//! [`crate::agents::DDPG`].

mod ou_noise;
mod replay_buffer;

pub use ou_noise::OuNoise;
pub use replay_buffer::ReplayBuffer;
