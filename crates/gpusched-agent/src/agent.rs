//! DQN agent: epsilon-greedy action selection, experience recording and
//! periodic learning with a softly tracking target network

use gpusched_core::rng::AGENT_STREAM;
use gpusched_core::{seeded, AgentConfig, SchedConfig, SchedError, SchedResult, SchedRng};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use tracing::{debug, info};

use crate::network::{argmax, QNetwork};
use crate::optimizer::{self, Optimizer};
use crate::replay::{Batch, Experience, ReplayBuffer};

/// Learned policy for one simulation run.
///
/// Owns its networks, optimizer state, replay buffer and random source; none
/// of them is shared with another agent.
pub struct Agent {
    config: AgentConfig,
    /// Continuously trained network
    local: QNetwork,
    /// Lagged network used for bootstrap targets
    target: QNetwork,
    optimizer: Box<dyn Optimizer>,
    memory: ReplayBuffer,
    rng: SchedRng,
    /// Steps recorded since the last learning step, modulo `update_every`
    t_step: usize,
    learn_steps: u64,
}

impl Agent {
    /// Create an agent for states of `state_size` features choosing among
    /// `action_size` actions
    pub fn new(
        config: AgentConfig,
        state_size: usize,
        action_size: usize,
        seed: u64,
    ) -> SchedResult<Self> {
        config.validate()?;
        if state_size == 0 || action_size == 0 {
            return Err(SchedError::Agent(format!(
                "state and action sizes must be positive, got {} and {}",
                state_size, action_size
            )));
        }

        let mut rng = seeded(seed, AGENT_STREAM);
        let local = QNetwork::new(state_size, action_size, config.hidden_units, &mut rng);
        let target = local.clone();

        info!(
            state_size,
            action_size,
            hidden = ?config.hidden_units,
            buffer_size = config.buffer_size,
            optimizer = ?config.optimizer,
            "Agent initialized"
        );

        Ok(Self {
            optimizer: optimizer::build(config.optimizer, config.learning_rate),
            memory: ReplayBuffer::new(config.buffer_size),
            config,
            local,
            target,
            rng,
            t_step: 0,
            learn_steps: 0,
        })
    }

    pub fn from_config(config: &SchedConfig, state_size: usize, action_size: usize) -> SchedResult<Self> {
        Self::new(config.agent.clone(), state_size, action_size, config.seed)
    }

    pub fn state_size(&self) -> usize {
        self.local.state_size()
    }

    pub fn action_size(&self) -> usize {
        self.local.action_size()
    }

    /// Local network action values for `state`
    pub fn action_values(&self, state: &[f32]) -> SchedResult<Array1<f32>> {
        self.check_state(state)?;
        Ok(self.local.predict(state))
    }

    /// Pick an action: greedy with probability `1 - eps`, uniform otherwise.
    /// `eps` is clamped to `[0, 1]`.
    pub fn act(&mut self, state: &[f32], eps: f32) -> SchedResult<usize> {
        let values = self.action_values(state)?;
        let eps = if eps.is_nan() { 0.0 } else { eps.clamp(0.0, 1.0) };
        if self.rng.gen_bool(eps as f64) {
            Ok(self.rng.gen_range(0..self.action_size()))
        } else {
            Ok(argmax(&values))
        }
    }

    /// Record a transition and learn every `update_every` steps once the
    /// buffer holds more than one batch. Returns the loss when a learning
    /// step ran.
    pub fn step(
        &mut self,
        state: &[f32],
        action: usize,
        reward: f32,
        next_state: &[f32],
        done: bool,
    ) -> SchedResult<Option<f32>> {
        self.check_state(state)?;
        self.check_state(next_state)?;
        if action >= self.action_size() {
            return Err(SchedError::Agent(format!(
                "action {} out of range for {} actions",
                action,
                self.action_size()
            )));
        }

        self.memory.push(Experience {
            state: state.to_vec(),
            action,
            reward,
            next_state: next_state.to_vec(),
            done,
        });

        self.t_step = (self.t_step + 1) % self.config.update_every;
        if self.t_step != 0 || self.memory.len() <= self.config.batch_size {
            return Ok(None);
        }

        match self.memory.sample(self.config.batch_size, &mut self.rng) {
            Some(batch) => self.learn(&batch).map(Some),
            None => Ok(None),
        }
    }

    /// One gradient step on `batch`, followed by a soft target update.
    /// Returns the mean squared TD error before the step.
    pub fn learn(&mut self, batch: &Batch) -> SchedResult<f32> {
        self.check_batch(batch)?;
        let gamma = self.config.gamma;
        let q_next = self.target.forward(&batch.next_states);
        let max_next = q_next.map_axis(Axis(1), |row| {
            row.fold(f32::NEG_INFINITY, |best, &v| best.max(v))
        });

        let cache = self.local.forward_cached(&batch.states);
        let n = batch.len();
        let mut grad_output = Array2::zeros(cache.output.raw_dim());
        let mut loss = 0.0;
        for i in 0..n {
            let action = batch.actions[i];
            let target = batch.rewards[i] + gamma * max_next[i] * (1.0 - batch.dones[i]);
            let diff = cache.output[[i, action]] - target;
            loss += diff * diff;
            grad_output[[i, action]] = 2.0 * diff / n as f32;
        }
        loss /= n as f32;

        let grads = self.local.backward(&cache, &grad_output);
        self.optimizer.step(&mut self.local, &grads);
        self.target.soft_update_from(&self.local, self.config.tau);

        self.learn_steps += 1;
        debug!(learn_step = self.learn_steps, loss, "Learning step");
        Ok(loss)
    }

    pub fn local(&self) -> &QNetwork {
        &self.local
    }

    pub fn target(&self) -> &QNetwork {
        &self.target
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    /// Number of learning steps taken so far
    pub fn learn_steps(&self) -> u64 {
        self.learn_steps
    }

    fn check_batch(&self, batch: &Batch) -> SchedResult<()> {
        if batch.is_empty() {
            return Err(SchedError::Agent("cannot learn from an empty batch".to_string()));
        }
        let n = batch.len();
        let width = self.state_size();
        if batch.states.dim() != (n, width)
            || batch.next_states.dim() != (n, width)
            || batch.rewards.len() != n
            || batch.dones.len() != n
        {
            return Err(SchedError::Agent(format!(
                "malformed batch of {} transitions for {} state features",
                n, width
            )));
        }
        if let Some(&action) = batch.actions.iter().find(|&&a| a >= self.action_size()) {
            return Err(SchedError::Agent(format!(
                "action {} out of range for {} actions",
                action,
                self.action_size()
            )));
        }
        Ok(())
    }

    fn check_state(&self, state: &[f32]) -> SchedResult<()> {
        if state.len() != self.state_size() {
            return Err(SchedError::Agent(format!(
                "state has {} features, expected {}",
                state.len(),
                self.state_size()
            )));
        }
        Ok(())
    }
}
